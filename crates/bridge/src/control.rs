//! Control Loop
//!
//! One task owns the table, the queue and every transport handle. Each
//! iteration:
//! 1. feeds the watchdog
//! 2. applies pending discovery events
//! 3. runs a discovery scan if one is requested
//! 4. on a minute change, samples every due entry in table order
//! 5. forwards at most one queued record

use crate::clock::Clock;
use crate::config::BridgeConfig;
use crate::read_engine::ReadEngine;
use crate::watchdog::Watchdog;
use ble_transport::{discovery_channel, DiscoverySender, WirelessTransport};
use ring_buffer::RingBuffer;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uplink::{ForwardOutcome, Forwarder, Uplink};
use value_scheduler::{CadenceScheduler, DeviceResolver, ScheduleTable};

/// Summary of one iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// Discovery scan performed
    pub scanned: bool,
    /// Minute counter, when this iteration ticked
    pub tick: Option<u64>,
    /// Entries sampled on this tick
    pub sampled: usize,
    /// A record was accepted by the sink
    pub delivered: bool,
    /// Queue occupancy in bytes once the iteration finished
    pub queued_bytes: usize,
}

/// The bridge's single control loop
pub struct ControlLoop<T, U, C, W> {
    scheduler: CadenceScheduler,
    resolver: DeviceResolver,
    discovery_tx: DiscoverySender,
    queue: RingBuffer,
    read_engine: ReadEngine,
    forwarder: Forwarder,
    transport: T,
    uplink: U,
    clock: C,
    watchdog: W,
    discovery_duration: Duration,
    loop_interval: Duration,
}

impl<T, U, C, W> ControlLoop<T, U, C, W>
where
    T: WirelessTransport,
    U: Uplink,
    C: Clock,
    W: Watchdog,
{
    /// Assemble the loop around a built schedule table
    pub fn new(
        config: &BridgeConfig,
        table: ScheduleTable,
        transport: T,
        uplink: U,
        clock: C,
        watchdog: W,
    ) -> Self {
        let (discovery_tx, discovery_rx) = discovery_channel();
        info!(
            "Control loop: {} entries, {} byte queue, {} byte records",
            table.len(),
            config.queue_capacity,
            config.max_record_len
        );
        Self {
            scheduler: CadenceScheduler::new(table),
            resolver: DeviceResolver::new(discovery_rx),
            discovery_tx,
            queue: RingBuffer::new(config.queue_capacity),
            read_engine: ReadEngine::new(config.max_record_len),
            forwarder: Forwarder::new(config.max_record_len),
            transport,
            uplink,
            clock,
            watchdog,
            discovery_duration: Duration::from_secs(config.discovery_seconds),
            loop_interval: Duration::from_millis(config.loop_interval_ms),
        }
    }

    /// Run one iteration
    pub async fn iterate(&mut self) -> IterationReport {
        let mut report = IterationReport::default();
        self.watchdog.feed();
        self.resolver.drain(self.scheduler.table_mut());

        if self.scheduler.take_rediscovery() {
            self.rediscover().await;
            report.scanned = true;
        }

        if let Some(tick) = self.scheduler.poll(self.clock.current_minute()) {
            report.tick = Some(tick.counter);
            for index in tick.due {
                let Some(entry) = self.scheduler.table_mut().get_mut(index) else {
                    continue;
                };
                self.read_engine
                    .sample(entry, &mut self.transport, &self.clock, &mut self.queue)
                    .await;
                self.watchdog.feed();
                report.sampled += 1;
            }
        }

        if let ForwardOutcome::Delivered(delivery) =
            self.forwarder.forward_once(&mut self.queue, &mut self.uplink).await
        {
            report.delivered = true;
            if let Some(correction) = delivery.clock_correction {
                if let Err(e) = self.clock.apply_correction(&correction) {
                    warn!("Ignoring clock correction: {}", e);
                }
            }
        }

        report.queued_bytes = self.queue.used();
        metrics::gauge!("bridge_queue_used_bytes").set(report.queued_bytes as f64);
        report
    }

    /// Iterate every loop interval until `shutdown` resolves. Shutdown is
    /// only observed between iterations.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut interval = tokio::time::interval(self.loop_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Control loop started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {}
            }
            self.iterate().await;
        }
        info!(
            "Control loop stopped with {} bytes queued",
            self.queue.used()
        );
    }

    async fn rediscover(&mut self) {
        match self
            .transport
            .discover_once(self.discovery_duration, &self.discovery_tx)
            .await
        {
            Ok(seen) => debug!("Discovery saw {} advertisements", seen),
            Err(e) => warn!("Discovery failed: {}", e),
        }
        self.watchdog.feed();
        let applied = self.resolver.drain(self.scheduler.table_mut());
        debug!("Applied {} discovery events", applied);
        self.report_status();
    }

    fn report_status(&self) {
        info!(
            "Queue {}/{} bytes, {} records queued in total",
            self.queue.used(),
            self.queue.capacity(),
            self.queue.total_pushed()
        );
        for entry in self.scheduler.table() {
            info!("{}", entry);
        }
    }

    /// The cadence scheduler and its table
    pub fn scheduler(&self) -> &CadenceScheduler {
        &self.scheduler
    }

    /// The record queue
    pub fn queue(&self) -> &RingBuffer {
        &self.queue
    }

    /// The wireless transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The uplink
    pub fn uplink(&self) -> &U {
        &self.uplink
    }

    /// The uplink, mutably
    pub fn uplink_mut(&mut self) -> &mut U {
        &mut self.uplink
    }

    /// The clock
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

//! Read engine: one connect/read/disconnect cycle per due entry

use crate::clock::Clock;
use ble_transport::{BleError, WirelessTransport};
use ring_buffer::RingBuffer;
use tracing::{debug, warn};
use value_scheduler::{ErrorFlags, ScheduleEntry};

/// What one sample attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Record formatted and queued
    Queued(String),
    /// Record formatted but the queue had no room; it is dropped
    Overflow(String),
    /// Connect or read failed; nothing queued
    Failed(BleError),
    /// Entry has no address yet
    Unresolved,
}

/// Sample counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub queued: u64,
    pub overflows: u64,
    pub failures: u64,
}

/// Samples entries and queues `timestamp,tag,value` records
pub struct ReadEngine {
    max_record_len: usize,
    stats: ReadStats,
}

impl ReadEngine {
    /// Create an engine emitting records of at most `max_record_len` bytes
    pub fn new(max_record_len: usize) -> Self {
        Self {
            max_record_len,
            stats: ReadStats::default(),
        }
    }

    /// Counters so far
    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// Read `entry` once and queue the result.
    ///
    /// A failed read sets [`ErrorFlags::CONNECT_FAILED`] and the sample is
    /// skipped; a full queue drops the record. Neither is retried.
    pub async fn sample<T, C>(
        &mut self,
        entry: &mut ScheduleEntry,
        transport: &mut T,
        clock: &C,
        queue: &mut RingBuffer,
    ) -> ReadOutcome
    where
        T: WirelessTransport + ?Sized,
        C: Clock + ?Sized,
    {
        let Some(address) = entry.address().cloned() else {
            return ReadOutcome::Unresolved;
        };

        let value = match transport
            .connect_read_disconnect(&address, entry.service_id(), entry.characteristic_id())
            .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!("{}: read from {} failed: {}", entry.tag(), address, e);
                entry.flag_error(ErrorFlags::CONNECT_FAILED);
                self.stats.failures += 1;
                metrics::counter!("bridge_connect_failures_total").increment(1);
                return ReadOutcome::Failed(e);
            }
        };
        entry.record_connect();

        let record = self.format_record(&clock.formatted_timestamp(), entry.tag(), &value);
        metrics::counter!("bridge_samples_total").increment(1);
        match queue.push(&record) {
            Ok(()) => {
                debug!("Queued {:?}", record);
                self.stats.queued += 1;
                ReadOutcome::Queued(record)
            }
            Err(e) => {
                warn!("Queue overflow, dropping {:?}: {}", record, e);
                self.stats.overflows += 1;
                metrics::counter!("bridge_queue_overflow_total").increment(1);
                ReadOutcome::Overflow(record)
            }
        }
    }

    /// `timestamp,tag,value`, null bytes removed and capped at the record
    /// limit on a character boundary
    pub fn format_record(&self, timestamp: &str, tag: &str, value: &str) -> String {
        let mut record = format!("{timestamp},{tag},{value}");
        record.retain(|c| c != '\0');
        if record.len() > self.max_record_len {
            let mut cut = self.max_record_len;
            while !record.is_char_boundary(cut) {
                cut -= 1;
            }
            warn!(
                "{}: record truncated from {} to {} bytes",
                tag,
                record.len(),
                cut
            );
            metrics::counter!("bridge_records_truncated_total").increment(1);
            record.truncate(cut);
        }
        record
    }
}

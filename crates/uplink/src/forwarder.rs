//! Round-Robin Forwarder

use crate::{Delivery, Uplink};
use ring_buffer::{QueueError, RingBuffer};
use tracing::{debug, warn};

/// What one forwarding step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Queue was empty
    Idle,
    /// An empty record was popped and discarded
    Skipped,
    /// Sink accepted the record
    Delivered(Delivery),
    /// Delivery failed; the record went to the back of the queue
    Requeued,
    /// Delivery failed and the record could not be requeued
    Dropped,
}

/// Forwarding counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    pub delivered: u64,
    pub failed_attempts: u64,
    pub dropped: u64,
}

/// Pops one record per step and hands it to the uplink.
///
/// A failed record is pushed back at the write cursor, so it waits behind
/// everything queued after it instead of blocking the head. Retries are
/// unbounded.
pub struct Forwarder {
    /// One byte longer than record plus terminator, so a maximum-length
    /// record still stops on its terminator and leaves the queue whole
    scratch: Box<[u8]>,
    stats: ForwarderStats,
}

impl Forwarder {
    /// Create a forwarder for records up to `max_record_len` bytes
    pub fn new(max_record_len: usize) -> Self {
        Self {
            scratch: vec![0u8; max_record_len + 2].into_boxed_slice(),
            stats: ForwarderStats::default(),
        }
    }

    /// Longest record popped without truncation
    pub fn max_record_len(&self) -> usize {
        self.scratch.len() - 2
    }

    /// Counters so far
    pub fn stats(&self) -> ForwarderStats {
        self.stats
    }

    /// Attempt delivery of the oldest queued record
    pub async fn forward_once<U>(
        &mut self,
        queue: &mut RingBuffer,
        uplink: &mut U,
    ) -> ForwardOutcome
    where
        U: Uplink + ?Sized,
    {
        let len = match queue.pop_into(&mut self.scratch) {
            Ok(len) => len,
            Err(QueueError::Empty) => return ForwardOutcome::Idle,
            Err(e) => {
                warn!("Pop failed: {}", e);
                return ForwardOutcome::Idle;
            }
        };
        if len == 0 {
            return ForwardOutcome::Skipped;
        }
        let record = String::from_utf8_lossy(&self.scratch[..len]).into_owned();

        match uplink.deliver(&record).await {
            Ok(delivery) => {
                debug!("Delivered {:?}", record);
                self.stats.delivered += 1;
                metrics::counter!("bridge_records_delivered_total").increment(1);
                ForwardOutcome::Delivered(delivery)
            }
            Err(e) => {
                self.stats.failed_attempts += 1;
                metrics::counter!("bridge_delivery_failures_total").increment(1);
                match queue.push(&record) {
                    Ok(()) => {
                        debug!("Delivery failed ({}), requeued {:?}", e, record);
                        ForwardOutcome::Requeued
                    }
                    Err(qe) => {
                        warn!("Delivery failed ({}), record lost on requeue: {}", e, qe);
                        self.stats.dropped += 1;
                        ForwardOutcome::Dropped
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockUplink;

    #[tokio::test]
    async fn test_empty_queue_is_idle() {
        let mut queue = RingBuffer::new(64);
        let mut uplink = MockUplink::new();
        let mut forwarder = Forwarder::new(32);

        assert_eq!(forwarder.forward_once(&mut queue, &mut uplink).await, ForwardOutcome::Idle);
        assert_eq!(uplink.attempts(), 0);
    }

    #[tokio::test]
    async fn test_failed_record_rotates_to_back() {
        let mut queue = RingBuffer::new(64);
        for r in ["A", "B", "C"] {
            queue.push(r).unwrap();
        }
        let mut uplink = MockUplink::new();
        uplink.fail_times("B", 1);
        let mut forwarder = Forwarder::new(32);

        while !queue.is_empty() {
            forwarder.forward_once(&mut queue, &mut uplink).await;
        }

        assert_eq!(uplink.delivered(), ["A", "C", "B"]);
        assert_eq!(
            forwarder.stats(),
            ForwarderStats {
                delivered: 3,
                failed_attempts: 1,
                dropped: 0
            }
        );
    }

    #[tokio::test]
    async fn test_max_length_record_survives_failed_delivery_on_full_queue() {
        let first = "0123456789abcdef";
        let second = "fedcba9876543210";
        let mut queue = RingBuffer::new(35);
        queue.push(first).unwrap();
        queue.push(second).unwrap();
        assert_eq!(queue.available(), 0);

        let mut uplink = MockUplink::new();
        uplink.fail_times(first, 1);
        let mut forwarder = Forwarder::new(first.len());
        assert_eq!(forwarder.max_record_len(), 16);

        assert_eq!(
            forwarder.forward_once(&mut queue, &mut uplink).await,
            ForwardOutcome::Requeued
        );
        assert_eq!(queue.used(), 34);

        while !queue.is_empty() {
            let outcome = forwarder.forward_once(&mut queue, &mut uplink).await;
            assert!(matches!(outcome, ForwardOutcome::Delivered(_)), "{outcome:?}");
        }
        assert_eq!(uplink.delivered(), [second, first]);
        assert_eq!(forwarder.stats().dropped, 0);
    }

    #[tokio::test]
    async fn test_max_length_record_leaves_queue_empty() {
        let mut queue = RingBuffer::new(64);
        queue.push("0123456789abcdef").unwrap();
        let mut uplink = MockUplink::new();
        let mut forwarder = Forwarder::new(16);

        assert!(matches!(
            forwarder.forward_once(&mut queue, &mut uplink).await,
            ForwardOutcome::Delivered(_)
        ));
        assert!(queue.is_empty());
        assert_eq!(queue.used(), 0);
        assert_eq!(
            forwarder.forward_once(&mut queue, &mut uplink).await,
            ForwardOutcome::Idle
        );
    }

    #[tokio::test]
    async fn test_offline_sink_keeps_records() {
        let mut queue = RingBuffer::new(64);
        queue.push("A").unwrap();
        queue.push("B").unwrap();
        let mut uplink = MockUplink::new();
        uplink.set_online(false);
        let mut forwarder = Forwarder::new(32);

        for _ in 0..10 {
            assert_eq!(
                forwarder.forward_once(&mut queue, &mut uplink).await,
                ForwardOutcome::Requeued
            );
        }
        assert_eq!(queue.used(), 4);

        uplink.set_online(true);
        forwarder.forward_once(&mut queue, &mut uplink).await;
        forwarder.forward_once(&mut queue, &mut uplink).await;
        assert!(queue.is_empty());
        assert_eq!(uplink.delivered().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_record_skipped() {
        let mut queue = RingBuffer::new(64);
        queue.push("").unwrap();
        let mut uplink = MockUplink::new();
        let mut forwarder = Forwarder::new(32);

        assert_eq!(
            forwarder.forward_once(&mut queue, &mut uplink).await,
            ForwardOutcome::Skipped
        );
        assert_eq!(uplink.attempts(), 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_clock_correction_passed_through() {
        let mut queue = RingBuffer::new(64);
        queue.push("A").unwrap();
        let mut uplink = MockUplink::new().with_clock_correction("2024-02-29 10:00:00");
        let mut forwarder = Forwarder::new(32);

        let outcome = forwarder.forward_once(&mut queue, &mut uplink).await;
        assert_eq!(
            outcome,
            ForwardOutcome::Delivered(Delivery {
                clock_correction: Some("2024-02-29 10:00:00".to_string())
            })
        );
    }
}

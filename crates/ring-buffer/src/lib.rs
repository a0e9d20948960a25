//! Record Ring Buffer
//!
//! Bounded FIFO of variable-length text records, stored back to back as
//! null-terminated byte runs in a fixed allocation. Decouples the sampling
//! cadence from uplink availability.

mod buffer;

pub use buffer::{RingBuffer, DEFAULT_CAPACITY, TERMINATOR};

use thiserror::Error;

/// Ring buffer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Record plus terminator does not fit in the free space
    #[error("Queue full: record needs {needed} bytes, {available} available")]
    Full { needed: usize, available: usize },

    /// Nothing to pop
    #[error("Queue empty")]
    Empty,

    /// Records are null-terminated and cannot carry a null byte themselves
    #[error("Record contains an embedded null byte at offset {0}")]
    EmbeddedNull(usize),

    /// Destination cannot even hold the terminator
    #[error("Destination buffer too small")]
    DestinationTooSmall,
}

//! Byte Ring Implementation

use crate::QueueError;

/// Default buffer capacity in bytes
pub const DEFAULT_CAPACITY: usize = 8192;

/// Record terminator
pub const TERMINATOR: u8 = 0;

/// Bounded FIFO of null-terminated text records.
///
/// One byte of `capacity` is never occupied so that `head == tail` always
/// means empty; at most `capacity - 1` bytes are in use at any time.
pub struct RingBuffer {
    /// Pre-allocated storage
    storage: Box<[u8]>,
    /// Capacity of the buffer in bytes
    capacity: usize,
    /// Head position (write cursor)
    head: usize,
    /// Tail position (read cursor)
    tail: usize,
    /// Total records admitted (for statistics)
    total_pushed: usize,
}

impl RingBuffer {
    /// Create a new ring buffer with given capacity in bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![TERMINATOR; capacity].into_boxed_slice(),
            capacity,
            head: 0,
            tail: 0,
            total_pushed: 0,
        }
    }

    /// Create a buffer with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Append a record.
    ///
    /// All-or-nothing: either the record and its terminator are written in
    /// full, or the buffer is left untouched.
    ///
    /// # Errors
    /// [`QueueError::Full`] when the terminated record exceeds
    /// [`available`](Self::available), [`QueueError::EmbeddedNull`] when the
    /// record itself contains a terminator byte.
    pub fn push(&mut self, record: &str) -> Result<(), QueueError> {
        let bytes = record.as_bytes();
        if let Some(pos) = bytes.iter().position(|&b| b == TERMINATOR) {
            return Err(QueueError::EmbeddedNull(pos));
        }

        let needed = bytes.len() + 1;
        let available = self.available();
        if needed > available {
            return Err(QueueError::Full { needed, available });
        }

        for &b in bytes.iter().chain(std::iter::once(&TERMINATOR)) {
            self.storage[self.head] = b;
            self.head = self.advance(self.head);
        }
        self.total_pushed += 1;
        Ok(())
    }

    /// Pop the oldest record into `dest`, returning the number of bytes
    /// copied before the terminator that is always written into `dest`.
    ///
    /// Copying stops at the record terminator, when the read cursor catches
    /// up with the write cursor, or after `dest.len() - 1` bytes. In the last
    /// case the rest of the record stays queued and the next pop resumes in
    /// the middle of it, so `dest` must be longer than any record pushed.
    ///
    /// # Errors
    /// [`QueueError::DestinationTooSmall`] for an empty `dest`,
    /// [`QueueError::Empty`] when nothing is queued.
    pub fn pop_into(&mut self, dest: &mut [u8]) -> Result<usize, QueueError> {
        if dest.is_empty() {
            return Err(QueueError::DestinationTooSmall);
        }
        dest[0] = TERMINATOR;
        if self.is_empty() {
            return Err(QueueError::Empty);
        }

        let limit = dest.len() - 1;
        let mut copied = 0;
        while copied < limit {
            let b = self.storage[self.tail];
            self.tail = self.advance(self.tail);
            dest[copied] = b;
            if b == TERMINATOR {
                return Ok(copied);
            }
            copied += 1;
            if self.tail == self.head {
                break;
            }
        }
        dest[copied] = TERMINATOR;
        Ok(copied)
    }

    /// Pop the oldest record as an owned string, reading at most
    /// `max_len - 1` bytes (see [`pop_into`](Self::pop_into)).
    ///
    /// # Errors
    /// Same as [`pop_into`](Self::pop_into).
    pub fn pop(&mut self, max_len: usize) -> Result<String, QueueError> {
        let mut scratch = vec![TERMINATOR; max_len];
        let n = self.pop_into(&mut scratch)?;
        scratch.truncate(n);
        Ok(String::from_utf8_lossy(&scratch).into_owned())
    }

    /// Bytes currently occupied, terminators included
    pub fn used(&self) -> usize {
        if self.head >= self.tail {
            self.head - self.tail
        } else {
            self.capacity - self.tail + self.head
        }
    }

    /// Free bytes, always keeping the one-byte gap
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.used() + 1)
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Get the buffer capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.used() as f64 / self.capacity as f64
    }

    /// Get total records admitted (for statistics)
    pub fn total_pushed(&self) -> usize {
        self.total_pushed
    }

    /// Drop everything queued and rewind both cursors
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    fn advance(&self, cursor: usize) -> usize {
        let next = cursor + 1;
        if next >= self.capacity {
            0
        } else {
            next
        }
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("used", &self.used())
            .finish()
    }
}

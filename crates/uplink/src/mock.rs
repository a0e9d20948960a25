//! Scripted sink for tests

use crate::{Delivery, Uplink, UplinkError};
use async_trait::async_trait;
use std::collections::HashMap;

/// In-memory sink recording accepted records
#[derive(Debug)]
pub struct MockUplink {
    online: bool,
    /// Remaining forced failures per record
    failures: HashMap<String, usize>,
    clock_correction: Option<String>,
    delivered: Vec<String>,
    attempts: usize,
}

impl Default for MockUplink {
    fn default() -> Self {
        Self {
            online: true,
            failures: HashMap::new(),
            clock_correction: None,
            delivered: Vec::new(),
            attempts: 0,
        }
    }
}

impl MockUplink {
    /// Create an online sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every delivery with this clock correction
    pub fn with_clock_correction(mut self, correction: impl Into<String>) -> Self {
        self.clock_correction = Some(correction.into());
        self
    }

    /// Reject `record` the next `times` it is delivered
    pub fn fail_times(&mut self, record: impl Into<String>, times: usize) {
        self.failures.insert(record.into(), times);
    }

    /// Take the sink on or offline
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Accepted records, in acceptance order
    pub fn delivered(&self) -> &[String] {
        &self.delivered
    }

    /// Delivery attempts, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

#[async_trait]
impl Uplink for MockUplink {
    async fn deliver(&mut self, record: &str) -> Result<Delivery, UplinkError> {
        self.attempts += 1;
        if !self.online {
            return Err(UplinkError::Connection("sink offline".to_string()));
        }
        if let Some(remaining) = self.failures.get_mut(record) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(UplinkError::Rejected(record.to_string()));
            }
        }
        self.delivered.push(record.to_string());
        Ok(Delivery {
            clock_correction: self.clock_correction.clone(),
        })
    }
}

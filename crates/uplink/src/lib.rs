//! Uplink Forwarding
//!
//! Drains queued records to a network sink:
//! - [`Uplink`]: one request/response exchange with the sink
//! - [`Forwarder`]: pops the oldest record and requeues it on failure
//! - [`MqttUplink`]: MQTT publisher
//! - [`MockUplink`]: scripted sink for tests

mod forwarder;
mod mock;
mod mqtt;

pub use forwarder::{ForwardOutcome, Forwarder, ForwarderStats};
pub use mock::MockUplink;
pub use mqtt::{MqttConfig, MqttUplink};

use async_trait::async_trait;
use thiserror::Error;

/// Uplink error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UplinkError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Sink rejected record: {0}")]
    Rejected(String),
}

/// Successful delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Out-of-band time from the sink, passed to the clock untouched
    pub clock_correction: Option<String>,
}

/// Network sink for records
#[async_trait]
pub trait Uplink: Send {
    /// Deliver one record. `Ok` means the sink accepted it.
    async fn deliver(&mut self, record: &str) -> Result<Delivery, UplinkError>;
}

//! Transport Trait and Discovery Events

use crate::{BleAddress, BleError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// One advertisement seen during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Advertised local name (empty if the peripheral sent none)
    pub name: String,
    /// Hardware address of the advertiser
    pub address: BleAddress,
}

impl Discovery {
    /// Create a discovery event
    pub fn new(name: impl Into<String>, address: BleAddress) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

/// Sending half handed to the transport during a scan
pub type DiscoverySender = mpsc::UnboundedSender<Discovery>;

/// Receiving half drained by the resolver
pub type DiscoveryReceiver = mpsc::UnboundedReceiver<Discovery>;

/// Create the channel that carries discovery events to the resolver.
///
/// Unbounded so the scan callback never blocks on the consumer.
pub fn discovery_channel() -> (DiscoverySender, DiscoveryReceiver) {
    mpsc::unbounded_channel()
}

/// Wireless transport used by the bridge.
///
/// Every call occupies the caller until it completes; timeouts are the
/// transport's own business.
#[async_trait]
pub trait WirelessTransport: Send {
    /// Scan for `duration`, emitting one [`Discovery`] per advertisement on
    /// `events`. Returns the number of advertisements seen.
    async fn discover_once(
        &mut self,
        duration: Duration,
        events: &DiscoverySender,
    ) -> Result<usize, BleError>;

    /// Connect to `address`, read one characteristic as text, disconnect.
    async fn connect_read_disconnect(
        &mut self,
        address: &BleAddress,
        service_id: &str,
        characteristic_id: &str,
    ) -> Result<String, BleError>;
}

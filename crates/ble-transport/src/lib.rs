//! BLE Transport Interface
//!
//! The wireless side of the bridge: scanning for advertising peripherals and
//! performing one connect/read/disconnect cycle against a characteristic.
//! Radio stacks plug in behind [`WirelessTransport`]; [`MockTransport`]
//! stands in for hardware in tests and simulated deployments.

mod address;
mod error;
mod mock;
mod transport;

pub use address::BleAddress;
pub use error::BleError;
pub use mock::{MockDevice, MockTransport};
pub use transport::{
    discovery_channel, Discovery, DiscoveryReceiver, DiscoverySender, WirelessTransport,
};

//! BLE Error Types

use thiserror::Error;

/// Errors that can occur talking to a wireless peripheral
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BleError {
    /// Radio adapter missing or powered off
    #[error("Bluetooth adapter unavailable: {0}")]
    AdapterUnavailable(String),

    /// Scan could not be started or was aborted
    #[error("Scan failed: {0}")]
    ScanFailed(String),

    /// Peripheral did not accept the connection
    #[error("Connect to {address} failed: {reason}")]
    ConnectFailed { address: String, reason: String },

    /// Service not offered by the peripheral
    #[error("Service {0} not found")]
    ServiceNotFound(String),

    /// Characteristic not offered by the service
    #[error("Characteristic {0} not found")]
    CharacteristicNotFound(String),

    /// Read of the characteristic value failed
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Operation timed out inside the transport
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Text that does not parse as a hardware address
    #[error("Invalid hardware address: {0:?}")]
    InvalidAddress(String),
}

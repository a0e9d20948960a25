//! Bridge Error Types

use thiserror::Error;
use uplink::UplinkError;

/// Errors raised while assembling or running the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration loaded but is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Key/value store could not be read
    #[error("Failed to read {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Clock correction text not understood
    #[error("Unparsable clock correction {0:?}")]
    ClockCorrection(String),

    /// Uplink could not be started
    #[error("Uplink error: {0}")]
    Uplink(#[from] UplinkError),
}

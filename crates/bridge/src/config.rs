//! Bridge configuration

use crate::BridgeError;
use ble_transport::{BleAddress, MockDevice, MockTransport};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;
use uplink::MqttConfig;
use value_scheduler::MAX_ENTRIES;

/// Environment variable prefix for overrides (`BRIDGE_QUEUE_CAPACITY=...`)
pub const ENV_PREFIX: &str = "BRIDGE";

/// Smallest record limit that still fits a timestamp and a short value
pub const MIN_RECORD_LEN: usize = 16;

/// Bridge configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Record queue size in bytes
    pub queue_capacity: usize,
    /// Longest record, terminator excluded
    pub max_record_len: usize,
    /// Maximum tracked values
    pub max_entries: usize,
    /// Length of each discovery scan
    pub discovery_seconds: u64,
    /// Control loop period
    pub loop_interval_ms: u64,
    /// Loop stall that triggers a process abort
    pub watchdog_timeout_secs: u64,
    /// Boot-time key/value store holding the `VALUE<n>` lines
    pub values_file: PathBuf,
    /// Key prefix of value lines in the store
    pub values_prefix: String,
    /// Log level filter
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// MQTT uplink
    pub uplink: MqttConfig,
    /// Simulated peripherals served by the mock transport
    pub simulation: SimulationConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 8192,
            max_record_len: 192,
            max_entries: MAX_ENTRIES,
            discovery_seconds: 5,
            loop_interval_ms: 1000,
            watchdog_timeout_secs: 120,
            values_file: PathBuf::from("bridge.cfg"),
            values_prefix: "VALUE".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            uplink: MqttConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load from an optional TOML file, then apply `BRIDGE_*` environment
    /// overrides. Missing keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, BridgeError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        info!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Reject settings that would break the queue's record sizing
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.max_record_len < MIN_RECORD_LEN {
            return Err(BridgeError::InvalidConfig(format!(
                "max_record_len {} below {}",
                self.max_record_len, MIN_RECORD_LEN
            )));
        }
        if self.queue_capacity <= self.max_record_len + 1 {
            return Err(BridgeError::InvalidConfig(format!(
                "queue_capacity {} cannot hold a {} byte record",
                self.queue_capacity, self.max_record_len
            )));
        }
        if self.max_entries == 0 {
            return Err(BridgeError::InvalidConfig("max_entries is 0".to_string()));
        }
        if self.loop_interval_ms == 0 {
            return Err(BridgeError::InvalidConfig("loop_interval_ms is 0".to_string()));
        }
        Ok(())
    }
}

/// Simulated peripherals
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub devices: Vec<SimulatedDevice>,
}

/// One simulated peripheral
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedDevice {
    pub name: String,
    pub address: BleAddress,
    /// Fixed characteristic values; anything else gets a generated reading
    #[serde(default)]
    pub values: Vec<SimulatedValue>,
}

/// A fixed characteristic value
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedValue {
    pub service_id: String,
    pub characteristic_id: String,
    pub value: String,
}

impl SimulationConfig {
    /// Build the mock transport serving these devices
    pub fn transport(&self) -> MockTransport {
        let mut transport = MockTransport::new();
        for device in &self.devices {
            let mut mock =
                MockDevice::new(device.name.clone(), device.address.clone()).synthesized();
            for v in &device.values {
                mock = mock.with_value(
                    v.service_id.clone(),
                    v.characteristic_id.clone(),
                    v.value.clone(),
                );
            }
            transport.add_device(mock);
        }
        transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.uplink.broker_port, 1883);
    }

    #[test]
    fn test_record_must_fit_queue() {
        let config = BridgeConfig {
            queue_capacity: 100,
            max_record_len: 99,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BridgeError::InvalidConfig(_))));

        // Record plus terminator must fit beside the one-byte gap
        let tight = |queue_capacity| BridgeConfig {
            queue_capacity,
            max_record_len: 32,
            ..Default::default()
        };
        assert!(tight(33).validate().is_err());
        assert!(tight(34).validate().is_ok());

        let config = BridgeConfig {
            max_record_len: 8,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_toml_file() {
        let path = std::env::temp_dir().join(format!("bridge-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
queue_capacity = 4096
values_file = "/etc/bridge/values.cfg"

[uplink]
broker_host = "broker.local"
topic = "site/a"

[[simulation.devices]]
name = "Thermo-1"
address = "aa:bb:cc:dd:ee:01"

[[simulation.devices.values]]
service_id = "svc"
characteristic_id = "temp"
value = "21.5"
"#
        )
        .unwrap();

        let config = BridgeConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.queue_capacity, 4096);
        assert_eq!(config.max_record_len, 192);
        assert_eq!(config.values_file, PathBuf::from("/etc/bridge/values.cfg"));
        assert_eq!(config.uplink.broker_host, "broker.local");
        assert_eq!(config.uplink.broker_port, 1883);
        assert_eq!(config.simulation.devices.len(), 1);
        assert_eq!(config.simulation.devices[0].values[0].value, "21.5");
    }

    #[tokio::test]
    async fn test_simulation_transport() {
        use ble_transport::WirelessTransport;

        let address = BleAddress::parse("aa:bb:cc:dd:ee:01").unwrap();
        let simulation = SimulationConfig {
            devices: vec![SimulatedDevice {
                name: "Thermo-1".to_string(),
                address: address.clone(),
                values: vec![SimulatedValue {
                    service_id: "svc".to_string(),
                    characteristic_id: "temp".to_string(),
                    value: "21.5".to_string(),
                }],
            }],
        };

        let mut transport = simulation.transport();
        let fixed = transport
            .connect_read_disconnect(&address, "svc", "temp")
            .await
            .unwrap();
        assert_eq!(fixed, "21.5");
        assert!(transport
            .connect_read_disconnect(&address, "svc", "other")
            .await
            .is_ok());
    }
}

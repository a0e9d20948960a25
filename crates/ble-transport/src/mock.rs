//! Mock Transport
//!
//! In-memory peripherals for tests and for running the bridge without a
//! radio.

use crate::{BleAddress, BleError, Discovery, DiscoverySender, WirelessTransport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// A simulated peripheral
#[derive(Debug, Clone)]
pub struct MockDevice {
    /// Advertised name
    pub name: String,
    /// Hardware address
    pub address: BleAddress,
    /// Whether the device advertises during scans
    pub advertising: bool,
    /// Whether connects succeed
    pub reachable: bool,
    /// Fixed values keyed by (service, characteristic)
    values: HashMap<(String, String), String>,
    /// Produce a pseudo-random reading for unknown characteristics
    synthesize: bool,
}

impl MockDevice {
    /// Create an advertising, reachable device with no characteristics
    pub fn new(name: impl Into<String>, address: BleAddress) -> Self {
        Self {
            name: name.into(),
            address,
            advertising: true,
            reachable: true,
            values: HashMap::new(),
            synthesize: false,
        }
    }

    /// Add a fixed characteristic value
    pub fn with_value(
        mut self,
        service_id: impl Into<String>,
        characteristic_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.values
            .insert((service_id.into(), characteristic_id.into()), value.into());
        self
    }

    /// Answer any characteristic with a generated reading
    pub fn synthesized(mut self) -> Self {
        self.synthesize = true;
        self
    }

    fn read(&self, service_id: &str, characteristic_id: &str, seq: usize) -> Option<String> {
        let key = (service_id.to_string(), characteristic_id.to_string());
        if let Some(value) = self.values.get(&key) {
            return Some(value.clone());
        }
        self.synthesize
            .then(|| synthesize_reading(&self.address, characteristic_id, seq))
    }
}

/// Mock wireless transport
#[derive(Debug, Default)]
pub struct MockTransport {
    devices: Vec<MockDevice>,
    scans: usize,
    reads: Vec<BleAddress>,
}

impl MockTransport {
    /// Create an empty mock transport
    pub fn new() -> Self {
        info!("Creating mock BLE transport");
        Self::default()
    }

    /// Add a device (builder form)
    pub fn with_device(mut self, device: MockDevice) -> Self {
        self.add_device(device);
        self
    }

    /// Add a device
    pub fn add_device(&mut self, device: MockDevice) {
        debug!("Mock device {} at {}", device.name, device.address);
        self.devices.push(device);
    }

    /// Make connects to `address` succeed or fail
    pub fn set_reachable(&mut self, address: &BleAddress, reachable: bool) {
        for device in self.devices.iter_mut().filter(|d| &d.address == address) {
            device.reachable = reachable;
        }
    }

    /// Start or stop a device advertising
    pub fn set_advertising(&mut self, address: &BleAddress, advertising: bool) {
        for device in self.devices.iter_mut().filter(|d| &d.address == address) {
            device.advertising = advertising;
        }
    }

    /// Number of scans performed
    pub fn scan_count(&self) -> usize {
        self.scans
    }

    /// Addresses of every successful read, in order
    pub fn reads(&self) -> &[BleAddress] {
        &self.reads
    }
}

#[async_trait]
impl WirelessTransport for MockTransport {
    async fn discover_once(
        &mut self,
        duration: Duration,
        events: &DiscoverySender,
    ) -> Result<usize, BleError> {
        self.scans += 1;
        debug!("Mock scan {} for {:?}", self.scans, duration);

        let mut seen = 0;
        for device in self.devices.iter().filter(|d| d.advertising) {
            events
                .send(Discovery::new(device.name.clone(), device.address.clone()))
                .map_err(|_| BleError::ScanFailed("discovery receiver dropped".to_string()))?;
            seen += 1;
        }
        Ok(seen)
    }

    async fn connect_read_disconnect(
        &mut self,
        address: &BleAddress,
        service_id: &str,
        characteristic_id: &str,
    ) -> Result<String, BleError> {
        let device = self
            .devices
            .iter()
            .find(|d| &d.address == address && d.reachable)
            .ok_or_else(|| BleError::ConnectFailed {
                address: address.to_string(),
                reason: "no response".to_string(),
            })?;

        let value = device
            .read(service_id, characteristic_id, self.reads.len())
            .ok_or_else(|| BleError::CharacteristicNotFound(characteristic_id.to_string()))?;

        self.reads.push(address.clone());
        Ok(value)
    }
}

/// Deterministic pseudo reading in the 15.00..35.00 range
fn synthesize_reading(address: &BleAddress, characteristic_id: &str, seq: usize) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    address.hash(&mut hasher);
    characteristic_id.hash(&mut hasher);
    seq.hash(&mut hasher);
    let hash = hasher.finish();

    let centi = 1500 + (hash % 2000);
    format!("{}.{:02}", centi / 100, centi % 100)
}

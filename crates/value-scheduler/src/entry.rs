//! Schedule Entry
//!
//! One tracked value: which peripheral characteristic to read, how often,
//! and what has happened to it so far.

use crate::ScheduleError;
use ble_transport::BleAddress;
use std::fmt;

/// Longest tag kept from configuration
pub const MAX_TAG_LEN: usize = 63;
/// Longest device/service/characteristic identifier kept from configuration
pub const MAX_ID_LEN: usize = 37;
/// Shortest cadence (every minute)
pub const MIN_INTERVAL: u32 = 1;
/// Longest cadence (once per day)
pub const MAX_INTERVAL: u32 = 1440;
/// Cadence of an entry that has not been configured
pub const DEFAULT_INTERVAL: u32 = 60;

/// Sticky error bits recorded against an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorFlags(u8);

impl ErrorFlags {
    /// Cadence came due while the device had never been discovered
    pub const DEVICE_NOT_FOUND: ErrorFlags = ErrorFlags(0x01);
    /// A connect/read cycle failed
    pub const CONNECT_FAILED: ErrorFlags = ErrorFlags(0x02);

    /// No errors
    pub fn empty() -> Self {
        Self(0)
    }

    /// Raw bitmask
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every bit of `other` is set
    pub fn contains(self, other: ErrorFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether no bit is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn insert(&mut self, other: ErrorFlags) {
        self.0 |= other.0;
    }
}

/// A value sampled on its own cadence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    tag: String,
    device_id: String,
    service_id: String,
    characteristic_id: String,
    interval_minutes: u32,
    address: Option<BleAddress>,
    connects: u32,
    errors: ErrorFlags,
}

impl Default for ScheduleEntry {
    fn default() -> Self {
        Self {
            tag: String::new(),
            device_id: String::new(),
            service_id: String::new(),
            characteristic_id: String::new(),
            interval_minutes: DEFAULT_INTERVAL,
            address: None,
            connects: 0,
            errors: ErrorFlags::empty(),
        }
    }
}

impl ScheduleEntry {
    /// Parse `tag,interval,deviceId,serviceId,characteristicId`.
    ///
    /// The interval is clamped to [`MIN_INTERVAL`]..=[`MAX_INTERVAL`] and
    /// overlong fields are truncated; only a missing separator is an error.
    /// Everything after the fourth comma is the characteristic identifier.
    pub fn parse(line: &str) -> Result<Self, ScheduleError> {
        let mut rest = line;
        let mut fields = [""; 4];
        for (i, field) in fields.iter_mut().enumerate() {
            let (head, tail) = rest.split_once(',').ok_or(ScheduleError::MissingComma(i + 1))?;
            *field = head;
            rest = tail;
        }
        let [tag, interval, device_id, service_id] = fields;

        Ok(Self {
            tag: truncated(tag, MAX_TAG_LEN),
            device_id: truncated(device_id, MAX_ID_LEN),
            service_id: truncated(service_id, MAX_ID_LEN),
            characteristic_id: truncated(rest, MAX_ID_LEN),
            interval_minutes: clamp_interval(leading_int(interval)),
            ..Default::default()
        })
    }

    /// Label attached to every record of this value
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Configured device name or hardware address
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Service holding the value
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Characteristic holding the value
    pub fn characteristic_id(&self) -> &str {
        &self.characteristic_id
    }

    /// Cadence in whole minutes
    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    /// Address learned from discovery, if any
    pub fn address(&self) -> Option<&BleAddress> {
        self.address.as_ref()
    }

    /// Check whether discovery has matched this entry
    pub fn is_resolved(&self) -> bool {
        self.address.is_some()
    }

    /// Successful connect/read cycles so far
    pub fn connects(&self) -> u32 {
        self.connects
    }

    /// Errors seen so far
    pub fn errors(&self) -> ErrorFlags {
        self.errors
    }

    /// Check whether the configured identifier names this advertiser
    pub fn matches(&self, name: &str, address: &BleAddress) -> bool {
        self.device_id == name || self.device_id == address.as_str()
    }

    /// Record the discovered address, returning whether it changed
    pub fn resolve(&mut self, address: &BleAddress) -> bool {
        if self.address.as_ref() == Some(address) {
            return false;
        }
        self.address = Some(address.clone());
        true
    }

    /// Cadence condition alone, ignoring resolution
    pub fn cadence_matches(&self, counter: u64) -> bool {
        counter % u64::from(self.interval_minutes) == 0
    }

    /// Due on this tick: cadence matches and the address is known
    pub fn is_due(&self, counter: u64) -> bool {
        self.cadence_matches(counter) && self.is_resolved()
    }

    /// Count a successful connect
    pub fn record_connect(&mut self) {
        self.connects = self.connects.saturating_add(1);
    }

    /// Set an error bit; bits are never cleared
    pub fn flag_error(&mut self, flag: ErrorFlags) {
        self.errors.insert(flag);
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{},{:x}",
            self.tag,
            self.interval_minutes,
            self.device_id,
            self.service_id,
            self.characteristic_id,
            self.address.as_ref().map(BleAddress::as_str).unwrap_or(""),
            self.connects,
            self.errors.bits()
        )
    }
}

fn truncated(field: &str, max: usize) -> String {
    field.chars().take(max).collect()
}

fn clamp_interval(minutes: i64) -> u32 {
    // Clamped into 1..=1440, so the cast is lossless
    minutes.clamp(i64::from(MIN_INTERVAL), i64::from(MAX_INTERVAL)) as u32
}

/// Leading integer of `text`: optional whitespace and sign, then digits.
/// No digits yields 0.
fn leading_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
    if negative {
        -value
    } else {
        value
    }
}

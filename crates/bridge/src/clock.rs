//! Wall clock
//!
//! Minute ticks and record timestamps come from here. The sink may send a
//! time correction, which re-bases the clock without touching the host.

use crate::BridgeError;
use chrono::{DateTime, Duration, Local, NaiveDateTime, Timelike};
use tracing::info;

/// Record timestamp format
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Time source for the control loop
pub trait Clock: Send {
    /// Minute of the hour (0..=59)
    fn current_minute(&self) -> u32;

    /// Second of the minute (0..=59)
    fn current_second(&self) -> u32;

    /// Current time as [`TIMESTAMP_FORMAT`]
    fn formatted_timestamp(&self) -> String;

    /// Re-base the clock on a correction received from the sink
    fn apply_correction(&mut self, correction: &str) -> Result<(), BridgeError>;
}

/// Parse a correction as RFC 3339 or as [`TIMESTAMP_FORMAT`] local time
fn parse_correction(correction: &str) -> Result<NaiveDateTime, BridgeError> {
    let text = correction.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Local).naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT))
        .map_err(|_| BridgeError::ClockCorrection(correction.to_string()))
}

/// Host local time plus a correction offset
#[derive(Debug, Clone)]
pub struct SystemClock {
    offset: Duration,
}

impl SystemClock {
    /// Clock with no correction
    pub fn new() -> Self {
        Self {
            offset: Duration::zero(),
        }
    }

    /// Offset currently applied to host time
    pub fn offset(&self) -> Duration {
        self.offset
    }

    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local() + self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn current_minute(&self) -> u32 {
        self.now().minute()
    }

    fn current_second(&self) -> u32 {
        self.now().second()
    }

    fn formatted_timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }

    fn apply_correction(&mut self, correction: &str) -> Result<(), BridgeError> {
        let target = parse_correction(correction)?;
        self.offset = target - Local::now().naive_local();
        info!("Clock corrected, offset {}s", self.offset.num_seconds());
        Ok(())
    }
}

/// Hand-driven clock for tests and replays
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: NaiveDateTime,
}

impl ManualClock {
    /// Clock frozen at `now`
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// Clock frozen at a [`TIMESTAMP_FORMAT`] time
    pub fn at(text: &str) -> Result<Self, BridgeError> {
        parse_correction(text).map(Self::new)
    }

    /// Move forward by whole minutes
    pub fn advance_minutes(&mut self, minutes: i64) {
        self.now += Duration::minutes(minutes);
    }

    /// Move forward by seconds
    pub fn advance_seconds(&mut self, seconds: i64) {
        self.now += Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn current_minute(&self) -> u32 {
        self.now.minute()
    }

    fn current_second(&self) -> u32 {
        self.now.second()
    }

    fn formatted_timestamp(&self) -> String {
        self.now.format(TIMESTAMP_FORMAT).to_string()
    }

    fn apply_correction(&mut self, correction: &str) -> Result<(), BridgeError> {
        self.now = parse_correction(correction)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_fields() {
        let mut clock = ManualClock::at("2024-02-29 23:59:30").unwrap();
        assert_eq!(clock.current_minute(), 59);
        assert_eq!(clock.current_second(), 30);

        clock.advance_seconds(45);
        assert_eq!(clock.formatted_timestamp(), "2024-03-01 00:00:15");
        assert_eq!(clock.current_minute(), 0);

        clock.advance_minutes(61);
        assert_eq!(clock.formatted_timestamp(), "2024-03-01 01:01:15");
    }

    #[test]
    fn test_bad_correction_rejected() {
        let mut clock = SystemClock::new();
        assert!(matches!(
            clock.apply_correction("yesterday"),
            Err(BridgeError::ClockCorrection(_))
        ));
        assert_eq!(clock.offset(), Duration::zero());
    }

    #[test]
    fn test_system_clock_correction() {
        let mut clock = SystemClock::new();
        clock.apply_correction("2001-01-01 00:00:00").unwrap();
        assert!(clock.formatted_timestamp().starts_with("2001-01-01 00:0"));
        assert!(clock.offset() < Duration::zero());
    }

    #[test]
    fn test_rfc3339_correction() {
        let mut clock = ManualClock::at("2024-01-01 00:00:00").unwrap();
        clock.apply_correction("2024-06-01T12:34:56+00:00").unwrap();
        assert_eq!(clock.current_second(), 56);
    }
}

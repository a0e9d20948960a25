//! Value Scheduler
//!
//! Tracks the values the bridge samples, each on its own cadence in whole
//! minutes:
//! - [`ScheduleEntry`]: one value, parsed from a configuration line
//! - [`ScheduleTable`]: the fixed set of entries, in configuration order
//! - [`DeviceResolver`]: maps configured device identifiers to addresses
//! - [`CadenceScheduler`]: the minute clock deciding which entries are due

mod entry;
mod error;
mod resolver;
mod scheduler;
mod table;

pub use entry::{
    ErrorFlags, ScheduleEntry, DEFAULT_INTERVAL, MAX_ID_LEN, MAX_INTERVAL, MAX_TAG_LEN,
    MIN_INTERVAL,
};
pub use error::ScheduleError;
pub use resolver::DeviceResolver;
pub use scheduler::{CadenceScheduler, Tick, REDISCOVERY_PERIOD};
pub use table::{ScheduleTable, MAX_ENTRIES};

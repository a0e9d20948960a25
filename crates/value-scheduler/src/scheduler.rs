//! Cadence Scheduler Implementation

use crate::{ErrorFlags, ScheduleTable};
use tracing::{debug, info};

/// Ticks between rediscovery scans
pub const REDISCOVERY_PERIOD: u64 = 60;

/// Result of one minute tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    /// Minute counter for this tick (0 on the first)
    pub counter: u64,
    /// Indices of due entries, in table order
    pub due: Vec<usize>,
}

/// Minute clock deciding which entries are due.
///
/// Owns the schedule table; callers reach entries through
/// [`table`](Self::table) and [`table_mut`](Self::table_mut).
#[derive(Debug)]
pub struct CadenceScheduler {
    table: ScheduleTable,
    /// `None` until the first tick
    counter: Option<u64>,
    /// Wall-clock minute seen on the previous poll
    last_minute: Option<u32>,
    /// Rediscovery requested and not yet consumed
    rediscover: bool,
}

impl CadenceScheduler {
    /// Create a scheduler over `table`. Rediscovery starts out requested.
    pub fn new(table: ScheduleTable) -> Self {
        info!("Cadence scheduler created with {} entries", table.len());
        Self {
            table,
            counter: None,
            last_minute: None,
            rediscover: true,
        }
    }

    /// Feed the current wall-clock minute. Returns a tick when the minute
    /// differs from the one seen on the previous poll.
    pub fn poll(&mut self, minute: u32) -> Option<Tick> {
        if self.last_minute == Some(minute) {
            return None;
        }
        self.last_minute = Some(minute);
        Some(self.advance())
    }

    /// Advance the minute counter by one and evaluate every entry.
    ///
    /// Entries whose cadence matches but which are still unresolved are
    /// flagged [`ErrorFlags::DEVICE_NOT_FOUND`] instead of becoming due.
    pub fn advance(&mut self) -> Tick {
        let counter = self.counter.map_or(0, |c| c + 1);
        self.counter = Some(counter);

        if counter % REDISCOVERY_PERIOD == REDISCOVERY_PERIOD - 1 {
            debug!("Tick {}: rediscovery requested", counter);
            self.rediscover = true;
        }

        let mut due = Vec::new();
        for (index, entry) in self.table.iter_mut().enumerate() {
            if !entry.cadence_matches(counter) {
                continue;
            }
            if entry.is_resolved() {
                due.push(index);
            } else {
                entry.flag_error(ErrorFlags::DEVICE_NOT_FOUND);
            }
        }

        debug!("Tick {}: {} entries due", counter, due.len());
        Tick { counter, due }
    }

    /// Check whether a rediscovery scan is pending
    pub fn rediscovery_due(&self) -> bool {
        self.rediscover
    }

    /// Consume the rediscovery request, returning whether one was pending
    pub fn take_rediscovery(&mut self) -> bool {
        std::mem::replace(&mut self.rediscover, false)
    }

    /// Counter of the latest tick
    pub fn counter(&self) -> Option<u64> {
        self.counter
    }

    /// The schedule table
    pub fn table(&self) -> &ScheduleTable {
        &self.table
    }

    /// The schedule table, mutably
    pub fn table_mut(&mut self) -> &mut ScheduleTable {
        &mut self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceResolver;
    use ble_transport::{BleAddress, Discovery};

    fn resolved_table(lines: &[&str]) -> ScheduleTable {
        let mut table = ScheduleTable::from_lines(8, lines);
        let addr = BleAddress::parse("aa:bb:cc:dd:ee:01").unwrap();
        DeviceResolver::resolve(&mut table, &Discovery::new("Dev", addr));
        table
    }

    #[test]
    fn test_cadence_over_two_hours() {
        let table = resolved_table(&["ONE,1,Dev,s,c", "FIVE,5,Dev,s,c", "HOUR,60,Dev,s,c"]);
        let mut scheduler = CadenceScheduler::new(table);

        for expected in 0..120u64 {
            let tick = scheduler.advance();
            assert_eq!(tick.counter, expected);

            let want: Vec<usize> = match expected {
                c if c % 60 == 0 => vec![0, 1, 2],
                c if c % 5 == 0 => vec![0, 1],
                _ => vec![0],
            };
            assert_eq!(tick.due, want, "counter {}", expected);
        }
    }

    #[test]
    fn test_poll_ticks_only_on_minute_change() {
        let table = resolved_table(&["ONE,1,Dev,s,c"]);
        let mut scheduler = CadenceScheduler::new(table);

        assert_eq!(scheduler.poll(17).map(|t| t.counter), Some(0));
        assert!(scheduler.poll(17).is_none());
        assert!(scheduler.poll(17).is_none());
        assert_eq!(scheduler.poll(18).map(|t| t.counter), Some(1));
        // Clock corrections can jump backwards; any change is a tick
        assert_eq!(scheduler.poll(3).map(|t| t.counter), Some(2));
    }

    #[test]
    fn test_rediscovery_cadence() {
        let mut scheduler = CadenceScheduler::new(ScheduleTable::default());

        assert!(scheduler.rediscovery_due());
        assert!(scheduler.take_rediscovery());
        assert!(!scheduler.rediscovery_due());

        for _ in 0..200 {
            let tick = scheduler.advance();
            let expect = tick.counter % 60 == 59;
            assert_eq!(scheduler.rediscovery_due(), expect, "counter {}", tick.counter);
            if expect {
                assert!(scheduler.take_rediscovery());
                assert!(!scheduler.take_rediscovery());
            }
        }
    }

    #[test]
    fn test_unresolved_entry_never_due_and_flagged() {
        let table = ScheduleTable::from_lines(8, ["LOST,5,Ghost,s,c"]);
        let mut scheduler = CadenceScheduler::new(table);

        let tick = scheduler.advance();
        assert!(tick.due.is_empty());
        assert!(scheduler
            .table()
            .get(0)
            .unwrap()
            .errors()
            .contains(ErrorFlags::DEVICE_NOT_FOUND));
    }

    #[test]
    fn test_off_cadence_unresolved_not_flagged() {
        let table = ScheduleTable::from_lines(8, ["LOST,5,Ghost,s,c"]);
        let mut scheduler = CadenceScheduler::new(table);
        scheduler.counter = Some(0);

        scheduler.advance(); // counter 1
        assert!(scheduler.table().get(0).unwrap().errors().is_empty());
    }
}

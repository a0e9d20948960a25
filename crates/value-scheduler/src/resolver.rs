//! Device Resolver
//!
//! Discovery events arrive on a channel fed by the transport's scan and are
//! applied to the table between loop iterations, so the table is only ever
//! touched by the loop that owns it.

use crate::ScheduleTable;
use ble_transport::{Discovery, DiscoveryReceiver};
use tracing::debug;

/// Applies discovery events to the schedule table
pub struct DeviceResolver {
    events: DiscoveryReceiver,
    applied: usize,
}

impl DeviceResolver {
    /// Create a resolver reading from `events`
    pub fn new(events: DiscoveryReceiver) -> Self {
        Self { events, applied: 0 }
    }

    /// Resolve every entry whose device identifier equals the advertised
    /// name or address. Returns the number of entries matched.
    pub fn resolve(table: &mut ScheduleTable, event: &Discovery) -> usize {
        let mut matched = 0;
        for entry in table
            .iter_mut()
            .filter(|e| e.matches(&event.name, &event.address))
        {
            if entry.resolve(&event.address) {
                debug!("{} resolved to {}", entry.tag(), event.address);
            }
            matched += 1;
        }
        matched
    }

    /// Apply every pending event without waiting. Returns the number of
    /// events consumed.
    pub fn drain(&mut self, table: &mut ScheduleTable) -> usize {
        let mut consumed = 0;
        while let Ok(event) = self.events.try_recv() {
            Self::resolve(table, &event);
            consumed += 1;
        }
        self.applied += consumed;
        consumed
    }

    /// Events applied since creation
    pub fn applied(&self) -> usize {
        self.applied
    }
}

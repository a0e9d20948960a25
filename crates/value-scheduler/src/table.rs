//! Schedule Table

use crate::{ScheduleEntry, ScheduleError};
use tracing::{info, warn};

/// Maximum number of tracked values
pub const MAX_ENTRIES: usize = 32;

/// Fixed-capacity, append-only list of entries in configuration order
#[derive(Debug, Clone)]
pub struct ScheduleTable {
    entries: Vec<ScheduleEntry>,
    max_entries: usize,
    rejected: usize,
}

impl ScheduleTable {
    /// Create an empty table holding at most `max_entries`
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_entries),
            max_entries,
            rejected: 0,
        }
    }

    /// Build a table from configuration lines.
    ///
    /// Lines that fail to parse, or arrive after the table is full, are
    /// logged and skipped; they never stop the build.
    pub fn from_lines<I, S>(max_entries: usize, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new(max_entries);
        for line in lines {
            let line = line.as_ref();
            let result = ScheduleEntry::parse(line).and_then(|entry| table.push(entry));
            if let Err(e) = result {
                warn!("Discarding schedule line {:?}: {}", line, e);
                table.rejected += 1;
            }
        }
        info!(
            "Schedule table built: {} entries, {} rejected",
            table.len(),
            table.rejected
        );
        table
    }

    /// Append an entry
    pub fn push(&mut self, entry: ScheduleEntry) -> Result<(), ScheduleError> {
        if self.entries.len() >= self.max_entries {
            return Err(ScheduleError::TableFull {
                max: self.max_entries,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Lines discarded while building
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&ScheduleEntry> {
        self.entries.get(index)
    }

    /// Mutable entry at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut ScheduleEntry> {
        self.entries.get_mut(index)
    }

    /// Entries in configuration order
    pub fn iter(&self) -> std::slice::Iter<'_, ScheduleEntry> {
        self.entries.iter()
    }

    /// Mutable entries in configuration order
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ScheduleEntry> {
        self.entries.iter_mut()
    }
}

impl Default for ScheduleTable {
    fn default() -> Self {
        Self::new(MAX_ENTRIES)
    }
}

impl<'a> IntoIterator for &'a ScheduleTable {
    type Item = &'a ScheduleEntry;
    type IntoIter = std::slice::Iter<'a, ScheduleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_preserves_order_and_skips_bad_lines() {
        let table = ScheduleTable::from_lines(
            MAX_ENTRIES,
            [
                "VALUE1,5,Thermo-1,s,c",
                "VALUE2,no commas here",
                "VALUE3,60,Thermo-2,s,c",
            ],
        );

        assert_eq!(table.len(), 2);
        assert_eq!(table.rejected(), 1);
        let tags: Vec<_> = table.iter().map(ScheduleEntry::tag).collect();
        assert_eq!(tags, ["VALUE1", "VALUE3"]);
    }

    #[test]
    fn test_capacity_enforced() {
        let lines: Vec<String> = (0..5).map(|i| format!("V{i},1,d,s,c")).collect();
        let table = ScheduleTable::from_lines(3, &lines);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rejected(), 2);

        let mut table = table;
        assert_eq!(
            table.push(ScheduleEntry::default()),
            Err(ScheduleError::TableFull { max: 3 })
        );
    }
}

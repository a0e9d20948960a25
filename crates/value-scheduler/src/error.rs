//! Schedule Error Types

use thiserror::Error;

/// Errors building the schedule table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Configuration line is missing one of its four separators
    #[error("format error, {} comma not found", ordinal(.0))]
    MissingComma(usize),

    /// Table already holds its maximum number of entries
    #[error("schedule table full ({max} entries)")]
    TableFull { max: usize },
}

fn ordinal(n: &usize) -> String {
    let suffix = match *n {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

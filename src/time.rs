//! Age tolerance parsing and the retention cutoff.

use std::num::ParseIntError;
use std::time::{Duration, SystemTime};

/// Age tolerance applied when a rule leaves the column empty
pub const DEFAULT_AGE_DAYS: u64 = 90;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Retention cutoff for one rule, fixed against the run's start time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeThreshold {
    cutoff: SystemTime,
}

impl AgeThreshold {
    /// Build a threshold `days` before `now`
    pub fn new(days: u64, now: SystemTime) -> Self {
        let age = Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY));
        let cutoff = now.checked_sub(age).unwrap_or(SystemTime::UNIX_EPOCH);
        AgeThreshold { cutoff }
    }

    pub fn cutoff(&self) -> SystemTime {
        self.cutoff
    }

    /// Check if a file with this modification time is stale.
    /// The boundary is exclusive: a file modified exactly at the cutoff is kept.
    pub fn is_stale(&self, modified_time: SystemTime) -> bool {
        modified_time < self.cutoff
    }
}

/// Parse an age tolerance cell.
///
/// Returns `Ok(None)` for an empty cell (caller applies the default) and
/// an error when the value is not a non-negative whole number of days.
pub fn parse_age_days(raw: &str) -> Result<Option<u64>, ParseIntError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    // Spreadsheet exports sometimes write whole numbers as "30.0"
    let digits = raw.strip_suffix(".0").unwrap_or(raw);
    digits.parse::<u64>().map(Some)
}

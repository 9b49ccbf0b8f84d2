//! Temporal grouping of reports into calendar-month windows.
//!
//! Recurrence is measured in *distinct* windows, never raw counts —
//! 100 reports in one week is a flood of duplicates, not a chronic
//! problem. A month is coarse enough to collapse duplicate storms and
//! fine enough to catch seasonal recurrence.

use chrono::{DateTime, Utc};

/// Returns the time-window key (`"YYYY-MM"`) containing a timestamp.
///
/// Pure and deterministic; the only temporal grouping the analysis
/// uses.
#[must_use]
pub fn month_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m").to_string()
}

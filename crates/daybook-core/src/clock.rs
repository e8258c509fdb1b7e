//! Reference-zone wall-clock helpers.
//!
//! All user-facing scheduling happens in one fixed reference time zone
//! (UTC+05:30). Habit notify times, the task send window, and digest dates
//! are interpreted against this zone regardless of where the server runs.

use chrono::{DateTime, Duration, FixedOffset, Utc};

/// Offset of the reference time zone from UTC, in seconds (UTC+05:30).
pub const REFERENCE_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// The fixed reference time zone.
pub fn reference_zone() -> FixedOffset {
    FixedOffset::east_opt(REFERENCE_OFFSET_SECS).unwrap()
}

/// Current wall-clock time in the reference zone.
pub fn reference_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&reference_zone())
}

/// Render the minute component of `t` in the store's notify-time format
/// ("HH:MM", zero-padded, no seconds).
pub fn minute_stamp(t: DateTime<FixedOffset>) -> String {
    t.format("%H:%M").to_string()
}

/// Render the day component of `t` in the store's date format ("YYYY-MM-DD").
pub fn date_stamp(t: DateTime<FixedOffset>) -> String {
    t.format("%Y-%m-%d").to_string()
}

/// The day before `t`, in the store's date format.
pub fn previous_day_stamp(t: DateTime<FixedOffset>) -> String {
    date_stamp(t - Duration::days(1))
}

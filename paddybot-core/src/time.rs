//! Timestamp helpers on top of chrono. All times are UTC.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Default layout for [`format_datetime`]
pub const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn datetime_to_timestamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

/// Convert a Unix timestamp in seconds. Out-of-range values yield `None`.
pub fn timestamp_to_datetime(timestamp: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(timestamp, 0).single()
}

pub fn format_datetime(dt: Option<DateTime<Utc>>, format: &str) -> Option<String> {
    dt.map(|dt| dt.format(format).to_string())
}

pub fn is_expired(expiry: DateTime<Utc>) -> bool {
    Utc::now() > expiry
}

/// Offset `base` (or now) by `delta`.
pub fn add_time(base: Option<DateTime<Utc>>, delta: Duration) -> DateTime<Utc> {
    base.unwrap_or_else(Utc::now) + delta
}

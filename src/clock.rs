//! Wall clock helpers. The registry works on epoch milliseconds; these
//! convert to and from what staff read on screen.

use chrono::{DateTime, FixedOffset, Utc};

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// `dd/mm/yyyy, HH:MM:SS` in the display offset. Out of range values print
/// as an empty string.
pub fn format_timestamp(ms: i64, offset: FixedOffset) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| format_datetime(dt, offset))
        .unwrap_or_default()
}

pub fn format_datetime(dt: DateTime<Utc>, offset: FixedOffset) -> String {
    dt.with_timezone(&offset).format("%d/%m/%Y, %H:%M:%S").to_string()
}

/// `YYYY-MM-DD`, used in export file names.
pub fn date_stamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

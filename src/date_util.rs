use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::granularity::DisplayUnit;

pub const HOURS_PER_DAY: f64 = 24.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Elapsed hours from `start` to `end`. Negative when `end` precedes `start`.
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Parse a tracker timestamp.
///
/// Accepts RFC 3339 (with any offset) and a bare `YYYY-MM-DD HH:MM:SS` or
/// `YYYY-MM-DD`, both taken as UTC. Returns `None` for anything else.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse an RFC 3339 "as of" instant into the system time zone.
///
/// Buckets then follow the local offset in effect at each timestamp, not the
/// offset of the `as of` instant itself.
pub fn parse_local_instant(s: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Local))
}

/// Compact age for alert lists: `"{n}h {m}m"` under a day, whole days otherwise.
pub fn format_age_short(hours: f64) -> String {
    let hours = hours.max(0.0);
    if hours < HOURS_PER_DAY {
        let total_minutes = (hours * 60.0).floor() as i64;
        format!("{}h {}m", total_minutes / 60, total_minutes % 60)
    } else {
        format!("{}d", (hours / HOURS_PER_DAY).floor() as i64)
    }
}

/// Render a duration in the granularity's display unit, one decimal place.
pub fn format_duration(hours: f64, unit: DisplayUnit) -> String {
    match unit {
        DisplayUnit::Hours => format!("{hours:.1}h"),
        DisplayUnit::Days => format!("{:.1}d", hours / HOURS_PER_DAY),
    }
}

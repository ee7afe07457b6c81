use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a duration is rendered for a given granularity. Computation is always in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    Hours,
    Days,
}

impl DisplayUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayUnit::Hours => "hours",
            DisplayUnit::Days => "days",
        }
    }
}

/// Time-bucket width for flow and throughput charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeGranularity {
    #[serde(rename = "hourly")]
    Hourly,
    #[serde(rename = "4-hourly")]
    FourHourly,
    #[serde(rename = "8-hourly")]
    EightHourly,
    #[default]
    #[serde(rename = "daily")]
    Daily,
}

impl TimeGranularity {
    pub const ALL: [TimeGranularity; 4] = [
        TimeGranularity::Hourly,
        TimeGranularity::FourHourly,
        TimeGranularity::EightHourly,
        TimeGranularity::Daily,
    ];

    /// Parse a granularity string.
    ///
    /// Supported formats:
    /// - `hourly` or `1h`
    /// - `4-hourly` or `4h`
    /// - `8-hourly` or `8h`
    /// - `daily` or `1d`
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hourly" | "1h" => Ok(TimeGranularity::Hourly),
            "4-hourly" | "4h" => Ok(TimeGranularity::FourHourly),
            "8-hourly" | "8h" => Ok(TimeGranularity::EightHourly),
            "daily" | "1d" => Ok(TimeGranularity::Daily),
            other => Err(Error::InvalidGranularity(format!(
                "unrecognized granularity: {other} (use hourly, 4-hourly, 8-hourly, daily)"
            ))),
        }
    }

    /// Canonical key string for storage.
    pub fn to_key(&self) -> &'static str {
        match self {
            TimeGranularity::Hourly => "hourly",
            TimeGranularity::FourHourly => "4-hourly",
            TimeGranularity::EightHourly => "8-hourly",
            TimeGranularity::Daily => "daily",
        }
    }

    pub fn hours_per_bucket(&self) -> u32 {
        match self {
            TimeGranularity::Hourly => 1,
            TimeGranularity::FourHourly => 4,
            TimeGranularity::EightHourly => 8,
            TimeGranularity::Daily => 24,
        }
    }

    pub fn display_unit(&self) -> DisplayUnit {
        match self {
            TimeGranularity::Daily => DisplayUnit::Days,
            _ => DisplayUnit::Hours,
        }
    }

    /// Start of the bucket containing `local`, a wall-clock time.
    ///
    /// Daily buckets start at midnight; sub-daily buckets start at
    /// `hour - hour % hours_per_bucket` on the same day.
    pub fn bucket_start(&self, local: NaiveDateTime) -> NaiveDateTime {
        let date = local.date();
        let hour = match self {
            TimeGranularity::Daily => 0,
            _ => local.hour() - local.hour() % self.hours_per_bucket(),
        };
        date.and_hms_opt(hour, 0, 0).unwrap_or(local)
    }

    /// Start of the bucket following the one that starts at `start`.
    pub fn next_bucket(&self, start: NaiveDateTime) -> NaiveDateTime {
        start + Duration::hours(i64::from(self.hours_per_bucket()))
    }

    /// Chart label for a bucket start.
    pub fn label(&self, start: NaiveDateTime) -> String {
        match self {
            TimeGranularity::Daily => start.format("%b %-d").to_string(),
            _ => start.format("%b %-d %H:00").to_string(),
        }
    }
}

impl std::fmt::Display for TimeGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

impl std::str::FromStr for TimeGranularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Bucket key for an instant, aligned in the calendar of the instant's own zone.
///
/// Callers convert timestamps into the zone of their "now" before bucketing so
/// that every aggregate shares one local calendar.
pub fn bucket_key<Tz: TimeZone>(ts: &DateTime<Tz>, granularity: TimeGranularity) -> NaiveDateTime {
    granularity.bucket_start(ts.naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Utc};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(TimeGranularity::parse("hourly").unwrap(), TimeGranularity::Hourly);
        assert_eq!(TimeGranularity::parse("4h").unwrap(), TimeGranularity::FourHourly);
        assert_eq!(TimeGranularity::parse("8-Hourly").unwrap(), TimeGranularity::EightHourly);
        assert_eq!(TimeGranularity::parse(" daily ").unwrap(), TimeGranularity::Daily);
        assert!(TimeGranularity::parse("weekly").is_err());
    }

    #[test]
    fn test_key_round_trip() {
        for g in TimeGranularity::ALL {
            assert_eq!(TimeGranularity::parse(g.to_key()).unwrap(), g);
            assert_eq!(g.to_string(), g.to_key());
        }
    }

    #[test]
    fn test_serde_uses_keys() {
        let json = serde_json::to_string(&TimeGranularity::FourHourly).unwrap();
        assert_eq!(json, "\"4-hourly\"");
        let g: TimeGranularity = serde_json::from_str("\"daily\"").unwrap();
        assert_eq!(g, TimeGranularity::Daily);
    }

    #[test]
    fn test_display_unit() {
        assert_eq!(TimeGranularity::Daily.display_unit(), DisplayUnit::Days);
        assert_eq!(TimeGranularity::Hourly.display_unit(), DisplayUnit::Hours);
        assert_eq!(TimeGranularity::EightHourly.display_unit(), DisplayUnit::Hours);
    }

    #[test]
    fn test_bucket_start_daily() {
        let g = TimeGranularity::Daily;
        assert_eq!(g.bucket_start(at(2025, 1, 5, 23, 59)), at(2025, 1, 5, 0, 0));
        assert_eq!(g.bucket_start(at(2025, 1, 5, 0, 0)), at(2025, 1, 5, 0, 0));
    }

    #[test]
    fn test_bucket_start_sub_daily() {
        assert_eq!(
            TimeGranularity::Hourly.bucket_start(at(2025, 1, 5, 13, 45)),
            at(2025, 1, 5, 13, 0)
        );
        assert_eq!(
            TimeGranularity::FourHourly.bucket_start(at(2025, 1, 5, 13, 45)),
            at(2025, 1, 5, 12, 0)
        );
        assert_eq!(
            TimeGranularity::EightHourly.bucket_start(at(2025, 1, 5, 7, 59)),
            at(2025, 1, 5, 0, 0)
        );
        assert_eq!(
            TimeGranularity::EightHourly.bucket_start(at(2025, 1, 5, 16, 0)),
            at(2025, 1, 5, 16, 0)
        );
    }

    #[test]
    fn test_same_bucket_iff_same_window() {
        let g = TimeGranularity::FourHourly;
        assert_eq!(g.bucket_start(at(2025, 1, 5, 8, 1)), g.bucket_start(at(2025, 1, 5, 11, 59)));
        assert_ne!(g.bucket_start(at(2025, 1, 5, 11, 59)), g.bucket_start(at(2025, 1, 5, 12, 0)));
    }

    #[test]
    fn test_next_bucket_crosses_midnight() {
        assert_eq!(
            TimeGranularity::EightHourly.next_bucket(at(2025, 1, 5, 16, 0)),
            at(2025, 1, 6, 0, 0)
        );
        assert_eq!(
            TimeGranularity::Daily.next_bucket(at(2025, 1, 31, 0, 0)),
            at(2025, 2, 1, 0, 0)
        );
    }

    #[test]
    fn test_bucket_key_uses_local_calendar() {
        // 02:00 UTC is still the previous day at UTC-05:00
        let utc = Utc.with_ymd_and_hms(2025, 1, 6, 2, 0, 0).unwrap();
        let eastern = utc.with_timezone(&FixedOffset::west_opt(5 * 3600).unwrap());
        assert_eq!(bucket_key(&utc, TimeGranularity::Daily), at(2025, 1, 6, 0, 0));
        assert_eq!(bucket_key(&eastern, TimeGranularity::Daily), at(2025, 1, 5, 0, 0));
    }

    #[test]
    fn test_labels() {
        assert_eq!(TimeGranularity::Daily.label(at(2025, 1, 5, 0, 0)), "Jan 5");
        assert_eq!(TimeGranularity::FourHourly.label(at(2025, 1, 5, 8, 0)), "Jan 5 08:00");
    }
}

use chrono::{DateTime, Utc};

use crate::date_util::HOURS_PER_DAY;
use crate::issue::{live_issues, Issue};
use crate::metrics::types::AgeBucket;

struct AgeRange {
    label: &'static str,
    min_days: u64,
    max_days: Option<u64>,
}

const AGE_RANGES: [AgeRange; 4] = [
    AgeRange { label: "0-7d", min_days: 0, max_days: Some(7) },
    AgeRange { label: "8-14d", min_days: 8, max_days: Some(14) },
    AgeRange { label: "15-30d", min_days: 15, max_days: Some(30) },
    AgeRange { label: ">30d", min_days: 31, max_days: None },
];

/// Whole days since creation, floored; ages before creation count as day zero.
pub fn age_days(created: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let hours = crate::date_util::hours_between(created, now).max(0.0);
    (hours / HOURS_PER_DAY).floor() as u64
}

fn bucket_index_for(days: u64) -> usize {
    AGE_RANGES
        .iter()
        .position(|r| r.max_days.is_none_or(|max| days <= max))
        .unwrap_or(AGE_RANGES.len() - 1)
}

/// Histogram of open-issue ages in fixed day ranges. All four buckets are
/// always returned, in order, so chart colors stay stable.
pub fn build_age_histogram(issues: &[Issue], now: DateTime<Utc>) -> Vec<AgeBucket> {
    let live = live_issues(issues);
    let open: Vec<&Issue> = live
        .into_iter()
        .filter(|i| i.status.is_open() && i.created_at.is_some())
        .collect();
    age_histogram_for(&open, now)
}

/// Histogram over issues already known to be open.
pub(crate) fn age_histogram_for(open: &[&Issue], now: DateTime<Utc>) -> Vec<AgeBucket> {
    let mut counts = [0u64; AGE_RANGES.len()];
    for issue in open {
        if let Some(created) = issue.created_at {
            counts[bucket_index_for(age_days(created, now))] += 1;
        }
    }

    AGE_RANGES
        .iter()
        .zip(counts)
        .enumerate()
        .map(|(bucket_index, (range, count))| AgeBucket {
            bucket_index,
            label: range.label,
            min_days: range.min_days,
            max_days: range.max_days,
            count,
        })
        .collect()
}

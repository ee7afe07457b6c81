use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::granularity::TimeGranularity;
use crate::issue::{live_issues, Issue};
use crate::metrics::types::FlowPoint;

#[derive(Default, Clone, Copy)]
struct BucketEvents {
    opened: u64,
    closed: u64,
}

/// Cumulative flow series from the earliest creation through `now`.
///
/// Every bucket in the range is present, including empty ones. Creations and
/// closes stamped after `now` count in the bucket containing `now`. Tombstoned
/// issues, issues without a creation time and closed issues whose close time
/// cannot be resolved are left out.
pub fn build_flow_series<Tz: TimeZone>(
    issues: &[Issue],
    now: &DateTime<Tz>,
    granularity: TimeGranularity,
) -> Vec<FlowPoint> {
    flow_series_for(&live_issues(issues), now, granularity)
}

pub(crate) fn flow_series_for<Tz: TimeZone>(
    issues: &[&Issue],
    now: &DateTime<Tz>,
    granularity: TimeGranularity,
) -> Vec<FlowPoint> {
    let tz = now.timezone();
    let bucket_of = |ts: DateTime<Utc>| -> NaiveDateTime {
        granularity.bucket_start(ts.with_timezone(&tz).naive_local())
    };

    let last = bucket_of(now.with_timezone(&Utc));
    let mut events: BTreeMap<NaiveDateTime, BucketEvents> = BTreeMap::new();
    for issue in issues {
        let Some(created) = issue.created_at else {
            continue;
        };
        let closed = issue.effective_close_time();
        if issue.status.is_closed() && closed.is_none() {
            continue;
        }
        events.entry(bucket_of(created).min(last)).or_default().opened += 1;
        if let Some(closed) = closed {
            events.entry(bucket_of(closed).min(last)).or_default().closed += 1;
        }
    }

    let Some(first) = events.keys().next().copied() else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut cumulative_opened = 0u64;
    let mut cumulative_closed = 0u64;
    let mut bucket = first;
    while bucket <= last {
        let ev = events.get(&bucket).copied().unwrap_or_default();
        cumulative_opened += ev.opened;
        cumulative_closed += ev.closed;
        series.push(FlowPoint {
            bucket_start: bucket,
            label: granularity.label(bucket),
            cumulative_opened,
            cumulative_closed,
            open: cumulative_opened.saturating_sub(cumulative_closed),
            throughput: ev.closed,
        });
        bucket = granularity.next_bucket(bucket);
    }

    log::debug!(
        "Built {} {} flow buckets from {} issues",
        series.len(),
        granularity,
        issues.len()
    );
    series
}

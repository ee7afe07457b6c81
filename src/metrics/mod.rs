pub mod age;
pub mod flow;
pub mod percentile;
pub mod types;

pub use age::build_age_histogram;
pub use flow::build_flow_series;
pub use percentile::percentile;
pub use types::*;

use chrono::{DateTime, TimeZone, Utc};

use crate::date_util::{format_duration, HOURS_PER_DAY};
use crate::granularity::TimeGranularity;
use crate::issue::{live_issues, Issue};
use percentile::percentile_sorted;

const P50: f64 = 0.5;
const P85: f64 = 0.85;

/// Compute every dashboard metric for `issues` as of `now`.
///
/// Returns `None` for an empty issue list. Bucketing follows the calendar of
/// `now`'s time zone. All outputs are derived from one tombstone-filtered set
/// and one `now`, so `open_count` equals both the histogram total and the last
/// flow bucket's `open`, including for timestamps that fall after `now`.
pub fn calculate_metrics<Tz: TimeZone>(
    issues: &[Issue],
    now: &DateTime<Tz>,
    granularity: TimeGranularity,
) -> Option<Metrics> {
    if issues.is_empty() {
        return None;
    }
    let now_utc = now.with_timezone(&Utc);
    let live = live_issues(issues);

    let open: Vec<&Issue> = live
        .iter()
        .copied()
        .filter(|i| i.status.is_open() && i.created_at.is_some())
        .collect();

    let mut lead_time: Vec<LeadTimePoint> = live
        .iter()
        .filter_map(|issue| {
            let closed_at = issue.effective_close_time()?;
            if closed_at > now_utc {
                return None;
            }
            Some(LeadTimePoint {
                id: issue.id.clone(),
                title: issue.title.clone(),
                issue_type: issue.issue_type.clone(),
                closed_at,
                cycle_time_hours: issue.cycle_time_hours()?,
            })
        })
        .collect();
    lead_time.sort_by(|a, b| a.closed_at.cmp(&b.closed_at).then_with(|| a.id.cmp(&b.id)));

    let mut sample: Vec<f64> = lead_time.iter().map(|p| p.cycle_time_hours).collect();
    sample.sort_by(|a, b| a.total_cmp(b));
    let p50 = percentile_sorted(&sample, P50);
    let p85 = percentile_sorted(&sample, P85);

    let ages: Vec<(&Issue, f64)> = open
        .iter()
        .filter_map(|issue| issue.age_hours(now_utc).map(|age| (*issue, age)))
        .collect();
    let average_hours = if ages.is_empty() {
        0.0
    } else {
        ages.iter().map(|(_, age)| age).sum::<f64>() / ages.len() as f64
    };
    let unit = granularity.display_unit();

    let mut aging_wip: Vec<AgingWipPoint> = ages
        .iter()
        .map(|(issue, age_hours)| {
            let severity = wip_severity(*age_hours, p50, p85);
            AgingWipPoint {
                id: issue.id.clone(),
                title: issue.title.clone(),
                status: issue.status,
                age_hours: *age_hours,
                severity,
                color: severity.color(),
            }
        })
        .collect();
    aging_wip.sort_by(|a, b| b.age_hours.total_cmp(&a.age_hours).then_with(|| a.id.cmp(&b.id)));

    let flow = flow::flow_series_for(&live, now, granularity);
    let age_distribution = age::age_histogram_for(&open, now_utc);

    log::debug!(
        "Computed metrics: {} issues, {} open, {} closed samples, {} flow buckets",
        issues.len(),
        open.len(),
        sample.len(),
        flow.len()
    );

    Some(Metrics {
        average_age: AverageAge {
            hours: average_hours,
            display: format_duration(average_hours, unit),
            unit,
        },
        open_count: open.len() as u64,
        cycle_time_p50_hours: p50,
        cycle_time_p85_hours: p85,
        lead_time,
        aging_wip,
        flow,
        age_distribution,
        granularity,
    })
}

/// Severity of an open issue's age, relative to cycle-time history when there
/// is any, otherwise relative to fixed one-week and one-month marks.
pub fn wip_severity(age_hours: f64, p50: Option<f64>, p85: Option<f64>) -> WipSeverity {
    let (watch_after, risk_after) = match (p50, p85) {
        (Some(p50), Some(p85)) => (p50, p85),
        _ => (7.0 * HOURS_PER_DAY, 30.0 * HOURS_PER_DAY),
    };
    if age_hours <= watch_after {
        WipSeverity::Healthy
    } else if age_hours <= risk_after {
        WipSeverity::Watch
    } else {
        WipSeverity::AtRisk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::granularity::DisplayUnit;
    use crate::issue::IssueStatus;
    use chrono::{Duration, FixedOffset};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn open(id: &str, hours_ago: i64) -> Issue {
        Issue::new(id, IssueStatus::Open, now() - Duration::hours(hours_ago)).with_title(id)
    }

    fn closed(id: &str, created_hours_ago: i64, cycle_hours: i64) -> Issue {
        let created = now() - Duration::hours(created_hours_ago);
        Issue::new(id, IssueStatus::Closed, created)
            .with_title(id)
            .with_closed_at(created + Duration::hours(cycle_hours))
    }

    fn sample_issues() -> Vec<Issue> {
        vec![
            open("o1", 12),
            open("o2", 24 * 10),
            Issue::new("o3", IssueStatus::InProgress, now() - Duration::hours(24 * 40)),
            closed("c1", 24 * 9, 24),
            closed("c2", 24 * 8, 48),
            closed("c3", 24 * 7, 72),
            closed("c4", 24 * 6, 96),
            closed("c5", 24 * 5, 120),
            Issue::new("t1", IssueStatus::Tombstone, now() - Duration::hours(24 * 100)),
        ]
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_input_is_none() {
        assert!(calculate_metrics(&[], &now(), TimeGranularity::Daily).is_none());
    }

    #[test]
    fn test_only_tombstones_is_some_and_empty() {
        let issues = vec![Issue::new("t", IssueStatus::Tombstone, now())];
        let m = calculate_metrics(&issues, &now(), TimeGranularity::Daily).unwrap();
        assert_eq!(m.open_count, 0);
        assert!(m.flow.is_empty());
        assert!(m.lead_time.is_empty());
        assert_eq!(m.cycle_time_p50_hours, None);
        assert_eq!(m.average_age.hours, 0.0);
    }

    #[test]
    fn test_cycle_time_percentiles() {
        let m = calculate_metrics(&sample_issues(), &now(), TimeGranularity::Daily).unwrap();
        assert!(approx(m.cycle_time_p50_hours.unwrap(), 72.0));
        assert!(approx(m.cycle_time_p85_hours.unwrap(), 105.6));
        assert_eq!(m.lead_time.len(), 5);
        assert_eq!(m.lead_time[0].id, "c1");
        assert!(m.lead_time.windows(2).all(|w| w[0].closed_at <= w[1].closed_at));
    }

    #[test]
    fn test_open_count_is_consistent_everywhere() {
        for g in TimeGranularity::ALL {
            let m = calculate_metrics(&sample_issues(), &now(), g).unwrap();
            assert_eq!(m.open_count, 3);
            let histogram_total: u64 = m.age_distribution.iter().map(|b| b.count).sum();
            assert_eq!(histogram_total, m.open_count);
            assert_eq!(m.flow.last().unwrap().open, m.open_count);
            assert_eq!(m.aging_wip.len() as u64, m.open_count);
            assert_eq!(m.granularity, g);
        }
    }

    #[test]
    fn test_flow_starts_at_earliest_live_issue() {
        let m = calculate_metrics(&sample_issues(), &now(), TimeGranularity::Daily).unwrap();
        // o3 is 40 days old; the 100-day-old tombstone does not extend the range
        assert_eq!(m.flow.len(), 41);
    }

    #[test]
    fn test_average_age_and_unit() {
        let issues = vec![open("a", 12), open("b", 36)];
        let daily = calculate_metrics(&issues, &now(), TimeGranularity::Daily).unwrap();
        assert_eq!(daily.average_age.hours, 24.0);
        assert_eq!(daily.average_age.unit, DisplayUnit::Days);
        assert_eq!(daily.average_age.display, "1.0d");

        let hourly = calculate_metrics(&issues, &now(), TimeGranularity::Hourly).unwrap();
        assert_eq!(hourly.average_age.unit, DisplayUnit::Hours);
        assert_eq!(hourly.average_age.display, "24.0h");
    }

    #[test]
    fn test_aging_wip_severity_from_percentiles() {
        let m = calculate_metrics(&sample_issues(), &now(), TimeGranularity::Daily).unwrap();
        let by_id = |id: &str| m.aging_wip.iter().find(|p| p.id == id).unwrap().clone();
        assert_eq!(by_id("o1").severity, WipSeverity::Healthy);
        assert_eq!(by_id("o3").severity, WipSeverity::AtRisk);
        assert_eq!(by_id("o3").color, "#ef4444");
        assert_eq!(m.aging_wip[0].id, "o3");
    }

    #[test]
    fn test_wip_severity_without_history() {
        assert_eq!(wip_severity(24.0, None, None), WipSeverity::Healthy);
        assert_eq!(wip_severity(10.0 * 24.0, None, None), WipSeverity::Watch);
        assert_eq!(wip_severity(31.0 * 24.0, None, None), WipSeverity::AtRisk);
        assert_eq!(wip_severity(80.0, Some(72.0), Some(105.6)), WipSeverity::Watch);
    }

    #[test]
    fn test_bad_created_at_degrades_one_point() {
        let mut issues = sample_issues();
        let mut bad = open("bad", 5);
        bad.created_at = None;
        issues.push(bad);
        let m = calculate_metrics(&issues, &now(), TimeGranularity::Daily).unwrap();
        assert_eq!(m.open_count, 3);
        assert!(m.aging_wip.iter().all(|p| p.id != "bad"));
    }

    #[test]
    fn test_idempotent_for_same_inputs() {
        let issues = sample_issues();
        let a = calculate_metrics(&issues, &now(), TimeGranularity::FourHourly);
        let b = calculate_metrics(&issues, &now(), TimeGranularity::FourHourly);
        assert_eq!(a, b);
    }

    #[test]
    fn test_issue_created_after_now_stays_consistent() {
        // Tracker clock a couple of minutes ahead of the caller
        let ahead = Issue::new("skew", IssueStatus::Open, now() + Duration::minutes(2));
        let issues = vec![open("a", 3), ahead];
        let m = calculate_metrics(&issues, &now(), TimeGranularity::Hourly).unwrap();
        assert_eq!(m.open_count, 2);
        let histogram_total: u64 = m.age_distribution.iter().map(|b| b.count).sum();
        assert_eq!(histogram_total, 2);
        assert_eq!(m.flow.last().unwrap().open, 2);
        assert_eq!(m.flow.last().unwrap().cumulative_opened, 2);
    }

    #[test]
    fn test_close_after_now_stays_consistent() {
        let created = now() - Duration::days(3);
        let closes_later = Issue::new("later", IssueStatus::Closed, created)
            .with_closed_at(now() + Duration::days(1));
        let issues = vec![open("a", 48), closes_later];
        let m = calculate_metrics(&issues, &now(), TimeGranularity::Daily).unwrap();
        assert_eq!(m.open_count, 1);
        let last = m.flow.last().unwrap();
        assert_eq!(last.open, 1);
        assert_eq!(last.cumulative_closed, 1);
        assert_eq!(m.flow.len(), 4);
        // Not yet a completed cycle as of now
        assert!(m.lead_time.is_empty());
    }

    #[test]
    fn test_accepts_any_time_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let local_now = now().with_timezone(&tokyo);
        let m = calculate_metrics(&sample_issues(), &local_now, TimeGranularity::Daily).unwrap();
        assert_eq!(m.open_count, 3);
        assert_eq!(m.flow.last().unwrap().open, 3);
    }
}

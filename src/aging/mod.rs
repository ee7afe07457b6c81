pub mod thresholds;

pub use thresholds::{
    calculate_thresholds_from_percentiles, parse_threshold, resolve_thresholds,
    threshold_to_hours, AgingThresholdConfig, AgingThresholds, ThresholdUnit, DEFAULT_THRESHOLDS,
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::date_util::format_age_short;
use crate::issue::Issue;

/// Alert level of one open issue. Ordered `Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgingStatus {
    Normal,
    Warning,
    Critical,
}

impl AgingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgingStatus::Normal => "normal",
            AgingStatus::Warning => "warning",
            AgingStatus::Critical => "critical",
        }
    }
}

/// An open issue past at least the warning threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingIssue {
    pub issue: Issue,
    pub status: AgingStatus,
    pub age_hours: f64,
    pub age_display: String,
}

/// Badge counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgingCounts {
    pub warning_count: u64,
    pub critical_count: u64,
}

/// Classify an age against thresholds. Both boundaries are inclusive.
pub fn classify_age(age_hours: f64, thresholds: &AgingThresholds) -> AgingStatus {
    if age_hours >= thresholds.critical_hours {
        AgingStatus::Critical
    } else if age_hours >= thresholds.warning_hours {
        AgingStatus::Warning
    } else {
        AgingStatus::Normal
    }
}

/// Classify one issue as of `now`. Closed, tombstoned and undated issues are
/// always [`AgingStatus::Normal`].
pub fn classify_issue_age(
    issue: &Issue,
    thresholds: &AgingThresholds,
    now: DateTime<Utc>,
) -> AgingStatus {
    if !issue.status.is_open() {
        return AgingStatus::Normal;
    }
    match issue.age_hours(now) {
        Some(age) => classify_age(age, thresholds),
        None => AgingStatus::Normal,
    }
}

/// Every open issue at warning or above, oldest first.
pub fn get_aging_issues(
    issues: &[Issue],
    config: &AgingThresholdConfig,
    now: DateTime<Utc>,
) -> Vec<AgingIssue> {
    let thresholds = resolve_thresholds(config, issues, now);
    let mut aging: Vec<AgingIssue> = issues
        .iter()
        .filter(|i| i.status.is_open())
        .filter_map(|issue| {
            let age_hours = issue.age_hours(now)?;
            let status = classify_age(age_hours, &thresholds);
            (status != AgingStatus::Normal).then(|| AgingIssue {
                issue: issue.clone(),
                status,
                age_hours,
                age_display: format_age_short(age_hours),
            })
        })
        .collect();
    aging.sort_by(|a, b| {
        b.age_hours
            .total_cmp(&a.age_hours)
            .then_with(|| a.issue.id.cmp(&b.issue.id))
    });
    aging
}

pub fn count_issues_by_aging_status(
    issues: &[Issue],
    config: &AgingThresholdConfig,
    now: DateTime<Utc>,
) -> AgingCounts {
    let thresholds = resolve_thresholds(config, issues, now);
    let mut counts = AgingCounts::default();
    for issue in issues {
        match classify_issue_age(issue, &thresholds, now) {
            AgingStatus::Warning => counts.warning_count += 1,
            AgingStatus::Critical => counts.critical_count += 1,
            AgingStatus::Normal => {}
        }
    }
    counts
}

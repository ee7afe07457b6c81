use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::granularity::{DisplayUnit, TimeGranularity};
use crate::issue::IssueStatus;

/// Average age of open work, raw and rendered for the granularity's unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageAge {
    pub hours: f64,
    pub display: String,
    pub unit: DisplayUnit,
}

/// One closed issue on the lead-time scatter chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadTimePoint {
    pub id: String,
    pub title: String,
    pub issue_type: Option<String>,
    pub closed_at: DateTime<Utc>,
    pub cycle_time_hours: f64,
}

/// Severity band of an open issue on the aging-WIP chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WipSeverity {
    Healthy,
    Watch,
    AtRisk,
}

impl WipSeverity {
    pub fn color(&self) -> &'static str {
        match self {
            WipSeverity::Healthy => "#22c55e",
            WipSeverity::Watch => "#f59e0b",
            WipSeverity::AtRisk => "#ef4444",
        }
    }
}

/// One open issue on the aging-WIP chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingWipPoint {
    pub id: String,
    pub title: String,
    pub status: IssueStatus,
    pub age_hours: f64,
    pub severity: WipSeverity,
    pub color: &'static str,
}

/// One bucket of the cumulative flow diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowPoint {
    pub bucket_start: NaiveDateTime,
    pub label: String,
    pub cumulative_opened: u64,
    pub cumulative_closed: u64,
    /// `cumulative_opened - cumulative_closed`.
    pub open: u64,
    /// Issues closed within this bucket only.
    pub throughput: u64,
}

/// One bar of the open-issue age histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeBucket {
    /// Stable position, independent of which buckets are populated.
    pub bucket_index: usize,
    pub label: &'static str,
    pub min_days: u64,
    /// Inclusive upper bound in whole days; `None` for the open-ended bucket.
    pub max_days: Option<u64>,
    pub count: u64,
}

/// Everything the dashboard charts need, computed from one issue set and one "now".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub average_age: AverageAge,
    pub open_count: u64,
    pub cycle_time_p50_hours: Option<f64>,
    pub cycle_time_p85_hours: Option<f64>,
    pub lead_time: Vec<LeadTimePoint>,
    pub aging_wip: Vec<AgingWipPoint>,
    pub flow: Vec<FlowPoint>,
    pub age_distribution: Vec<AgeBucket>,
    pub granularity: TimeGranularity,
}

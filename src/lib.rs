//! Engineering-flow analytics for issue tracker exports.
//!
//! The engine is a pure function of `(issues, now, config)`: lead-time
//! percentiles, a cumulative flow series, an open-age histogram and aging
//! alerts. Storage only holds settings; it never feeds the engine implicitly.

pub mod aging;
pub mod date_util;
pub mod error;
pub mod granularity;
pub mod issue;
pub mod metrics;
pub mod storage;

pub use aging::{
    classify_age, classify_issue_age, count_issues_by_aging_status, get_aging_issues,
    AgingCounts, AgingIssue, AgingStatus, AgingThresholdConfig, AgingThresholds, ThresholdUnit,
    DEFAULT_THRESHOLDS,
};
pub use error::{Error, Result};
pub use granularity::{bucket_key, DisplayUnit, TimeGranularity};
pub use issue::{Issue, IssueStatus};
pub use metrics::{calculate_metrics, Metrics};
pub use storage::{Database, MemoryThresholdStore, ThresholdStore};

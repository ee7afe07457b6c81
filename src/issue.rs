use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::date_util::parse_timestamp;
use crate::error::Result;

/// Workflow status of an issue as exported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    Open,
    InProgress,
    Blocked,
    Closed,
    Tombstone,
    Deferred,
    Pinned,
    Hooked,
    /// Any status this crate does not know about. Treated as open work.
    #[serde(other)]
    Unknown,
}

impl IssueStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, IssueStatus::Closed)
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, IssueStatus::Tombstone)
    }

    /// Work in progress: anything that is neither closed nor deleted.
    pub fn is_open(&self) -> bool {
        !self.is_closed() && !self.is_tombstone()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Blocked => "blocked",
            IssueStatus::Closed => "closed",
            IssueStatus::Tombstone => "tombstone",
            IssueStatus::Deferred => "deferred",
            IssueStatus::Pinned => "pinned",
            IssueStatus::Hooked => "hooked",
            IssueStatus::Unknown => "unknown",
        }
    }
}

/// A work item as read from the tracker's JSONL export. Read-only to the engine.
///
/// Timestamps are optional because a malformed record must only cost its own
/// data points: an unparseable `created_at` deserializes to `None` and the
/// issue is left out of every time-based aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn new(id: impl Into<String>, status: IssueStatus, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status,
            created_at: Some(created_at),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_closed_at(mut self, closed_at: DateTime<Utc>) -> Self {
        self.closed_at = Some(closed_at);
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// When a closed issue was closed: `closed_at`, else `updated_at`.
    /// `None` for issues that are not closed.
    pub fn close_time(&self) -> Option<DateTime<Utc>> {
        if !self.status.is_closed() {
            return None;
        }
        self.closed_at.or(self.updated_at)
    }

    /// Close time clamped so it never precedes creation.
    /// `None` unless both the creation and close time resolve.
    pub fn effective_close_time(&self) -> Option<DateTime<Utc>> {
        let created = self.created_at?;
        let closed = self.close_time()?;
        Some(closed.max(created))
    }

    /// Hours from creation to close, for closed issues with both timestamps.
    pub fn cycle_time_hours(&self) -> Option<f64> {
        let created = self.created_at?;
        let closed = self.effective_close_time()?;
        Some(crate::date_util::hours_between(created, closed))
    }

    /// Hours since creation as of `now`, floored at zero.
    pub fn age_hours(&self, now: DateTime<Utc>) -> Option<f64> {
        let created = self.created_at?;
        Some(crate::date_util::hours_between(created, now).max(0.0))
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|s| {
        let parsed = parse_timestamp(s);
        if parsed.is_none() {
            log::warn!("Ignoring unparseable timestamp: {s:?}");
        }
        parsed
    }))
}

/// Parse a JSONL issue export. Blank lines are skipped; lines that fail to
/// parse are logged and dropped.
pub fn parse_jsonl(contents: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Issue>(line) {
            Ok(issue) => issues.push(issue),
            Err(e) => log::warn!("Skipping issue on line {}: {e}", idx + 1),
        }
    }
    log::debug!("Parsed {} issues", issues.len());
    issues
}

/// Read and parse a JSONL issue export from disk.
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<Issue>> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    Ok(parse_jsonl(&contents))
}

/// Drop tombstoned issues; every aggregate starts from this set.
pub fn live_issues(issues: &[Issue]) -> Vec<&Issue> {
    issues.iter().filter(|i| !i.status.is_tombstone()).collect()
}

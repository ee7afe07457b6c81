use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::date_util::HOURS_PER_DAY;
use crate::error::{Error, Result};
use crate::issue::{live_issues, Issue};
use crate::metrics::percentile::percentile_sorted;

static RE_THRESHOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*(h|hr|hrs|hour|hours|d|day|days)$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdUnit {
    Hours,
    Days,
}

impl ThresholdUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdUnit::Hours => "hours",
            ThresholdUnit::Days => "days",
        }
    }
}

/// Aging alert settings as stored by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingThresholdConfig {
    pub warning_threshold: f64,
    pub warning_unit: ThresholdUnit,
    pub critical_threshold: f64,
    pub critical_unit: ThresholdUnit,
    pub use_auto_calculation: bool,
    /// Fraction in `[0, 1]`.
    pub auto_calc_percentile_warning: f64,
    /// Fraction in `[0, 1]`.
    pub auto_calc_percentile_critical: f64,
}

pub const DEFAULT_THRESHOLDS: AgingThresholdConfig = AgingThresholdConfig {
    warning_threshold: 3.0,
    warning_unit: ThresholdUnit::Days,
    critical_threshold: 7.0,
    critical_unit: ThresholdUnit::Days,
    use_auto_calculation: false,
    auto_calc_percentile_warning: 0.75,
    auto_calc_percentile_critical: 0.95,
};

impl Default for AgingThresholdConfig {
    fn default() -> Self {
        DEFAULT_THRESHOLDS
    }
}

/// Warning and critical thresholds in hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgingThresholds {
    pub warning_hours: f64,
    pub critical_hours: f64,
}

pub fn threshold_to_hours(value: f64, unit: ThresholdUnit) -> f64 {
    match unit {
        ThresholdUnit::Hours => value,
        ThresholdUnit::Days => value * HOURS_PER_DAY,
    }
}

impl AgingThresholdConfig {
    /// The manually configured thresholds, in hours.
    pub fn manual_thresholds(&self) -> AgingThresholds {
        AgingThresholds {
            warning_hours: threshold_to_hours(self.warning_threshold, self.warning_unit),
            critical_hours: threshold_to_hours(self.critical_threshold, self.critical_unit),
        }
    }

    /// Check that the config can produce meaningful classifications.
    ///
    /// The classifier itself accepts any config; callers run this before saving.
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.warning_threshold) || !positive(self.critical_threshold) {
            return Err(Error::InvalidThreshold(
                "thresholds must be positive numbers".into(),
            ));
        }
        let t = self.manual_thresholds();
        if t.critical_hours < t.warning_hours {
            return Err(Error::InvalidThreshold(format!(
                "critical threshold ({}h) is below warning threshold ({}h)",
                t.critical_hours, t.warning_hours
            )));
        }
        let fraction = |p: f64| (0.0..=1.0).contains(&p);
        if !fraction(self.auto_calc_percentile_warning)
            || !fraction(self.auto_calc_percentile_critical)
        {
            return Err(Error::InvalidThreshold(
                "percentiles must be between 0 and 1".into(),
            ));
        }
        if self.auto_calc_percentile_critical < self.auto_calc_percentile_warning {
            return Err(Error::InvalidThreshold(format!(
                "critical percentile ({}) is below warning percentile ({})",
                self.auto_calc_percentile_critical, self.auto_calc_percentile_warning
            )));
        }
        Ok(())
    }
}

/// Parse a threshold like `48h`, `3d` or `2.5 days`.
pub fn parse_threshold(s: &str) -> Result<(f64, ThresholdUnit)> {
    let s = s.trim();
    let caps = RE_THRESHOLD
        .captures(s)
        .ok_or_else(|| Error::InvalidThreshold(format!("unrecognized threshold: {s}")))?;
    let value: f64 = caps[1]
        .parse()
        .map_err(|_| Error::InvalidThreshold(format!("invalid number: {s}")))?;
    let unit = if caps[2].to_lowercase().starts_with('h') {
        ThresholdUnit::Hours
    } else {
        ThresholdUnit::Days
    };
    Ok((value, unit))
}

/// Sorted cycle times (hours) of issues closed at or before `now` with a
/// resolvable close time.
pub fn cycle_time_sample(issues: &[Issue], now: DateTime<Utc>) -> Vec<f64> {
    let mut sample: Vec<f64> = live_issues(issues)
        .into_iter()
        .filter(|i| i.effective_close_time().is_some_and(|closed| closed <= now))
        .filter_map(Issue::cycle_time_hours)
        .collect();
    sample.sort_by(|a, b| a.total_cmp(b));
    sample
}

/// Warning/critical hours from percentiles of historical cycle times.
///
/// Falls back to [`DEFAULT_THRESHOLDS`] when no closed issue has a usable
/// cycle time. The result is not reordered if `p_critical < p_warning`.
pub fn calculate_thresholds_from_percentiles(
    issues: &[Issue],
    p_warning: f64,
    p_critical: f64,
    now: DateTime<Utc>,
) -> AgingThresholds {
    let sample = cycle_time_sample(issues, now);
    match (
        percentile_sorted(&sample, p_warning),
        percentile_sorted(&sample, p_critical),
    ) {
        (Some(warning_hours), Some(critical_hours)) => {
            log::debug!(
                "Calibrated aging thresholds from {} cycle times: warning {warning_hours:.1}h, critical {critical_hours:.1}h",
                sample.len()
            );
            AgingThresholds {
                warning_hours,
                critical_hours,
            }
        }
        _ => {
            log::debug!("No cycle-time history; using default aging thresholds");
            DEFAULT_THRESHOLDS.manual_thresholds()
        }
    }
}

/// Thresholds in effect for `config`: calibrated from history when auto
/// calculation is on, the manual values otherwise.
pub fn resolve_thresholds(
    config: &AgingThresholdConfig,
    issues: &[Issue],
    now: DateTime<Utc>,
) -> AgingThresholds {
    if config.use_auto_calculation {
        calculate_thresholds_from_percentiles(
            issues,
            config.auto_calc_percentile_warning,
            config.auto_calc_percentile_critical,
            now,
        )
    } else {
        config.manual_thresholds()
    }
}

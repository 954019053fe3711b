//! Threshold-based health classification.
//!
//! Classification is a pure function of a value, its threshold, and the
//! [`MetricKind`] that says how the threshold is read. Checks for one
//! evaluation are independent of each other, so callers may classify them
//! concurrently and fold the results with [`aggregate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{HealthStatus, MetricKind};

/// Response time becomes critical above this multiple of its threshold.
pub const RESPONSE_TIME_CRITICAL_FACTOR: f64 = 1.5;
/// Error rate becomes critical above this multiple of its threshold.
pub const ERROR_RATE_CRITICAL_FACTOR: f64 = 2.0;
/// Utilization becomes critical this many percentage points above its threshold.
pub const UTILIZATION_CRITICAL_MARGIN: f64 = 10.0;

/// Classifies a single value against its threshold.
#[must_use]
pub fn classify(value: f64, threshold: f64, kind: MetricKind) -> HealthStatus {
    let critical_above = match kind {
        MetricKind::ResponseTime => threshold * RESPONSE_TIME_CRITICAL_FACTOR,
        MetricKind::ErrorRate => threshold * ERROR_RATE_CRITICAL_FACTOR,
        MetricKind::Utilization => threshold + UTILIZATION_CRITICAL_MARGIN,
    };

    if value > critical_above {
        HealthStatus::Critical
    } else if value > threshold {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

/// Returns the most severe status, or healthy for an empty input.
#[must_use]
pub fn aggregate<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = HealthStatus>,
{
    statuses.into_iter().max().unwrap_or_default()
}

/// A metric value paired with the threshold it is checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCheck {
    /// Metric name.
    pub metric: String,
    /// Observed value.
    pub value: f64,
    /// Threshold for the metric.
    pub threshold: f64,
    /// How the threshold is interpreted.
    pub kind: MetricKind,
}

impl MetricCheck {
    /// Creates a new check.
    #[must_use]
    pub fn new(metric: impl Into<String>, value: f64, threshold: f64, kind: MetricKind) -> Self {
        Self {
            metric: metric.into(),
            value,
            threshold,
            kind,
        }
    }
}

/// Outcome of one classified check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Metric name.
    pub metric: String,
    /// Observed value.
    pub value: f64,
    /// Threshold the value was checked against.
    pub threshold: f64,
    /// Classification.
    pub status: HealthStatus,
    /// When the check was classified.
    pub checked_at: DateTime<Utc>,
}

/// Aggregated outcome of a set of checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Most severe status across all checks.
    pub overall_status: HealthStatus,
    /// Individual check results, in input order.
    pub checks: Vec<HealthCheckResult>,
    /// Number of checks.
    pub total_checks: usize,
    /// Checks classified healthy.
    pub healthy_checks: usize,
    /// Checks classified warning.
    pub warning_checks: usize,
    /// Checks classified critical.
    pub critical_checks: usize,
}

impl HealthReport {
    /// Builds a report from already-classified results.
    #[must_use]
    pub fn from_results(checks: Vec<HealthCheckResult>) -> Self {
        let count = |status: HealthStatus| checks.iter().filter(|c| c.status == status).count();
        Self {
            overall_status: aggregate(checks.iter().map(|c| c.status)),
            total_checks: checks.len(),
            healthy_checks: count(HealthStatus::Healthy),
            warning_checks: count(HealthStatus::Warning),
            critical_checks: count(HealthStatus::Critical),
            checks,
        }
    }
}

/// Stateless health classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthEvaluator;

impl HealthEvaluator {
    /// Creates a new evaluator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Classifies one metric value.
    #[must_use]
    pub fn classify(
        &self,
        metric: &str,
        value: f64,
        threshold: f64,
        kind: MetricKind,
    ) -> HealthStatus {
        let status = classify(value, threshold, kind);
        debug!(metric, value, threshold, %kind, %status, "classified metric");
        status
    }

    /// Classifies one check into a result.
    #[must_use]
    pub fn check(&self, check: &MetricCheck) -> HealthCheckResult {
        HealthCheckResult {
            metric: check.metric.clone(),
            value: check.value,
            threshold: check.threshold,
            status: self.classify(&check.metric, check.value, check.threshold, check.kind),
            checked_at: Utc::now(),
        }
    }

    /// Classifies every check and aggregates the results.
    #[must_use]
    pub fn evaluate(&self, checks: &[MetricCheck]) -> HealthReport {
        HealthReport::from_results(checks.iter().map(|c| self.check(c)).collect())
    }
}

//! Core types shared by the evaluators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single recorded metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricObservation {
    /// Metric name, e.g. `response_time_ms`.
    pub metric: String,
    /// Observed value.
    pub value: f64,
    /// When the value was observed.
    pub timestamp: DateTime<Utc>,
}

impl MetricObservation {
    /// Creates a new observation.
    #[must_use]
    pub fn new(metric: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            metric: metric.into(),
            value,
            timestamp,
        }
    }

    /// Creates an observation stamped with the current time.
    #[must_use]
    pub fn now(metric: impl Into<String>, value: f64) -> Self {
        Self::new(metric, value, Utc::now())
    }
}

/// Health classification of a metric or a whole target.
///
/// Variants are ordered so that the most severe status compares greatest,
/// which makes aggregation a plain maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Within thresholds.
    #[default]
    Healthy,
    /// Over the threshold but not yet critical.
    Warning,
    /// Far enough over the threshold to require action.
    Critical,
}

impl HealthStatus {
    /// Returns the string representation of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// Returns true if the status requires attention.
    #[must_use]
    pub const fn requires_attention(&self) -> bool {
        matches!(self, Self::Warning | Self::Critical)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a metric's threshold is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Latency-like metric; critical above 1.5x the threshold.
    ResponseTime,
    /// Error-rate-like metric; critical above 2x the threshold.
    ErrorRate,
    /// Utilization percentage; critical 10 points above the threshold.
    Utilization,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResponseTime => write!(f, "response_time"),
            Self::ErrorRate => write!(f, "error_rate"),
            Self::Utilization => write!(f, "utilization"),
        }
    }
}

//! Failure pattern detection over a window of traces.
//!
//! Failed traces are grouped into failure classes. A class becomes a pattern once
//! it recurs often enough, and its severity comes from the same sigma cut points
//! the anomaly scorer uses, applied to the class frequencies within the window.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anomaly::{AnomalyScorer, AnomalySeverity};
use crate::error::{ObserveError, Result};

/// Failure class for traces that timed out.
pub const TIMEOUT_CASCADE: &str = "timeout_cascade";
/// Failure class for HTTP 429 responses.
pub const EXTERNAL_API_RATE_LIMIT: &str = "external_api_rate_limit";
/// Failure class for server errors without an explicit error type.
pub const SERVER_ERROR: &str = "server_error";
/// Pattern name for steadily growing memory.
pub const MEMORY_LEAK: &str = "memory_leak";

/// One recorded request trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Operation the trace belongs to.
    pub operation: String,
    /// When the trace started.
    pub timestamp: DateTime<Utc>,
    /// Wall time of the operation.
    pub duration_ms: f64,
    /// HTTP status, if the operation was a request.
    pub status_code: Option<u16>,
    /// Error class reported by the agent, e.g. `timeout`.
    pub error_type: Option<String>,
    /// Resident memory sampled at the end of the operation.
    pub memory_mb: Option<f64>,
}

impl TraceRecord {
    /// Creates a successful trace.
    #[must_use]
    pub fn new(operation: impl Into<String>, timestamp: DateTime<Utc>, duration_ms: f64) -> Self {
        Self {
            operation: operation.into(),
            timestamp,
            duration_ms,
            status_code: None,
            error_type: None,
            memory_mb: None,
        }
    }

    /// Sets the HTTP status code.
    #[must_use]
    pub const fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Sets the error type.
    #[must_use]
    pub fn with_error(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// Sets the memory sample.
    #[must_use]
    pub const fn with_memory_mb(mut self, memory_mb: f64) -> Self {
        self.memory_mb = Some(memory_mb);
        self
    }

    /// Returns the failure class of this trace, if it failed.
    #[must_use]
    pub fn failure_class(&self) -> Option<String> {
        if self.status_code == Some(429) {
            return Some(EXTERNAL_API_RATE_LIMIT.to_string());
        }
        match self.error_type.as_deref() {
            Some("timeout") => Some(TIMEOUT_CASCADE.to_string()),
            Some(other) => Some(other.to_string()),
            None if self.status_code.is_some_and(|code| code >= 500) => {
                Some(SERVER_ERROR.to_string())
            }
            None => None,
        }
    }
}

/// Thresholds for pattern detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Occurrences before a failure class is reported as a pattern.
    pub min_occurrences: usize,
    /// Share of timed-out traces that marks a timeout cascade.
    pub timeout_fraction: f64,
    /// Share of increasing memory samples that marks a leak.
    pub leak_increase_fraction: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            timeout_fraction: 0.1,
            leak_increase_fraction: 0.7,
        }
    }
}

impl PatternConfig {
    /// Checks that fractions lie in [0, 1] and the occurrence floor is positive.
    ///
    /// # Errors
    ///
    /// Returns [`ObserveError::InvalidConfig`] describing the problem.
    pub fn validate(&self) -> Result<()> {
        if self.min_occurrences == 0 {
            return Err(ObserveError::invalid_config("min_occurrences must be at least 1"));
        }
        for (name, value) in [
            ("timeout_fraction", self.timeout_fraction),
            ("leak_increase_fraction", self.leak_increase_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ObserveError::invalid_config(format!("{name} must lie in [0, 1]")));
            }
        }
        Ok(())
    }
}

/// A recurring failure found in a trace window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePattern {
    /// Failure class name.
    pub pattern_name: String,
    /// Occurrences in the window.
    pub frequency: usize,
    /// Severity of the pattern.
    pub severity: AnomalySeverity,
    /// First trace of the class.
    pub first_occurrence: DateTime<Utc>,
    /// Last trace of the class.
    pub last_occurrence: DateTime<Utc>,
    /// Distinct operations affected, sorted.
    pub affected_operations: Vec<String>,
    /// Suggested remediation.
    pub recommendation: String,
}

/// Result of analyzing one trace window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceAnalysis {
    /// Number of traces in the window.
    pub traces_analyzed: usize,
    /// Detected patterns, most severe first.
    pub patterns_detected: Vec<TracePattern>,
    /// Number of critical patterns.
    pub critical_patterns: usize,
    /// Number of high severity patterns.
    pub high_patterns: usize,
}

/// Returns true if timeouts make up more than `fraction` of the traces.
#[must_use]
pub fn detect_timeout_cascade(traces: &[TraceRecord], fraction: f64) -> bool {
    let timeouts = traces
        .iter()
        .filter(|t| t.error_type.as_deref() == Some("timeout"))
        .count();
    timeouts as f64 > traces.len() as f64 * fraction
}

/// Returns true if any trace was rate limited.
#[must_use]
pub fn detect_api_rate_limit(traces: &[TraceRecord]) -> bool {
    traces.iter().any(|t| t.status_code == Some(429))
}

/// Returns true if more than `fraction` of the readings increased on the previous one.
#[must_use]
pub fn detect_memory_leak(readings: &[f64], fraction: f64) -> bool {
    rising_trend(readings).is_some_and(|share| share > fraction)
}

/// Share of readings that increased on their predecessor.
///
/// The share is taken over all readings, so a strictly increasing series of n
/// values scores `(n - 1) / n`. Fewer than two readings have no trend.
#[must_use]
pub fn rising_trend(readings: &[f64]) -> Option<f64> {
    if readings.len() < 2 {
        return None;
    }
    let increases = readings.windows(2).filter(|w| w[1] > w[0]).count();
    Some(increases as f64 / readings.len() as f64)
}

fn recommendation_for(pattern: &str) -> String {
    match pattern {
        TIMEOUT_CASCADE => "Implement circuit breaker pattern with exponential backoff".to_string(),
        EXTERNAL_API_RATE_LIMIT => {
            "Implement rate limiting with token bucket algorithm".to_string()
        }
        MEMORY_LEAK => "Review cache eviction policy and add memory monitoring".to_string(),
        SERVER_ERROR => "Inspect server logs for the failing operations".to_string(),
        other => format!("Investigate recurring {other} failures"),
    }
}

#[derive(Debug)]
struct ClassStats {
    count: usize,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    operations: BTreeSet<String>,
}

/// Detects recurring failure patterns in trace windows.
#[derive(Debug, Clone, Default)]
pub struct TracePatternDetector {
    config: PatternConfig,
    scorer: AnomalyScorer,
}

impl TracePatternDetector {
    /// Creates a detector with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detector with validated thresholds and the scorer whose cut
    /// points grade pattern severity.
    ///
    /// # Errors
    ///
    /// Returns [`ObserveError::InvalidConfig`] if the thresholds are rejected.
    pub fn with_config(config: PatternConfig, scorer: AnomalyScorer) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, scorer })
    }

    /// Returns the thresholds.
    #[must_use]
    pub const fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Analyzes a trace window, oldest trace first.
    #[must_use]
    pub fn analyze(&self, traces: &[TraceRecord]) -> TraceAnalysis {
        let mut classes: BTreeMap<String, ClassStats> = BTreeMap::new();
        for trace in traces {
            let Some(class) = trace.failure_class() else {
                continue;
            };
            let stats = classes.entry(class).or_insert_with(|| ClassStats {
                count: 0,
                first: trace.timestamp,
                last: trace.timestamp,
                operations: BTreeSet::new(),
            });
            stats.count += 1;
            stats.first = stats.first.min(trace.timestamp);
            stats.last = stats.last.max(trace.timestamp);
            stats.operations.insert(trace.operation.clone());
        }

        let counts: Vec<f64> = classes.values().map(|s| s.count as f64).collect();
        let (mean, std_dev) = mean_and_std(&counts);
        let cascade = detect_timeout_cascade(traces, self.config.timeout_fraction);
        let rate_limited = detect_api_rate_limit(traces);

        let mut patterns: Vec<TracePattern> = classes
            .into_iter()
            .filter_map(|(name, stats)| {
                let named_hit = (name == TIMEOUT_CASCADE && cascade)
                    || (name == EXTERNAL_API_RATE_LIMIT && rate_limited);
                if stats.count < self.config.min_occurrences && !named_hit {
                    return None;
                }

                let deviation = self.scorer.score(stats.count as f64, mean, std_dev);
                let mut severity = self.scorer.classify_severity(deviation);
                if named_hit {
                    severity = severity.max(AnomalySeverity::High);
                }

                Some(TracePattern {
                    recommendation: recommendation_for(&name),
                    pattern_name: name,
                    frequency: stats.count,
                    severity,
                    first_occurrence: stats.first,
                    last_occurrence: stats.last,
                    affected_operations: stats.operations.into_iter().collect(),
                })
            })
            .collect();

        if let Some(leak) = self.memory_leak(traces) {
            patterns.push(leak);
        }

        patterns.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.frequency.cmp(&a.frequency))
        });

        let analysis = TraceAnalysis {
            traces_analyzed: traces.len(),
            critical_patterns: patterns
                .iter()
                .filter(|p| p.severity == AnomalySeverity::Critical)
                .count(),
            high_patterns: patterns
                .iter()
                .filter(|p| p.severity == AnomalySeverity::High)
                .count(),
            patterns_detected: patterns,
        };
        debug!(
            traces = analysis.traces_analyzed,
            patterns = analysis.patterns_detected.len(),
            "analyzed trace window"
        );
        analysis
    }

    fn memory_leak(&self, traces: &[TraceRecord]) -> Option<TracePattern> {
        let samples: Vec<(&TraceRecord, f64)> = traces
            .iter()
            .filter_map(|t| t.memory_mb.map(|m| (t, m)))
            .collect();
        let readings: Vec<f64> = samples.iter().map(|(_, m)| *m).collect();
        if !detect_memory_leak(&readings, self.config.leak_increase_fraction) {
            return None;
        }

        let (mean, std_dev) = mean_and_std(&readings);
        let last = readings.last().copied().unwrap_or(mean);
        let severity = self
            .scorer
            .classify_severity(self.scorer.score(last, mean, std_dev))
            .max(AnomalySeverity::Medium);
        let operations: BTreeSet<String> =
            samples.iter().map(|(t, _)| t.operation.clone()).collect();

        Some(TracePattern {
            pattern_name: MEMORY_LEAK.to_string(),
            frequency: readings.windows(2).filter(|w| w[1] > w[0]).count(),
            severity,
            first_occurrence: samples.first().map(|(t, _)| t.timestamp)?,
            last_occurrence: samples.last().map(|(t, _)| t.timestamp)?,
            affected_operations: operations.into_iter().collect(),
            recommendation: recommendation_for(MEMORY_LEAK),
        })
    }
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

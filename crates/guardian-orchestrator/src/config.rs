//! Orchestrator configuration.
//!
//! Every section has defaults, so a partial JSON document only needs to name
//! the settings it changes. [`GuardianConfig::from_json`] parses and validates in
//! one step.

use guardian_observe::{AnomalyConfig, MetricKind, PatternConfig, DEFAULT_SLA_PERIOD_HOURS};
use guardian_recovery::{CircuitBreaker, RecoveryOptions};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::target::ExtractionPolicy;

/// Metric name for response time.
pub const RESPONSE_TIME_MS: &str = "response_time_ms";
/// Metric name for error rate.
pub const ERROR_RATE_PERCENT: &str = "error_rate_percent";
/// Metric name for CPU utilization.
pub const CPU_PERCENT: &str = "cpu_percent";
/// Metric name for memory utilization.
pub const MEMORY_PERCENT: &str = "memory_percent";
/// Metric name for uptime, read by reports.
pub const UPTIME_PERCENT: &str = "uptime_percent";

/// A monitored metric with its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Metric name as known to the metrics source.
    pub name: String,
    /// How the threshold is read.
    pub kind: MetricKind,
    /// Threshold value.
    pub threshold: f64,
}

impl MetricSpec {
    /// Creates a metric spec.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: MetricKind, threshold: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            threshold,
        }
    }
}

/// Health thresholds and the observation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Response time threshold in milliseconds.
    pub response_time_threshold_ms: f64,
    /// Error rate threshold in percent.
    pub error_rate_threshold_percent: f64,
    /// CPU utilization threshold in percent.
    pub cpu_threshold_percent: f64,
    /// Memory utilization threshold in percent.
    pub memory_threshold_percent: f64,
    /// Observations kept per metric in a target's window.
    pub observation_window: usize,
    /// How far back sources are queried, in seconds.
    pub lookback_secs: i64,
    /// Metrics monitored in addition to the four standard ones.
    pub extra_metrics: Vec<MetricSpec>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            response_time_threshold_ms: 1000.0,
            error_rate_threshold_percent: 5.0,
            cpu_threshold_percent: 80.0,
            memory_threshold_percent: 85.0,
            observation_window: 20,
            lookback_secs: 300,
            extra_metrics: Vec::new(),
        }
    }
}

impl MonitoringConfig {
    /// Sets the response time threshold.
    #[must_use]
    pub const fn with_response_time_threshold_ms(mut self, threshold: f64) -> Self {
        self.response_time_threshold_ms = threshold;
        self
    }

    /// Sets the error rate threshold.
    #[must_use]
    pub const fn with_error_rate_threshold_percent(mut self, threshold: f64) -> Self {
        self.error_rate_threshold_percent = threshold;
        self
    }

    /// Adds a monitored metric.
    #[must_use]
    pub fn with_metric(mut self, spec: MetricSpec) -> Self {
        self.extra_metrics.push(spec);
        self
    }

    /// Returns every monitored metric, standard ones first.
    #[must_use]
    pub fn metric_specs(&self) -> Vec<MetricSpec> {
        let mut specs = vec![
            MetricSpec::new(RESPONSE_TIME_MS, MetricKind::ResponseTime, self.response_time_threshold_ms),
            MetricSpec::new(ERROR_RATE_PERCENT, MetricKind::ErrorRate, self.error_rate_threshold_percent),
            MetricSpec::new(CPU_PERCENT, MetricKind::Utilization, self.cpu_threshold_percent),
            MetricSpec::new(MEMORY_PERCENT, MetricKind::Utilization, self.memory_threshold_percent),
        ];
        specs.extend(self.extra_metrics.iter().cloned());
        specs
    }

    /// Validates thresholds and the metric list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.observation_window == 0 {
            return Err(ConfigError::invalid_threshold("observation_window", "must be at least 1"));
        }
        if self.lookback_secs <= 0 {
            return Err(ConfigError::invalid_threshold("lookback_secs", "must be positive"));
        }

        let mut seen = std::collections::HashSet::new();
        for spec in self.metric_specs() {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::invalid_policy("metric names must not be empty"));
            }
            if !seen.insert(spec.name.clone()) {
                return Err(ConfigError::invalid_policy(format!(
                    "metric {} is monitored twice",
                    spec.name
                )));
            }
            if !spec.threshold.is_finite() || spec.threshold <= 0.0 {
                return Err(ConfigError::invalid_threshold(spec.name, "must be a positive number"));
            }
            if spec.kind == MetricKind::Utilization && spec.threshold > 100.0 {
                return Err(ConfigError::invalid_threshold(spec.name, "must not exceed 100 percent"));
            }
        }
        Ok(())
    }
}

/// Breaker and pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Consecutive failed runs before a target's breaker opens.
    pub failure_threshold: u32,
    /// Seconds an open breaker waits before admitting a trial run.
    pub timeout_secs: i64,
    /// Run recovery automatically after a critical monitor result.
    pub auto_recover: bool,
    /// Options handed to the recovery pipeline.
    pub pipeline: RecoveryOptions,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 10,
            timeout_secs: 60,
            auto_recover: false,
            pipeline: RecoveryOptions::default(),
        }
    }
}

impl RecoveryConfig {
    /// Enables or disables automatic recovery.
    #[must_use]
    pub const fn with_auto_recover(mut self, enabled: bool) -> Self {
        self.auto_recover = enabled;
        self
    }

    /// Sets the breaker threshold and timeout.
    #[must_use]
    pub const fn with_breaker(mut self, failure_threshold: u32, timeout_secs: i64) -> Self {
        self.failure_threshold = failure_threshold;
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the pipeline options.
    #[must_use]
    pub fn with_pipeline(mut self, options: RecoveryOptions) -> Self {
        self.pipeline = options;
        self
    }

    /// Returns the breaker timeout.
    #[must_use]
    pub fn timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.timeout_secs)
    }

    /// Builds a closed breaker from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Recovery`] if the breaker settings are rejected.
    pub fn breaker(&self) -> Result<CircuitBreaker, ConfigError> {
        Ok(CircuitBreaker::new(self.failure_threshold, self.timeout())?)
    }

    /// Validates the breaker and pipeline settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Recovery`] describing the problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.breaker()?;
        self.pipeline.validate()?;
        Ok(())
    }
}

/// SLA and reporting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Target uptime percentage.
    pub sla_target_percent: f64,
    /// Response time target used by the reliability score.
    pub response_time_target_ms: f64,
    /// Hours in an SLA period.
    pub sla_period_hours: f64,
    /// Recent audit entries included in reports.
    pub audit_summary_size: usize,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            sla_target_percent: 99.7,
            response_time_target_ms: 1000.0,
            sla_period_hours: DEFAULT_SLA_PERIOD_HOURS,
            audit_summary_size: 10,
        }
    }
}

impl ComplianceConfig {
    /// Validates the SLA target and periods.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThreshold`] describing the problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sla_target_percent > 0.0 && self.sla_target_percent <= 100.0) {
            return Err(ConfigError::invalid_threshold("sla_target_percent", "must lie in (0, 100]"));
        }
        if !(self.response_time_target_ms > 0.0 && self.response_time_target_ms.is_finite()) {
            return Err(ConfigError::invalid_threshold("response_time_target_ms", "must be positive"));
        }
        if !(self.sla_period_hours > 0.0 && self.sla_period_hours.is_finite()) {
            return Err(ConfigError::invalid_threshold("sla_period_hours", "must be positive"));
        }
        Ok(())
    }
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianConfig {
    /// Health thresholds.
    pub monitoring: MonitoringConfig,
    /// Breaker and pipeline settings.
    pub recovery: RecoveryConfig,
    /// SLA and reporting settings.
    pub compliance: ComplianceConfig,
    /// Anomaly cut points and curves.
    pub anomaly: AnomalyConfig,
    /// Trace pattern thresholds.
    pub patterns: PatternConfig,
    /// Target extraction policy.
    pub extraction: ExtractionPolicy,
}

impl GuardianConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any validation error
    /// otherwise.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitoring.validate()?;
        self.recovery.validate()?;
        self.compliance.validate()?;
        self.anomaly.validate()?;
        self.patterns.validate()?;
        self.extraction.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn defaults_are_valid() {
        let config = GuardianConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.monitoring.response_time_threshold_ms - 1000.0).abs() < f64::EPSILON);
        assert!((config.monitoring.error_rate_threshold_percent - 5.0).abs() < f64::EPSILON);
        assert!((config.monitoring.cpu_threshold_percent - 80.0).abs() < f64::EPSILON);
        assert!((config.monitoring.memory_threshold_percent - 85.0).abs() < f64::EPSILON);
        assert_eq!(config.monitoring.observation_window, 20);
        assert_eq!(config.recovery.failure_threshold, 10);
        assert_eq!(config.recovery.timeout_secs, 60);
        assert!(!config.recovery.auto_recover);
        assert!((config.compliance.sla_target_percent - 99.7).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = GuardianConfig::from_json(
            r##"{
                "monitoring": { "cpu_threshold_percent": 70 },
                "recovery": { "auto_recover": true, "pipeline": { "notification_channel": "#payments" } },
                "anomaly": { "critical_threshold": 4.0 }
            }"##,
        );
        assert!(config.is_ok());
        let config = config.unwrap_or_default();
        assert!((config.monitoring.cpu_threshold_percent - 70.0).abs() < f64::EPSILON);
        assert!((config.monitoring.memory_threshold_percent - 85.0).abs() < f64::EPSILON);
        assert!(config.recovery.auto_recover);
        assert_eq!(config.recovery.pipeline.notification_channel, "#payments");
        assert_eq!(config.recovery.pipeline.checkpoint_id, "latest");
        assert!((config.anomaly.critical_threshold - 4.0).abs() < f64::EPSILON);
        assert!((config.anomaly.high_threshold - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            GuardianConfig::from_json("{ not json"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test_case(r#"{"monitoring": {"cpu_threshold_percent": 120}}"# ; "utilization over 100")]
    #[test_case(r#"{"monitoring": {"response_time_threshold_ms": 0}}"# ; "zero response threshold")]
    #[test_case(r#"{"monitoring": {"observation_window": 0}}"# ; "empty window")]
    #[test_case(r#"{"monitoring": {"extra_metrics": [{"name": "cpu_percent", "kind": "utilization", "threshold": 50}]}}"# ; "duplicate metric")]
    #[test_case(r#"{"recovery": {"failure_threshold": 0}}"# ; "zero breaker threshold")]
    #[test_case(r#"{"recovery": {"pipeline": {"step_timeout_ms": 0}}}"# ; "zero step timeout")]
    #[test_case(r#"{"compliance": {"sla_target_percent": 101}}"# ; "sla over 100")]
    #[test_case(r#"{"anomaly": {"medium_threshold": 4, "high_threshold": 3}}"# ; "unordered cut points")]
    #[test_case(r#"{"patterns": {"min_occurrences": 0}}"# ; "zero occurrences")]
    #[test_case(r#"{"extraction": {"fallback": ""}}"# ; "empty fallback")]
    fn invalid_documents_rejected(json: &str) {
        let result = GuardianConfig::from_json(json);
        assert!(result.is_err(), "accepted {json}");
        assert!(!matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn metric_specs_include_extras_in_order() {
        let monitoring = MonitoringConfig::default()
            .with_metric(MetricSpec::new("queue_depth", MetricKind::ResponseTime, 500.0));
        let names: Vec<String> = monitoring.metric_specs().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![RESPONSE_TIME_MS, ERROR_RATE_PERCENT, CPU_PERCENT, MEMORY_PERCENT, "queue_depth"]
        );
    }

    #[test]
    fn round_trips_through_json() {
        let config = GuardianConfig::default();
        let json = serde_json::to_string(&config).unwrap_or_default();
        assert_eq!(GuardianConfig::from_json(&json).ok(), Some(config));
    }
}

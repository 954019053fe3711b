//! Baseline deviation scoring.
//!
//! The scorer measures how far a current value sits from a learned baseline in
//! standard deviations, then maps that deviation to a severity, a confidence,
//! and a predicted failure probability. Every cut point and curve parameter
//! lives in [`AnomalyConfig`].
//!
//! Baselines are read-only here. Learning them is the job of a
//! [`BaselineProvider`](crate::sources::BaselineProvider).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ObserveError, Result};
use crate::patterns::rising_trend;
use crate::types::MetricObservation;

/// Confidence and probability never reach certainty.
pub const MAX_PROBABILITY: f64 = 0.999;

/// Learned statistics for one metric under normal conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineStats {
    /// Metric the baseline describes.
    pub metric: String,
    /// Mean value.
    pub mean: f64,
    /// Standard deviation.
    pub std_dev: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile.
    pub p99: f64,
}

impl BaselineStats {
    /// Creates a baseline with percentiles left at zero.
    #[must_use]
    pub fn new(metric: impl Into<String>, mean: f64, std_dev: f64) -> Self {
        Self {
            metric: metric.into(),
            mean,
            std_dev,
            p95: 0.0,
            p99: 0.0,
        }
    }

    /// Sets the tail percentiles.
    #[must_use]
    pub const fn with_percentiles(mut self, p95: f64, p99: f64) -> Self {
        self.p95 = p95;
        self.p99 = p99;
        self
    }
}

/// Severity of a deviation from baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    /// Within normal variation.
    #[default]
    Low,
    /// Noticeable deviation.
    Medium,
    /// Large deviation.
    High,
    /// Extreme deviation.
    Critical,
}

impl AnomalySeverity {
    /// Returns the string representation of this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyType {
    /// Current value at or above the baseline mean.
    Spike,
    /// Current value below the baseline mean.
    Drop,
}

/// Tunable cut points and curves for anomaly scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Deviation (in sigma) at which severity becomes medium.
    pub medium_threshold: f64,
    /// Deviation at which severity becomes high.
    pub high_threshold: f64,
    /// Deviation at which severity becomes critical.
    pub critical_threshold: f64,
    /// Deviation at which a record counts as an anomaly at all.
    pub anomaly_threshold: f64,
    /// Scale of the confidence curve `1 - exp(-d / scale)`.
    pub confidence_scale: f64,
    /// Scale of the failure curve `weight * (1 - exp(-d / scale))`.
    pub failure_scale: f64,
    /// Failure probability weight per severity: low, medium, high, critical.
    pub severity_weights: [f64; 4],
    /// Failure probability at which an imminent failure alert is raised.
    pub imminent_failure_threshold: f64,
    /// Fraction of increasing observations that counts as a deteriorating trend.
    pub trend_increase_fraction: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            medium_threshold: 2.0,
            high_threshold: 3.0,
            critical_threshold: 5.0,
            anomaly_threshold: 2.0,
            confidence_scale: 2.0,
            failure_scale: 4.0,
            severity_weights: [0.1, 0.35, 0.75, 0.95],
            imminent_failure_threshold: 0.8,
            trend_increase_fraction: 0.7,
        }
    }
}

impl AnomalyConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the severity cut points.
    #[must_use]
    pub const fn with_cut_points(mut self, medium: f64, high: f64, critical: f64) -> Self {
        self.medium_threshold = medium;
        self.high_threshold = high;
        self.critical_threshold = critical;
        self
    }

    /// Sets the deviation at which a record counts as an anomaly.
    #[must_use]
    pub const fn with_anomaly_threshold(mut self, threshold: f64) -> Self {
        self.anomaly_threshold = threshold;
        self
    }

    /// Sets the imminent failure threshold.
    #[must_use]
    pub const fn with_imminent_failure_threshold(mut self, threshold: f64) -> Self {
        self.imminent_failure_threshold = threshold;
        self
    }

    /// Checks that the curves are monotonic and the cut points ordered.
    ///
    /// # Errors
    ///
    /// Returns [`ObserveError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let cuts = [self.medium_threshold, self.high_threshold, self.critical_threshold];
        if cuts.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return Err(ObserveError::invalid_config(
                "severity cut points must be finite and positive",
            ));
        }
        if !(cuts[0] < cuts[1] && cuts[1] < cuts[2]) {
            return Err(ObserveError::invalid_config(
                "severity cut points must strictly increase (medium < high < critical)",
            ));
        }
        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold < 0.0 {
            return Err(ObserveError::invalid_config(
                "anomaly_threshold must be a non-negative number",
            ));
        }
        if self.confidence_scale <= 0.0 || self.failure_scale <= 0.0 {
            return Err(ObserveError::invalid_config("curve scales must be positive"));
        }
        if self.severity_weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(ObserveError::invalid_config(
                "severity weights must lie in [0, 1]",
            ));
        }
        if self.severity_weights.windows(2).any(|w| w[0] > w[1]) {
            return Err(ObserveError::invalid_config(
                "severity weights must not decrease with severity",
            ));
        }
        if !(0.0..=1.0).contains(&self.imminent_failure_threshold) {
            return Err(ObserveError::invalid_config(
                "imminent_failure_threshold must lie in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.trend_increase_fraction) {
            return Err(ObserveError::invalid_config(
                "trend_increase_fraction must lie in [0, 1]",
            ));
        }
        Ok(())
    }
}

/// A scored deviation for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Metric name.
    pub metric: String,
    /// Current value.
    pub current_value: f64,
    /// Baseline mean the value was compared with.
    pub baseline_mean: f64,
    /// Distance from the mean in standard deviations.
    pub std_deviations: f64,
    /// Severity derived from the deviation.
    pub severity: AnomalySeverity,
    /// Direction of the deviation.
    pub anomaly_type: AnomalyType,
    /// Confidence that this is a real anomaly, in [0, 1).
    pub confidence: f64,
    /// Predicted probability of an imminent failure, in [0, 1).
    pub predicted_failure_probability: f64,
}

/// Kind of forward-looking alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictiveAlertKind {
    /// An anomaly's failure probability crossed the imminent threshold.
    ImminentFailure,
    /// A metric has been rising steadily across the observation window.
    TrendDeterioration,
}

/// A forward-looking alert derived from scored anomalies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveAlert {
    /// Alert kind.
    pub kind: PredictiveAlertKind,
    /// Metric that raised the alert.
    pub metric: String,
    /// Confidence of the alert.
    pub confidence: f64,
    /// What an operator should do.
    pub recommended_action: String,
    /// When the alert was raised.
    pub raised_at: DateTime<Utc>,
}

/// Scores observations against baselines.
#[derive(Debug, Clone, Default)]
pub struct AnomalyScorer {
    config: AnomalyConfig,
}

impl AnomalyScorer {
    /// Creates a scorer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scorer with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ObserveError::InvalidConfig`] if the configuration is rejected.
    pub fn with_config(config: AnomalyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Distance of `current` from `mean` in standard deviations.
    ///
    /// A zero standard deviation yields 0 rather than a division by zero.
    #[must_use]
    pub fn score(&self, current: f64, mean: f64, std_dev: f64) -> f64 {
        if std_dev == 0.0 {
            return 0.0;
        }
        (current - mean).abs() / std_dev.abs()
    }

    /// Maps a deviation onto the configured cut points.
    #[must_use]
    pub fn classify_severity(&self, deviation: f64) -> AnomalySeverity {
        if deviation >= self.config.critical_threshold {
            AnomalySeverity::Critical
        } else if deviation >= self.config.high_threshold {
            AnomalySeverity::High
        } else if deviation >= self.config.medium_threshold {
            AnomalySeverity::Medium
        } else {
            AnomalySeverity::Low
        }
    }

    /// Confidence rising with deviation, saturating below 1.
    #[must_use]
    pub fn confidence(&self, deviation: f64) -> f64 {
        saturate(deviation, self.config.confidence_scale)
    }

    /// Failure probability for a deviation at a given severity.
    #[must_use]
    pub fn failure_probability(&self, deviation: f64, severity: AnomalySeverity) -> f64 {
        let weight = self.config.severity_weights[severity as usize];
        (weight * saturate(deviation, self.config.failure_scale)).min(MAX_PROBABILITY)
    }

    /// Scores `current` against `baseline`.
    #[must_use]
    pub fn build_anomaly_record(
        &self,
        metric: &str,
        current: f64,
        baseline: &BaselineStats,
    ) -> AnomalyRecord {
        let deviation = self.score(current, baseline.mean, baseline.std_dev);
        let severity = self.classify_severity(deviation);
        AnomalyRecord {
            metric: metric.to_string(),
            current_value: current,
            baseline_mean: baseline.mean,
            std_deviations: round2(deviation),
            severity,
            anomaly_type: if current >= baseline.mean {
                AnomalyType::Spike
            } else {
                AnomalyType::Drop
            },
            confidence: round2(self.confidence(deviation)).min(MAX_PROBABILITY),
            predicted_failure_probability: round2(self.failure_probability(deviation, severity))
                .min(MAX_PROBABILITY),
        }
    }

    /// Returns true if the record's deviation reaches the anomaly threshold.
    #[must_use]
    pub fn is_anomalous(&self, record: &AnomalyRecord) -> bool {
        record.std_deviations >= self.config.anomaly_threshold
    }

    /// Derives predictive alerts from scored records and their recent history.
    ///
    /// `history` holds the observation window per metric, oldest first.
    #[must_use]
    pub fn predictive_alerts(
        &self,
        records: &[AnomalyRecord],
        history: &[(String, Vec<MetricObservation>)],
    ) -> Vec<PredictiveAlert> {
        let now = Utc::now();
        let mut alerts = Vec::new();

        if let Some(worst) = records
            .iter()
            .filter(|r| r.predicted_failure_probability >= self.config.imminent_failure_threshold)
            .max_by(|a, b| {
                a.predicted_failure_probability
                    .total_cmp(&b.predicted_failure_probability)
            })
        {
            alerts.push(PredictiveAlert {
                kind: PredictiveAlertKind::ImminentFailure,
                metric: worst.metric.clone(),
                confidence: worst.predicted_failure_probability,
                recommended_action: "Trigger recovery procedure immediately".to_string(),
                raised_at: now,
            });
        }

        for (metric, observations) in history {
            let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
            if let Some(fraction) = rising_trend(&values) {
                if fraction > self.config.trend_increase_fraction {
                    alerts.push(PredictiveAlert {
                        kind: PredictiveAlertKind::TrendDeterioration,
                        metric: metric.clone(),
                        confidence: round2(fraction.min(MAX_PROBABILITY)),
                        recommended_action: "Monitor closely and prepare rollback".to_string(),
                        raised_at: now,
                    });
                }
            }
        }

        alerts
    }
}

fn saturate(deviation: f64, scale: f64) -> f64 {
    if deviation.is_nan() || deviation <= 0.0 {
        return 0.0;
    }
    (1.0 - (-deviation / scale).exp()).min(MAX_PROBABILITY)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn scorer() -> AnomalyScorer {
        AnomalyScorer::new()
    }

    #[test]
    fn score_examples() {
        let s = scorer();
        assert!((s.score(100.0, 100.0, 10.0) - 0.0).abs() < f64::EPSILON);
        assert!((s.score(120.0, 100.0, 10.0) - 2.0).abs() < f64::EPSILON);
        assert!((s.score(130.0, 100.0, 10.0) - 3.0).abs() < f64::EPSILON);
        assert!((s.score(80.0, 100.0, 10.0) - 2.0).abs() < f64::EPSILON);
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(42.5 ; "positive")]
    #[test_case(-7.0 ; "negative")]
    fn zero_std_dev_scores_zero(x: f64) {
        assert!(scorer().score(x, x, 0.0).abs() < f64::EPSILON);
        assert!(scorer().score(x + 5.0, x, 0.0).abs() < f64::EPSILON);
    }

    #[test_case(0.5, AnomalySeverity::Low ; "noise")]
    #[test_case(2.0, AnomalySeverity::Medium ; "two sigma")]
    #[test_case(3.5, AnomalySeverity::High ; "three and a half sigma")]
    #[test_case(5.0, AnomalySeverity::Critical ; "five sigma")]
    #[test_case(30.8, AnomalySeverity::Critical ; "far out")]
    fn default_cut_points(deviation: f64, expected: AnomalySeverity) {
        assert_eq!(scorer().classify_severity(deviation), expected);
    }

    #[test]
    fn custom_cut_points() {
        let config = AnomalyConfig::new().with_cut_points(1.0, 1.5, 2.5);
        let s = AnomalyScorer::with_config(config);
        assert!(s.is_ok());
        let s = s.unwrap_or_default();
        assert_eq!(s.classify_severity(1.2), AnomalySeverity::Medium);
        assert_eq!(s.classify_severity(2.6), AnomalySeverity::Critical);
    }

    #[test_case(AnomalyConfig::new().with_cut_points(3.0, 2.0, 5.0) ; "unordered cut points")]
    #[test_case(AnomalyConfig::new().with_cut_points(0.0, 2.0, 5.0) ; "zero cut point")]
    #[test_case(AnomalyConfig::new().with_anomaly_threshold(-1.0) ; "negative anomaly threshold")]
    #[test_case(AnomalyConfig::new().with_imminent_failure_threshold(1.5) ; "probability above one")]
    #[test_case(AnomalyConfig { severity_weights: [0.5, 0.4, 0.7, 0.9], ..AnomalyConfig::default() } ; "decreasing weights")]
    #[test_case(AnomalyConfig { confidence_scale: 0.0, ..AnomalyConfig::default() } ; "zero scale")]
    fn invalid_configs_rejected(config: AnomalyConfig) {
        assert!(matches!(
            AnomalyScorer::with_config(config),
            Err(ObserveError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn record_for_response_time_spike() {
        let baseline = BaselineStats::new("response_time_ms", 287.0, 52.0).with_percentiles(612.0, 1245.0);
        let record = scorer().build_anomaly_record("response_time_ms", 1850.0, &baseline);

        assert_eq!(record.metric, "response_time_ms");
        assert!((record.std_deviations - 30.06).abs() < 0.01);
        assert_eq!(record.severity, AnomalySeverity::Critical);
        assert_eq!(record.anomaly_type, AnomalyType::Spike);
        assert!(record.confidence > 0.95 && record.confidence < 1.0);
        assert!(record.predicted_failure_probability > 0.9);
        assert!(scorer().is_anomalous(&record));
    }

    #[test]
    fn record_for_drop_below_mean() {
        let baseline = BaselineStats::new("throughput", 100.0, 10.0);
        let record = scorer().build_anomaly_record("throughput", 70.0, &baseline);
        assert_eq!(record.anomaly_type, AnomalyType::Drop);
        assert_eq!(record.severity, AnomalySeverity::High);
    }

    #[test]
    fn record_at_mean_is_not_anomalous() {
        let baseline = BaselineStats::new("cpu_percent", 42.3, 8.2);
        let record = scorer().build_anomaly_record("cpu_percent", 42.3, &baseline);
        assert_eq!(record.severity, AnomalySeverity::Low);
        assert!(record.confidence.abs() < f64::EPSILON);
        assert!(record.predicted_failure_probability.abs() < f64::EPSILON);
        assert!(!scorer().is_anomalous(&record));
    }

    #[test]
    fn imminent_failure_alert_uses_worst_record() {
        let s = scorer();
        let records = vec![
            s.build_anomaly_record("cpu_percent", 60.0, &BaselineStats::new("cpu_percent", 42.3, 8.2)),
            s.build_anomaly_record("error_rate_percent", 8.5, &BaselineStats::new("error_rate_percent", 0.37, 0.15)),
        ];
        let alerts = s.predictive_alerts(&records, &[]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, PredictiveAlertKind::ImminentFailure);
        assert_eq!(alerts[0].metric, "error_rate_percent");
    }

    #[test]
    fn rising_history_raises_trend_alert() {
        let history: Vec<MetricObservation> = (0..10)
            .map(|i| MetricObservation::now("error_rate_percent", f64::from(i)))
            .collect();
        let alerts = scorer().predictive_alerts(&[], &[("error_rate_percent".to_string(), history)]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, PredictiveAlertKind::TrendDeterioration);
    }

    #[test]
    fn flat_history_raises_nothing() {
        let history: Vec<MetricObservation> =
            (0..10).map(|_| MetricObservation::now("cpu_percent", 40.0)).collect();
        assert!(scorer()
            .predictive_alerts(&[], &[("cpu_percent".to_string(), history)])
            .is_empty());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn confidence_monotonic_and_bounded(a in 0.0f64..1000.0, b in 0.0f64..1000.0) {
                let s = scorer();
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(s.confidence(low) <= s.confidence(high));
                prop_assert!(s.confidence(high) < 1.0);
                prop_assert!(s.confidence(low) >= 0.0);
            }

            #[test]
            fn failure_probability_monotonic(a in 0.0f64..1000.0, b in 0.0f64..1000.0) {
                let s = scorer();
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                let p_low = s.failure_probability(low, s.classify_severity(low));
                let p_high = s.failure_probability(high, s.classify_severity(high));
                prop_assert!(p_low <= p_high);
                prop_assert!(p_high < 1.0);
            }

            #[test]
            fn score_is_symmetric(mean in -1e6f64..1e6, delta in 0.0f64..1e6, std in 0.001f64..1e3) {
                let s = scorer();
                let up = s.score(mean + delta, mean, std);
                let down = s.score(mean - delta, mean, std);
                prop_assert!((up - down).abs() <= 1e-6 * up.max(1.0));
            }
        }
    }
}

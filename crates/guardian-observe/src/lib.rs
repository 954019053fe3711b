//! # guardian-observe
//!
//! Evaluators for Agent Reliability Guardian.
//!
//! Everything here is a pure function of its inputs: metric values, baselines, and
//! traces are supplied by the caller through the traits in [`sources`], and no
//! evaluator keeps state between calls.
//!
//! ## Features
//!
//! - **Health Classification**: Threshold checks per metric kind, aggregated to the most severe status
//! - **Anomaly Scoring**: Sigma deviation from a baseline, severity, confidence, failure probability
//! - **Predictive Alerts**: Imminent failure and steadily rising metrics
//! - **Reliability Grading**: Weighted 0-100 score, letter grade, SLA compliance
//! - **Trace Patterns**: Timeout cascades, rate limiting, memory leaks, recurring error classes
//!
//! ## Quick Start
//!
//! ```rust
//! use guardian_observe::{
//!     AnomalyScorer, AnomalySeverity, BaselineStats, HealthEvaluator, HealthStatus, MetricCheck,
//!     MetricKind,
//! };
//!
//! let report = HealthEvaluator::new().evaluate(&[
//!     MetricCheck::new("response_time_ms", 1850.0, 1000.0, MetricKind::ResponseTime),
//!     MetricCheck::new("error_rate_percent", 2.0, 5.0, MetricKind::ErrorRate),
//! ]);
//! assert_eq!(report.overall_status, HealthStatus::Critical);
//!
//! let baseline = BaselineStats::new("response_time_ms", 287.0, 52.0);
//! let record = AnomalyScorer::new().build_anomaly_record("response_time_ms", 1850.0, &baseline);
//! assert_eq!(record.severity, AnomalySeverity::Critical);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anomaly;
pub mod error;
pub mod health;
pub mod patterns;
pub mod reliability;
pub mod sources;
pub mod types;

pub use error::{ObserveError, Result};
pub use types::{HealthStatus, MetricKind, MetricObservation};

pub use health::{aggregate, classify, HealthCheckResult, HealthEvaluator, HealthReport, MetricCheck};

pub use anomaly::{
    AnomalyConfig, AnomalyRecord, AnomalyScorer, AnomalySeverity, AnomalyType, BaselineStats,
    PredictiveAlert, PredictiveAlertKind,
};

pub use reliability::{
    Grade, ReliabilityScore, ReliabilityScorer, ScoreComponents, SlaCompliance,
    DEFAULT_SLA_PERIOD_HOURS,
};

pub use patterns::{
    detect_api_rate_limit, detect_memory_leak, detect_timeout_cascade, PatternConfig,
    TraceAnalysis, TracePattern, TracePatternDetector, TraceRecord,
};

pub use sources::{
    BaselineProvider, MetricsSource, StaticBaselineProvider, TraceSource, DEFAULT_RECORDED_CAPACITY,
};

//! # guardian-orchestrator
//!
//! Request routing for Agent Reliability Guardian.
//!
//! An [`Orchestrator`] takes a free-form request such as
//! `"Monitor PaymentAgent for reliability issues"`, classifies it into an
//! [`Intent`], finds the target it names, and dispatches to the matching
//! capability. Every target gets its own circuit breaker and observation window in
//! the [`TargetRegistry`], created on first reference.
//!
//! ## Features
//!
//! - **Intent Routing**: Ordered keyword rules, first match wins, help otherwise
//! - **Target Extraction**: Configurable keywords and name suffixes, audited fallback
//! - **Parallel Monitoring**: One scoped worker per monitored metric
//! - **Per-Target Isolation**: Breaker and window behind a per-target lock
//! - **Auto Recovery**: Optional recovery run after a critical health check
//! - **JSON Responses**: Every response serializes with a tagged result
//!
//! ## Example
//!
//! ```rust
//! use guardian_orchestrator::{Intent, IntentClassifier, TargetExtractor};
//!
//! let text = "Monitor PaymentAgent for reliability issues";
//! assert_eq!(IntentClassifier::new().classify(text), Intent::Monitor);
//! assert_eq!(TargetExtractor::default().extract(text).as_deref(), Some("Paymentagent"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod intent;
pub mod orchestrator;
pub mod registry;
pub mod target;

pub use error::{ConfigError, GuardianError, Result};

pub use config::{
    ComplianceConfig, GuardianConfig, MetricSpec, MonitoringConfig, RecoveryConfig, CPU_PERCENT,
    ERROR_RATE_PERCENT, MEMORY_PERCENT, RESPONSE_TIME_MS, UPTIME_PERCENT,
};
pub use intent::{Intent, IntentClassifier, IntentRule};
pub use orchestrator::{
    AnalyzeResult, CommandHelp, EvaluatorHealthVerifier, HelpResult, IntentResult, MonitorResult,
    ObservationSources, Orchestrator, OrchestratorResponse, RecoverResult, RecoveryServices,
    ReportResult, UnavailableMetric, ORCHESTRATOR_ACTOR,
};
pub use registry::{MetricsWindow, TargetHandle, TargetRegistry, TargetState};
pub use target::{ExtractionPolicy, ResolvedTarget, TargetExtractor, UNKNOWN_TARGET};

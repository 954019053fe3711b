//! # guardian-recovery
//!
//! Circuit breaker and recovery pipeline for Agent Reliability Guardian.
//!
//! A [`RecoveryPipeline`] walks a fixed sequence of recovery actions against a
//! misbehaving target: isolate it from traffic, roll back, restore state, verify
//! health, notify the team. The target's [`CircuitBreaker`] gates every run and
//! learns its outcome, so a target that keeps failing recovery is left alone until
//! the breaker timeout expires.
//!
//! ## Features
//!
//! - **Fail Fast**: An open breaker rejects a run without touching any collaborator
//! - **Abort on Failure**: The first failed step skips every later step
//! - **Audited Transitions**: Each step transition is appended to the audit trail
//! - **Bounded Steps**: Collaborator calls over the step timeout count as failures
//! - **Cancellation**: A [`CancellationFlag`] stops a run at the next step boundary
//! - **Recommended Plans**: [`IncidentSeverity::recovery_plan`] sizes the response to an incident
//!
//! ## Example
//!
//! ```rust
//! use chrono::Duration;
//! use guardian_recovery::{CircuitBreaker, CircuitState};
//!
//! let mut breaker = CircuitBreaker::new(2, Duration::seconds(60))?;
//! breaker.record_failure();
//! breaker.record_failure();
//!
//! assert_eq!(breaker.state(), CircuitState::Open);
//! assert!(!breaker.is_available());
//! # Ok::<(), guardian_recovery::RecoveryError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actions;
pub mod breaker;
pub mod error;
pub mod pipeline;
pub mod plan;

pub use error::{CollaboratorError, CollaboratorResult, RecoveryError, Result};

pub use breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};

pub use actions::{
    DeployOutcome, DeploymentService, HealthVerifier, NotificationSeverity, Notifier, Platform,
    RecoveryCollaborators, RollbackOutcome, StateStore, TrafficGuard,
};

pub use pipeline::{
    CancellationFlag, RecoveryAction, RecoveryOptions, RecoveryPipeline, RecoveryRun,
    RecoveryStep, RunStatus, StepStatus, CANCELED, CIRCUIT_OPEN, PIPELINE_ACTOR,
};

pub use plan::{build_recovery_plan, IncidentSeverity, PlanAction};

//! Ordered, breaker-gated recovery pipeline.
//!
//! A run walks the five [`RecoveryAction`]s in order. Every step transition is
//! appended to the audit trail before the next one may happen, the first failure
//! skips everything after it, and the target's breaker is told the outcome exactly
//! once per run.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use guardian_audit::{event_types, AuditSeverity, AuditTrail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::actions::{NotificationSeverity, Platform, RecoveryCollaborators};
use crate::breaker::CircuitBreaker;
use crate::error::{CollaboratorError, CollaboratorResult, RecoveryError, Result};

/// Actor name used for audit entries written by the pipeline.
pub const PIPELINE_ACTOR: &str = "recovery_pipeline";
/// Failure reason of a run rejected by an open breaker.
pub const CIRCUIT_OPEN: &str = "circuit open";
/// Failure reason of a canceled run.
pub const CANCELED: &str = "canceled";

/// One recovery action, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Isolate the target from traffic.
    CircuitBreakerActivation,
    /// Roll the target back to a known-good version.
    RollbackVersion,
    /// Restore persisted state from a checkpoint.
    RestoreState,
    /// Confirm the target is healthy again.
    VerifyHealth,
    /// Tell the owning team what happened.
    NotifyTeam,
}

impl RecoveryAction {
    /// Every action, in execution order.
    pub const ALL: [Self; 5] = [
        Self::CircuitBreakerActivation,
        Self::RollbackVersion,
        Self::RestoreState,
        Self::VerifyHealth,
        Self::NotifyTeam,
    ];

    /// 1-based position of the action in a run.
    #[must_use]
    pub const fn step_number(self) -> u8 {
        match self {
            Self::CircuitBreakerActivation => 1,
            Self::RollbackVersion => 2,
            Self::RestoreState => 3,
            Self::VerifyHealth => 4,
            Self::NotifyTeam => 5,
        }
    }

    /// Returns the string representation of this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CircuitBreakerActivation => "circuit_breaker_activation",
            Self::RollbackVersion => "rollback_version",
            Self::RestoreState => "restore_state",
            Self::VerifyHealth => "verify_health",
            Self::NotifyTeam => "notify_team",
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not started.
    Pending,
    /// Collaborator call in flight.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
    /// Never started because the run was aborted.
    Skipped,
}

impl StepStatus {
    /// Returns true once the step can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Returns the string representation of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress | Self::Skipped)
                | (Self::InProgress, Self::Completed | Self::Failed)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a recovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStep {
    /// 1-based position in the run.
    pub step_number: u8,
    /// What the step does.
    pub action: RecoveryAction,
    /// Current status.
    pub status: StepStatus,
    /// Wall time of the collaborator call.
    pub duration_ms: u64,
    /// Outcome description.
    pub details: String,
}

impl RecoveryStep {
    fn pending(action: RecoveryAction) -> Self {
        Self {
            step_number: action.step_number(),
            action,
            status: StepStatus::Pending,
            duration_ms: 0,
            details: String::new(),
        }
    }
}

/// Final outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every step completed.
    Completed,
    /// The run was rejected, canceled, or a step failed.
    Failed,
}

/// Record of one pipeline invocation. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRun {
    /// Unique run id.
    pub run_id: Uuid,
    /// Target the run recovered.
    pub target: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Steps in execution order.
    pub steps: Vec<RecoveryStep>,
    /// Final outcome.
    pub status: RunStatus,
    /// Why the run failed, if it did.
    pub failure_reason: Option<String>,
    /// Sum of step durations.
    pub total_duration_ms: u64,
    /// True iff every step completed.
    pub recovery_successful: bool,
}

impl RecoveryRun {
    /// Number of completed steps.
    #[must_use]
    pub fn steps_completed(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    /// Actions that completed, in order.
    #[must_use]
    pub fn actions_taken(&self) -> Vec<RecoveryAction> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .map(|s| s.action)
            .collect()
    }

    /// The step that failed, if any.
    #[must_use]
    pub fn failed_step(&self) -> Option<&RecoveryStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }
}

/// Parameters passed to the collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryOptions {
    /// Longest a single collaborator call may take.
    pub step_timeout_ms: u64,
    /// Version the rollback step returns to.
    pub rollback_version: String,
    /// Checkpoint the restore step loads.
    pub checkpoint_id: String,
    /// Channel the notify step posts to.
    pub notification_channel: String,
    /// Redeploy the rolled-back version after a successful rollback.
    pub redeploy: bool,
    /// Platform used for the redeploy.
    pub platform: Platform,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            step_timeout_ms: 30_000,
            rollback_version: "previous".to_string(),
            checkpoint_id: "latest".to_string(),
            notification_channel: "#ops-alerts".to_string(),
            redeploy: false,
            platform: Platform::CloudRun,
        }
    }
}

impl RecoveryOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-step timeout.
    #[must_use]
    pub const fn with_step_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.step_timeout_ms = timeout_ms;
        self
    }

    /// Sets the rollback version.
    #[must_use]
    pub fn with_rollback_version(mut self, version: impl Into<String>) -> Self {
        self.rollback_version = version.into();
        self
    }

    /// Sets the checkpoint id.
    #[must_use]
    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<String>) -> Self {
        self.checkpoint_id = checkpoint_id.into();
        self
    }

    /// Sets the notification channel.
    #[must_use]
    pub fn with_notification_channel(mut self, channel: impl Into<String>) -> Self {
        self.notification_channel = channel.into();
        self
    }

    /// Enables redeploying to `platform` after the rollback.
    #[must_use]
    pub const fn with_redeploy(mut self, platform: Platform) -> Self {
        self.redeploy = true;
        self.platform = platform;
        self
    }

    /// Returns the step timeout as a [`Duration`].
    #[must_use]
    pub const fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    /// Checks the timeout is positive and every name is set.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::InvalidConfig`] describing the problem.
    pub fn validate(&self) -> Result<()> {
        if self.step_timeout_ms == 0 {
            return Err(RecoveryError::invalid_config("step_timeout_ms must be positive"));
        }
        for (name, value) in [
            ("rollback_version", &self.rollback_version),
            ("checkpoint_id", &self.checkpoint_id),
            ("notification_channel", &self.notification_channel),
        ] {
            if value.trim().is_empty() {
                return Err(RecoveryError::invalid_config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Shared flag that stops a run at the next step boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Step list of an in-flight run. Every accepted transition is audited.
struct StepLedger<'a> {
    run_id: Uuid,
    target: &'a str,
    audit: &'a AuditTrail,
    steps: Vec<RecoveryStep>,
}

impl<'a> StepLedger<'a> {
    fn new(run_id: Uuid, target: &'a str, audit: &'a AuditTrail) -> Self {
        Self {
            run_id,
            target,
            audit,
            steps: RecoveryAction::ALL.into_iter().map(RecoveryStep::pending).collect(),
        }
    }

    fn transition(
        &mut self,
        index: usize,
        next: StepStatus,
        duration_ms: u64,
        details: impl Into<String>,
    ) -> Result<()> {
        if next == StepStatus::InProgress {
            if let Some(open) = self.steps.iter().take(index).find(|s| !s.status.is_terminal()) {
                return Err(RecoveryError::InvariantViolation(format!(
                    "step {} started before step {} finished",
                    index + 1,
                    open.step_number
                )));
            }
        }

        let step = self.steps.get_mut(index).ok_or_else(|| {
            RecoveryError::InvariantViolation(format!("run has no step {}", index + 1))
        })?;
        if !step.status.can_transition_to(next) {
            return Err(RecoveryError::InvariantViolation(format!(
                "step {} cannot move from {} to {}",
                step.step_number, step.status, next
            )));
        }

        step.status = next;
        if next.is_terminal() {
            step.duration_ms = duration_ms;
            step.details = details.into();
        }

        let mut message = format!(
            "run {} target {} step {} {}: {}",
            self.run_id, self.target, step.step_number, step.action, step.status
        );
        if !step.details.is_empty() {
            message.push_str(" (");
            message.push_str(&step.details);
            message.push(')');
        }
        let severity = if next == StepStatus::Failed {
            AuditSeverity::Warning
        } else {
            AuditSeverity::Info
        };
        self.audit
            .log_with_severity(event_types::RECOVERY_STEP, PIPELINE_ACTOR, message, severity);

        debug!(
            run_id = %self.run_id,
            target_name = self.target,
            step = step.step_number,
            action = %step.action,
            status = %step.status,
            "recovery step transition"
        );
        Ok(())
    }

    fn skip_from(&mut self, index: usize, reason: &str) -> Result<()> {
        for i in index..self.steps.len() {
            self.transition(i, StepStatus::Skipped, 0, reason)?;
        }
        Ok(())
    }

    fn into_steps(self) -> Vec<RecoveryStep> {
        self.steps
    }
}

/// Executes recovery runs against a set of collaborators.
#[derive(Debug, Clone)]
pub struct RecoveryPipeline {
    collaborators: RecoveryCollaborators,
    options: RecoveryOptions,
    audit: AuditTrail,
}

impl RecoveryPipeline {
    /// Creates a pipeline with default options.
    #[must_use]
    pub fn new(collaborators: RecoveryCollaborators, audit: AuditTrail) -> Self {
        Self {
            collaborators,
            options: RecoveryOptions::default(),
            audit,
        }
    }

    /// Creates a pipeline with validated options.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::InvalidConfig`] if the options are rejected.
    pub fn with_options(
        collaborators: RecoveryCollaborators,
        options: RecoveryOptions,
        audit: AuditTrail,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            collaborators,
            options,
            audit,
        })
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &RecoveryOptions {
        &self.options
    }

    /// Runs every step for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::InvariantViolation`] if step ordering breaks.
    /// Collaborator failures are reported inside the returned run.
    pub fn execute(&self, target: &str, breaker: &mut CircuitBreaker) -> Result<RecoveryRun> {
        self.execute_with_cancellation(target, breaker, &CancellationFlag::new())
    }

    /// Runs every step for `target`, checking `cancel` before each one.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::InvariantViolation`] if step ordering breaks.
    pub fn execute_with_cancellation(
        &self,
        target: &str,
        breaker: &mut CircuitBreaker,
        cancel: &CancellationFlag,
    ) -> Result<RecoveryRun> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        if !breaker.is_available() {
            warn!(%run_id, target_name = target, "recovery rejected, circuit open");
            let mut step = RecoveryStep::pending(RecoveryAction::CircuitBreakerActivation);
            step.status = StepStatus::Failed;
            step.details = CIRCUIT_OPEN.to_string();
            self.audit.log_with_severity(
                event_types::RECOVERY_STEP,
                PIPELINE_ACTOR,
                format!(
                    "run {run_id} target {target} step {} {}: {} ({CIRCUIT_OPEN})",
                    step.step_number, step.action, step.status
                ),
                AuditSeverity::Warning,
            );
            self.audit.log_with_severity(
                event_types::RECOVERY_RUN,
                PIPELINE_ACTOR,
                format!("run {run_id} target {target}: rejected, {CIRCUIT_OPEN}"),
                AuditSeverity::Warning,
            );
            return Ok(RecoveryRun {
                run_id,
                target: target.to_string(),
                started_at,
                finished_at: Utc::now(),
                steps: vec![step],
                status: RunStatus::Failed,
                failure_reason: Some(CIRCUIT_OPEN.to_string()),
                total_duration_ms: 0,
                recovery_successful: false,
            });
        }

        info!(%run_id, target_name = target, "starting recovery run");
        let mut ledger = StepLedger::new(run_id, target, &self.audit);
        let mut failure_reason = None;
        let mut completed = Vec::with_capacity(RecoveryAction::ALL.len());

        for (index, action) in RecoveryAction::ALL.into_iter().enumerate() {
            if cancel.is_cancelled() {
                ledger.skip_from(index, CANCELED)?;
                failure_reason = Some(CANCELED.to_string());
                break;
            }

            ledger.transition(index, StepStatus::InProgress, 0, "")?;
            let started = Instant::now();
            let outcome = self.perform(action, target, &completed);
            let elapsed = started.elapsed();
            let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

            let outcome = match outcome {
                Ok(_) if elapsed > self.options.step_timeout() => Err(CollaboratorError::Timeout {
                    elapsed_ms: duration_ms,
                    limit_ms: self.options.step_timeout_ms,
                }),
                other => other,
            };

            match outcome {
                Ok(details) => {
                    completed.push(details.clone());
                    ledger.transition(index, StepStatus::Completed, duration_ms, details)?;
                }
                Err(error) => {
                    warn!(%run_id, target_name = target, %action, %error, "recovery step failed");
                    ledger.transition(index, StepStatus::Failed, duration_ms, error.to_string())?;
                    ledger.skip_from(index + 1, "previous step failed")?;
                    failure_reason = Some(format!("{action} failed: {error}"));
                    break;
                }
            }
        }

        let steps = ledger.into_steps();
        let recovery_successful = failure_reason.is_none();
        if recovery_successful {
            breaker.record_success();
        } else {
            breaker.record_failure();
        }

        let run = RecoveryRun {
            run_id,
            target: target.to_string(),
            started_at,
            finished_at: Utc::now(),
            total_duration_ms: steps.iter().map(|s| s.duration_ms).sum(),
            steps,
            status: if recovery_successful {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            },
            failure_reason,
            recovery_successful,
        };
        self.audit_run(&run);
        Ok(run)
    }

    fn audit_run(&self, run: &RecoveryRun) {
        let completed = run.steps_completed();
        let total = run.steps.len();
        match &run.failure_reason {
            None => {
                info!(
                    run_id = %run.run_id,
                    target_name = %run.target,
                    duration_ms = run.total_duration_ms,
                    "recovery run completed"
                );
                self.audit.log(
                    event_types::RECOVERY_RUN,
                    PIPELINE_ACTOR,
                    format!(
                        "run {} target {}: completed {completed}/{total} steps in {} ms",
                        run.run_id, run.target, run.total_duration_ms
                    ),
                );
            }
            Some(reason) => {
                warn!(
                    run_id = %run.run_id,
                    target_name = %run.target,
                    reason = %reason,
                    "recovery run failed"
                );
                self.audit.log_with_severity(
                    event_types::RECOVERY_RUN,
                    PIPELINE_ACTOR,
                    format!(
                        "run {} target {}: failed after {completed}/{total} steps: {reason}",
                        run.run_id, run.target
                    ),
                    AuditSeverity::Warning,
                );
            }
        }
    }

    /// Runs one action. `completed` holds the details of the steps already done.
    fn perform(
        &self,
        action: RecoveryAction,
        target: &str,
        completed: &[String],
    ) -> CollaboratorResult<String> {
        let c = &self.collaborators;
        let o = &self.options;
        match action {
            RecoveryAction::CircuitBreakerActivation => {
                require(c.traffic.isolate(target)?, "traffic isolation refused")?;
                Ok(format!("isolated {target} from traffic"))
            }
            RecoveryAction::RollbackVersion => {
                let rollback = c.deployments.rollback(target, &o.rollback_version)?;
                require(
                    rollback.success,
                    format!("rollback to {} reported failure", o.rollback_version),
                )?;
                if !o.redeploy {
                    return Ok(format!("rolled back to {}", rollback.rolled_back_to));
                }
                let deploy = c
                    .deployments
                    .deploy(target, &rollback.rolled_back_to, o.platform)?;
                require(
                    deploy.success,
                    format!("redeploy of {} on {} reported failure", rollback.rolled_back_to, o.platform),
                )?;
                Ok(format!(
                    "rolled back to {} and redeployed as {} on {}",
                    rollback.rolled_back_to, deploy.deployment_id, o.platform
                ))
            }
            RecoveryAction::RestoreState => {
                require(
                    c.state.restore_checkpoint(target, &o.checkpoint_id)?,
                    format!("checkpoint {} not restored", o.checkpoint_id),
                )?;
                Ok(format!("restored checkpoint {}", o.checkpoint_id))
            }
            RecoveryAction::VerifyHealth => {
                require(c.health.verify(target)?, "health verification failed")?;
                Ok("health verified".to_string())
            }
            RecoveryAction::NotifyTeam => {
                let sent = c.notifier.send_notification(
                    &o.notification_channel,
                    &format!("Recovery executed for {target}"),
                    &format!("Automated recovery of {target}: {}", completed.join("; ")),
                    NotificationSeverity::Warning,
                )?;
                require(sent, format!("notification rejected by {}", o.notification_channel))?;
                Ok(format!("notified {}", o.notification_channel))
            }
        }
    }
}

fn require(ok: bool, reason: impl Into<String>) -> CollaboratorResult<()> {
    if ok {
        Ok(())
    } else {
        Err(CollaboratorError::failed(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{
        DeployOutcome, DeploymentService, HealthVerifier, Notifier, RollbackOutcome, StateStore,
        TrafficGuard,
    };
    use std::sync::Mutex;
    use test_case::test_case;

    #[derive(Debug, Default)]
    struct Fake {
        calls: Mutex<Vec<&'static str>>,
        fail_on: Option<&'static str>,
        error_on: Option<&'static str>,
        delay_on: Option<(&'static str, Duration)>,
        cancel_on: Option<(&'static str, CancellationFlag)>,
        messages: Mutex<Vec<String>>,
    }

    impl Fake {
        fn respond(&self, call: &'static str) -> CollaboratorResult<bool> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }
            if let Some((_, flag)) = self.cancel_on.as_ref().filter(|(c, _)| *c == call) {
                flag.cancel();
            }
            if let Some((_, delay)) = self.delay_on.filter(|(c, _)| *c == call) {
                std::thread::sleep(delay);
            }
            if self.error_on == Some(call) {
                return Err(CollaboratorError::unavailable("connection refused"));
            }
            Ok(self.fail_on != Some(call))
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl TrafficGuard for Fake {
        fn isolate(&self, _target: &str) -> CollaboratorResult<bool> {
            self.respond("isolate")
        }
    }

    impl DeploymentService for Fake {
        fn deploy(&self, _target: &str, version: &str, _platform: Platform) -> CollaboratorResult<DeployOutcome> {
            Ok(DeployOutcome {
                success: self.respond("deploy")?,
                deployment_id: format!("deploy-{version}"),
                url: None,
            })
        }

        fn rollback(&self, _target: &str, version: &str) -> CollaboratorResult<RollbackOutcome> {
            Ok(RollbackOutcome {
                success: self.respond("rollback")?,
                rolled_back_to: version.to_string(),
            })
        }
    }

    impl StateStore for Fake {
        fn restore_checkpoint(&self, _target: &str, _checkpoint_id: &str) -> CollaboratorResult<bool> {
            self.respond("restore_checkpoint")
        }
    }

    impl HealthVerifier for Fake {
        fn verify(&self, _target: &str) -> CollaboratorResult<bool> {
            self.respond("verify")
        }
    }

    impl Notifier for Fake {
        fn send_notification(
            &self,
            _channel: &str,
            _title: &str,
            message: &str,
            _severity: NotificationSeverity,
        ) -> CollaboratorResult<bool> {
            if let Ok(mut messages) = self.messages.lock() {
                messages.push(message.to_string());
            }
            self.respond("send_notification")
        }
    }

    fn collaborators(fake: &Arc<Fake>) -> RecoveryCollaborators {
        RecoveryCollaborators::new(fake.clone(), fake.clone(), fake.clone(), fake.clone(), fake.clone())
    }

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(threshold, chrono::Duration::seconds(60))
            .unwrap_or_else(|e| panic!("valid breaker: {e}"))
    }

    fn statuses(run: &RecoveryRun) -> Vec<StepStatus> {
        run.steps.iter().map(|s| s.status).collect()
    }

    #[test]
    fn successful_run_completes_every_step() {
        let fake = Arc::new(Fake::default());
        let audit = AuditTrail::new();
        let pipeline = RecoveryPipeline::new(collaborators(&fake), audit.clone());
        let mut cb = breaker(10);
        cb.record_failure();

        let run = pipeline
            .execute("PaymentAgent", &mut cb)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert!(run.recovery_successful);
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.steps_completed(), 5);
        assert_eq!(run.actions_taken(), RecoveryAction::ALL.to_vec());
        assert!(run.failed_step().is_none());
        assert!(run.failure_reason.is_none());
        assert_eq!(
            run.steps.iter().map(|s| s.step_number).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        assert_eq!(
            fake.calls(),
            vec!["isolate", "rollback", "restore_checkpoint", "verify", "send_notification"]
        );
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(run.total_duration_ms, run.steps.iter().map(|s| s.duration_ms).sum::<u64>());

        // Two transitions per step plus the run summary.
        assert_eq!(audit.len(), 11);
        assert!(audit.verify_integrity().is_ok());
    }

    #[test_case("isolate", 1 ; "isolation refused")]
    #[test_case("rollback", 2 ; "rollback failed")]
    #[test_case("restore_checkpoint", 3 ; "restore failed")]
    #[test_case("verify", 4 ; "verification failed")]
    #[test_case("send_notification", 5 ; "notification rejected")]
    fn failure_skips_remaining_steps(call: &'static str, failed_step: u8) {
        let fake = Arc::new(Fake {
            fail_on: Some(call),
            ..Fake::default()
        });
        let pipeline = RecoveryPipeline::new(collaborators(&fake), AuditTrail::new());
        let mut cb = breaker(10);

        let run = pipeline
            .execute("PaymentAgent", &mut cb)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert!(!run.recovery_successful);
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.failed_step().map(|s| s.step_number), Some(failed_step));
        assert_eq!(run.steps_completed(), usize::from(failed_step - 1));
        assert_eq!(
            run.steps.iter().filter(|s| s.status == StepStatus::Skipped).count(),
            usize::from(5 - failed_step)
        );
        assert_eq!(fake.calls().len(), usize::from(failed_step));
        assert_eq!(fake.calls().last().copied(), Some(call));
        assert_eq!(cb.failure_count(), 1);
    }

    #[test]
    fn rollback_failure_leaves_expected_statuses() {
        let fake = Arc::new(Fake {
            fail_on: Some("rollback"),
            ..Fake::default()
        });
        let pipeline = RecoveryPipeline::new(collaborators(&fake), AuditTrail::new());
        let mut cb = breaker(10);

        let run = pipeline
            .execute("PaymentAgent", &mut cb)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert_eq!(
            statuses(&run),
            vec![
                StepStatus::Completed,
                StepStatus::Failed,
                StepStatus::Skipped,
                StepStatus::Skipped,
                StepStatus::Skipped,
            ]
        );
        assert!(run
            .failure_reason
            .as_deref()
            .is_some_and(|r| r.starts_with("rollback_version failed")));
    }

    #[test]
    fn collaborator_error_becomes_failed_step() {
        let fake = Arc::new(Fake {
            error_on: Some("verify"),
            ..Fake::default()
        });
        let pipeline = RecoveryPipeline::new(collaborators(&fake), AuditTrail::new());
        let mut cb = breaker(10);

        let run = pipeline
            .execute("PaymentAgent", &mut cb)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        let failed = run.failed_step().map(|s| (s.action, s.details.clone()));
        assert_eq!(
            failed,
            Some((RecoveryAction::VerifyHealth, "unavailable: connection refused".to_string()))
        );
        assert_eq!(cb.failure_count(), 1);
    }

    #[test]
    fn open_breaker_fails_fast() {
        let fake = Arc::new(Fake::default());
        let audit = AuditTrail::new();
        let pipeline = RecoveryPipeline::new(collaborators(&fake), audit.clone());
        let mut cb = breaker(1);
        cb.record_failure();

        let run = pipeline
            .execute("PaymentAgent", &mut cb)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert_eq!(run.steps.len(), 1);
        assert_eq!(run.steps[0].status, StepStatus::Failed);
        assert_eq!(run.steps[0].details, CIRCUIT_OPEN);
        assert_eq!(run.failure_reason.as_deref(), Some(CIRCUIT_OPEN));
        assert!(fake.calls().is_empty());
        assert_eq!(cb.failure_count(), 1);

        let entries = audit.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type(), event_types::RECOVERY_STEP);
        assert_eq!(entries[0].severity(), AuditSeverity::Warning);
        assert!(entries[0].details().contains("step 1 circuit_breaker_activation: failed (circuit open)"));
        assert_eq!(entries[1].event_type(), event_types::RECOVERY_RUN);
        assert!(audit.verify_integrity().is_ok());
    }

    #[test]
    fn repeated_failures_open_the_breaker() {
        let fake = Arc::new(Fake {
            fail_on: Some("restore_checkpoint"),
            ..Fake::default()
        });
        let pipeline = RecoveryPipeline::new(collaborators(&fake), AuditTrail::new());
        let mut cb = breaker(2);

        for _ in 0..2 {
            let run = pipeline
                .execute("PaymentAgent", &mut cb)
                .unwrap_or_else(|e| panic!("run failed: {e}"));
            assert_eq!(run.steps.len(), 5);
        }
        assert_eq!(cb.state(), crate::CircuitState::Open);

        let rejected = pipeline
            .execute("PaymentAgent", &mut cb)
            .unwrap_or_else(|e| panic!("run failed: {e}"));
        assert_eq!(rejected.failure_reason.as_deref(), Some(CIRCUIT_OPEN));
        assert_eq!(fake.calls().len(), 6);
    }

    #[test]
    fn cancellation_before_start_skips_everything() {
        let fake = Arc::new(Fake::default());
        let pipeline = RecoveryPipeline::new(collaborators(&fake), AuditTrail::new());
        let mut cb = breaker(10);
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let run = pipeline
            .execute_with_cancellation("PaymentAgent", &mut cb, &cancel)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert!(run.steps.iter().all(|s| s.status == StepStatus::Skipped));
        assert_eq!(run.failure_reason.as_deref(), Some(CANCELED));
        assert!(fake.calls().is_empty());
        assert_eq!(cb.failure_count(), 1);
    }

    #[test]
    fn cancellation_is_honoured_between_steps() {
        let cancel = CancellationFlag::new();
        let fake = Arc::new(Fake {
            cancel_on: Some(("isolate", cancel.clone())),
            ..Fake::default()
        });
        let pipeline = RecoveryPipeline::new(collaborators(&fake), AuditTrail::new());
        let mut cb = breaker(10);

        let run = pipeline
            .execute_with_cancellation("PaymentAgent", &mut cb, &cancel)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert_eq!(run.steps[0].status, StepStatus::Completed);
        assert!(run.steps[1..].iter().all(|s| s.status == StepStatus::Skipped));
        assert_eq!(fake.calls(), vec!["isolate"]);
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[test]
    fn slow_step_times_out() {
        let fake = Arc::new(Fake {
            delay_on: Some(("verify", Duration::from_millis(120))),
            ..Fake::default()
        });
        let options = RecoveryOptions::new().with_step_timeout_ms(50);
        let pipeline = RecoveryPipeline::with_options(collaborators(&fake), options, AuditTrail::new())
            .unwrap_or_else(|e| panic!("valid options: {e}"));
        let mut cb = breaker(10);

        let run = pipeline
            .execute("PaymentAgent", &mut cb)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        let failed = run.failed_step().cloned();
        assert!(failed.is_some_and(|s| s.action == RecoveryAction::VerifyHealth
            && s.details.starts_with("timed out")
            && s.duration_ms >= 120));
        assert!(!fake.calls().contains(&"send_notification"));
    }

    #[test]
    fn redeploy_follows_rollback() {
        let fake = Arc::new(Fake::default());
        let options = RecoveryOptions::new()
            .with_rollback_version("v41")
            .with_redeploy(Platform::Kubernetes);
        let pipeline = RecoveryPipeline::with_options(collaborators(&fake), options, AuditTrail::new())
            .unwrap_or_else(|e| panic!("valid options: {e}"));
        let mut cb = breaker(10);

        let run = pipeline
            .execute("PaymentAgent", &mut cb)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert!(run.recovery_successful);
        assert_eq!(&fake.calls()[1..3], &["rollback", "deploy"]);
        assert!(run.steps[1].details.contains("deploy-v41"));

        let messages = fake.messages.lock().map(|m| m.clone()).unwrap_or_default();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("redeployed as deploy-v41 on kubernetes"));
    }

    #[test]
    fn notification_reports_completed_steps() {
        let fake = Arc::new(Fake::default());
        let options = RecoveryOptions::new()
            .with_rollback_version("v7")
            .with_checkpoint_id("cp-9");
        let pipeline = RecoveryPipeline::with_options(collaborators(&fake), options, AuditTrail::new())
            .unwrap_or_else(|e| panic!("valid options: {e}"));
        let mut cb = breaker(10);

        let run = pipeline
            .execute("PaymentAgent", &mut cb)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert!(run.recovery_successful);
        let messages = fake.messages.lock().map(|m| m.clone()).unwrap_or_default();
        assert_eq!(
            messages,
            vec![
                "Automated recovery of PaymentAgent: isolated PaymentAgent from traffic; \
                 rolled back to v7; restored checkpoint cp-9; health verified"
                    .to_string()
            ]
        );
        assert!(!messages[0].contains("redeploy"));
    }

    #[test_case(RecoveryOptions::new().with_step_timeout_ms(0) ; "zero timeout")]
    #[test_case(RecoveryOptions::new().with_checkpoint_id(" ") ; "blank checkpoint")]
    #[test_case(RecoveryOptions::new().with_notification_channel("") ; "empty channel")]
    fn invalid_options_rejected(options: RecoveryOptions) {
        let fake = Arc::new(Fake::default());
        assert!(matches!(
            RecoveryPipeline::with_options(collaborators(&fake), options, AuditTrail::new()),
            Err(RecoveryError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn ledger_rejects_out_of_order_transitions() {
        let audit = AuditTrail::new();
        let mut ledger = StepLedger::new(Uuid::nil(), "PaymentAgent", &audit);

        assert!(matches!(
            ledger.transition(2, StepStatus::InProgress, 0, ""),
            Err(RecoveryError::InvariantViolation(_))
        ));
        assert!(matches!(
            ledger.transition(0, StepStatus::Completed, 0, "done"),
            Err(RecoveryError::InvariantViolation(_))
        ));
        assert!(ledger.transition(7, StepStatus::Skipped, 0, "").is_err());
        assert!(audit.is_empty());

        assert!(ledger.transition(0, StepStatus::InProgress, 0, "").is_ok());
        assert!(ledger.transition(0, StepStatus::Completed, 3, "done").is_ok());
        assert!(ledger.transition(0, StepStatus::Failed, 0, "again").is_err());
        assert!(ledger.transition(1, StepStatus::InProgress, 0, "").is_ok());
        assert_eq!(audit.len(), 3);
    }

    #[test]
    fn run_serializes_to_json() {
        let fake = Arc::new(Fake::default());
        let pipeline = RecoveryPipeline::new(collaborators(&fake), AuditTrail::new());
        let mut cb = breaker(10);
        let run = pipeline
            .execute("PaymentAgent", &mut cb)
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        let json = serde_json::to_value(&run).unwrap_or_default();
        assert_eq!(json["recovery_successful"], serde_json::json!(true));
        assert_eq!(json["steps"][0]["action"], serde_json::json!("circuit_breaker_activation"));
        assert_eq!(json["steps"][4]["status"], serde_json::json!("completed"));
    }
}

//! External collaborators invoked by recovery steps.
//!
//! Each trait is a seam to infrastructure the engine does not own. Calls are
//! synchronous; the pipeline measures each one against its step timeout.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CollaboratorResult;

/// Deployment platform for a redeploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Managed container service.
    #[default]
    CloudRun,
    /// Kubernetes cluster.
    Kubernetes,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CloudRun => write!(f, "cloud_run"),
            Self::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

/// Outcome of a deploy call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployOutcome {
    /// Whether the deploy succeeded.
    pub success: bool,
    /// Identifier assigned by the platform.
    pub deployment_id: String,
    /// Service URL, if the platform reports one.
    pub url: Option<String>,
}

/// Outcome of a rollback call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackOutcome {
    /// Whether the rollback succeeded.
    pub success: bool,
    /// Version now serving traffic.
    pub rolled_back_to: String,
}

/// Severity attached to a team notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    /// Informational.
    Info,
    /// Needs a look.
    Warning,
    /// Needs action now.
    Critical,
}

/// Cuts a target off from live traffic.
pub trait TrafficGuard: Send + Sync + fmt::Debug {
    /// Isolates `target`; returns false if isolation was refused.
    fn isolate(&self, target: &str) -> CollaboratorResult<bool>;
}

/// Deploys and rolls back agent versions.
pub trait DeploymentService: Send + Sync + fmt::Debug {
    /// Deploys `version` of `target` to `platform`.
    fn deploy(&self, target: &str, version: &str, platform: Platform) -> CollaboratorResult<DeployOutcome>;

    /// Rolls `target` back to `version`.
    fn rollback(&self, target: &str, version: &str) -> CollaboratorResult<RollbackOutcome>;
}

/// Restores persisted agent state.
pub trait StateStore: Send + Sync + fmt::Debug {
    /// Restores `target` from `checkpoint_id`; returns false if no such checkpoint.
    fn restore_checkpoint(&self, target: &str, checkpoint_id: &str) -> CollaboratorResult<bool>;
}

/// Confirms a target is healthy after recovery.
pub trait HealthVerifier: Send + Sync + fmt::Debug {
    /// Returns true if `target` is healthy.
    fn verify(&self, target: &str) -> CollaboratorResult<bool>;
}

/// Delivers messages to the owning team.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Sends a notification; returns false if the channel rejected it.
    fn send_notification(
        &self,
        channel: &str,
        title: &str,
        message: &str,
        severity: NotificationSeverity,
    ) -> CollaboratorResult<bool>;
}

/// The set of collaborators one pipeline calls into.
#[derive(Debug, Clone)]
pub struct RecoveryCollaborators {
    /// Used by the circuit breaker activation step.
    pub traffic: Arc<dyn TrafficGuard>,
    /// Used by the rollback step.
    pub deployments: Arc<dyn DeploymentService>,
    /// Used by the state restore step.
    pub state: Arc<dyn StateStore>,
    /// Used by the health verification step.
    pub health: Arc<dyn HealthVerifier>,
    /// Used by the notification step.
    pub notifier: Arc<dyn Notifier>,
}

impl RecoveryCollaborators {
    /// Bundles the collaborators.
    #[must_use]
    pub fn new(
        traffic: Arc<dyn TrafficGuard>,
        deployments: Arc<dyn DeploymentService>,
        state: Arc<dyn StateStore>,
        health: Arc<dyn HealthVerifier>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            traffic,
            deployments,
            state,
            health,
            notifier,
        }
    }
}

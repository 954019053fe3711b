//! Severity-based recovery recommendations.
//!
//! A plan is advisory. Runs always walk [`RecoveryAction::ALL`] in order; the plan
//! tells an operator how much of that is warranted for an incident.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::RecoveryAction;

/// How bad an incident is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    /// Nothing needs doing yet.
    #[default]
    Low,
    /// Degraded.
    Medium,
    /// Failing.
    High,
    /// Failing and needs people.
    Critical,
}

impl IncidentSeverity {
    /// Parses a lowercase severity name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

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

    /// Returns the recommended actions for this severity, in order.
    #[must_use]
    pub fn recovery_plan(self) -> Vec<PlanAction> {
        use PlanAction::{CircuitBreaker, Escalate, Log, Monitor, Notify, Restore, Rollback};
        match self {
            Self::Low => vec![Monitor, Log],
            Self::Medium => vec![CircuitBreaker, Monitor],
            Self::High => vec![CircuitBreaker, Rollback, Restore, Notify],
            Self::Critical => vec![CircuitBreaker, Rollback, Restore, Notify, Escalate],
        }
    }
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recommended action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Keep watching.
    Monitor,
    /// Record the incident.
    Log,
    /// Isolate the target.
    CircuitBreaker,
    /// Roll back to the last good version.
    Rollback,
    /// Restore state from a checkpoint.
    Restore,
    /// Tell the owning team.
    Notify,
    /// Page a human.
    Escalate,
}

impl PlanAction {
    /// Returns the pipeline step that carries out this action, if any.
    #[must_use]
    pub const fn recovery_action(self) -> Option<RecoveryAction> {
        match self {
            Self::CircuitBreaker => Some(RecoveryAction::CircuitBreakerActivation),
            Self::Rollback => Some(RecoveryAction::RollbackVersion),
            Self::Restore => Some(RecoveryAction::RestoreState),
            Self::Notify => Some(RecoveryAction::NotifyTeam),
            Self::Monitor | Self::Log | Self::Escalate => None,
        }
    }
}

/// Returns the plan for a severity name; unknown names get `[monitor]`.
#[must_use]
pub fn build_recovery_plan(severity: &str) -> Vec<PlanAction> {
    IncidentSeverity::parse(severity).map_or_else(
        || vec![PlanAction::Monitor],
        IncidentSeverity::recovery_plan,
    )
}

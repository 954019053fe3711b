//! Error types for guardian-orchestrator.

use guardian_observe::ObserveError;
use guardian_recovery::RecoveryError;
use thiserror::Error;

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, GuardianError>;

/// A configuration rejected at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A numeric threshold is out of range.
    #[error("invalid threshold {name}: {reason}")]
    InvalidThreshold {
        /// Setting that was rejected.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A policy (extraction, metric list) is unusable.
    #[error("invalid policy: {reason}")]
    InvalidPolicy {
        /// Why the policy was rejected.
        reason: String,
    },

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {reason}")]
    Parse {
        /// Parser message.
        reason: String,
    },

    /// Anomaly or pattern settings were rejected.
    #[error(transparent)]
    Observe(#[from] ObserveError),

    /// Breaker or pipeline settings were rejected.
    #[error(transparent)]
    Recovery(#[from] RecoveryError),
}

impl ConfigError {
    /// Shorthand for a [`ConfigError::InvalidThreshold`].
    #[must_use]
    pub fn invalid_threshold(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidThreshold {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`ConfigError::InvalidPolicy`].
    #[must_use]
    pub fn invalid_policy(reason: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Error)]
pub enum GuardianError {
    /// Invalid configuration; fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// An internal ordering rule was broken.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A metrics or trace source failed a request that has no fallback.
    #[error("source error: {0}")]
    Source(#[from] ObserveError),

    /// A response could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RecoveryError> for GuardianError {
    fn from(err: RecoveryError) -> Self {
        match err {
            RecoveryError::InvariantViolation(reason) => Self::InvariantViolation(reason),
            other @ RecoveryError::InvalidConfig { .. } => {
                Self::Configuration(ConfigError::Recovery(other))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_violation_keeps_its_kind() {
        let err = GuardianError::from(RecoveryError::InvariantViolation("step 2 before step 1".into()));
        assert!(matches!(err, GuardianError::InvariantViolation(ref r) if r == "step 2 before step 1"));
    }

    #[test]
    fn recovery_config_error_is_configuration() {
        let err = GuardianError::from(RecoveryError::invalid_config("step_timeout_ms must be positive"));
        assert!(matches!(err, GuardianError::Configuration(ConfigError::Recovery(_))));
        assert_eq!(
            err.to_string(),
            "configuration error: invalid configuration: step_timeout_ms must be positive"
        );
    }

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::invalid_threshold("cpu_threshold_percent", "must lie in (0, 100]").to_string(),
            "invalid threshold cpu_threshold_percent: must lie in (0, 100]"
        );
    }
}

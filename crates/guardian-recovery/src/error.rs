//! Error types for guardian-recovery.

use thiserror::Error;

/// Errors returned by the recovery engine itself.
///
/// Collaborator failures are not errors at this level: they become failed steps
/// in the returned [`RecoveryRun`](crate::RecoveryRun).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecoveryError {
    /// A step transition broke the ordering rules of a run.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The breaker or pipeline was configured with unusable values.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },
}

impl RecoveryError {
    /// Shorthand for an [`RecoveryError::InvalidConfig`].
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Result type for recovery operations.
pub type Result<T> = std::result::Result<T, RecoveryError>;

/// Failure reported by an external recovery collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The collaborator ran and reported a failure.
    #[error("{reason}")]
    Failed {
        /// What went wrong.
        reason: String,
    },

    /// The call exceeded the step timeout.
    #[error("timed out after {elapsed_ms} ms (limit {limit_ms} ms)")]
    Timeout {
        /// How long the call took.
        elapsed_ms: u64,
        /// The configured step timeout.
        limit_ms: u64,
    },

    /// The collaborator could not be reached.
    #[error("unavailable: {reason}")]
    Unavailable {
        /// Why it could not be reached.
        reason: String,
    },
}

impl CollaboratorError {
    /// Shorthand for a [`CollaboratorError::Failed`].
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`CollaboratorError::Unavailable`].
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Result type for collaborator calls.
pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            RecoveryError::InvariantViolation("step 3 started before step 2 finished".into())
                .to_string(),
            "invariant violation: step 3 started before step 2 finished"
        );
        assert_eq!(
            CollaboratorError::Timeout {
                elapsed_ms: 31_000,
                limit_ms: 30_000
            }
            .to_string(),
            "timed out after 31000 ms (limit 30000 ms)"
        );
        assert_eq!(CollaboratorError::failed("checkpoint missing").to_string(), "checkpoint missing");
    }
}

//! Error types for guardian-observe.

use thiserror::Error;

/// Errors that can occur while evaluating observations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserveError {
    /// An evaluator was configured with unusable thresholds.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// A metrics or trace source could not serve the request.
    #[error("source unavailable: {reason}")]
    SourceUnavailable {
        /// The reason reported by the source.
        reason: String,
    },
}

impl ObserveError {
    /// Shorthand for an [`ObserveError::InvalidConfig`].
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`ObserveError::SourceUnavailable`].
    #[must_use]
    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            reason: reason.into(),
        }
    }
}

/// Result type for observe operations.
pub type Result<T> = std::result::Result<T, ObserveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            ObserveError::invalid_config("cut points must increase").to_string(),
            "invalid configuration: cut points must increase"
        );
        assert_eq!(
            ObserveError::source_unavailable("metrics store offline").to_string(),
            "source unavailable: metrics store offline"
        );
    }
}

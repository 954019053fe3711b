//! Error types for the audit trail.

use thiserror::Error;

/// Errors that can occur while reading or exporting the audit trail.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The trail no longer satisfies its append-only contract.
    ///
    /// This is a programming error, never a recoverable condition.
    #[error("audit invariant violated: {0}")]
    InvariantViolation(String),

    /// Failed to serialize entries for export.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;

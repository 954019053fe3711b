//! Audit entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Well-known event types written by the engine.
///
/// The trail accepts any event type string; these are the ones the engine itself
/// emits, collected here so exporters can filter on them.
pub mod event_types {
    /// A recovery step started or reached a terminal status.
    pub const RECOVERY_STEP: &str = "recovery_step";
    /// A recovery run finished.
    pub const RECOVERY_RUN: &str = "recovery_run";
    /// A health evaluation completed.
    pub const HEALTH_CHECK: &str = "health_check_completed";
    /// An anomaly was detected against a learned baseline.
    pub const ANOMALY_DETECTED: &str = "anomaly_detected";
    /// A reliability report was generated.
    pub const REPORT_GENERATED: &str = "report_generated";
    /// A trace window was analyzed.
    pub const TRACE_ANALYSIS: &str = "trace_analysis_completed";
    /// No target name could be extracted from a request.
    pub const TARGET_UNRESOLVED: &str = "target_unresolved";
}

/// Identifier of an audit entry.
///
/// Ids are allocated by the trail, start at 1, and strictly increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditEventId(u64);

impl AuditEventId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AuditEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt_{:08}", self.0)
    }
}

/// Severity attached to an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    /// Routine operational event.
    #[default]
    Info,
    /// Something ambiguous or degraded that a reviewer should be able to trace.
    Warning,
    /// A failure that required or triggered intervention.
    Critical,
}

impl AuditSeverity {
    /// Returns the string representation of this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable record in the audit trail.
///
/// Fields are private so an entry cannot be altered after the trail hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    event_id: AuditEventId,
    timestamp: DateTime<Utc>,
    event_type: String,
    actor: String,
    details: String,
    severity: AuditSeverity,
}

impl AuditEntry {
    pub(crate) fn new(
        event_id: AuditEventId,
        timestamp: DateTime<Utc>,
        event_type: String,
        actor: String,
        details: String,
        severity: AuditSeverity,
    ) -> Self {
        Self {
            event_id,
            timestamp,
            event_type,
            actor,
            details,
            severity,
        }
    }

    /// Returns the entry id.
    #[must_use]
    pub const fn event_id(&self) -> AuditEventId {
        self.event_id
    }

    /// Returns when the entry was appended.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the event type.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Returns the actor that produced the event.
    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Returns the free-text details.
    #[must_use]
    pub fn details(&self) -> &str {
        &self.details
    }

    /// Returns the severity.
    #[must_use]
    pub const fn severity(&self) -> AuditSeverity {
        self.severity
    }

    /// Serializes the entry to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

//! Audit sinks.
//!
//! A sink receives every entry right after the trail appends it. The trail itself
//! is the record of truth; sinks forward entries to logs, files, or a database.

use std::fmt;

use crate::events::{AuditEntry, AuditSeverity};

/// Trait for audit forwarding backends.
///
/// Implementations must not block for long: the sink runs on the caller's thread
/// right after the append.
pub trait AuditSink: Send + Sync + fmt::Debug {
    /// Forwards one appended entry.
    fn record(&self, entry: &AuditEntry);
}

/// Sink that emits entries through `tracing`.
///
/// Entries are logged at a level matching their severity:
/// - Info → `tracing::info!`
/// - Warning → `tracing::warn!`
/// - Critical → `tracing::error!`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    /// Creates a new tracing sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditEntry) {
        let event_id = entry.event_id();
        let event_type = entry.event_type();
        let actor = entry.actor();
        let details = entry.details();
        let timestamp = entry.timestamp();

        match entry.severity() {
            AuditSeverity::Info => {
                tracing::info!(
                    target: "guardian_audit",
                    %event_id,
                    %event_type,
                    %actor,
                    %timestamp,
                    "[AUDIT] {details}"
                );
            }
            AuditSeverity::Warning => {
                tracing::warn!(
                    target: "guardian_audit",
                    %event_id,
                    %event_type,
                    %actor,
                    %timestamp,
                    "[AUDIT] {details}"
                );
            }
            AuditSeverity::Critical => {
                tracing::error!(
                    target: "guardian_audit",
                    %event_id,
                    %event_type,
                    %actor,
                    %timestamp,
                    "[AUDIT] {details}"
                );
            }
        }
    }
}

/// A sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl NoopAuditSink {
    /// Creates a new no-op sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AuditSink for NoopAuditSink {
    fn record(&self, _entry: &AuditEntry) {}
}

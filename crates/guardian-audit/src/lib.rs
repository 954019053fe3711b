//! # guardian-audit
//!
//! Append-only audit trail for Agent Reliability Guardian.
//!
//! Every operational event the engine takes (recovery step transitions, anomaly
//! findings, unresolved targets) is appended here with a strictly increasing id.
//! Entries are never edited or removed; retention and durable storage belong to
//! whatever [`AuditSink`] the embedding process installs.
//!
//! ## Features
//!
//! - [`AuditTrail`]: Shared, cloneable handle to the in-process log
//! - [`AuditEntry`]: One immutable event record
//! - [`AuditSink`]: Pluggable forwarder for appended entries
//! - [`TracingAuditSink`]: Default sink emitting through `tracing`
//!
//! ## Example
//!
//! ```rust
//! use guardian_audit::{AuditSeverity, AuditTrail};
//!
//! let trail = AuditTrail::new();
//! let first = trail.log("recovery_step", "recovery_pipeline", "step 1 started");
//! let second = trail.log_with_severity(
//!     "target_unresolved",
//!     "orchestrator",
//!     "no target name in request",
//!     AuditSeverity::Warning,
//! );
//!
//! assert!(second > first);
//! assert_eq!(trail.entries().len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod sink;
pub mod trail;

pub use error::{AuditError, Result};
pub use events::{event_types, AuditEntry, AuditEventId, AuditSeverity};
pub use sink::{AuditSink, NoopAuditSink, TracingAuditSink};
pub use trail::{AuditSummary, AuditTrail};

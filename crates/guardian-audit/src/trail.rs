//! The append-only audit trail.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};
use crate::events::{AuditEntry, AuditEventId, AuditSeverity};
use crate::sink::{AuditSink, TracingAuditSink};

#[derive(Debug, Default)]
struct TrailState {
    entries: Vec<AuditEntry>,
    last_id: u64,
}

/// Shared handle to the process audit log.
///
/// Cloning is cheap and every clone appends to the same log. Appends are
/// serialized by a single writer lock, and ids are allocated under that lock, so
/// concurrent callers never observe duplicate or out-of-order ids. Readers get an
/// owned snapshot and never see a half-written entry.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    state: Arc<RwLock<TrailState>>,
    sink: Arc<dyn AuditSink>,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditTrail {
    /// Creates an empty trail forwarding to [`TracingAuditSink`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingAuditSink::new()))
    }

    /// Creates an empty trail forwarding to the given sink.
    #[must_use]
    pub fn with_sink(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            state: Arc::new(RwLock::new(TrailState::default())),
            sink,
        }
    }

    /// Appends an info-level entry and returns its id.
    pub fn log(
        &self,
        event_type: impl Into<String>,
        actor: impl Into<String>,
        details: impl Into<String>,
    ) -> AuditEventId {
        self.log_with_severity(event_type, actor, details, AuditSeverity::Info)
    }

    /// Appends an entry with an explicit severity and returns its id.
    pub fn log_with_severity(
        &self,
        event_type: impl Into<String>,
        actor: impl Into<String>,
        details: impl Into<String>,
        severity: AuditSeverity,
    ) -> AuditEventId {
        let entry = {
            let mut state = self.state.write();
            state.last_id += 1;

            // Wall clocks can step backwards; entries must stay timestamp-ordered.
            let now = Utc::now();
            let timestamp = state
                .entries
                .last()
                .map_or(now, |last| last.timestamp().max(now));

            let entry = AuditEntry::new(
                AuditEventId::new(state.last_id),
                timestamp,
                event_type.into(),
                actor.into(),
                details.into(),
                severity,
            );
            state.entries.push(entry.clone());
            entry
        };

        self.sink.record(&entry);
        entry.event_id()
    }

    /// Returns a snapshot of every entry, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.state.read().entries.clone()
    }

    /// Returns a snapshot of the entries appended after `id`.
    #[must_use]
    pub fn entries_since(&self, id: AuditEventId) -> Vec<AuditEntry> {
        let state = self.state.read();
        // Ids are dense and start at 1, so the entry with id n sits at index n - 1.
        let start = usize::try_from(id.get()).unwrap_or(usize::MAX);
        state.entries.get(start..).map(<[AuditEntry]>::to_vec).unwrap_or_default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns true if nothing has been logged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Summarizes the trail, keeping the `recent` newest entries verbatim.
    #[must_use]
    pub fn summary(&self, recent: usize) -> AuditSummary {
        let state = self.state.read();
        let mut summary = AuditSummary {
            total_entries: state.entries.len(),
            ..AuditSummary::default()
        };

        for entry in &state.entries {
            match entry.severity() {
                AuditSeverity::Info => {}
                AuditSeverity::Warning => summary.warning_entries += 1,
                AuditSeverity::Critical => summary.critical_entries += 1,
            }
            match summary
                .event_types
                .iter_mut()
                .find(|(name, _)| name == entry.event_type())
            {
                Some((_, count)) => *count += 1,
                None => summary.event_types.push((entry.event_type().to_string(), 1)),
            }
        }

        let skip = state.entries.len().saturating_sub(recent);
        summary.recent = state.entries[skip..].to_vec();
        summary
    }

    /// Checks that ids and timestamps strictly follow append order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvariantViolation`] if an id repeats, goes backwards,
    /// or a timestamp precedes the one before it.
    pub fn verify_integrity(&self) -> Result<()> {
        let state = self.state.read();
        for pair in state.entries.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.event_id() <= prev.event_id() {
                return Err(AuditError::InvariantViolation(format!(
                    "event id {} follows {}",
                    next.event_id(),
                    prev.event_id()
                )));
            }
            if next.timestamp() < prev.timestamp() {
                return Err(AuditError::InvariantViolation(format!(
                    "event {} is timestamped before {}",
                    next.event_id(),
                    prev.event_id()
                )));
            }
        }
        Ok(())
    }

    /// Exports the full trail as a JSON array after verifying its integrity.
    ///
    /// # Errors
    ///
    /// Returns an error if the integrity check or serialization fails.
    pub fn export_json(&self) -> Result<String> {
        self.verify_integrity()?;
        Ok(serde_json::to_string_pretty(&self.entries())?)
    }
}

/// Aggregate view of the trail for reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    /// Number of entries in the trail.
    pub total_entries: usize,
    /// Entries logged at warning severity.
    pub warning_entries: usize,
    /// Entries logged at critical severity.
    pub critical_entries: usize,
    /// Entry count per event type, in first-seen order.
    pub event_types: Vec<(String, usize)>,
    /// The newest entries, oldest first.
    pub recent: Vec<AuditEntry>,
}

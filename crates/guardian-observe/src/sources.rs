//! Collaborators that feed the evaluators.
//!
//! Metric values, traces, and baselines always come from outside the core.
//! Implementations must be safe to share across the monitor path's worker threads.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use parking_lot::RwLock;
use tracing::debug;

use crate::anomaly::BaselineStats;
use crate::error::Result;
use crate::patterns::TraceRecord;
use crate::types::MetricObservation;

/// Supplies recent metric observations for a target.
pub trait MetricsSource: Send + Sync + fmt::Debug {
    /// Returns observations of `metric` for `target` within `window`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ObserveError::SourceUnavailable`](crate::ObserveError::SourceUnavailable)
    /// if the backing store cannot be queried.
    fn get_recent_observations(
        &self,
        target: &str,
        metric: &str,
        window: Duration,
    ) -> Result<Vec<MetricObservation>>;
}

/// Supplies learned baselines and receives observations to learn from.
pub trait BaselineProvider: Send + Sync + fmt::Debug {
    /// Returns the baseline for `metric`, if one has been learned.
    fn get_baseline(&self, metric: &str) -> Option<BaselineStats>;

    /// Hands a scored observation to the learner.
    fn record_observation(&self, metric: &str, value: f64);
}

/// Supplies recent request traces for a target.
pub trait TraceSource: Send + Sync + fmt::Debug {
    /// Returns traces for `target` within `window`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ObserveError::SourceUnavailable`](crate::ObserveError::SourceUnavailable)
    /// if the backing store cannot be queried.
    fn get_recent_traces(&self, target: &str, window: Duration) -> Result<Vec<TraceRecord>>;
}

/// Values kept per metric by [`StaticBaselineProvider`] unless configured.
pub const DEFAULT_RECORDED_CAPACITY: usize = 100;

/// Baseline provider over a fixed set of baselines.
///
/// Recorded observations never alter the baselines. Only the newest
/// `capacity` values per metric are kept.
#[derive(Debug, Clone)]
pub struct StaticBaselineProvider {
    baselines: Arc<HashMap<String, BaselineStats>>,
    recorded: Arc<RwLock<HashMap<String, VecDeque<f64>>>>,
    capacity: usize,
}

impl Default for StaticBaselineProvider {
    fn default() -> Self {
        Self::new([])
    }
}

impl StaticBaselineProvider {
    /// Creates a provider serving the given baselines, keyed by their metric.
    #[must_use]
    pub fn new(baselines: impl IntoIterator<Item = BaselineStats>) -> Self {
        Self {
            baselines: Arc::new(
                baselines
                    .into_iter()
                    .map(|b| (b.metric.clone(), b))
                    .collect(),
            ),
            recorded: Arc::default(),
            capacity: DEFAULT_RECORDED_CAPACITY,
        }
    }

    /// Keeps at most `capacity` recorded values per metric (minimum 1).
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Returns the recorded values still held for `metric`, oldest first.
    #[must_use]
    pub fn recorded(&self, metric: &str) -> Vec<f64> {
        self.recorded
            .read()
            .get(metric)
            .map(|values| values.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl BaselineProvider for StaticBaselineProvider {
    fn get_baseline(&self, metric: &str) -> Option<BaselineStats> {
        self.baselines.get(metric).cloned()
    }

    fn record_observation(&self, metric: &str, value: f64) {
        let mut recorded = self.recorded.write();
        let values = recorded.entry(metric.to_string()).or_default();
        values.push_back(value);
        while values.len() > self.capacity {
            values.pop_front();
        }
        debug!(metric, value, samples = values.len(), "recorded observation");
    }
}

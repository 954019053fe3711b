//! Per-target state.
//!
//! Each target owns one circuit breaker and one rolling observation window,
//! guarded by its own mutex so work on different targets never contends. The
//! registry map itself is only write-locked to insert a new target.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use guardian_observe::MetricObservation;
use guardian_recovery::CircuitBreaker;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

/// Rolling window of observations, bounded per metric.
#[derive(Debug, Clone)]
pub struct MetricsWindow {
    capacity: usize,
    series: BTreeMap<String, VecDeque<MetricObservation>>,
}

impl MetricsWindow {
    /// Creates a window keeping up to `capacity` observations per metric.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: BTreeMap::new(),
        }
    }

    /// Appends observations newer than the latest one held for their metric,
    /// evicting the oldest beyond capacity. Returns how many were appended.
    pub fn extend(&mut self, observations: &[MetricObservation]) -> usize {
        let mut appended = 0;
        for obs in observations {
            let series = self.series.entry(obs.metric.clone()).or_default();
            if series.back().is_some_and(|last| last.timestamp >= obs.timestamp) {
                continue;
            }
            series.push_back(obs.clone());
            while series.len() > self.capacity {
                series.pop_front();
            }
            appended += 1;
        }
        appended
    }

    /// Returns the newest observation of `metric`.
    #[must_use]
    pub fn latest(&self, metric: &str) -> Option<&MetricObservation> {
        self.series.get(metric).and_then(VecDeque::back)
    }

    /// Returns the held observations of `metric`, oldest first.
    #[must_use]
    pub fn history(&self, metric: &str) -> Vec<MetricObservation> {
        self.series
            .get(metric)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns every metric's history, keyed by metric name.
    #[must_use]
    pub fn all_histories(&self) -> Vec<(String, Vec<MetricObservation>)> {
        self.series
            .iter()
            .map(|(metric, s)| (metric.clone(), s.iter().cloned().collect()))
            .collect()
    }

    /// Total observations held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.values().map(VecDeque::len).sum()
    }

    /// Returns true if nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable state of one target.
#[derive(Debug, Clone)]
pub struct TargetState {
    /// The target's breaker.
    pub breaker: CircuitBreaker,
    /// The target's recent observations.
    pub window: MetricsWindow,
}

/// Shared handle to one target's state.
pub type TargetHandle = Arc<Mutex<TargetState>>;

/// Lazily populated map of targets.
#[derive(Debug)]
pub struct TargetRegistry {
    template: CircuitBreaker,
    window_capacity: usize,
    targets: RwLock<HashMap<String, TargetHandle>>,
}

impl TargetRegistry {
    /// Creates a registry whose targets start with a copy of `template`.
    #[must_use]
    pub fn new(template: CircuitBreaker, window_capacity: usize) -> Self {
        Self {
            template,
            window_capacity,
            targets: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the state of `name`, creating it on first reference.
    pub fn get_or_create(&self, name: &str) -> TargetHandle {
        if let Some(handle) = self.targets.read().get(name) {
            return Arc::clone(handle);
        }

        let mut targets = self.targets.write();
        let handle = targets.entry(name.to_string()).or_insert_with(|| {
            debug!(target_name = name, "registered target");
            Arc::new(Mutex::new(TargetState {
                breaker: self.template.clone(),
                window: MetricsWindow::new(self.window_capacity),
            }))
        });
        Arc::clone(handle)
    }

    /// Returns the state of `name` if it has been referenced.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TargetHandle> {
        self.targets.read().get(name).cloned()
    }

    /// Registered target names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.targets.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.read().len()
    }

    /// Returns true if no target has been referenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.read().is_empty()
    }
}

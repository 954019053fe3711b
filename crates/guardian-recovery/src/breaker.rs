//! Per-target circuit breaker.
//!
//! ```text
//! Closed    -> Open:      failure_count >= failure_threshold
//! Open      -> HalfOpen:  is_available() once the timeout has elapsed
//! HalfOpen  -> Closed:    record_success()
//! HalfOpen  -> Open:      record_failure()
//! ```
//!
//! The breaker is plain data. Callers serialize access through the lock that
//! guards the owning target.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RecoveryError, Result};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests pass through.
    #[default]
    Closed,
    /// Requests fail fast.
    Open,
    /// One trial is allowed through after the timeout.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Serializable view of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures since the last success.
    pub failure_count: u32,
    /// Threshold at which the breaker opens.
    pub failure_threshold: u32,
    /// Time of the most recent failure.
    pub last_failure_time: Option<DateTime<Utc>>,
}

/// Fail-fast gate against a persistently failing target.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    timeout: Duration,
    failure_count: u32,
    last_failure_time: Option<DateTime<Utc>>,
    state: CircuitState,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::InvalidConfig`] if the threshold is zero or the
    /// timeout is negative.
    pub fn new(failure_threshold: u32, timeout: Duration) -> Result<Self> {
        if failure_threshold == 0 {
            return Err(RecoveryError::invalid_config(
                "circuit breaker failure_threshold must be at least 1",
            ));
        }
        if timeout < Duration::zero() {
            return Err(RecoveryError::invalid_config(
                "circuit breaker timeout must not be negative",
            ));
        }
        Ok(Self {
            failure_threshold,
            timeout,
            failure_count: 0,
            last_failure_time: None,
            state: CircuitState::Closed,
        })
    }

    /// Returns the current state without advancing it.
    #[must_use]
    pub const fn state(&self) -> CircuitState {
        self.state
    }

    /// Returns the consecutive failure count.
    #[must_use]
    pub const fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Returns the failure threshold.
    #[must_use]
    pub const fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Returns the open timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the time of the most recent failure.
    #[must_use]
    pub const fn last_failure_time(&self) -> Option<DateTime<Utc>> {
        self.last_failure_time
    }

    /// Returns a serializable view of the breaker.
    #[must_use]
    pub const fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.state,
            failure_count: self.failure_count,
            failure_threshold: self.failure_threshold,
            last_failure_time: self.last_failure_time,
        }
    }

    /// Resets the failure count and closes the breaker.
    pub fn record_success(&mut self) {
        if self.state != CircuitState::Closed {
            info!(from = %self.state, "circuit breaker closed");
        }
        self.failure_count = 0;
        self.state = CircuitState::Closed;
    }

    /// Records a failure now.
    pub fn record_failure(&mut self) {
        self.record_failure_at(Utc::now());
    }

    /// Records a failure at `now`, opening the breaker at the threshold.
    pub fn record_failure_at(&mut self, now: DateTime<Utc>) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_time = Some(now);

        if self.failure_count >= self.failure_threshold {
            if self.state != CircuitState::Open {
                warn!(
                    failures = self.failure_count,
                    threshold = self.failure_threshold,
                    from = %self.state,
                    "circuit breaker opened"
                );
            }
            self.state = CircuitState::Open;
        } else {
            debug!(
                failures = self.failure_count,
                threshold = self.failure_threshold,
                "circuit breaker recorded failure"
            );
        }
    }

    /// Returns true if a call may proceed now.
    pub fn is_available(&mut self) -> bool {
        self.is_available_at(Utc::now())
    }

    /// Returns true if a call may proceed at `now`.
    ///
    /// An open breaker whose timeout has elapsed moves to half-open and admits
    /// the call. Half-open keeps admitting until an outcome is recorded, so
    /// callers must serialize trial runs on the breaker.
    pub fn is_available_at(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self
                    .last_failure_time
                    .map_or(self.timeout, |last| now - last);
                if elapsed >= self.timeout {
                    info!(failures = self.failure_count, "circuit breaker half-open");
                    self.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }
}

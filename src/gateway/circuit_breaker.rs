//! Per-provider circuit breaker.
//!
//! `Closed` lets every call through. After `failure_threshold` consecutive
//! failures the breaker opens and rejects calls until `cooldown` has passed,
//! then lets a single trial call through in `HalfOpen`. A successful trial
//! closes it again; a failed one reopens it.

use serde::Serialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit (at least 1)
    pub failure_threshold: u32,
    /// Time the circuit stays open before a trial call
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // State stays consistent across a panicking holder; recover it
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state, promoting `Open` to `HalfOpen` once the cooldown elapsed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        inner.state
    }

    fn refresh(&self, inner: &mut Inner) {
        if inner.state == CircuitState::Open {
            let cooled = inner
                .opened_at
                .map(|at| at.elapsed() >= self.config.cooldown)
                .unwrap_or(true);
            if cooled {
                info!("{}: circuit half-open, allowing a trial request", self.name);
                inner.state = CircuitState::HalfOpen;
                inner.trial_in_flight = false;
            }
        }
    }

    /// Ask permission for one call. In `HalfOpen` only one trial is admitted
    /// until its outcome is recorded.
    ///
    /// Dropping the permit without settling it frees the trial slot, so a
    /// cancelled call never wedges the breaker in `HalfOpen`.
    pub fn acquire(&self) -> Option<Permit<'_>> {
        self.try_acquire().map(|is_trial| Permit {
            breaker: self,
            is_trial,
            settled: false,
        })
    }

    /// `Some(is_trial)` when a call is admitted.
    fn try_acquire(&self) -> Option<bool> {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        match inner.state {
            CircuitState::Closed => Some(false),
            CircuitState::Open => None,
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    None
                } else {
                    inner.trial_in_flight = true;
                    Some(true)
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!("{}: circuit closed after successful request", self.name);
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.trial_in_flight = false;

        let should_open = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => {
                inner.consecutive_failures >= self.config.failure_threshold.max(1)
            }
            CircuitState::Open => false,
        };

        if should_open {
            warn!(
                "{}: circuit opened after {} consecutive failures (cooldown {:?})",
                self.name, inner.consecutive_failures, self.config.cooldown
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    fn release(&self) {
        self.lock().trial_in_flight = false;
    }
}

/// Admission to call a provider, settled with its outcome.
#[must_use]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    /// Admitted as the single `HalfOpen` trial
    is_trial: bool,
    settled: bool,
}

impl Permit<'_> {
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        // Only the trial owns the slot; a stale Closed-era permit must not free it
        if !self.settled && self.is_trial {
            self.breaker.release();
        }
    }
}

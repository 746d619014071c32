//! Circuit breaker guarding the outbound provider call.
//!
//! One instance protects one operation and is shared by every request
//! handler. All transitions happen under a single mutex, so the half-open
//! trial permit is handed to exactly one caller.

use std::sync::{Arc, Mutex};

use ragchat_types::resilience::{BreakerConfig, BreakerSnapshot, CircuitState};

use crate::clock::{Clock, MonotonicClock};

/// Identifies one half-open trial. Each grant gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialId(u64);

/// Answer to [`CircuitBreaker::before_call`]. A permitted caller hands it
/// back to [`CircuitBreaker::after_call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPermit {
    /// The call may proceed. `trial` is set for the single half-open trial.
    Permit { trial: Option<TrialId> },
    /// Short-circuited; the operation must not be attempted.
    Reject,
}

impl CallPermit {
    pub fn is_permitted(&self) -> bool {
        matches!(self, CallPermit::Permit { .. })
    }

    pub fn is_trial(&self) -> bool {
        matches!(self, CallPermit::Permit { trial: Some(_) })
    }

    fn trial(&self) -> Option<TrialId> {
        match self {
            CallPermit::Permit { trial } => *trial,
            CallPermit::Reject => None,
        }
    }
}

/// What happened to a permitted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallReport {
    Success,
    Failure,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_transition_ms: u64,
    trial_in_flight: bool,
    /// Id of the most recently granted trial.
    trial_seq: u64,
    total_successes: u64,
    total_failures: u64,
}

/// Closed / open / half-open breaker with a consecutive-failure threshold.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerState>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(MonotonicClock))
    }

    pub fn with_clock(name: impl Into<String>, config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_transition_ms: now,
                trial_in_flight: false,
                trial_seq: 0,
                total_successes: 0,
                total_failures: 0,
            }),
            clock,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    /// Current reading of the breaker's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Ask for permission to attempt the protected call at `now_ms`.
    ///
    /// An open breaker whose open duration has elapsed moves to half-open and
    /// grants the trial permit to this caller. While the trial is outstanding
    /// every other caller is rejected. A trial that has been outstanding for a
    /// full open duration without a report is presumed lost (its caller was
    /// dropped) and the permit is handed out again.
    pub fn before_call_at(&self, now_ms: u64) -> CallPermit {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        match inner.state {
            CircuitState::Closed => CallPermit::Permit { trial: None },
            CircuitState::Open => {
                if now_ms.saturating_sub(inner.last_transition_ms) >= self.config.open_ms {
                    inner.state = CircuitState::HalfOpen;
                    tracing::info!(breaker = %self.name, "circuit half-open, allowing trial call");
                    grant_trial(&mut inner, now_ms)
                } else {
                    CallPermit::Reject
                }
            }
            CircuitState::HalfOpen => {
                let stale = now_ms.saturating_sub(inner.last_transition_ms) >= self.config.open_ms;
                if inner.trial_in_flight && !stale {
                    CallPermit::Reject
                } else {
                    grant_trial(&mut inner, now_ms)
                }
            }
        }
    }

    pub fn before_call(&self) -> CallPermit {
        self.before_call_at(self.clock.now_ms())
    }

    /// Record the outcome of a call made under `permit`.
    ///
    /// While half-open only the outstanding trial moves the breaker. Reports
    /// from calls permitted before the trip, or from a trial that was
    /// presumed lost and re-issued, are counted but change no state.
    pub fn after_call_at(&self, permit: CallPermit, report: CallReport, now_ms: u64) {
        if !permit.is_permitted() {
            return;
        }
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        let is_current_trial = inner.trial_in_flight
            && permit.trial() == Some(TrialId(inner.trial_seq));
        match report {
            CallReport::Success => {
                inner.total_successes += 1;
                match inner.state {
                    CircuitState::HalfOpen if !is_current_trial => {}
                    CircuitState::HalfOpen => {
                        inner.state = CircuitState::Closed;
                        inner.consecutive_failures = 0;
                        inner.trial_in_flight = false;
                        inner.last_transition_ms = now_ms;
                        tracing::info!(breaker = %self.name, "trial call succeeded, circuit closed");
                    }
                    CircuitState::Closed => inner.consecutive_failures = 0,
                    // Late report from a call permitted before the trip.
                    CircuitState::Open => {}
                }
            }
            CallReport::Failure => {
                inner.total_failures += 1;
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                match inner.state {
                    CircuitState::Closed => {
                        if inner.consecutive_failures >= self.config.failure_threshold.max(1) {
                            inner.state = CircuitState::Open;
                            inner.last_transition_ms = now_ms;
                            tracing::warn!(
                                breaker = %self.name,
                                failures = inner.consecutive_failures,
                                open_ms = self.config.open_ms,
                                "failure threshold reached, circuit opened"
                            );
                        }
                    }
                    CircuitState::HalfOpen if !is_current_trial => {}
                    CircuitState::HalfOpen => {
                        inner.state = CircuitState::Open;
                        inner.trial_in_flight = false;
                        inner.last_transition_ms = now_ms;
                        tracing::warn!(breaker = %self.name, "trial call failed, circuit re-opened");
                    }
                    CircuitState::Open => {}
                }
            }
        }
    }

    pub fn after_call(&self, permit: CallPermit, report: CallReport) {
        self.after_call_at(permit, report, self.clock.now_ms());
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock().expect("circuit breaker lock poisoned");
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_transition_ms: inner.last_transition_ms,
            trial_in_flight: inner.trial_in_flight,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.snapshot().state
    }
}

fn grant_trial(inner: &mut BreakerState, now_ms: u64) -> CallPermit {
    inner.trial_seq += 1;
    inner.trial_in_flight = true;
    inner.last_transition_ms = now_ms;
    CallPermit::Permit {
        trial: Some(TrialId(inner.trial_seq)),
    }
}

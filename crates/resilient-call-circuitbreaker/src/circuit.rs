use crate::config::CircuitBreakerConfig;
use crate::events::{CircuitBreakerEvent, RejectionReason};
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CircuitState {
    /// Calls run unconditionally.
    Closed = 0,
    /// Calls are rejected until the open timeout elapses.
    Open = 1,
    /// A limited number of probe calls are admitted.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Lowercase name, used for metric tags and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a finished call is applied to the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    /// The call says nothing about downstream health (e.g. the caller gave
    /// up). Its half-open slot is released and no counter changes.
    Ignored,
}

/// Point-in-time view of a breaker's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitMetrics {
    pub state: CircuitState,
    /// Consecutive failures in closed; the failure that reopened it otherwise.
    pub failure_count: usize,
    /// Successful probes in the current half-open period.
    pub success_count: usize,
    /// Probes admitted in the current half-open period and not released.
    pub half_open_admitted: usize,
    pub time_since_last_failure: Option<Duration>,
    pub time_since_state_change: Duration,
}

/// Proof of admission. Results carrying a stale epoch are discarded.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ticket {
    epoch: u64,
}

pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    epoch: u64,
    last_state_change: Instant,
    last_failure_time: Option<Instant>,
    failure_count: usize,
    success_count: usize,
    half_open_admitted: usize,
}

impl Circuit {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            epoch: 0,
            last_state_change: Instant::now(),
            last_failure_time: None,
            failure_count: 0,
            success_count: 0,
            half_open_admitted: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn metrics(&self) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            failure_count: self.failure_count,
            success_count: self.success_count,
            half_open_admitted: self.half_open_admitted,
            time_since_last_failure: self.last_failure_time.map(|t| t.elapsed()),
            time_since_state_change: self.last_state_change.elapsed(),
        }
    }

    pub fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> Result<Ticket, RejectionReason> {
        match self.state {
            CircuitState::Closed => {}
            CircuitState::Open => {
                let since = self.last_failure_time.unwrap_or(self.last_state_change);
                if since.elapsed() <= config.open_timeout {
                    return Err(self.reject(RejectionReason::Open, config));
                }
                self.transition_to(CircuitState::HalfOpen, config);
                self.half_open_admitted = 1;
            }
            CircuitState::HalfOpen => {
                if self.half_open_admitted >= config.max_half_open_probes {
                    return Err(self.reject(RejectionReason::ProbesExhausted, config));
                }
                self.half_open_admitted += 1;
            }
        }

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallPermitted {
                name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });

        Ok(Ticket { epoch: self.epoch })
    }

    pub fn complete(&mut self, ticket: Ticket, outcome: Outcome, config: &CircuitBreakerConfig) {
        if ticket.epoch != self.epoch {
            #[cfg(feature = "tracing")]
            tracing::trace!(breaker = %config.name, ?outcome, "discarding result from an earlier state");
            return;
        }

        match outcome {
            Outcome::Success => self.record_success(config),
            Outcome::Failure => self.record_failure(config),
            Outcome::Ignored => {
                if self.state == CircuitState::HalfOpen {
                    self.half_open_admitted = self.half_open_admitted.saturating_sub(1);
                }
            }
        }
    }

    fn record_success(&mut self, config: &CircuitBreakerConfig) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);

        match self.state {
            CircuitState::Closed => self.failure_count = 0,
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= config.half_open_close_threshold() {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&mut self, config: &CircuitBreakerConfig) {
        self.last_failure_time = Some(Instant::now());

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);

        match self.state {
            CircuitState::Closed => {
                self.failure_count += 1;
                self.emit_failure(config);
                if self.failure_count >= config.max_failures {
                    self.transition_to(CircuitState::Open, config);
                }
            }
            CircuitState::HalfOpen => {
                self.failure_count += 1;
                self.emit_failure(config);
                self.transition_to(CircuitState::Open, config);
            }
            CircuitState::Open => {}
        }
    }

    fn emit_failure(&self, config: &CircuitBreakerConfig) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
                failure_count: self.failure_count,
            });
    }

    fn reject(&self, reason: RejectionReason, config: &CircuitBreakerConfig) -> RejectionReason {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallRejected {
                name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                reason,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "rejected").increment(1);

        reason
    }

    pub fn force_open(&mut self, config: &CircuitBreakerConfig) {
        self.last_failure_time = Some(Instant::now());
        self.transition_to(CircuitState::Open, config);
    }

    pub fn force_closed(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    pub fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
        self.epoch += 1;
        self.failure_count = 0;
        self.success_count = 0;
        self.half_open_admitted = 0;
        self.last_failure_time = None;
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %config.name, from = %from_state, to = %state, "circuit state transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone())
                .set(state as u8 as f64);
        }

        match state {
            CircuitState::Closed | CircuitState::HalfOpen => {
                self.failure_count = 0;
                self.success_count = 0;
            }
            CircuitState::Open => self.success_count = 0,
        }
        self.half_open_admitted = 0;
        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = Instant::now();
        self.epoch += 1;
    }
}

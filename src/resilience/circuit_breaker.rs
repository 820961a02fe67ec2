//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: testing if dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: first call after recovery timeout
//! Half-Open → Closed: success_threshold probes succeed
//! Half-Open → Open: a probe fails (recovery clock restarts)
//! any → Open/Closed: administrative override
//! ```
//!
//! # Design Decisions
//! - One mutex per circuit; admission, transitions and counters change in one critical section
//! - Fail fast in Open state (no suspension, no waiting for timeout)
//! - Bounded probes in Half-Open (prevents hammering recovering dependency)
//! - The operation and its accounting run in a spawned task, so a caller
//!   that stops waiting never loses the outcome

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::{broadcast, oneshot};
use tokio::time::Instant;

use crate::config::validation::validate_circuit;
use crate::config::{CircuitConfig, ConfigError};
use crate::observability::metrics;
use crate::resilience::error::CircuitError;
use crate::resilience::events::{CallContext, CircuitEvent, EventSink};
use crate::resilience::timeouts::{race, Settled};

/// State of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters of a circuit. Timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    /// Includes timeouts.
    pub failed_requests: u64,
    pub timeout_requests: u64,
    /// Calls short-circuited without invoking the operation.
    pub rejected_requests: u64,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub last_failure_time: Option<u64>,
    pub last_success_time: Option<u64>,
    /// Set only while the circuit is not closed.
    pub opened_at: Option<u64>,
}

impl CircuitMetrics {
    /// Failed share of settled calls; 0 when there was no traffic.
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.failed_requests as f64 / self.total_requests as f64
        }
    }
}

/// Derived health view of a circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub state: CircuitState,
    pub healthy: bool,
    pub failure_rate: f64,
    pub last_failure: Option<u64>,
    /// When the next probe will be admitted; only while open.
    pub next_attempt: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success,
    Failure,
    Timeout,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Timeout => "timeout",
        }
    }
}

/// Ticket handed to an admitted call.
#[derive(Debug, Clone, Copy)]
struct Admission {
    probe: bool,
    /// Transition epoch the call was admitted in.
    epoch: u64,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    metrics: CircuitMetrics,
    opened_at: Option<Instant>,
    probes_in_flight: u32,
    epoch: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            metrics: CircuitMetrics::default(),
            opened_at: None,
            probes_in_flight: 0,
            epoch: 0,
        }
    }
}

#[derive(Debug)]
struct Shared {
    config: CircuitConfig,
    inner: Mutex<Inner>,
    events: EventSink,
}

/// A named circuit guarding one dependency.
///
/// Cloning is cheap and every clone refers to the same circuit.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

impl CircuitBreaker {
    /// Create a standalone circuit.
    pub fn new(config: CircuitConfig) -> Result<Self, ConfigError> {
        Self::with_forwarding(config, None)
    }

    /// Create a circuit whose events are also published on `forward`.
    pub(crate) fn with_forwarding(
        config: CircuitConfig,
        forward: Option<broadcast::Sender<CircuitEvent>>,
    ) -> Result<Self, ConfigError> {
        validate_circuit(&config).map_err(ConfigError::Validation)?;
        metrics::record_state(&config.name, CircuitState::Closed);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(Inner::new()),
                events: EventSink::new(forward),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.shared.config
    }

    /// True when both handles refer to the same circuit.
    pub fn same_as(&self, other: &CircuitBreaker) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Subscribe to this circuit's events.
    pub fn subscribe(&self) -> broadcast::Receiver<CircuitEvent> {
        self.shared.events.subscribe()
    }

    /// Run `operation` through the circuit.
    ///
    /// Fails fast with [`CircuitError::Open`] without invoking `operation`
    /// while the circuit is open, or while half-open with all probe slots
    /// taken. Otherwise the operation races the per-call timeout; its value
    /// or its own error is returned unchanged.
    ///
    /// The operation runs on a spawned task. Dropping the returned future
    /// stops the wait, not the accounting.
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: F,
        context: CallContext,
    ) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let admission = match self.admit() {
            Ok(admission) => admission,
            Err(retry_after) => {
                tracing::debug!(circuit = %self.name(), context = ?context, "Call short-circuited");
                return Err(CircuitError::Open {
                    circuit: self.name().to_string(),
                    retry_after,
                });
            }
        };

        let deadline = self.shared.config.timeout();
        let task = tokio::spawn(operation());
        let (tx, rx) = oneshot::channel();
        let circuit = self.clone();

        tokio::spawn(async move {
            let result = match race(task, deadline).await {
                Settled::Completed(Ok(value)) => {
                    circuit.record(admission, Outcome::Success, &context);
                    Ok(value)
                }
                Settled::Completed(Err(e)) => {
                    circuit.record(admission, Outcome::Failure, &context);
                    Err(CircuitError::Operation(e))
                }
                Settled::TimedOut => {
                    circuit.record(admission, Outcome::Timeout, &context);
                    Err(CircuitError::Timeout {
                        circuit: circuit.name().to_string(),
                        timeout: deadline,
                    })
                }
                Settled::Aborted => {
                    circuit.record(admission, Outcome::Failure, &context);
                    Err(CircuitError::Aborted {
                        circuit: circuit.name().to_string(),
                    })
                }
            };
            // The caller may have stopped waiting.
            let _ = tx.send(result);
        });

        rx.await.unwrap_or_else(|_| {
            Err(CircuitError::Aborted {
                circuit: self.name().to_string(),
            })
        })
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> CircuitMetrics {
        self.lock().metrics.clone()
    }

    pub fn health_status(&self) -> HealthStatus {
        self.health_of(&self.lock())
    }

    /// Metrics and health taken under one lock, so they always agree.
    pub fn snapshot(&self) -> (CircuitMetrics, HealthStatus) {
        let inner = self.lock();
        (inner.metrics.clone(), self.health_of(&inner))
    }

    /// Open the circuit regardless of its counters.
    ///
    /// Forcing an already open circuit restarts the recovery window. A
    /// forced-open circuit recovers through the normal recovery timeout.
    pub fn force_open(&self, reason: impl Into<String>) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Open, Some(reason.into()));
    }

    /// Close the circuit regardless of its counters.
    pub fn force_close(&self, reason: impl Into<String>) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed, Some(reason.into()));
        }
        inner.metrics.consecutive_failures = 0;
    }

    /// Clear all counters and return to closed. Config is untouched.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let from = inner.state;
        let epoch = inner.epoch + 1;
        *inner = Inner::new();
        inner.epoch = epoch;
        metrics::record_state(self.name(), CircuitState::Closed);

        tracing::info!(circuit = %self.name(), from = %from, "Circuit reset");
        if from != CircuitState::Closed {
            self.shared.events.emit(CircuitEvent::StateChange {
                circuit: self.name().to_string(),
                from,
                to: CircuitState::Closed,
                reason: Some("reset".to_string()),
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether a call may run. `Err` carries the remaining recovery
    /// time when it is known.
    fn admit(&self) -> Result<Admission, Option<Duration>> {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => Ok(Admission {
                probe: false,
                epoch: inner.epoch,
            }),
            CircuitState::Open => {
                let now = Instant::now();
                let ready_at = match inner.opened_at {
                    Some(opened) => opened.checked_add(self.shared.config.recovery_timeout()),
                    None => Some(now),
                };

                match ready_at {
                    Some(ready_at) if now < ready_at => {
                        self.reject(&mut inner);
                        return Err(Some(ready_at - now));
                    }
                    // Window too long to represent: stays open until overridden.
                    None => {
                        self.reject(&mut inner);
                        return Err(None);
                    }
                    Some(_) => {}
                }

                self.transition(&mut inner, CircuitState::HalfOpen, None);
                inner.probes_in_flight = 1;
                Ok(Admission {
                    probe: true,
                    epoch: inner.epoch,
                })
            }
            CircuitState::HalfOpen => {
                if inner.probes_in_flight >= self.shared.config.half_open_max_probes {
                    self.reject(&mut inner);
                    return Err(None);
                }
                inner.probes_in_flight += 1;
                Ok(Admission {
                    probe: true,
                    epoch: inner.epoch,
                })
            }
        }
    }

    fn health_of(&self, inner: &Inner) -> HealthStatus {
        let next_attempt = match inner.state {
            CircuitState::Open => inner
                .metrics
                .opened_at
                .map(|opened| opened.saturating_add(self.shared.config.recovery_timeout_ms)),
            _ => None,
        };

        HealthStatus {
            state: inner.state,
            healthy: inner.state != CircuitState::Open,
            failure_rate: inner.metrics.failure_rate(),
            last_failure: inner.metrics.last_failure_time,
            next_attempt,
        }
    }

    fn reject(&self, inner: &mut Inner) {
        inner.metrics.rejected_requests += 1;
        metrics::record_rejection(self.name());
    }

    /// Apply a settled call to counters and state.
    fn record(&self, admission: Admission, outcome: Outcome, context: &CallContext) {
        let mut inner = self.lock();
        let config = &self.shared.config;
        let now = epoch_millis();

        // Probes admitted before the last transition no longer drive the state machine.
        let current = admission.epoch == inner.epoch;
        if admission.probe && current {
            inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
        }
        let probe = admission.probe && current && inner.state == CircuitState::HalfOpen;
        // Only probes move the success streak while half-open.
        let counts_streak = probe || inner.state != CircuitState::HalfOpen;

        inner.metrics.total_requests += 1;
        metrics::record_call(self.name(), outcome.label());

        match outcome {
            Outcome::Success => {
                inner.metrics.successful_requests += 1;
                inner.metrics.consecutive_failures = 0;
                if counts_streak {
                    inner.metrics.consecutive_successes += 1;
                }
                inner.metrics.last_success_time = Some(now);

                if probe && inner.metrics.consecutive_successes >= config.success_threshold {
                    self.transition(&mut inner, CircuitState::Closed, None);
                    self.shared.events.emit(CircuitEvent::Close {
                        circuit: self.name().to_string(),
                        metrics: inner.metrics.clone(),
                        context: context.clone(),
                    });
                }
            }
            Outcome::Failure | Outcome::Timeout => {
                inner.metrics.failed_requests += 1;
                if matches!(outcome, Outcome::Timeout) {
                    inner.metrics.timeout_requests += 1;
                }
                inner.metrics.consecutive_failures += 1;
                if counts_streak {
                    inner.metrics.consecutive_successes = 0;
                }
                inner.metrics.last_failure_time = Some(now);

                tracing::debug!(
                    circuit = %self.name(),
                    outcome = outcome.label(),
                    consecutive_failures = inner.metrics.consecutive_failures,
                    context = ?context,
                    "Protected call failed"
                );

                let trip = match inner.state {
                    CircuitState::Closed => {
                        inner.metrics.consecutive_failures >= config.failure_threshold
                    }
                    CircuitState::HalfOpen => probe,
                    // Stragglers admitted before the trip do not extend the window.
                    CircuitState::Open => false,
                };
                if trip {
                    self.transition(&mut inner, CircuitState::Open, None);
                    self.shared.events.emit(CircuitEvent::Open {
                        circuit: self.name().to_string(),
                        metrics: inner.metrics.clone(),
                        context: context.clone(),
                    });
                }
            }
        }
    }

    /// Move to `to`, stamp the recovery clock and announce the change.
    /// Must be called with the lock held.
    fn transition(&self, inner: &mut Inner, to: CircuitState, reason: Option<String>) {
        let from = inner.state;
        inner.state = to;
        inner.epoch += 1;
        inner.probes_in_flight = 0;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
                inner.metrics.opened_at = Some(epoch_millis());
                inner.metrics.consecutive_successes = 0;
            }
            CircuitState::Closed => {
                inner.opened_at = None;
                inner.metrics.opened_at = None;
                inner.metrics.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.metrics.consecutive_successes = 0;
            }
        }

        match to {
            CircuitState::Open => tracing::warn!(
                circuit = %self.name(),
                from = %from,
                consecutive_failures = inner.metrics.consecutive_failures,
                recovery_timeout_ms = self.shared.config.recovery_timeout_ms,
                reason = ?reason,
                "Circuit opened"
            ),
            _ => tracing::info!(
                circuit = %self.name(),
                from = %from,
                to = %to,
                reason = ?reason,
                "Circuit state changed"
            ),
        }
        metrics::record_transition(self.name(), to);

        self.shared.events.emit(CircuitEvent::StateChange {
            circuit: self.name().to_string(),
            from,
            to,
            reason,
        });
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

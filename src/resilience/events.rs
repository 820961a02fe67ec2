//! Circuit events and call context.
//!
//! # Responsibilities
//! - Define the `open` / `close` / `stateChange` notifications
//! - Carry the opaque per-call context through to observers
//!
//! # Design Decisions
//! - Delivered over `tokio::sync::broadcast`; slow subscribers lag, they never block a circuit
//! - Every event carries the circuit name so one subscriber can watch the whole registry

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::resilience::circuit_breaker::{CircuitMetrics, CircuitState};

/// Capacity of each broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Opaque data supplied by the caller of `execute`.
///
/// The circuit never inspects it; it is only attached to the events a call
/// triggers and to log lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CallContext(BTreeMap<String, Value>);

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key/value pair.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Notification emitted by a circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum CircuitEvent {
    /// The circuit tripped (threshold reached or a probe failed).
    #[serde(rename_all = "camelCase")]
    Open {
        circuit: String,
        metrics: CircuitMetrics,
        context: CallContext,
    },
    /// A half-open probe closed the circuit.
    #[serde(rename_all = "camelCase")]
    Close {
        circuit: String,
        metrics: CircuitMetrics,
        context: CallContext,
    },
    /// Any state transition, including administrative overrides.
    #[serde(rename_all = "camelCase")]
    StateChange {
        circuit: String,
        from: CircuitState,
        to: CircuitState,
        reason: Option<String>,
    },
}

impl CircuitEvent {
    /// Name of the circuit that emitted the event.
    pub fn circuit(&self) -> &str {
        match self {
            CircuitEvent::Open { circuit, .. }
            | CircuitEvent::Close { circuit, .. }
            | CircuitEvent::StateChange { circuit, .. } => circuit,
        }
    }

    /// Event name as exposed to observers.
    pub fn kind(&self) -> &'static str {
        match self {
            CircuitEvent::Open { .. } => "open",
            CircuitEvent::Close { .. } => "close",
            CircuitEvent::StateChange { .. } => "stateChange",
        }
    }
}

/// Fan-out of circuit events to a local channel and, optionally, the
/// registry-wide channel of the owning manager.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    local: broadcast::Sender<CircuitEvent>,
    forward: Option<broadcast::Sender<CircuitEvent>>,
}

impl EventSink {
    pub(crate) fn new(forward: Option<broadcast::Sender<CircuitEvent>>) -> Self {
        let (local, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { local, forward }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<CircuitEvent> {
        self.local.subscribe()
    }

    pub(crate) fn emit(&self, event: CircuitEvent) {
        // Sending only fails when nobody is subscribed.
        if let Some(forward) = &self.forward {
            let _ = forward.send(event.clone());
        }
        let _ = self.local.send(event);
    }
}

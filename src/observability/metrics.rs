//! Metrics collection and exposition.
//!
//! # Metrics
//! - `circuit_requests_total` (counter): settled calls by circuit, outcome
//! - `circuit_rejected_total` (counter): short-circuited calls by circuit
//! - `circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `circuit_transitions_total` (counter): transitions by circuit, target state
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn record_call(circuit: &str, outcome: &'static str) {
    ::metrics::counter!(
        "circuit_requests_total",
        "circuit" => circuit.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_rejection(circuit: &str) {
    ::metrics::counter!("circuit_rejected_total", "circuit" => circuit.to_string()).increment(1);
}

pub fn record_transition(circuit: &str, to: CircuitState) {
    ::metrics::counter!(
        "circuit_transitions_total",
        "circuit" => circuit.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    record_state(circuit, to);
}

pub fn record_state(circuit: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    ::metrics::gauge!("circuit_state", "circuit" => circuit.to_string()).set(value);
}

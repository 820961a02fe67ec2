//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Log every circuit event published by the registry
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured level

use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::resilience::CircuitEvent;

/// Install the global subscriber. Call once, from `main`.
pub fn init_logging(config: &ObservabilityConfig) {
    let fallback = format!("dependency_breaker={0},tower_http={0}", config.log_level);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Log circuit events until `shutdown` fires or the registry goes away.
pub async fn log_events(
    mut events: broadcast::Receiver<CircuitEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Event logger stopped");
}

fn log_event(event: &CircuitEvent) {
    match event {
        CircuitEvent::Open { circuit, metrics, context } => tracing::warn!(
            event = "open",
            circuit = %circuit,
            failed_requests = metrics.failed_requests,
            consecutive_failures = metrics.consecutive_failures,
            context = ?context,
            "Dependency marked unavailable"
        ),
        CircuitEvent::Close { circuit, metrics, context } => tracing::info!(
            event = "close",
            circuit = %circuit,
            successful_requests = metrics.successful_requests,
            context = ?context,
            "Dependency recovered"
        ),
        CircuitEvent::StateChange { circuit, from, to, reason } => tracing::info!(
            event = "stateChange",
            circuit = %circuit,
            from = %from,
            to = %to,
            reason = reason.as_deref().unwrap_or(""),
            "Circuit transition"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitState;
    use std::time::Duration;

    #[tokio::test]
    async fn test_logger_stops_on_shutdown() {
        let (events_tx, events_rx) = broadcast::channel(4);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(log_events(events_rx, shutdown_rx));

        events_tx
            .send(CircuitEvent::StateChange {
                circuit: "cache".into(),
                from: CircuitState::Closed,
                to: CircuitState::Open,
                reason: None,
            })
            .unwrap();
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("logger should exit")
            .unwrap();
    }
}

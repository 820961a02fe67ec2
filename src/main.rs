//! Dependency circuit breaker service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Service code                    ┌───────────────────────────────────────────┐
//!     ───────────────────────────────▶│ adapters (middleware, client, fallback)   │
//!                                     └─────────────────────┬─────────────────────┘
//!                                                           ▼
//!                                     ┌───────────────────────────────────────────┐
//!                                     │ CircuitBreakerManager (name → circuit)    │
//!                                     └─────────────────────┬─────────────────────┘
//!                                                           ▼
//!                                     ┌───────────────────────────────────────────┐
//!                                     │ CircuitBreaker::execute                   │──▶ dependency
//!                                     │  fail fast │ timeout race │ accounting    │
//!                                     └─────────────────────┬─────────────────────┘
//!                                                           │ events
//!     Operators                       ┌─────────────────────▼─────────────────────┐
//!     ◀──────────────────────────────▶│ admin: /health /stats /control            │
//!                                     │ observability: logs, Prometheus           │
//!                                     └───────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use dependency_breaker::admin::{setup_admin_router, AppState};
use dependency_breaker::config::{load_config, ServiceConfig};
use dependency_breaker::lifecycle::{signals, Shutdown};
use dependency_breaker::observability::{logging, metrics};
use dependency_breaker::resilience::CircuitBreakerManager;

#[derive(Parser)]
#[command(name = "dependency-breaker", version, about = "Circuit breakers for external dependencies")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "BREAKER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dependency-breaker starting");

    tracing::info!(
        config_file = ?args.config,
        admin_address = %config.admin.bind_address,
        circuits = config.circuits.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let manager = CircuitBreakerManager::from_config(&config)?;
    let shutdown = Shutdown::new();

    let event_logger = tokio::spawn(logging::log_events(manager.subscribe(), shutdown.subscribe()));

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let listener = TcpListener::bind(&config.admin.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");

    let app = setup_admin_router(AppState::new(manager, &config.admin));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.signalled())
        .await?;

    let _ = event_logger.await;
    tracing::info!("Shutdown complete");
    Ok(())
}

//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use dependency_breaker::config::CircuitConfig;
use tokio::net::TcpListener;

/// Circuit settings used across tests.
#[allow(dead_code)]
pub fn test_config(name: &str, failure_threshold: u32, recovery_ms: u64) -> CircuitConfig {
    CircuitConfig::named(name)
        .with_failure_threshold(failure_threshold)
        .with_recovery_timeout(Duration::from_millis(recovery_ms))
        .with_timeout(Duration::from_millis(500))
}

/// Counts how often an operation was actually invoked.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct CallCounter(Arc<AtomicUsize>);

#[allow(dead_code)]
impl CallCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Operation that records its invocation and then yields `result`.
    pub fn op<T: Send + 'static>(
        &self,
        result: Result<T, String>,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = Result<T, String>> + Send>> {
        let counter = self.0.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { result })
        }
    }
}

/// Start a programmable HTTP backend on an ephemeral port. `f` decides the
/// status of every response.
#[allow(dead_code)]
pub async fn start_programmable_backend<F>(f: F) -> SocketAddr
where
    F: Fn() -> StatusCode + Clone + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().route(
        "/",
        get(move || {
            let f = f.clone();
            async move {
                let status = f();
                (status, format!("{{\"status\":{}}}", status.as_u16()))
            }
        }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

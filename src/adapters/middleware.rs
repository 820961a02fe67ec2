//! Axum middleware that routes a handler through a circuit.
//!
//! # Design Decisions
//! - 5xx responses count as failures but reach the client unchanged
//! - Open circuit → 503 with `Retry-After`; timeout → 504
//! - Method and path travel as call context for observers

use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::ConfigError;
use crate::resilience::{CallContext, CircuitBreaker, CircuitBreakerManager, CircuitError};

/// State for [`circuit_breaker_middleware`]: the circuit guarding a route.
#[derive(Debug, Clone)]
pub struct CircuitGuard {
    circuit: CircuitBreaker,
}

impl CircuitGuard {
    /// Guard routes with the circuit `name` from `manager`.
    pub fn new(manager: &CircuitBreakerManager, name: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            circuit: manager.get_circuit(name, None)?,
        })
    }

    pub fn circuit(&self) -> &CircuitBreaker {
        &self.circuit
    }
}

/// Use with `axum::middleware::from_fn_with_state(guard, circuit_breaker_middleware)`.
pub async fn circuit_breaker_middleware(
    State(guard): State<CircuitGuard>,
    request: Request,
    next: Next,
) -> Response {
    let context = CallContext::new()
        .with("method", request.method().as_str())
        .with("path", request.uri().path());

    let outcome = guard
        .circuit
        .execute(
            move || async move {
                let response = next.run(request).await;
                if response.status().is_server_error() {
                    Err(response)
                } else {
                    Ok(response)
                }
            },
            context,
        )
        .await;

    match outcome {
        Ok(response) | Err(CircuitError::Operation(response)) => response,
        Err(CircuitError::Open { circuit, retry_after }) => {
            let mut response = (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "dependency temporarily unavailable",
                    "circuit": circuit,
                })),
            )
                .into_response();
            if let Some(wait) = retry_after {
                // Round up so clients never retry early.
                let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(RETRY_AFTER, value);
                }
            }
            response
        }
        Err(CircuitError::Timeout { circuit, timeout }) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(serde_json::json!({
                "error": "dependency timed out",
                "circuit": circuit,
                "timeoutMs": timeout.as_millis() as u64,
            })),
        )
            .into_response(),
        Err(CircuitError::Aborted { circuit }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": "request aborted",
                "circuit": circuit,
            })),
        )
            .into_response(),
    }
}

//! Administrative HTTP surface.
//!
//! # Endpoints
//! - `GET /health`: per-circuit health and overall health
//! - `GET /stats`: aggregate counters plus per-circuit metrics
//! - `POST /control`: force a circuit open/closed or reset it
//!
//! # Design Decisions
//! - Built on the manager only; never creates circuits implicitly
//! - Errors are JSON bodies with 4xx/5xx status; a panicking handler becomes a 500
//! - Bearer auth guards `/control` only, and only when an API key is configured

pub mod auth;
pub mod handlers;
pub mod request_id;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AdminConfig;
use crate::resilience::CircuitBreakerManager;
use self::auth::admin_auth_middleware;
use self::handlers::*;
use self::request_id::UuidRequestId;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: CircuitBreakerManager,
    pub api_key: Option<Arc<str>>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(manager: CircuitBreakerManager, config: &AdminConfig) -> Self {
        Self {
            manager,
            api_key: config.api_key.as_deref().map(Arc::from),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// Build the admin router with all middleware layers.
#[allow(deprecated)]
pub fn setup_admin_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;

    let control = Router::new()
        .route("/control", post(control_circuit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new()
        .route("/health", get(get_health))
        .route("/stats", get(get_stats))
        .merge(control)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(detail = %detail, "Admin handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "internal error" })),
    )
        .into_response()
}

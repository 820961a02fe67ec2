//! Admin API tests, driven in-process through the router.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use dependency_breaker::admin::{setup_admin_router, AppState};
use dependency_breaker::config::AdminConfig;
use dependency_breaker::{CallContext, CircuitBreakerManager};

mod common;
use common::test_config;

fn app_with(manager: &CircuitBreakerManager, api_key: Option<&str>) -> Router {
    let config = AdminConfig {
        api_key: api_key.map(str::to_string),
        ..AdminConfig::default()
    };
    setup_admin_router(AppState::new(manager.clone(), &config))
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn control(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/control")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_of_fresh_circuit() {
    let manager = CircuitBreakerManager::default();
    manager.get_circuit("x", None).unwrap();
    let app = app_with(&manager, None);

    let (status, body) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "overallHealth": true,
            "circuits": {
                "x": {
                    "state": "CLOSED",
                    "healthy": true,
                    "failureRate": 0.0,
                    "lastFailure": null,
                    "nextAttempt": null
                }
            }
        })
    );
}

#[tokio::test]
async fn test_stats_summary() {
    let manager = CircuitBreakerManager::default();
    let x = manager.get_circuit("x", Some(test_config("x", 5, 1000))).unwrap();
    manager.get_circuit("y", None).unwrap();

    x.execute(|| async { Ok::<_, String>(()) }, CallContext::new()).await.unwrap();
    x.execute(|| async { Err::<(), _>("down".to_string()) }, CallContext::new())
        .await
        .unwrap_err();

    let app = app_with(&manager, None);
    let (status, body) = call(&app, get("/stats")).await;
    assert_eq!(status, StatusCode::OK);

    let summary = &body["summary"];
    assert_eq!(summary["totalCircuits"], 2);
    assert_eq!(summary["totalRequests"], 2);
    assert_eq!(summary["successfulRequests"], 1);
    assert_eq!(summary["failedRequests"], 1);
    assert_eq!(summary["timeoutRequests"], 0);
    assert_eq!(summary["overallFailureRate"], 0.5);

    let circuits = body["circuits"].as_array().unwrap();
    assert_eq!(circuits.len(), 2);
    assert_eq!(circuits[0]["name"], "x");
    assert_eq!(circuits[0]["metrics"]["consecutiveFailures"], 1);
    assert_eq!(circuits[0]["health"]["failureRate"], 0.5);
}

#[tokio::test]
async fn test_force_open_then_reset() {
    let manager = CircuitBreakerManager::default();
    let x = manager.get_circuit("x", None).unwrap();
    x.execute(|| async { Ok::<_, String>(()) }, CallContext::new()).await.unwrap();
    let app = app_with(&manager, None);

    let (status, body) = call(
        &app,
        control(json!({ "action": "open", "circuitName": "x", "reason": "broker maintenance" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "OPEN");
    assert!(body["health"]["nextAttempt"].is_u64());

    let (_, health) = call(&app, get("/health")).await;
    assert_eq!(health["overallHealth"], false);

    let (status, body) = call(&app, control(json!({ "action": "reset", "circuitName": "x" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "CLOSED");
    assert_eq!(body["metrics"]["totalRequests"], 0);
    assert_eq!(body["metrics"]["successfulRequests"], 0);
    assert_eq!(body["metrics"]["openedAt"], Value::Null);
}

#[tokio::test]
async fn test_force_close() {
    let manager = CircuitBreakerManager::default();
    let x = manager.get_circuit("x", None).unwrap();
    x.force_open("test");
    let app = app_with(&manager, None);

    let (status, body) = call(&app, control(json!({ "action": "close", "circuitName": "x" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "CLOSED");
    assert_eq!(body["action"], "close");
}

#[tokio::test]
async fn test_control_validation() {
    let manager = CircuitBreakerManager::default();
    manager.get_circuit("x", None).unwrap();
    let app = app_with(&manager, None);

    let cases = [
        json!({ "circuitName": "x" }),
        json!({ "action": "open" }),
        json!({ "action": "restart", "circuitName": "x" }),
    ];
    for case in cases {
        let (status, body) = call(&app, control(case)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    let malformed = Request::builder()
        .method("POST")
        .uri("/control")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = call(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_control_unknown_circuit_is_not_created() {
    let manager = CircuitBreakerManager::default();
    let app = app_with(&manager, None);

    let (status, body) = call(&app, control(json!({ "action": "open", "circuitName": "ghost" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "circuit 'ghost' not found");
    assert!(manager.get_circuit_by_name("ghost").is_none());
}

#[tokio::test]
async fn test_control_requires_api_key_when_configured() {
    let manager = CircuitBreakerManager::default();
    manager.get_circuit("x", None).unwrap();
    let app = app_with(&manager, Some("s3cret"));

    let (status, _) = call(&app, control(json!({ "action": "open", "circuitName": "x" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = control(json!({ "action": "open", "circuitName": "x" }));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "OPEN");

    let (status, _) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let manager = CircuitBreakerManager::default();
    let app = app_with(&manager, None);

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    let id = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(id.len(), 36);
}

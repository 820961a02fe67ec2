use std::collections::BTreeMap;
use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AppState;
use crate::resilience::{CircuitMetrics, CircuitState, HealthStatus, StatsSummary};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub overall_health: bool,
    pub circuits: BTreeMap<String, HealthStatus>,
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub summary: StatsSummary,
    pub circuits: Vec<CircuitStats>,
}

#[derive(Debug, Serialize)]
pub struct CircuitStats {
    pub name: String,
    pub metrics: CircuitMetrics,
    pub health: HealthStatus,
}

/// Body of `POST /control`. Fields are optional so that missing ones map
/// to 400 instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    pub action: Option<String>,
    pub circuit_name: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Open,
    Close,
    Reset,
}

impl FromStr for ControlAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ControlAction::Open),
            "close" => Ok(ControlAction::Close),
            "reset" => Ok(ControlAction::Reset),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    pub success: bool,
    pub circuit_name: String,
    pub action: ControlAction,
    pub state: CircuitState,
    pub metrics: CircuitMetrics,
    pub health: HealthStatus,
}

/// Error returned by admin endpoints as `{"error": "..."}`.
#[derive(Debug)]
pub enum AdminError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AdminError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub async fn get_health(State(state): State<AppState>) -> Json<HealthReport> {
    let circuits = state.manager.health_status();
    Json(HealthReport {
        overall_health: circuits.values().all(|h| h.healthy),
        circuits,
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsReport> {
    let circuits: Vec<CircuitStats> = state
        .manager
        .snapshots()
        .into_iter()
        .map(|(name, (metrics, health))| CircuitStats {
            name,
            metrics,
            health,
        })
        .collect();

    Json(StatsReport {
        summary: StatsSummary::from_metrics(circuits.iter().map(|c| &c.metrics)),
        circuits,
    })
}

pub async fn control_circuit(
    State(state): State<AppState>,
    payload: Result<Json<ControlRequest>, JsonRejection>,
) -> Result<Json<ControlResponse>, AdminError> {
    let Json(request) = payload.map_err(|e| AdminError::BadRequest(e.body_text()))?;

    let action = request
        .action
        .as_deref()
        .ok_or_else(|| AdminError::BadRequest("missing field 'action'".to_string()))?;
    let circuit_name = request
        .circuit_name
        .ok_or_else(|| AdminError::BadRequest("missing field 'circuitName'".to_string()))?;
    let action = action.parse::<ControlAction>().map_err(|_| {
        AdminError::BadRequest(format!(
            "invalid action '{}', expected open, close or reset",
            action
        ))
    })?;

    let circuit = state
        .manager
        .get_circuit_by_name(&circuit_name)
        .ok_or_else(|| AdminError::NotFound(format!("circuit '{}' not found", circuit_name)))?;

    let reason = request
        .reason
        .unwrap_or_else(|| "manual override via admin API".to_string());
    match action {
        ControlAction::Open => circuit.force_open(reason.clone()),
        ControlAction::Close => circuit.force_close(reason.clone()),
        ControlAction::Reset => circuit.reset(),
    }

    tracing::info!(
        circuit = %circuit_name,
        action = ?action,
        reason = %reason,
        state = %circuit.state(),
        "Admin control applied"
    );

    Ok(Json(ControlResponse {
        success: true,
        circuit_name,
        action,
        state: circuit.state(),
        metrics: circuit.metrics(),
        health: circuit.health_status(),
    }))
}

//! Handlers for the instance lifecycle endpoints.
//!
//! Thin HTTP adapters over [`LifecycleController`]: extract state, call
//! the controller, serialize the outcome. All policy (idempotence, the
//! activity clock, status mapping) lives in the controller.

use axum::extract::State;
use axum::Json;
use renderd_cloud::lifecycle::OperationOutcome;
use renderd_core::activity::ActivityReport;
use renderd_core::error::CoreError;
use serde::Serialize;
use serde_json::json;

use crate::error::AppResult;
use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Which provider adapter is serving requests.
    pub service: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// GET / -- liveness probe, no provider calls.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.controller.service_name(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /status -- current instance status and activity timestamp.
///
/// A provider fault degrades to a `200` with `"status": "ERROR"` in the
/// body rather than an error response: callers poll this endpoint and a
/// transient API hiccup is information, not failure.
pub async fn status(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    match state.controller.status().await {
        Ok(report) => Ok(Json(serde_json::to_value(&report).map_err(|e| {
            CoreError::Internal(format!("Failed to encode status report: {e}"))
        })?)),
        Err(err @ (CoreError::Provider(_) | CoreError::Storage(_))) => {
            tracing::warn!(error = %err, "Status query failed at the provider");
            Ok(Json(json!({
                "status": "ERROR",
                "last_activity": state.controller.clock().last_activity(),
                "error": err.to_string(),
            })))
        }
        Err(err) => Err(err.into()),
    }
}

/// POST /start -- boot the instance (idempotent).
pub async fn start(State(state): State<AppState>) -> AppResult<Json<OperationOutcome>> {
    Ok(Json(state.controller.start().await?))
}

/// POST /stop -- stop the instance (idempotent).
pub async fn stop(State(state): State<AppState>) -> AppResult<Json<OperationOutcome>> {
    Ok(Json(state.controller.stop().await?))
}

/// POST /keep-alive -- reset the inactivity timer.
pub async fn keep_alive(State(state): State<AppState>) -> Json<OperationOutcome> {
    Json(state.controller.keep_alive())
}

/// GET /activity -- idle-clock report for the reclamation watchdog.
pub async fn activity(State(state): State<AppState>) -> Json<ActivityReport> {
    Json(state.controller.activity())
}

/// POST /terminate -- permanently destroy the instance.
///
/// Providers without a destroy operation reject this with `400`.
pub async fn terminate(State(state): State<AppState>) -> AppResult<Json<OperationOutcome>> {
    Ok(Json(state.controller.terminate().await?))
}

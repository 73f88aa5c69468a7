//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns 200 while the process is running and
//!   reports whether a key set is loaded
//! - `/ready`: Readiness probe - 503 until tokens can be verified

use crate::models::{HealthResponse, JwksState, ReadinessResponse, SERVICE_NAME};
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

fn jwks_state(state: &AppState) -> JwksState {
    let gate = &state.auth_gate;
    match gate.key_cache().status(gate.jwks_url()) {
        Some(status) if status.version.is_some() => JwksState::Loaded,
        _ => JwksState::Unavailable,
    }
}

/// Liveness probe handler.
///
/// Always 200: an unavailable key set is reported in the body, not as a
/// failure, so the process is not restarted while the auth server is down.
#[tracing::instrument(skip_all, name = "authly.health.liveness")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().timestamp(),
        service: SERVICE_NAME,
        jwks: jwks_state(&state),
    })
}

/// Readiness probe handler.
///
/// Returns 200 once a key set has been fetched, 503 before that.
#[tracing::instrument(skip_all, name = "authly.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match jwks_state(&state) {
        JwksState::Loaded => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                jwks: JwksState::Loaded,
                error: None,
            }),
        ),
        JwksState::Unavailable => {
            tracing::warn!(
                target: "authly.health",
                jwks_url = %state.auth_gate.jwks_url(),
                "Readiness check failed: no key set loaded"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    jwks: JwksState::Unavailable,
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}

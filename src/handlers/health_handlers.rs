//! Monitor & readiness handlers.
//!
//! - GET /api/v1/monitor -> liveness with the running version
//! - GET /api/v1/ready   -> readiness that checks store connectivity

use super::envelope;
use crate::{errors::AppError, state::AppState};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::warn;

/// `GET /monitor`
///
/// Liveness probe. Never performs I/O, so it answers even when the database
/// is down.
pub async fn monitor(State(state): State<AppState>) -> impl IntoResponse {
    envelope(
        StatusCode::OK,
        MonitorPayload {
            status: "sensor-metadata-api is running",
            version: state.version,
        },
    )
}

/// `GET /ready`
///
/// Readiness probe: 200 when the store answers a trivial query, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    match state.sensors.ping().await {
        Ok(()) => Ok(envelope(StatusCode::OK, ReadyPayload { status: "ok" })),
        Err(err) => {
            warn!(error = %err, "readiness check failed");
            Err(AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("storage unavailable: {}", err),
            ))
        }
    }
}

#[derive(Serialize)]
struct MonitorPayload {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ReadyPayload {
    status: &'static str,
}

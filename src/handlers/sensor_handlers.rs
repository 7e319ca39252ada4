//! HTTP handlers for sensor metadata.
//!
//! Bodies are taken as raw bytes and decoded here so that every decoding
//! failure, whatever its cause, becomes the same 400 `invalid JSON` envelope.

use super::{MessagePayload, envelope};
use crate::{
    errors::AppError,
    models::sensor::{NewSensor, SensorPatch},
    services::sensor_service::parse_body,
    state::AppState,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

/// `POST /sensor-metadata` - create a sensor.
pub async fn create_sensor(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: NewSensor = parse_body(&body).map_err(|err| {
        debug!(error = %err, "rejecting create body");
        AppError::bad_request("invalid JSON")
    })?;

    state
        .sensors
        .create(payload)
        .await
        .map_err(AppError::from_create)?;

    Ok(envelope(
        StatusCode::CREATED,
        MessagePayload {
            message: "successfully inserted sensor metadata",
        },
    ))
}

/// `GET /sensor-metadata/{name}` - fetch a sensor by name.
pub async fn get_sensor(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let sensor = state.sensors.get(&name).await.map_err(AppError::from_get)?;
    Ok(envelope(StatusCode::OK, sensor))
}

/// `PUT /sensor-metadata/{name}` - patch a sensor.
///
/// The body is decoded before the stored record is read, so a malformed body
/// never reaches the database.
pub async fn update_sensor(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let patch: SensorPatch = parse_body(&body).map_err(|err| {
        debug!(error = %err, "rejecting update body");
        AppError::bad_request("invalid JSON")
    })?;

    state
        .sensors
        .update(&name, patch)
        .await
        .map_err(AppError::from_update)?;

    Ok(envelope(
        StatusCode::OK,
        MessagePayload {
            message: "successfully updated sensor metadata",
        },
    ))
}

//! HTTP handlers. Every response body, success or error, uses the same
//! `{code, payload}` envelope.

use axum::{Json, http::StatusCode};
use serde::Serialize;

pub mod health_handlers;
pub mod sensor_handlers;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub payload: T,
}

#[derive(Debug, Serialize)]
pub struct MessagePayload {
    pub message: &'static str,
}

/// Wrap `payload` in the envelope and pair it with `status`.
pub fn envelope<T: Serialize>(status: StatusCode, payload: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        status,
        Json(Envelope {
            code: status.as_u16(),
            payload,
        }),
    )
}

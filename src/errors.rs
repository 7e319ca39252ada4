use crate::services::sensor_service::SensorError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// An HTTP-facing error: a status code plus the message placed in the
/// `{code, payload: {error}}` envelope.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Map a failed create. Conflicts count as storage failures.
    pub fn from_create(err: SensorError) -> Self {
        match err {
            SensorError::InvalidInput(msg) => Self::bad_request(msg),
            other => {
                error!(error = %other, "create sensor metadata failed");
                Self::internal(format!("failed to insert sensor metadata: {}", other))
            }
        }
    }

    /// Map a failed lookup.
    pub fn from_get(err: SensorError) -> Self {
        match err {
            SensorError::NotFound(_) => Self::not_found("sensor metadata not found"),
            SensorError::InvalidInput(msg) => Self::bad_request(msg),
            other => {
                error!(error = %other, "fetch sensor metadata failed");
                Self::internal("failed to fetch sensor metadata")
            }
        }
    }

    /// Map a failed update. Only a miss on the initial fetch is a 404.
    pub fn from_update(err: SensorError) -> Self {
        match err {
            SensorError::NotFound(_) => Self::not_found("sensor metadata not found"),
            SensorError::InvalidInput(msg) => Self::bad_request(msg),
            other => {
                error!(error = %other, "update sensor metadata failed");
                Self::internal("failed to update sensor metadata")
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.status.as_u16(),
            "payload": { "error": self.message }
        }));

        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn create_conflict_is_internal_error() {
        let err = AppError::from_create(SensorError::Conflict("dup".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.starts_with("failed to insert sensor metadata: "));
    }

    #[test]
    fn invalid_input_is_bad_request_everywhere() {
        for err in [
            AppError::from_create(SensorError::InvalidInput("x".into())),
            AppError::from_get(SensorError::InvalidInput("x".into())),
            AppError::from_update(SensorError::InvalidInput("x".into())),
        ] {
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn update_storage_not_found_is_internal_error() {
        let err = AppError::from_update(SensorError::Storage(StoreError::NotFound("gone".into())));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "failed to update sensor metadata");
    }

    #[test]
    fn get_storage_failure_is_internal_error() {
        let err = AppError::from_get(SensorError::Storage(StoreError::Sqlx(sqlx::Error::PoolClosed)));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "failed to fetch sensor metadata");
    }
}

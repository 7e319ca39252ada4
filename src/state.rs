//! Shared application state handed to every handler.

use crate::services::sensor_service::SensorService;

/// Constructed once at startup and cloned per request by axum.
#[derive(Clone)]
pub struct AppState {
    pub sensors: SensorService,

    /// Version string reported by the monitor endpoint.
    pub version: &'static str,
}

impl AppState {
    pub fn new(sensors: SensorService) -> Self {
        Self {
            sensors,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

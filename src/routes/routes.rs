//! Defines routes for the sensor metadata API.
//!
//! ## Structure
//! All endpoints live under `/api/v1`:
//!   - `GET  /monitor` - liveness + version
//!   - `GET  /ready` - readiness (store connectivity)
//!   - `POST /sensor-metadata` - create sensor
//!   - `GET  /sensor-metadata/{name}` - fetch sensor
//!   - `PUT  /sensor-metadata/{name}` - patch sensor
//!
//! Every request gets an `x-request-id` (generated if the client sent none),
//! a tracing span carrying it, permissive CORS headers and a uniform timeout.

use crate::{
    handlers::{
        health_handlers::{monitor, ready},
        sensor_handlers::{create_sensor, get_sensor, update_sensor},
    },
    state::AppState,
};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
    routing::{get, post},
};
use std::time::Duration;
use tower_http::{
    LatencyUnit,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info_span};

/// Routes mounted under `/api/v1`, still waiting for their state.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/monitor", get(monitor))
        .route("/ready", get(ready))
        .route("/sensor-metadata", post(create_sensor))
        .route(
            "/sensor-metadata/{name}",
            get(get_sensor).put(update_sensor),
        )
}

/// Build the complete application: versioned routes, shared state and the
/// middleware stack.
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::HEAD,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            info_span!(
                "request",
                request_id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
            )
        })
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    // Layers wrap outward: the request id is set first and seen by everything below.
    Router::new()
        .nest("/api/v1", routes())
        .with_state(state)
        .layer(timeout_layer(request_timeout))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(trace)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Requests running past `request_timeout` are answered with 408.
fn timeout_layer(request_timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout)
}

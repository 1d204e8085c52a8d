use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;
use crate::store::migrate;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
}

pub async fn health_check(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let start = Instant::now();
    let schema_version = migrate::get_current_version(state.store());
    let latency_us = start.elapsed().as_micros() as u64;
    let healthy = schema_version.is_ok();

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if healthy { "ok" } else { "degraded" },
            "uptimeSecs": state.uptime_secs(),
            "store": {
                "healthy": healthy,
                "latencyUs": latency_us,
                "schemaVersion": schema_version.ok(),
            }
        })),
    )
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

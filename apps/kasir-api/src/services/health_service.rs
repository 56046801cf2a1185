//! Liveness endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new().route("/health", get(health))
}

/// `200` with the database reachable, `503` otherwise.
async fn health(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    if state.db.health_check().await {
        (
            StatusCode::OK,
            Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": "unreachable" })),
        )
    }
}

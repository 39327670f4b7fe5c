// src/routes/health.rs
//! Liveness endpoint.
//!
//! `GET /health` answers without touching the insights collaborator. Besides
//! the static `ok` it reports the current dashboard phase, which makes it
//! handy for scripts waiting on an upload.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    phase: &'static str,
}

/// Handle `GET /health`.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let phase = state.session().phase();
    Json(HealthResponse { status: "ok", phase })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

//! Read and reset the current dashboard.

use axum::{extract::State, routing::get, routing::post, Json, Router};
use tracing::info;

use super::AppState;
use crate::session::DashboardState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/dashboard", get(current))
        .route("/api/dashboard/reset", post(reset))
}

async fn current(State(state): State<AppState>) -> Json<DashboardState> {
    let snapshot = state.session().clone();
    Json(snapshot)
}

/// Drop all held data and return to `awaiting-input`. Valid from every phase.
async fn reset(State(state): State<AppState>) -> Json<DashboardState> {
    // ---
    info!("POST /api/dashboard/reset");
    let mut session = state.session();
    session.reset();
    Json(session.clone())
}

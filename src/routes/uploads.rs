//! Upload endpoints: run the full pipeline for a set of CSV files.
//!
//! Each upload walks the session through upload-received, parse-complete or
//! parse-failed, and finally insights-resolved. The collaborator call happens
//! between the last two steps with the session unlocked.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, response::Response, routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AppState;
use crate::error::TransitionError;
use crate::insights::generate_insights;
use crate::pipeline::{prepare, UploadedFile};
use crate::sample::sample_upload;
use crate::session::{Dashboard, SessionEvent};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/uploads", post(upload))
        .route("/api/uploads/sample", post(upload_sample))
}

/// Body of `POST /api/uploads`.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    files: Vec<UploadedFile>,
}

/// Error body for refused or failed uploads.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    phase: &'static str,
}

async fn upload(State(state): State<AppState>, Json(body): Json<UploadRequest>) -> Response {
    // ---
    info!("POST /api/uploads - {} file(s)", body.files.len());
    run_upload(state, body.files).await
}

async fn upload_sample(State(state): State<AppState>) -> Response {
    // ---
    info!("POST /api/uploads/sample");
    run_upload(state, sample_upload()).await
}

async fn run_upload(state: AppState, files: Vec<UploadedFile>) -> Response {
    // ---
    let upload_id = Uuid::new_v4();
    let policy = state.config.upload_policy;

    // Step 1: claim the session
    debug!("Upload {} - Step 1", upload_id);
    let received = state
        .session()
        .apply(SessionEvent::UploadReceived { upload_id }, policy);
    if let Err(e) = received {
        warn!("Upload {} refused: {}", upload_id, e);
        return conflict(&state, e);
    }

    // Step 2: parse, assemble and aggregate
    debug!("Upload {} - Step 2", upload_id);
    let prepared = match prepare(&files, &state.config.thresholds) {
        Ok(prepared) => prepared,
        Err(e) => {
            warn!("Upload {} has no usable data: {}", upload_id, e);
            let message = e.to_string();
            let failed = state.session().apply(
                SessionEvent::ParseFailed {
                    upload_id,
                    message: message.clone(),
                },
                policy,
            );
            if let Err(e) = failed {
                return conflict(&state, e);
            }
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    error: message,
                    phase: "failed",
                }),
            )
                .into_response();
        }
    };

    let dashboard = Dashboard::new(upload_id, prepared.series, prepared.stats);
    let parsed = state
        .session()
        .apply(SessionEvent::ParseComplete(dashboard.clone()), policy);
    if let Err(e) = parsed {
        return conflict(&state, e);
    }

    // Step 3: insights, with the session unlocked
    debug!("Upload {} - Step 3", upload_id);
    let insights = generate_insights(
        &dashboard.readings,
        &dashboard.stats,
        &state.config.thresholds,
        state.collaborator.as_deref(),
    )
    .await;

    let resolved = state
        .session()
        .apply(SessionEvent::InsightsResolved { upload_id, insights }, policy);
    if let Err(e) = resolved {
        return conflict(&state, e);
    }

    info!(
        "Upload {} complete: {} readings from {}",
        upload_id, dashboard.reading_count, dashboard.source_label
    );
    let snapshot = state.session().clone();
    (StatusCode::OK, Json(snapshot)).into_response()
}

fn conflict(state: &AppState, error: TransitionError) -> Response {
    // ---
    let phase = state.session().phase();
    (
        StatusCode::CONFLICT,
        Json(ErrorBody {
            error: error.to_string(),
            phase,
        }),
    )
        .into_response()
}

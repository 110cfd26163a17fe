use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::info;

use crate::errors::AppError;
use crate::models::{RunRecord, RunReport};
use crate::services::run_tracker::RetryPolicy;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(trigger_run))
        .route("/last", get(last_run))
}

/// GET /api/runs/last - Outcome of the most recent run
async fn last_run(State(state): State<AppState>) -> Result<Json<RunRecord>, AppError> {
    state.tracker.last_run().map(Json).ok_or(AppError::NotFound)
}

/// POST /api/runs - Run the pipeline now, without retries
async fn trigger_run(State(state): State<AppState>) -> Result<Json<RunReport>, AppError> {
    info!("POST /api/runs - Manual run requested");
    let report = state
        .tracker
        .run_exclusive("manual", RetryPolicy::none())
        .await?;
    Ok(Json(report))
}

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::RunStatus;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    running: bool,
    last_run_status: Option<RunStatus>,
    last_run_completed_at: Option<DateTime<Utc>>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

/// GET /health - Liveness plus where the pipeline stands
async fn health(State(state): State<AppState>) -> Json<Health> {
    let last = state.tracker.last_run();

    Json(Health {
        status: "ok",
        running: state.tracker.is_running(),
        last_run_status: last.as_ref().map(|r| r.status),
        last_run_completed_at: last.map(|r| r.completed_at),
    })
}

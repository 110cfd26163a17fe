use axum::Router;

use crate::routes::{health, runs};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/runs", runs::router())
        .with_state(state)
}

use std::sync::Arc;
use crate::services::run_tracker::RunTracker;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<RunTracker>,
}

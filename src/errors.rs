use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;

use crate::db::warehouse::WarehouseError;
use crate::external::quote_source::QuoteSourceError;
use crate::services::handoff::HandoffError;

/// Failure of a pipeline step. Every variant aborts the run; retries belong to
/// whoever scheduled it.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("quote source unavailable: {0}")]
    SourceUnavailable(QuoteSourceError),

    #[error("invalid timestamp {value:?} in upstream record {index}")]
    InvalidTimestamp { index: usize, value: String },

    #[error("warehouse access error: {0}")]
    WarehouseAccess(#[from] WarehouseError),

    #[error("load aborted, none of {attempted} rows committed: {source}")]
    LoadPartialFailure {
        attempted: usize,
        #[source]
        source: WarehouseError,
    },

    #[error("hand-off error: {0}")]
    Handoff(#[from] HandoffError),

    #[error("preflight check failed: {0}")]
    Preflight(String),

    #[error("a pipeline run is already in progress")]
    AlreadyRunning,
}

impl From<QuoteSourceError> for EtlError {
    fn from(value: QuoteSourceError) -> Self {
        match value {
            QuoteSourceError::InvalidDate { index, value } => {
                EtlError::InvalidTimestamp { index, value }
            }
            other => EtlError::SourceUnavailable(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("External error: {0}")]
    External(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            AppError::External(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
        }
    }
}

impl From<EtlError> for AppError {
    fn from(value: EtlError) -> Self {
        match value {
            EtlError::AlreadyRunning => AppError::Conflict(value.to_string()),
            other => AppError::External(other.to_string()),
        }
    }
}

use async_trait::async_trait;
use thiserror::Error;

use crate::models::QuoteRecord;

#[derive(Debug, Error)]
pub enum QuoteSourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned status {status}")]
    Unavailable { status: u16 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid observation date {value:?} in record {index}")]
    InvalidDate { index: usize, value: String },

    #[error("upstream returned no quotes")]
    Empty,
}

/// Upstream provider of the full quote history.
///
/// The endpoint offers no server-side filtering, so every call returns the
/// entire history and callers filter on their side.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quotes(&self) -> Result<Vec<QuoteRecord>, QuoteSourceError>;
}

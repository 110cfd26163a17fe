use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{TableRef, TransformedRecord};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("failed to connect to warehouse: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("warehouse query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// One open warehouse session.
///
/// The primitives the pipeline needs from the store: catalog lookup, the
/// watermark aggregate, table creation and an all-or-nothing append.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn ping(&self) -> Result<(), WarehouseError>;

    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError>;

    /// `MAX(updated_at)`; `None` when the table holds no rows.
    async fn max_updated_at(&self, table: &TableRef)
        -> Result<Option<NaiveDateTime>, WarehouseError>;

    async fn create_table(&self, table: &TableRef) -> Result<(), WarehouseError>;

    /// Insert every record inside a single transaction. Either all rows are
    /// committed or none are.
    async fn append(
        &self,
        table: &TableRef,
        records: &[TransformedRecord],
    ) -> Result<u64, WarehouseError>;
}

/// Opens a fresh session per pipeline step; sessions are never shared.
#[async_trait]
pub trait WarehouseConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Warehouse>, WarehouseError>;
}

use tracing::{error, info};

use crate::db::warehouse::WarehouseConnector;
use crate::errors::EtlError;
use crate::models::{LoadReport, TableRef, TransformedRecord};
use crate::services::watermark_service;

/// Append a transformed batch to the warehouse table.
///
/// An empty batch returns immediately without opening a connection. Otherwise
/// the table is created if missing and the rows go in as one transaction.
///
/// The exists-then-create sequence is not atomic. Concurrent first runs
/// against an empty warehouse may both try to create the table; runs are
/// expected to be serialized by the scheduler.
pub async fn load(
    connector: &dyn WarehouseConnector,
    table: &TableRef,
    records: &[TransformedRecord],
) -> Result<LoadReport, EtlError> {
    if records.is_empty() {
        info!("No new rows for {}, nothing to load", table);
        return Ok(LoadReport::default());
    }

    let warehouse = connector.connect().await?;

    let mut table_created = false;
    if !watermark_service::table_exists(warehouse.as_ref(), table).await? {
        warehouse.create_table(table).await.map_err(|e| {
            error!("Failed to create table {}: {}", table, e);
            e
        })?;
        table_created = true;
    }

    info!("Loading {} rows into {}", records.len(), table);

    let rows_inserted = warehouse.append(table, records).await.map_err(|e| {
        error!("Failed to load data into {}: {}", table, e);
        EtlError::LoadPartialFailure {
            attempted: records.len(),
            source: e,
        }
    })?;

    info!("✅ Loaded {} rows into {}", rows_inserted, table);
    Ok(LoadReport {
        rows_inserted,
        table_created,
    })
}

use chrono::NaiveDateTime;
use tracing::{error, info};

use crate::db::warehouse::{Warehouse, WarehouseError};
use crate::models::TableRef;

pub async fn table_exists(warehouse: &dyn Warehouse, table: &TableRef) -> Result<bool, WarehouseError> {
    warehouse.table_exists(table).await.map_err(|e| {
        error!("Failed to check whether {} exists: {}", table, e);
        e
    })
}

/// Latest recorded `updated_at`, or `None` when the table is missing or empty.
///
/// The aggregate is only issued once the catalog confirms the table exists,
/// so a first run never queries a missing relation.
pub async fn last_timestamp(
    warehouse: &dyn Warehouse,
    table: &TableRef,
) -> Result<Option<NaiveDateTime>, WarehouseError> {
    if !table_exists(warehouse, table).await? {
        info!("Table {} does not exist, a full load will be performed", table);
        return Ok(None);
    }

    let last = warehouse.max_updated_at(table).await.map_err(|e| {
        error!("Failed to read the watermark of {}: {}", table, e);
        e
    })?;

    match last {
        Some(ts) => info!("Last recorded timestamp in {}: {}", table, ts),
        None => info!("Table {} is empty, a full load will be performed", table),
    }
    Ok(last)
}

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, info};

use crate::config::WarehouseSettings;
use crate::db::warehouse::{Warehouse, WarehouseConnector, WarehouseError};
use crate::models::{TableRef, TransformedRecord};

// 6 binds per row keeps each statement far below the 65535 bind limit
pub const INSERT_CHUNK_ROWS: usize = 1000;

pub fn create_table_sql(table: &TableRef) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            type_id INTEGER,
            type_desc VARCHAR(50),
            buy_price FLOAT,
            sell_price FLOAT,
            avg_price FLOAT,
            updated_at TIMESTAMP
        )
        "#,
        table.qualified()
    )
}

pub fn max_updated_at_sql(table: &TableRef) -> String {
    format!("SELECT MAX(updated_at) FROM {}", table.qualified())
}

pub fn insert_prefix_sql(table: &TableRef) -> String {
    format!(
        "INSERT INTO {} (type_id, type_desc, buy_price, sell_price, avg_price, updated_at) ",
        table.qualified()
    )
}

/// Split a batch into the row groups sent as one `INSERT` each.
pub fn insert_chunks(records: &[TransformedRecord]) -> std::slice::Chunks<'_, TransformedRecord> {
    records.chunks(INSERT_CHUNK_ROWS)
}

/// Multi-row `INSERT ... VALUES` for one chunk, six binds per row.
pub fn insert_chunk_query(
    table: &TableRef,
    chunk: &[TransformedRecord],
) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(insert_prefix_sql(table));
    builder.push_values(chunk, |mut row, r| {
        row.push_bind(r.type_id)
            .push_bind(r.type_desc.clone())
            .push_bind(r.buy_price)
            .push_bind(r.sell_price)
            .push_bind(r.avg_price)
            .push_bind(r.updated_at);
    });
    builder
}

pub struct RedshiftConnector {
    settings: WarehouseSettings,
}

impl RedshiftConnector {
    pub fn new(settings: WarehouseSettings) -> Self {
        Self { settings }
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.settings.host)
            .port(self.settings.port)
            .database(&self.settings.database)
            .username(&self.settings.user)
            .password(&self.settings.password)
    }
}

#[async_trait]
impl WarehouseConnector for RedshiftConnector {
    async fn connect(&self) -> Result<Box<dyn Warehouse>, WarehouseError> {
        let timeout_ms = self.settings.query_timeout.as_millis();

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.settings.query_timeout)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute(format!("SET statement_timeout TO {}", timeout_ms).as_str())
                        .await?;
                    Ok(())
                })
            })
            .connect_with(self.connect_options())
            .await
            .map_err(|e| {
                error!(
                    "Failed to connect to warehouse {}:{}/{}: {}",
                    self.settings.host, self.settings.port, self.settings.database, e
                );
                WarehouseError::Connect(e)
            })?;

        debug!(
            "Connected to warehouse {}:{}/{}",
            self.settings.host, self.settings.port, self.settings.database
        );
        Ok(Box::new(RedshiftWarehouse { pool }))
    }
}

pub struct RedshiftWarehouse {
    pool: PgPool,
}

#[async_trait]
impl Warehouse for RedshiftWarehouse {
    async fn ping(&self) -> Result<(), WarehouseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM information_schema.tables
            WHERE table_schema = $1
              AND table_name = $2
            "#,
        )
        .bind(&table.schema)
        .bind(&table.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn max_updated_at(
        &self,
        table: &TableRef,
    ) -> Result<Option<NaiveDateTime>, WarehouseError> {
        let max: Option<NaiveDateTime> = sqlx::query_scalar(&max_updated_at_sql(table))
            .fetch_one(&self.pool)
            .await?;

        Ok(max)
    }

    async fn create_table(&self, table: &TableRef) -> Result<(), WarehouseError> {
        sqlx::query(&create_table_sql(table))
            .execute(&self.pool)
            .await?;
        info!("Table {} created", table);
        Ok(())
    }

    async fn append(
        &self,
        table: &TableRef,
        records: &[TransformedRecord],
    ) -> Result<u64, WarehouseError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction for {}: {}", table, e);
            e
        })?;

        let mut inserted = 0u64;
        for (i, chunk) in insert_chunks(records).enumerate() {
            let mut builder = insert_chunk_query(table, chunk);

            // Dropping `tx` without commit rolls the whole batch back
            let result = builder.build().execute(&mut *tx).await.map_err(|e| {
                error!(
                    "Failed to insert chunk {} ({} rows) into {}: {}",
                    i,
                    chunk.len(),
                    table,
                    e
                );
                e
            })?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction for {}: {}", table, e);
            e
        })?;

        Ok(inserted)
    }
}

//! In-memory stand-ins for the upstream API and the warehouse.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use tokio::sync::Notify;

use dolar_etl::db::redshift::insert_chunks;
use dolar_etl::db::warehouse::{Warehouse, WarehouseConnector, WarehouseError};
use dolar_etl::external::quote_source::{QuoteSource, QuoteSourceError};
use dolar_etl::models::{QuoteRecord, TableRef, TransformedRecord};
use dolar_etl::services::handoff::{HandoffStore, MemoryHandoff};
use dolar_etl::services::pipeline_service::Pipeline;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn quote(house: &str, buy: f64, sell: f64, date: NaiveDateTime) -> QuoteRecord {
    QuoteRecord {
        date,
        house_code: house.to_string(),
        buy_price: Some(buy),
        sell_price: Some(sell),
    }
}

pub fn table() -> TableRef {
    TableRef::new("2024_fx_schema", "cotizaciones_dolares")
}

#[derive(Default)]
pub struct FakeSource {
    quotes: Vec<QuoteRecord>,
    // Every call fails with this status
    status: Option<u16>,
    // The first N calls fail with 503
    failures_remaining: AtomicU32,
    // When set, each call waits for a notification before answering
    gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_quotes(quotes: Vec<QuoteRecord>) -> Self {
        Self {
            quotes,
            ..Default::default()
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn flaky(quotes: Vec<QuoteRecord>, failures: u32) -> Self {
        Self {
            quotes,
            failures_remaining: AtomicU32::new(failures),
            ..Default::default()
        }
    }

    pub fn gated(quotes: Vec<QuoteRecord>, gate: Arc<Notify>) -> Self {
        Self {
            quotes,
            gate: Some(gate),
            ..Default::default()
        }
    }
}

#[async_trait]
impl QuoteSource for FakeSource {
    async fn fetch_quotes(&self) -> Result<Vec<QuoteRecord>, QuoteSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(status) = self.status {
            return Err(QuoteSourceError::Unavailable { status });
        }
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(QuoteSourceError::Unavailable { status: 503 });
        }
        if self.quotes.is_empty() {
            return Err(QuoteSourceError::Empty);
        }
        Ok(self.quotes.clone())
    }
}

#[derive(Default)]
pub struct WarehouseState {
    pub tables: HashMap<String, Vec<TransformedRecord>>,
    pub connects: usize,
    pub creates: usize,
    pub appends: usize,
    pub unreachable: bool,
    // Chunk index (per append) whose INSERT fails; earlier chunks stay staged
    pub fail_on_chunk: Option<usize>,
    // Rows written by chunks of the last append, before commit or rollback
    pub staged_before_failure: usize,
}

/// Shared warehouse; every `connect` hands out a session over the same state.
#[derive(Clone, Default)]
pub struct FakeWarehouse {
    pub state: Arc<Mutex<WarehouseState>>,
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(table: &TableRef, rows: Vec<TransformedRecord>) -> Self {
        let warehouse = Self::new();
        warehouse.state.lock().tables.insert(table.qualified(), rows);
        warehouse
    }

    pub fn rows(&self, table: &TableRef) -> Option<Vec<TransformedRecord>> {
        self.state.lock().tables.get(&table.qualified()).cloned()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    pub fn set_fail_appends(&self, fail: bool) {
        self.set_fail_on_chunk(fail.then_some(0));
    }

    pub fn set_fail_on_chunk(&self, chunk: Option<usize>) {
        self.state.lock().fail_on_chunk = chunk;
    }

    pub fn staged_before_failure(&self) -> usize {
        self.state.lock().staged_before_failure
    }
}

#[async_trait]
impl WarehouseConnector for FakeWarehouse {
    async fn connect(&self) -> Result<Box<dyn Warehouse>, WarehouseError> {
        let mut state = self.state.lock();
        if state.unreachable {
            return Err(WarehouseError::Connect(sqlx::Error::PoolTimedOut));
        }
        state.connects += 1;
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<WarehouseState>>,
}

#[async_trait]
impl Warehouse for FakeSession {
    async fn ping(&self) -> Result<(), WarehouseError> {
        Ok(())
    }

    async fn table_exists(&self, table: &TableRef) -> Result<bool, WarehouseError> {
        Ok(self.state.lock().tables.contains_key(&table.qualified()))
    }

    async fn max_updated_at(
        &self,
        table: &TableRef,
    ) -> Result<Option<NaiveDateTime>, WarehouseError> {
        let state = self.state.lock();
        let rows = state.tables.get(&table.qualified()).ok_or_else(|| {
            WarehouseError::Query(sqlx::Error::Protocol(format!(
                "relation {} does not exist",
                table
            )))
        })?;
        Ok(rows.iter().map(|r| r.updated_at).max())
    }

    async fn create_table(&self, table: &TableRef) -> Result<(), WarehouseError> {
        let mut state = self.state.lock();
        state.creates += 1;
        state.tables.entry(table.qualified()).or_default();
        Ok(())
    }

    async fn append(
        &self,
        table: &TableRef,
        records: &[TransformedRecord],
    ) -> Result<u64, WarehouseError> {
        let mut state = self.state.lock();
        if !state.tables.contains_key(&table.qualified()) {
            return Err(WarehouseError::Query(sqlx::Error::Protocol(format!(
                "relation {} does not exist",
                table
            ))));
        }

        // Chunks land in a transaction-local buffer and only publish on commit
        let mut staged: Vec<TransformedRecord> = Vec::new();
        for (i, chunk) in insert_chunks(records).enumerate() {
            if state.fail_on_chunk == Some(i) {
                state.staged_before_failure = staged.len();
                return Err(WarehouseError::Query(sqlx::Error::Protocol(
                    "value too long for type character varying(50)".to_string(),
                )));
            }
            staged.extend(chunk.iter().cloned());
        }

        state.appends += 1;
        state.staged_before_failure = 0;
        let inserted = staged.len() as u64;
        if let Some(rows) = state.tables.get_mut(&table.qualified()) {
            rows.extend(staged);
        }
        Ok(inserted)
    }
}

pub fn pipeline(source: FakeSource, warehouse: &FakeWarehouse) -> Pipeline {
    pipeline_with_handoff(source, warehouse, Arc::new(MemoryHandoff::new()))
}

pub fn pipeline_with_handoff(
    source: FakeSource,
    warehouse: &FakeWarehouse,
    handoff: Arc<dyn HandoffStore>,
) -> Pipeline {
    Pipeline::new(
        Arc::new(source),
        Arc::new(warehouse.clone()),
        handoff,
        table(),
    )
}

//! Step sequencing for the daily quotes load.
//!
//! The four steps run in a fixed order: `run-tests`, `extract`, `transform`,
//! `load`. Steps never call each other; each reads the previous step's output
//! from the hand-off store and publishes its own under its step name, so the
//! same code serves an in-process run and one-process-per-step execution.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::warehouse::WarehouseConnector;
use crate::errors::EtlError;
use crate::external::quote_source::QuoteSource;
use crate::models::{LoadReport, QuoteRecord, RunReport, TableRef, TransformedRecord};
use crate::services::handoff::{self, HandoffStore};
use crate::services::{extract_service, load_service, transform_service};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Step {
    RunTests,
    Extract,
    Transform,
    Load,
}

impl Step {
    pub const SEQUENCE: [Step; 4] = [Step::RunTests, Step::Extract, Step::Transform, Step::Load];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::RunTests => "run-tests",
            Step::Extract => "extract",
            Step::Transform => "transform",
            Step::Load => "load",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::SEQUENCE
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown step: {}", s))
    }
}

// What `extract` publishes; the watermark travels along for the run report
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExtractSlot {
    watermark: Option<NaiveDateTime>,
    fetched: usize,
    records: Vec<QuoteRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Checked,
    Extracted {
        watermark: Option<NaiveDateTime>,
        fetched: usize,
        kept: usize,
    },
    Transformed {
        rows: usize,
        unmapped: usize,
    },
    Loaded(LoadReport),
}

pub struct Pipeline {
    source: Arc<dyn QuoteSource>,
    connector: Arc<dyn WarehouseConnector>,
    handoff: Arc<dyn HandoffStore>,
    table: TableRef,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        connector: Arc<dyn WarehouseConnector>,
        handoff: Arc<dyn HandoffStore>,
        table: TableRef,
    ) -> Self {
        Self {
            source,
            connector,
            handoff,
            table,
        }
    }

    pub async fn run_step(&self, step: Step) -> Result<StepOutcome, EtlError> {
        info!("▶ Step {}", step);
        match step {
            Step::RunTests => self.preflight().await,
            Step::Extract => self.extract_step().await,
            Step::Transform => self.transform_step().await,
            Step::Load => self.load_step().await,
        }
    }

    /// All four steps in order; the first failure aborts the run.
    pub async fn run(&self) -> Result<RunReport, EtlError> {
        let started_at = Utc::now();
        let mut report = RunReport::default();

        for step in Step::SEQUENCE {
            match self.run_step(step).await? {
                StepOutcome::Checked => {}
                StepOutcome::Extracted {
                    watermark,
                    fetched,
                    kept,
                } => {
                    report.watermark = watermark;
                    report.fetched = fetched;
                    report.extracted = kept;
                }
                StepOutcome::Transformed { unmapped, .. } => report.unmapped = unmapped,
                StepOutcome::Loaded(load) => {
                    report.inserted = load.rows_inserted;
                    report.table_created = load.table_created;
                }
            }
        }

        report.duration_ms = (Utc::now() - started_at).num_milliseconds();
        info!(
            "Run finished: watermark={:?} fetched={} extracted={} unmapped={} inserted={} table_created={} ({}ms)",
            report.watermark,
            report.fetched,
            report.extracted,
            report.unmapped,
            report.inserted,
            report.table_created,
            report.duration_ms
        );
        Ok(report)
    }

    async fn preflight(&self) -> Result<StepOutcome, EtlError> {
        self.table.validate().map_err(EtlError::Preflight)?;
        check_transform_contract()?;

        let warehouse = self.connector.connect().await?;
        warehouse.ping().await?;

        info!("Preflight checks passed for {}", self.table);
        Ok(StepOutcome::Checked)
    }

    async fn extract_step(&self) -> Result<StepOutcome, EtlError> {
        let extraction =
            extract_service::extract(self.source.as_ref(), self.connector.as_ref(), &self.table)
                .await?;

        let slot = ExtractSlot {
            watermark: extraction.watermark,
            fetched: extraction.fetched,
            records: extraction.records,
        };
        handoff::put_typed(self.handoff.as_ref(), Step::Extract.as_str(), &slot).await?;

        Ok(StepOutcome::Extracted {
            watermark: slot.watermark,
            fetched: slot.fetched,
            kept: slot.records.len(),
        })
    }

    async fn transform_step(&self) -> Result<StepOutcome, EtlError> {
        let slot: ExtractSlot =
            handoff::get_typed(self.handoff.as_ref(), Step::Extract.as_str()).await?;

        let rows = transform_service::transform(slot.records);
        let unmapped = rows.iter().filter(|r| r.type_id.is_none()).count();

        handoff::put_typed(self.handoff.as_ref(), Step::Transform.as_str(), &rows).await?;

        Ok(StepOutcome::Transformed {
            rows: rows.len(),
            unmapped,
        })
    }

    async fn load_step(&self) -> Result<StepOutcome, EtlError> {
        let rows: Vec<TransformedRecord> =
            handoff::get_typed(self.handoff.as_ref(), Step::Transform.as_str()).await?;

        let report = load_service::load(self.connector.as_ref(), &self.table, &rows).await?;

        // A committed batch must not be loadable a second time
        self.handoff.remove(Step::Transform.as_str()).await?;

        Ok(StepOutcome::Loaded(report))
    }
}

fn check_transform_contract() -> Result<(), EtlError> {
    let date = NaiveDate::from_ymd_opt(2024, 10, 15)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| EtlError::Preflight("invalid canned date".to_string()))?;

    let row = transform_service::transform_record(QuoteRecord {
        date,
        house_code: "oficial".to_string(),
        buy_price: Some(900.0),
        sell_price: Some(920.0),
    });

    if row.type_id != Some(0) || row.avg_price != Some(910.0) || row.updated_at != date {
        return Err(EtlError::Preflight(format!(
            "canned oficial quote transformed to {:?}",
            row
        )));
    }
    Ok(())
}

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_inserted: u64,
    pub table_created: bool,
}

/// Summary of one full extract → transform → load pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub watermark: Option<NaiveDateTime>,
    pub fetched: usize,
    pub extracted: usize,
    pub unmapped: usize,
    pub inserted: u64,
    pub table_created: bool,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub trigger: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub status: RunStatus,
    pub attempts: u32,
    pub report: Option<RunReport>,
    pub error_message: Option<String>,
}

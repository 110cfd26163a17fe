use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::errors::EtlError;
use crate::models::{RunRecord, RunReport, RunStatus};
use crate::services::pipeline_service::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Serializes pipeline runs and remembers how the last one ended.
///
/// At most one run is in flight at a time. A trigger arriving while a run
/// (including its retries) is still going is rejected rather than queued,
/// since the load step assumes a single writer.
pub struct RunTracker {
    pipeline: Arc<Pipeline>,
    running: tokio::sync::Mutex<()>,
    last_run: Mutex<Option<RunRecord>>,
}

impl RunTracker {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            running: tokio::sync::Mutex::new(()),
            last_run: Mutex::new(None),
        }
    }

    pub fn last_run(&self) -> Option<RunRecord> {
        self.last_run.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    pub async fn run_exclusive(
        &self,
        trigger: &str,
        policy: RetryPolicy,
    ) -> Result<RunReport, EtlError> {
        let _guard = self.running.try_lock().map_err(|_| {
            warn!("Rejected {} trigger: a run is already in progress", trigger);
            EtlError::AlreadyRunning
        })?;

        let started_at = Utc::now();
        let mut attempts = 0;

        let result = loop {
            attempts += 1;
            match self.pipeline.run().await {
                Ok(report) => break Ok(report),
                Err(e) if attempts <= policy.retries => {
                    warn!(
                        "Run attempt {}/{} failed: {}. Retrying in {}s",
                        attempts,
                        policy.retries + 1,
                        e,
                        policy.delay.as_secs()
                    );
                    sleep(policy.delay).await;
                }
                Err(e) => break Err(e),
            }
        };

        let record = RunRecord {
            trigger: trigger.to_string(),
            started_at,
            completed_at: Utc::now(),
            status: if result.is_ok() { RunStatus::Success } else { RunStatus::Failed },
            attempts,
            report: result.as_ref().ok().cloned(),
            error_message: result.as_ref().err().map(|e| e.to_string()),
        };

        match &result {
            Ok(_) => info!("Run triggered by {} succeeded after {} attempt(s)", trigger, attempts),
            Err(e) => error!("Run triggered by {} failed after {} attempt(s): {}", trigger, attempts, e),
        }

        *self.last_run.lock() = Some(record);
        result
    }
}

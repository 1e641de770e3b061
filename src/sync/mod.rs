//! Sync orchestration.
//!
//! A run validates the job, ensures the remote link, and drives the
//! configured strategy to completion. Each step blocks on the previous
//! one's remote round trip; there is nothing to parallelize inside a run
//! because every round trip already moves a full batch of work.
//!
//! Outcomes are kept apart deliberately:
//! - skipped: validation declined, `disabled_reason` set, no remote command
//!   was issued;
//! - completed: `rows` carries the count moved by this run (possibly zero);
//! - failed: the run returns an error and `rows` stays unset.

mod batch;
mod full;
mod swap;
mod truncate;

use crate::executor::RemoteExecutor;
use crate::job::SyncJob;
use crate::link;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sync_core::{ConnectionDescriptor, SyncCoreError, SyncStrategy};
use tracing::{info, warn};

/// Outcome of one sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Destination table the run targeted
    pub table: String,

    /// Rows moved by this run. `None` until a run completes; a completed run
    /// that moved nothing reports `Some(0)`.
    pub rows: Option<u64>,

    /// Why the job was skipped, when validation declined to run it
    pub disabled_reason: Option<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    /// True when the run moved data (as opposed to being skipped).
    pub fn completed(&self) -> bool {
        self.rows.is_some()
    }
}

/// Drives sync runs against one command executor.
pub struct Synchronizer<'a> {
    executor: &'a dyn RemoteExecutor,
}

impl<'a> Synchronizer<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor) -> Self {
        Self { executor }
    }

    /// Runs one job to completion.
    ///
    /// Returns a skipped report when the job does not validate, and an error
    /// when a remote command fails. Partial destination state after a remote
    /// failure (a truncated-but-unreloaded table) is a documented outcome;
    /// retrying the run is the recovery path.
    pub async fn sync(&self, job: &dyn SyncJob) -> Result<SyncReport> {
        let started_at = Utc::now();
        let table = job.table_name().to_string();

        if let Err(reason) = validate(job) {
            warn!(table = %table, reason = %reason, "job skipped");
            return Ok(SyncReport {
                table,
                rows: None,
                disabled_reason: Some(reason),
                started_at,
                finished_at: Utc::now(),
            });
        }

        let descriptor = ConnectionDescriptor::parse(job.remote_database_url())?;
        link::ensure_link(self.executor, job.link_name(), &descriptor).await?;

        let rows = match job.strategy() {
            SyncStrategy::Full => full::run(self.executor, job).await?,
            SyncStrategy::TruncateReload => truncate::run(self.executor, job).await?,
            SyncStrategy::BatchedCursor => batch::run(self.executor, job).await?,
            SyncStrategy::StagedSwap => swap::run(self.executor, job).await?,
        };

        let finished_at = Utc::now();
        let elapsed_ms = finished_at.signed_duration_since(started_at).num_milliseconds();
        info!(table = %table, rows, elapsed_ms, "sync complete");
        Ok(SyncReport {
            table,
            rows: Some(rows),
            disabled_reason: None,
            started_at,
            finished_at,
        })
    }
}

/// Combines the job's own validity rule with the engine's strategy-specific
/// requirements. Runs before any remote command; the `Err` text becomes the
/// job's disabled reason.
pub fn validate(job: &dyn SyncJob) -> Result<(), String> {
    job.validate()?;
    match job.strategy() {
        SyncStrategy::BatchedCursor if job.batch_size() == 0 => {
            Err(SyncCoreError::InvalidBatchSize(job.batch_size()).to_string())
        }
        SyncStrategy::StagedSwap if job.primary_key().is_none() => {
            Err(SyncCoreError::MissingSwapIdentifier {
                table: job.table_name().to_string(),
                missing: "primary key",
            }
            .to_string())
        }
        SyncStrategy::StagedSwap if job.sequence_name().is_none() => {
            Err(SyncCoreError::MissingSwapIdentifier {
                table: job.table_name().to_string(),
                missing: "sequence",
            }
            .to_string())
        }
        _ => Ok(()),
    }
}

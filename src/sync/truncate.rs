//! Truncate-reload materialization: empty the destination outright, then
//! reload it through the link.
//!
//! There is no rollback across the two steps; truncation is irreversible by
//! design. When the reload half fails the destination stays empty, and a
//! retry of the whole run is the recovery path. Jobs that cannot tolerate
//! the empty window should use the staged-swap strategy instead.

use crate::commands;
use crate::executor::RemoteExecutor;
use crate::job::SyncJob;
use anyhow::{Context, Result};
use tracing::debug;

pub(super) async fn run(executor: &dyn RemoteExecutor, job: &dyn SyncJob) -> Result<u64> {
    let table = job.table_name();

    executor
        .execute(&commands::truncate_table(table))
        .await
        .with_context(|| format!("failed to truncate '{table}'"))?;
    debug!(table, "destination truncated");

    let sql = commands::insert_select(table, job.link_name(), job.remote_query(), job.column_schema());
    let rows = executor
        .execute(&sql)
        .await
        .with_context(|| format!("reload of '{table}' failed; destination is left empty"))?;
    Ok(rows)
}

//! Full-insert materialization: one cross-link insert-select, no
//! intermediate state. Suited to small and medium result sets.

use crate::commands;
use crate::executor::RemoteExecutor;
use crate::job::SyncJob;
use anyhow::{Context, Result};
use tracing::debug;

pub(super) async fn run(executor: &dyn RemoteExecutor, job: &dyn SyncJob) -> Result<u64> {
    let sql = commands::insert_select(
        job.table_name(),
        job.link_name(),
        job.remote_query(),
        job.column_schema(),
    );
    let rows = executor
        .execute(&sql)
        .await
        .with_context(|| format!("cross-link insert into '{}' failed", job.table_name()))?;
    debug!(table = job.table_name(), rows, "full insert done");
    Ok(rows)
}

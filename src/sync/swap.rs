//! Staged-swap materialization: build the replacement contents in a staging
//! table next to the live one, then swap the two with renames.
//!
//! The live table stays readable until the swap, which makes this the
//! strategy for destinations that cannot tolerate the truncate-reload
//! empty window. Costs a second copy of the table on disk while the run is
//! in flight.

use crate::commands;
use crate::executor::RemoteExecutor;
use crate::job::SyncJob;
use anyhow::{anyhow, Context, Result};
use tracing::debug;

pub(super) async fn run(executor: &dyn RemoteExecutor, job: &dyn SyncJob) -> Result<u64> {
    let table = job.table_name();
    // Validation rejects swap jobs without these before the run starts.
    let primary_key = job
        .primary_key()
        .ok_or_else(|| anyhow!("job '{table}' has no primary key"))?;
    let sequence = job
        .sequence_name()
        .ok_or_else(|| anyhow!("job '{table}' has no sequence"))?;

    executor
        .execute(&commands::drop_staging_table(table))
        .await
        .with_context(|| format!("failed to drop staging table for '{table}'"))?;

    let rows = executor
        .execute(&commands::create_staging_table(
            table,
            job.link_name(),
            job.remote_query(),
            job.column_schema(),
        ))
        .await
        .with_context(|| format!("failed to stage remote data for '{table}'"))?;
    debug!(table, rows, "staging table built");

    executor
        .execute(&commands::add_staging_primary_key(table, primary_key))
        .await
        .with_context(|| format!("failed to declare primary key on staging table for '{table}'"))?;

    executor
        .execute(&commands::ensure_sequence(sequence))
        .await
        .with_context(|| format!("failed to ensure sequence '{sequence}'"))?;

    executor
        .execute(&commands::attach_sequence(table, primary_key, sequence))
        .await
        .with_context(|| format!("failed to attach sequence '{sequence}'"))?;

    executor
        .execute(&commands::swap_staging_into_place(table))
        .await
        .with_context(|| format!("failed to swap staging table into place for '{table}'"))?;

    Ok(rows)
}

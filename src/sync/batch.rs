//! Batched-cursor materialization for result sets too large to move in one
//! statement.
//!
//! The run walks a small state machine: truncate the destination, open a
//! named cursor over the remote query, then fetch-and-insert in bounded
//! batches until a short batch signals exhaustion. The cursor is closed on
//! every exit path; a cursor left open would linger on the remote session
//! for its whole lifetime.

use crate::commands;
use crate::executor::RemoteExecutor;
use crate::job::SyncJob;
use anyhow::{Context, Result};
use tracing::{debug, warn};

pub(super) async fn run(executor: &dyn RemoteExecutor, job: &dyn SyncJob) -> Result<u64> {
    let table = job.table_name();
    // The cursor is scoped to this run and named after the destination.
    let cursor = table;

    executor
        .execute(&commands::truncate_table(table))
        .await
        .with_context(|| format!("failed to truncate '{table}'"))?;

    executor
        .execute(&commands::open_cursor(job.link_name(), cursor, job.remote_query()))
        .await
        .with_context(|| format!("failed to open cursor '{cursor}'"))?;

    let fetched = fetch_all_batches(executor, job, cursor).await;
    let closed = executor
        .execute(&commands::close_cursor(job.link_name(), cursor))
        .await;

    match (fetched, closed) {
        (Ok(rows), Ok(_)) => Ok(rows),
        (Ok(_), Err(e)) => Err(e).with_context(|| format!("failed to close cursor '{cursor}'")),
        (Err(e), Ok(_)) => Err(e),
        (Err(e), Err(close_error)) => {
            // The fetch failure is the actionable error; the close failure
            // usually follows from the same broken session.
            warn!(cursor, "cursor close also failed after sync error: {close_error:#}");
            Err(e)
        }
    }
}

/// Fetches and inserts until a batch comes back short. A batch of fewer
/// than `batch_size` rows, including zero, means the cursor is exhausted;
/// its rows are already inserted when the loop stops.
async fn fetch_all_batches(
    executor: &dyn RemoteExecutor,
    job: &dyn SyncJob,
    cursor: &str,
) -> Result<u64> {
    let batch_size = job.batch_size();
    let mut total = 0u64;
    loop {
        let sql = commands::fetch_into_table(
            job.table_name(),
            job.link_name(),
            cursor,
            batch_size,
            job.column_schema(),
        );
        let inserted = executor
            .execute(&sql)
            .await
            .with_context(|| format!("batch insert into '{}' failed", job.table_name()))?;
        total += inserted;
        debug!(table = job.table_name(), inserted, total, "batch inserted");

        if inserted < u64::from(batch_size) {
            return Ok(total);
        }
    }
}

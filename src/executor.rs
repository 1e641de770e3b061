//! Remote command execution.
//!
//! The engine does not own a transport. It consumes a command-execution
//! capability: hand over command text, get back an affected-row count. The
//! production implementation relays everything through a local PostgreSQL
//! session, whose dblink calls reach the remote side.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, error, info};

/// Command-execution capability the engine consumes.
///
/// Failures are opaque to the engine; it treats any error as "command
/// failed" and never retries. Deadlines and cancellation are the
/// implementation's responsibility.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Executes `sql` and returns the affected-row count it reports.
    async fn execute(&self, sql: &str) -> Result<u64>;
}

/// Executor backed by a local PostgreSQL session.
///
/// Uses the simple query protocol, so a command may carry several statements
/// (the swap strategy's rename sequence relies on this; multi-statement
/// commands run in one implicit transaction).
pub struct PgExecutor {
    client: Client,
}

impl PgExecutor {
    /// Connects to the local database and spawns the connection driver task.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .context("failed to connect to the local database")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {e}");
            }
        });

        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteExecutor for PgExecutor {
    async fn execute(&self, sql: &str) -> Result<u64> {
        debug!("executing: {sql}");
        let messages = self.client.simple_query(sql).await?;
        let affected = messages
            .iter()
            .map(|message| match message {
                SimpleQueryMessage::CommandComplete(rows) => *rows,
                _ => 0,
            })
            .sum();
        Ok(affected)
    }
}

/// Executor that logs every command instead of running it.
///
/// Reports zero affected rows, so a dry batched run terminates after its
/// first fetch.
pub struct DryRunExecutor;

#[async_trait]
impl RemoteExecutor for DryRunExecutor {
    async fn execute(&self, sql: &str) -> Result<u64> {
        info!("dry-run, would execute: {sql}");
        Ok(0)
    }
}

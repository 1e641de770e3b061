//! The sync job contract.
//!
//! Every synchronizable table supplies these capabilities. They are required
//! trait members, so a job type missing one fails to build instead of
//! failing when first invoked; there are no inherited defaults to guess at.

use sync_core::{ColumnDef, JobConfig, SyncStrategy, DEFAULT_BATCH_SIZE};

/// Contract between a synchronizable table and the engine.
pub trait SyncJob: Send + Sync {
    /// Destination table in the local database.
    fn table_name(&self) -> &str;

    /// Stable per-target name for the remote link. Jobs that may run
    /// concurrently on one session must not share a name, or their cursor
    /// operations can interleave.
    fn link_name(&self) -> &str;

    /// Connection URL of the source database.
    fn remote_database_url(&self) -> &str;

    /// The SELECT executed on the remote side.
    fn remote_query(&self) -> &str;

    /// Shape of the remote result, in the order the query produces columns.
    fn column_schema(&self) -> &[ColumnDef];

    /// Which materialization strategy drives the run.
    fn strategy(&self) -> SyncStrategy;

    /// Whether the job can run right now.
    ///
    /// `Err` carries the reason recorded as the job's disabled reason. This
    /// is the expected way to skip a job (say, missing prerequisite data),
    /// not a failure path; no remote command is issued for a job that
    /// declines here.
    fn validate(&self) -> Result<(), String>;

    /// Rows fetched per cursor batch. Only the batched-cursor strategy reads
    /// this.
    fn batch_size(&self) -> u32 {
        DEFAULT_BATCH_SIZE
    }

    /// Primary key column, required by the staged-swap strategy.
    fn primary_key(&self) -> Option<&str> {
        None
    }

    /// Sequence backing the primary key, required by the staged-swap
    /// strategy.
    fn sequence_name(&self) -> Option<&str> {
        None
    }
}

/// A job backed by an entry from the jobs file.
pub struct ConfiguredJob {
    config: JobConfig,
}

impl ConfiguredJob {
    pub fn new(config: JobConfig) -> Self {
        Self { config }
    }
}

impl SyncJob for ConfiguredJob {
    fn table_name(&self) -> &str {
        &self.config.table
    }

    fn link_name(&self) -> &str {
        &self.config.link
    }

    fn remote_database_url(&self) -> &str {
        &self.config.remote_url
    }

    fn remote_query(&self) -> &str {
        &self.config.remote_query
    }

    fn column_schema(&self) -> &[ColumnDef] {
        &self.config.columns
    }

    fn strategy(&self) -> SyncStrategy {
        self.config.strategy
    }

    fn validate(&self) -> Result<(), String> {
        if self.config.table.is_empty() {
            return Err("destination table is not named".to_string());
        }
        if self.config.link.is_empty() {
            return Err("link name is empty".to_string());
        }
        if self.config.remote_query.trim().is_empty() {
            return Err("remote query is empty".to_string());
        }
        if self.config.columns.is_empty() {
            return Err("no column schema declared".to_string());
        }
        Ok(())
    }

    fn batch_size(&self) -> u32 {
        self.config.batch_size
    }

    fn primary_key(&self) -> Option<&str> {
        self.config.primary_key.as_deref()
    }

    fn sequence_name(&self) -> Option<&str> {
        self.config.sequence.as_deref()
    }
}

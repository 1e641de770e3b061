//! Command-line interface for dblink-sync
//!
//! # Usage Examples
//!
//! ```bash
//! # Run every job declared in a jobs file
//! dblink-sync sync --jobs jobs.yaml
//!
//! # Run only the jobs for selected tables
//! dblink-sync sync --jobs jobs.yaml --table mission_responses --table missions
//!
//! # Point at a specific local database (or set DBLINK_SYNC_LOCAL_URL)
//! dblink-sync sync --jobs jobs.yaml \
//!   --local-url "host=localhost user=postgres dbname=reporting"
//!
//! # Log the command sequence without touching any database
//! dblink-sync sync --jobs jobs.yaml --dry-run
//!
//! # Check a jobs file without running anything
//! dblink-sync validate --jobs jobs.yaml
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use dblink_sync::{
    ConfiguredJob, DryRunExecutor, JobsFile, LocalOpts, PgExecutor, RemoteExecutor, SyncJob,
    SyncReport, Synchronizer,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dblink-sync")]
#[command(about = "Mirror remote PostgreSQL query results into local tables over dblink")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run sync jobs from a jobs file
    Sync {
        /// Path to the YAML jobs file
        #[arg(long)]
        jobs: PathBuf,

        /// Only run the jobs for these destination tables (default: all)
        #[arg(long = "table", value_name = "TABLE")]
        tables: Vec<String>,

        /// Local database session options
        #[command(flatten)]
        local: LocalOpts,
    },

    /// Check a jobs file and report each job without running anything
    Validate {
        /// Path to the YAML jobs file
        #[arg(long)]
        jobs: PathBuf,
    },
}

/// Per-job outcome printed as JSON once all jobs have run.
#[derive(Serialize)]
struct JobOutcome {
    table: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl JobOutcome {
    fn from_report(report: SyncReport) -> Self {
        if report.completed() {
            Self {
                table: report.table,
                status: "completed",
                rows: report.rows,
                reason: None,
            }
        } else {
            Self {
                table: report.table,
                status: "skipped",
                rows: None,
                reason: report.disabled_reason,
            }
        }
    }

    fn failed(table: String, error: &anyhow::Error) -> Self {
        Self {
            table,
            status: "failed",
            rows: None,
            reason: Some(format!("{error:#}")),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dblink_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync {
            jobs,
            tables,
            local,
        } => run_sync(&jobs, &tables, &local).await,
        Commands::Validate { jobs } => validate_jobs(&jobs),
    }
}

async fn run_sync(path: &Path, tables: &[String], local: &LocalOpts) -> anyhow::Result<()> {
    let file = load_jobs(path)?;
    let jobs: Vec<ConfiguredJob> = file
        .jobs
        .into_iter()
        .filter(|job| tables.is_empty() || tables.iter().any(|t| t == &job.table))
        .map(ConfiguredJob::new)
        .collect();
    if jobs.is_empty() {
        warn!("no jobs matched; nothing to do");
        return Ok(());
    }

    info!(jobs = jobs.len(), "starting sync");
    let outcomes = if local.dry_run {
        run_jobs(&DryRunExecutor, &jobs).await
    } else {
        let executor = PgExecutor::connect(&local.local_url).await?;
        run_jobs(&executor, &jobs).await
    };

    println!("{}", serde_json::to_string_pretty(&outcomes)?);

    let failed = outcomes.iter().filter(|o| o.status == "failed").count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} jobs failed", outcomes.len());
    }
    Ok(())
}

/// Runs jobs one after another; each run is strictly sequential internally,
/// and concurrent runs would need per-job link names to stay safe anyway.
async fn run_jobs(executor: &dyn RemoteExecutor, jobs: &[ConfiguredJob]) -> Vec<JobOutcome> {
    let synchronizer = Synchronizer::new(executor);
    let mut outcomes = Vec::with_capacity(jobs.len());
    for job in jobs {
        match synchronizer.sync(job).await {
            Ok(report) => outcomes.push(JobOutcome::from_report(report)),
            Err(e) => {
                error!(table = job.table_name(), "sync failed: {e:#}");
                outcomes.push(JobOutcome::failed(job.table_name().to_string(), &e));
            }
        }
    }
    outcomes
}

fn validate_jobs(path: &Path) -> anyhow::Result<()> {
    let file = load_jobs(path)?;
    let mut invalid = 0;
    for config in &file.jobs {
        let table = config.table.clone();
        let job = ConfiguredJob::new(config.clone());
        match dblink_sync::sync::validate(&job) {
            Ok(()) => info!(table = %table, strategy = ?config.strategy, "job ok"),
            Err(reason) => {
                invalid += 1;
                warn!(table = %table, reason = %reason, "job invalid");
            }
        }
    }
    if invalid > 0 {
        anyhow::bail!("{invalid} of {} jobs are invalid", file.jobs.len());
    }
    info!(jobs = file.jobs.len(), "all jobs valid");
    Ok(())
}

fn load_jobs(path: &Path) -> anyhow::Result<JobsFile> {
    JobsFile::load(path).with_context(|| format!("failed to load jobs from {}", path.display()))
}

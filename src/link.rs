//! Cross-database link lifecycle.
//!
//! Links are named, session-scoped connections on the remote side. The
//! engine only ever ensures one exists; it never tears one down. Cursors,
//! not links, are the resource a strategy releases at the end of a run.

use crate::commands;
use crate::executor::RemoteExecutor;
use anyhow::{Context, Result};
use sync_core::ConnectionDescriptor;
use tracing::debug;

/// Ensures the dblink extension is loaded and a link named `link_name` is
/// open on the current session.
///
/// Safe to call once per run on the same name: the probe-or-open is a single
/// statement, and the remote session opens the link at most once.
pub async fn ensure_link(
    executor: &dyn RemoteExecutor,
    link_name: &str,
    descriptor: &ConnectionDescriptor,
) -> Result<()> {
    executor
        .execute(&commands::enable_extension())
        .await
        .context("failed to enable the dblink extension")?;
    executor
        .execute(&commands::ensure_link(link_name, descriptor))
        .await
        .with_context(|| format!("failed to ensure link '{link_name}'"))?;
    debug!(link = link_name, host = %descriptor.host, "link ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedExecutor;

    #[test]
    fn issues_enable_then_probe_each_call() {
        let executor = ScriptedExecutor::new();
        let descriptor = ConnectionDescriptor::parse("postgres://src.example.com/missions").unwrap();

        tokio_test::block_on(async {
            ensure_link(&executor, "missions_link", &descriptor).await.unwrap();
            ensure_link(&executor, "missions_link", &descriptor).await.unwrap();
        });

        let executed = executor.executed();
        assert_eq!(executed.len(), 4);
        assert_eq!(executed[0], "CREATE EXTENSION IF NOT EXISTS dblink;");
        assert!(executed[1].contains("dblink_get_connections()"));
        // The second call re-issues the probe verbatim; opening again is the
        // remote conditional's business.
        assert_eq!(executed[1], executed[3]);
    }
}

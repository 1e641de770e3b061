//! Test doubles for the command-execution capability.
//!
//! The scripted executor records every command it is handed and replays a
//! configured sequence of results, so the engine's flows can be exercised
//! without a database: batch termination, partial-failure states, and the
//! exact command vocabulary are all observable through the log.

use crate::executor::RemoteExecutor;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Executor that logs commands and replays scripted results in order.
///
/// Once the script runs out, every further command succeeds with zero
/// affected rows.
#[derive(Default)]
pub struct ScriptedExecutor {
    log: Mutex<Vec<String>>,
    script: Mutex<VecDeque<Result<u64, String>>>,
}

impl ScriptedExecutor {
    /// Executor whose every command succeeds with zero affected rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor that answers commands with `results` in order.
    pub fn with_results(results: Vec<Result<u64, String>>) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            script: Mutex::new(results.into()),
        }
    }

    /// Every command executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Commands executed so far whose text contains `needle`.
    pub fn executed_matching(&self, needle: &str) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|sql| sql.contains(needle))
            .collect()
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn execute(&self, sql: &str) -> Result<u64> {
        self.log.lock().unwrap().push(sql.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(0),
        }
    }
}

//! Bounded worker pool for extraction/derivation/remap commands.
//!
//! Each command is an independent subprocess writing its own output path, so
//! no ordering is needed within one work list. The pool joins every worker
//! before returning — callers rely on that barrier between the extraction
//! and derivation stages.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use nimbus_types::{NimbusError, Result};

use crate::plan::WorkCommand;

async fn run_one(command: &WorkCommand) -> Result<()> {
    tracing::debug!(command = %command.describe(), "spawning worker command");
    let output = tokio::process::Command::new(&command.program)
        .args(&command.args)
        .output()
        .await?;
    if !output.status.success() {
        return Err(NimbusError::CommandFailed {
            program: command.program.clone(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

/// Run a work list sequentially (`num_procs <= 1`) or across a pool of
/// `num_procs` concurrent subprocesses. All workers are joined before this
/// returns; the first failure is reported after the join.
pub async fn run_commands(commands: Vec<WorkCommand>, num_procs: usize) -> Result<()> {
    if commands.is_empty() {
        return Ok(());
    }

    if num_procs <= 1 {
        for command in &commands {
            run_one(command).await?;
        }
        return Ok(());
    }

    let semaphore = Arc::new(Semaphore::new(num_procs));
    let mut joins: JoinSet<Result<()>> = JoinSet::new();
    for command in commands {
        let semaphore = Arc::clone(&semaphore);
        joins.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore is never closed");
            run_one(&command).await
        });
    }

    let mut first_error = None;
    while let Some(joined) = joins.join_next().await {
        let result = joined.expect("worker tasks do not panic");
        if let Err(err) = result {
            tracing::error!(error = %err, "worker command failed");
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

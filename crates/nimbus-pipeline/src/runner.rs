//! The external runner seam.
//!
//! Actual notebook/script execution is delegated to external tools; the
//! executor only knows the [`TaskRunner`] trait. [`CommandRunner`] is the
//! live implementation (papermill for notebooks, the interpreter for
//! scripts); [`RecordingRunner`] captures invocations for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use nimbus_types::{NimbusError, Result};

use crate::expand::{Task, TaskKind};

#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: &Task) -> Result<()>;
}

// ---------------------------------------------------------------------------
// CommandRunner — live implementation
// ---------------------------------------------------------------------------

/// Runs notebooks through `papermill` and scripts through `python`, passing
/// the merged parameters and resolved kernel on the command line.
pub struct CommandRunner;

impl CommandRunner {
    /// Build the argv for one task.
    pub(crate) fn argv(task: &Task) -> Result<Vec<String>> {
        match task.kind {
            TaskKind::Notebook => Ok(vec![
                "papermill".to_string(),
                task.input.to_string_lossy().into_owned(),
                task.output.to_string_lossy().into_owned(),
                "-k".to_string(),
                task.kernel_name.clone(),
                "-y".to_string(),
                serde_yaml::to_string(&task.params)?,
            ]),
            TaskKind::Script => Ok(vec![
                "python".to_string(),
                task.input.to_string_lossy().into_owned(),
                serde_json::to_string(&task.params)?,
            ]),
        }
    }
}

#[async_trait]
impl TaskRunner for CommandRunner {
    async fn run(&self, task: &Task) -> Result<()> {
        let argv = Self::argv(task)?;
        tracing::debug!(task = %task.id, program = %argv[0], "spawning runner");

        if let Some(parent) = task.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let output = tokio::process::Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .await?;
        if !output.status.success() {
            return Err(NimbusError::CommandFailed {
                program: argv[0].clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingRunner — test double
// ---------------------------------------------------------------------------

/// Records the identity of every task it is asked to run, in call order.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    runs: Arc<Mutex<Vec<String>>>,
    fail: Arc<Mutex<Vec<String>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the runner fail for the given task identity.
    pub fn fail_task(&self, task_id: impl Into<String>) {
        self.fail.lock().unwrap().push(task_id.into());
    }

    pub fn runs(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskRunner for RecordingRunner {
    async fn run(&self, task: &Task) -> Result<()> {
        self.runs.lock().unwrap().push(task.id.clone());
        if self.fail.lock().unwrap().contains(&task.id) {
            return Err(NimbusError::TaskFailed {
                task: task.id.clone(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Graph execution: serial and parallel policies over the external runner.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use nimbus_types::{Result, TaskState};

use crate::events::{EventEmitter, RunEvent};
use crate::graph::TaskGraph;
use crate::runner::TaskRunner;

/// Executor policy. Serial visits tasks one at a time; the first failure
/// aborts the remainder of the run. Parallel runs independent branches
/// concurrently and collects failures; downstream tasks of a failed
/// upstream never start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    Serial,
    Parallel,
}

/// Summary of a completed (or aborted) run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub succeeded: Vec<String>,
    /// `(task identity, error)` pairs.
    pub failed: Vec<(String, String)>,
    pub pruned: Vec<String>,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Executor {
    policy: ExecutionPolicy,
    events: EventEmitter,
}

impl Executor {
    pub fn new(policy: ExecutionPolicy) -> Self {
        Self {
            policy,
            events: EventEmitter::default(),
        }
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Run the graph to completion under the configured policy. Tasks talk
    /// to each other only through the file system; each writes its own
    /// statically-known output path, so parallel interleaving is safe.
    pub async fn execute(
        &self,
        graph: &mut TaskGraph,
        runner: Arc<dyn TaskRunner>,
    ) -> Result<RunReport> {
        let started = Instant::now();
        self.events.emit(RunEvent::RunStarted {
            task_count: graph.len(),
        });

        let mut report = RunReport {
            pruned: graph.pruned().iter().map(|p| p.id.clone()).collect(),
            ..Default::default()
        };

        match self.policy {
            ExecutionPolicy::Serial => self.run_serial(graph, runner, &mut report).await?,
            ExecutionPolicy::Parallel => self.run_parallel(graph, runner, &mut report).await?,
        }

        self.events.emit(RunEvent::RunCompleted {
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(report)
    }

    async fn run_one(
        &self,
        graph: &mut TaskGraph,
        idx: usize,
        runner: &dyn TaskRunner,
    ) -> std::result::Result<(), String> {
        let task = graph.tasks()[idx].clone();
        graph.set_state(idx, TaskState::Running);
        self.events.emit(RunEvent::TaskStarted {
            task_id: task.id.clone(),
        });
        let started = Instant::now();

        match runner.run(&task).await {
            Ok(()) => {
                graph.set_state(idx, TaskState::Succeeded);
                self.events.emit(RunEvent::TaskCompleted {
                    task_id: task.id.clone(),
                    duration_ms: started.elapsed().as_millis() as u64,
                });
                tracing::info!(task = %task.id, "task succeeded");
                Ok(())
            }
            Err(err) => {
                graph.set_state(idx, TaskState::Failed);
                let message = err.to_string();
                self.events.emit(RunEvent::TaskFailed {
                    task_id: task.id.clone(),
                    error: message.clone(),
                });
                tracing::error!(task = %task.id, error = %message, "task failed");
                Err(message)
            }
        }
    }

    async fn run_serial(
        &self,
        graph: &mut TaskGraph,
        runner: Arc<dyn TaskRunner>,
        report: &mut RunReport,
    ) -> Result<()> {
        for idx in graph.execution_order()? {
            graph.set_state(idx, TaskState::Queued);
            let id = graph.tasks()[idx].id.clone();
            match self.run_one(graph, idx, runner.as_ref()).await {
                Ok(()) => report.succeeded.push(id),
                Err(message) => {
                    report.failed.push((id, message));
                    // Abort the remainder of the run.
                    break;
                }
            }
        }
        Ok(())
    }

    async fn run_parallel(
        &self,
        graph: &mut TaskGraph,
        runner: Arc<dyn TaskRunner>,
        report: &mut RunReport,
    ) -> Result<()> {
        // Validate the edge set up front; the wave scheduler below would
        // otherwise stall silently on a cycle.
        graph.execution_order()?;

        let count = graph.len();
        let mut indegree = vec![0usize; count];
        for idx in 0..count {
            indegree[idx] = graph.upstreams_of(idx).count();
        }

        let mut joins: JoinSet<(usize, std::result::Result<(), String>, u64)> = JoinSet::new();
        for idx in 0..count {
            if indegree[idx] == 0 {
                self.spawn_task(graph, idx, &runner, &mut joins);
            }
        }

        while let Some(joined) = joins.join_next().await {
            let (idx, result, duration_ms) = joined.expect("runner tasks do not panic");
            let id = graph.tasks()[idx].id.clone();
            match result {
                Ok(()) => {
                    graph.set_state(idx, TaskState::Succeeded);
                    self.events.emit(RunEvent::TaskCompleted {
                        task_id: id.clone(),
                        duration_ms,
                    });
                    tracing::info!(task = %id, "task succeeded");
                    report.succeeded.push(id);
                    for down in graph.downstreams_of(idx).collect::<Vec<_>>() {
                        indegree[down] -= 1;
                        if indegree[down] == 0 && graph.state_at(down) == TaskState::Pending {
                            self.spawn_task(graph, down, &runner, &mut joins);
                        }
                    }
                }
                Err(message) => {
                    graph.set_state(idx, TaskState::Failed);
                    self.events.emit(RunEvent::TaskFailed {
                        task_id: id.clone(),
                        error: message.clone(),
                    });
                    tracing::error!(task = %id, error = %message, "task failed");
                    report.failed.push((id, message));
                    self.fail_downstream(graph, idx, report);
                }
            }
        }
        Ok(())
    }

    fn spawn_task(
        &self,
        graph: &mut TaskGraph,
        idx: usize,
        runner: &Arc<dyn TaskRunner>,
        joins: &mut JoinSet<(usize, std::result::Result<(), String>, u64)>,
    ) {
        graph.set_state(idx, TaskState::Running);
        let task = graph.tasks()[idx].clone();
        self.events.emit(RunEvent::TaskStarted {
            task_id: task.id.clone(),
        });
        let runner = Arc::clone(runner);
        joins.spawn(async move {
            let started = Instant::now();
            let result = runner.run(&task).await.map_err(|e| e.to_string());
            (idx, result, started.elapsed().as_millis() as u64)
        });
    }

    /// Mark the whole downstream chain of a failed task as failed without
    /// running it.
    fn fail_downstream(&self, graph: &mut TaskGraph, idx: usize, report: &mut RunReport) {
        for down in graph.downstreams_of(idx).collect::<Vec<_>>() {
            if graph.state_at(down) != TaskState::Pending {
                continue;
            }
            graph.set_state(down, TaskState::Failed);
            let id = graph.tasks()[down].id.clone();
            let upstream = graph.tasks()[idx].id.clone();
            report
                .failed
                .push((id, format!("upstream task '{upstream}' failed")));
            self.fail_downstream(graph, down, report);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

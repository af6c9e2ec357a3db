//! Task-graph construction: identity checks, kernel pruning, dependency
//! edges, and topological ordering.
//!
//! Construction is build-then-filter: the full candidate list is expanded
//! first, then a filtered graph is produced, never mutating a collection
//! while walking it.

use std::collections::BTreeMap;

use nimbus_config::KernelAvailability;
use nimbus_types::{NimbusError, Result, TaskState};

use crate::expand::Task;

/// Record of a task removed before execution because its kernel is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedTask {
    pub id: String,
    pub kernel_name: String,
}

/// The executable set of tasks plus directed dependency edges.
///
/// Edge storage and [`TaskGraph::execution_order`] implement topological
/// scheduling, but the only source of edges today is the `dependency`
/// config key, whose intended semantics are unresolved (wait for completion
/// vs. receive the upstream's output path). Construction fails with
/// [`NimbusError::DependencyUnsupported`] whenever a surviving task
/// declares one.
#[derive(Debug)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: BTreeMap<String, usize>,
    /// `(downstream, upstream)` pairs into `tasks`.
    edges: Vec<(usize, usize)>,
    states: Vec<TaskState>,
    pruned: Vec<PrunedTask>,
}

impl TaskGraph {
    /// Build the graph from the fully expanded candidate list.
    ///
    /// Duplicate identities are a configuration error. Tasks whose kernel is
    /// unavailable (or never probed) transition `Pending → Pruned` with one
    /// warning each and never enter the executable set.
    pub fn build(candidates: Vec<Task>, kernels: &KernelAvailability) -> Result<TaskGraph> {
        let mut seen: BTreeMap<String, ()> = BTreeMap::new();
        for task in &candidates {
            if seen.insert(task.id.clone(), ()).is_some() {
                return Err(NimbusError::DuplicateTask {
                    id: task.id.clone(),
                });
            }
        }

        let mut tasks = Vec::new();
        let mut pruned = Vec::new();
        for task in candidates {
            if kernels.is_available(&task.kernel_name) == Some(true) {
                tasks.push(task);
            } else {
                tracing::warn!(
                    task = %task.id,
                    kernel = %task.kernel_name,
                    "kernel unavailable; task will not run"
                );
                pruned.push(PrunedTask {
                    id: task.id,
                    kernel_name: task.kernel_name,
                });
            }
        }

        let index: BTreeMap<String, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        for task in &tasks {
            if let Some(upstream) = &task.dependency {
                return Err(NimbusError::DependencyUnsupported {
                    task: task.id.clone(),
                    upstream: upstream.clone(),
                });
            }
        }

        let states = vec![TaskState::Pending; tasks.len()];
        Ok(TaskGraph {
            tasks,
            index,
            edges: Vec::new(),
            states,
            pruned,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pruned(&self) -> &[PrunedTask] {
        &self.pruned
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    pub fn state(&self, id: &str) -> Option<TaskState> {
        self.index.get(id).map(|&i| self.states[i])
    }

    pub(crate) fn state_at(&self, idx: usize) -> TaskState {
        self.states[idx]
    }

    pub(crate) fn set_state(&mut self, idx: usize, state: TaskState) {
        self.states[idx] = state;
    }

    /// Upstream indices of task `idx`.
    pub(crate) fn upstreams_of(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .filter(move |(down, _)| *down == idx)
            .map(|(_, up)| *up)
    }

    /// Downstream indices of task `idx`.
    pub(crate) fn downstreams_of(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .filter(move |(_, up)| *up == idx)
            .map(|(down, _)| *down)
    }

    #[cfg(test)]
    pub(crate) fn add_edge(&mut self, downstream: &str, upstream: &str) {
        let down = self.index[downstream];
        let up = self.index[upstream];
        self.edges.push((down, up));
    }

    /// Indices in an order that respects every edge (upstream before
    /// downstream), stable with respect to insertion order otherwise.
    pub fn execution_order(&self) -> Result<Vec<usize>> {
        let mut indegree = vec![0usize; self.tasks.len()];
        for (down, _) in &self.edges {
            indegree[*down] += 1;
        }

        let mut order = Vec::with_capacity(self.tasks.len());
        let mut placed = vec![false; self.tasks.len()];
        while order.len() < self.tasks.len() {
            let next = (0..self.tasks.len()).find(|&i| !placed[i] && indegree[i] == 0);
            let Some(i) = next else {
                return Err(NimbusError::Config(
                    "task dependencies form a cycle".to_string(),
                ));
            };
            placed[i] = true;
            order.push(i);
            for down in self.downstreams_of(i).collect::<Vec<_>>() {
                indegree[down] -= 1;
            }
        }
        Ok(order)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

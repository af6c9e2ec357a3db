//! Task generation and execution graph for the nimbus diagnostics driver.
//!
//! This crate implements the core pipeline: component selection, expansion of
//! parameter groups into concrete tasks, catalog subsetting, task-graph
//! construction (with kernel-availability pruning), and the serial/parallel
//! executors that drive the external notebook/script runner.

pub mod catalog;
pub mod events;
pub mod executor;
pub mod expand;
pub mod graph;
pub mod runner;
pub mod select;

pub use catalog::resolve_catalog;
pub use events::{EventEmitter, RunEvent};
pub use executor::{ExecutionPolicy, Executor, RunReport};
pub use expand::{expand_component, expand_notebook, expand_script, Task, TaskKind};
pub use graph::{PrunedTask, TaskGraph};
pub use runner::{CommandRunner, RecordingRunner, TaskRunner};
pub use select::{select_components, ComponentFlags};

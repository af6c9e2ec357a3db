//! Shared types for the nimbus diagnostics driver.
//!
//! This crate provides the foundational types used across all other nimbus
//! crates:
//! - `NimbusError` — unified error taxonomy
//! - `Component` — the fixed set of physical-domain diagnostics partitions
//! - `TaskState` — lifecycle of one executable task
//! - `ParamMap` — the parameter mapping carried by specs and tasks

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unified error type for all nimbus subsystems.
///
/// The taxonomy distinguishes configuration problems (fatal, the process
/// exits non-zero), missing input data (fatal for the affected case), and
/// execution failures surfaced from external commands. Conditions that are
/// warnings by design — an unavailable kernel, an underivable variable — are
/// never represented here; they are logged and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum NimbusError {
    // === Configuration errors ===
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing required config key '{key}'")]
    MissingKey { key: String },

    #[error("duplicate task identity '{id}'")]
    DuplicateTask { id: String },

    #[error("task '{task}' declares dependency '{upstream}', but dependency wiring is not implemented")]
    DependencyUnsupported { task: String, upstream: String },

    // === Input data errors ===
    #[error("input data missing at {path}: {message}")]
    InputData { path: String, message: String },

    // === Execution errors ===
    #[error("task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("command '{program}' exited with status {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: i32,
        stderr: String,
    },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl NimbusError {
    /// Returns `true` if the error indicates a problem with the run's
    /// configuration rather than with task execution.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            NimbusError::Config(_)
                | NimbusError::MissingKey { .. }
                | NimbusError::DuplicateTask { .. }
                | NimbusError::DependencyUnsupported { .. }
        )
    }
}

/// A convenience alias for `Result<T, NimbusError>`.
pub type Result<T> = std::result::Result<T, NimbusError>;

/// Parameter mapping carried by specs and tasks. `BTreeMap` keeps iteration
/// deterministic, which in turn keeps task identities and command lines
/// reproducible across runs.
pub type ParamMap = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Component — physical-domain partition of diagnostics
// ---------------------------------------------------------------------------

/// A physical-domain partition of the diagnostics pipeline.
///
/// `Infrastructure` is special: its notebooks are unconditionally included in
/// every run regardless of which component flags were passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    Atmosphere,
    Ocean,
    Land,
    SeaIce,
    LandIce,
    RiverRunoff,
    Infrastructure,
}

impl Component {
    /// All components, in the order they are reported.
    pub const ALL: [Component; 7] = [
        Component::Atmosphere,
        Component::Ocean,
        Component::Land,
        Component::SeaIce,
        Component::LandIce,
        Component::RiverRunoff,
        Component::Infrastructure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Atmosphere => "atmosphere",
            Component::Ocean => "ocean",
            Component::Land => "land",
            Component::SeaIce => "sea-ice",
            Component::LandIce => "land-ice",
            Component::RiverRunoff => "river-runoff",
            Component::Infrastructure => "infrastructure",
        }
    }

    /// Subdirectory of a case's model-output tree holding this component's
    /// history files. `Infrastructure` owns no model output.
    pub fn history_subdir(&self) -> Option<&'static str> {
        match self {
            Component::Atmosphere => Some("atm"),
            Component::Ocean => Some("ocn"),
            Component::Land => Some("lnd"),
            Component::SeaIce => Some("ice"),
            Component::LandIce => Some("glc"),
            Component::RiverRunoff => Some("rof"),
            Component::Infrastructure => None,
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskState — lifecycle of one executable task
// ---------------------------------------------------------------------------

/// Lifecycle of a task: `Pending` when expanded, `Pruned` when its kernel is
/// unavailable (terminal, never executed), then `Queued` → `Running` →
/// `Succeeded` | `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Pruned,
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Pruned | TaskState::Succeeded | TaskState::Failed
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

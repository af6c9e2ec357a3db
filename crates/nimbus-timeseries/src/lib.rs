//! Idempotent per-variable time-series generation.
//!
//! For each component and case this crate discovers raw history files,
//! resolves which requested variables can be extracted directly and which
//! must be derived from constituents, detects the vertical-coordinate
//! convention, and produces per-variable time-series files through external
//! extraction commands — sequentially or across a bounded worker pool.
//! Existing outputs are skipped unless overwrite is requested, so a re-run
//! with unchanged inputs performs no work.

pub mod discover;
pub mod generate;
pub mod inspect;
pub mod plan;
pub mod pool;
pub mod resolve;
pub mod vertical;

pub use discover::discover_history_files;
pub use generate::generate_timeseries;
pub use inspect::{HistoryInspector, NcdumpInspector, StaticInspector};
pub use plan::{
    derive_command, extraction_command, plan_derivations, plan_extractions, plan_remaps,
    remap_command, ts_output_name, WorkCommand,
};
pub use pool::run_commands;
pub use resolve::{resolve_variables, DerivedVariable, VariableCatalog, VariablePlan};
pub use vertical::VerticalCoordinate;

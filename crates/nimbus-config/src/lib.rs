//! Configuration loading and normalization for nimbus.
//!
//! The YAML schema is deserialized into the raw typed structs in [`model`],
//! then a single normalization pass ([`normalize`]) resolves kernel names,
//! input/output paths, and probes each distinct execution kernel exactly once
//! into a per-run [`KernelAvailability`] cache.

pub mod kernels;
pub mod model;
pub mod normalize;

pub use kernels::{JupyterProber, KernelAvailability, KernelProber, StaticProber};
pub use model::{
    load_config, ComputationConfig, DataSources, NotebookEntry, OneOrMany, RawConfig, ScriptEntry,
    TimeSeriesSection, TsComponentEntry,
};
pub use normalize::{
    normalize, ComponentSpec, ConfigModel, NotebookSpec, ScriptSpec, FALLBACK_KERNEL_NAME,
};

//! Raw configuration schema.
//!
//! These structs mirror the YAML layout one-to-one. Nothing here is resolved
//! or defaulted beyond what serde expresses; the normalization pass in
//! [`crate::normalize`] turns a [`RawConfig`] into the read-only
//! [`crate::ConfigModel`] the rest of the pipeline consumes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use nimbus_types::{Component, ParamMap, Result};

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    pub data_sources: DataSources,
    #[serde(default)]
    pub global_params: ParamMap,
    #[serde(default)]
    pub timeseries: Option<TimeSeriesSection>,
    #[serde(default)]
    pub computation_config: ComputationConfig,
    #[serde(default)]
    pub compute_notebooks: BTreeMap<Component, BTreeMap<String, NotebookEntry>>,
    #[serde(default)]
    pub compute_scripts: BTreeMap<Component, BTreeMap<String, ScriptEntry>>,
    /// Passed through unmodified to the downstream report builder.
    #[serde(default)]
    pub book_toc: serde_json::Value,
    #[serde(default)]
    pub book_config_keys: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSources {
    pub run_dir: PathBuf,
    pub sname: String,
    pub nb_path_root: PathBuf,
    #[serde(default)]
    pub path_to_cat_json: Option<PathBuf>,
    /// Run-level catalog subset query, applied once before task expansion.
    #[serde(default)]
    pub subset: Option<ParamMap>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComputationConfig {
    #[serde(default)]
    pub default_kernel_name: Option<String>,
}

/// One notebook declaration under `compute_notebooks.<component>`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotebookEntry {
    /// Named parameter groups; each produces one task. The group name
    /// `"none"` signals "no identity suffix".
    pub parameter_groups: BTreeMap<String, ParamMap>,
    #[serde(default)]
    pub default_params: ParamMap,
    #[serde(default)]
    pub kernel_name: Option<String>,
    #[serde(default)]
    pub subset: Option<ParamMap>,
    #[serde(default)]
    pub dependency: Option<String>,
    /// Opaque metadata, passed through to the task unmodified.
    #[serde(default)]
    pub external_tool: Option<serde_json::Value>,
}

/// One script declaration under `compute_scripts.<component>`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEntry {
    pub parameter_groups: BTreeMap<String, ParamMap>,
    /// Output artifact produced by the script.
    pub product: PathBuf,
    #[serde(default)]
    pub default_params: ParamMap,
    #[serde(default)]
    pub kernel_name: Option<String>,
    #[serde(default)]
    pub subset: Option<ParamMap>,
    #[serde(default)]
    pub dependency: Option<String>,
}

// ---------------------------------------------------------------------------
// Time-series section
// ---------------------------------------------------------------------------

/// The `timeseries` section. Case-indexed fields (`ts_done`, `overwrite_ts`
/// and the per-component year ranges) accept either a scalar applied to every
/// case or one value per case.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesSection {
    pub case_name: OneOrMany<String>,
    #[serde(default = "default_num_procs")]
    pub num_procs: usize,
    #[serde(default)]
    pub ts_done: OneOrMany<bool>,
    #[serde(default)]
    pub overwrite_ts: OneOrMany<bool>,
    /// Variable-metadata table consulted for `derivable_from` lists.
    #[serde(default)]
    pub variable_metadata: Option<PathBuf>,
    #[serde(flatten)]
    pub components: BTreeMap<Component, TsComponentEntry>,
}

fn default_num_procs() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct TsComponentEntry {
    #[serde(default)]
    pub vars: Vec<String>,
    #[serde(default)]
    pub derive_vars: Vec<String>,
    pub hist_str: String,
    pub start_years: OneOrMany<i32>,
    pub end_years: OneOrMany<i32>,
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default)]
    pub mapping_file: Option<PathBuf>,
    #[serde(default)]
    pub ts_output_dir: Option<PathBuf>,
}

/// A field that may be written as a scalar or as a per-case list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Value for case index `idx`: a scalar applies to every case; a list is
    /// indexed directly.
    pub fn for_case(&self, idx: usize) -> Option<&T> {
        match self {
            OneOrMany::One(v) => Some(v),
            OneOrMany::Many(vs) => vs.get(idx),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        match self {
            OneOrMany::One(v) => std::slice::from_ref(v).iter(),
            OneOrMany::Many(vs) => vs.iter(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// Read and deserialize a configuration file.
pub fn load_config(path: &Path) -> Result<RawConfig> {
    let source = std::fs::read_to_string(path)?;
    let config: RawConfig = serde_yaml::from_str(&source)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

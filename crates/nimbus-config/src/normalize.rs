//! Normalization pass: raw config → read-only [`ConfigModel`].
//!
//! One walk over every notebook and script spec (whether or not its component
//! ends up selected) resolves kernel names with the documented fallback
//! chain, fixes input/output paths, and probes each distinct kernel exactly
//! once into the [`KernelAvailability`] cache.

use std::collections::BTreeMap;
use std::path::PathBuf;

use nimbus_types::{Component, NimbusError, ParamMap, Result};

use crate::kernels::{KernelAvailability, KernelProber};
use crate::model::{NotebookEntry, RawConfig, ScriptEntry, TimeSeriesSection};

/// Kernel assigned when a spec declares none and the pipeline has no default.
pub const FALLBACK_KERNEL_NAME: &str = "cupid-analysis";

/// Normalized, read-only view of the pipeline configuration. Built once per
/// run; everything downstream borrows from it.
#[derive(Debug, Clone)]
pub struct ConfigModel {
    pub run_dir: PathBuf,
    pub sname: String,
    pub nb_path_root: PathBuf,
    pub path_to_cat: Option<PathBuf>,
    pub subset: Option<ParamMap>,
    pub global_params: ParamMap,
    pub default_kernel: Option<String>,
    pub components: BTreeMap<Component, ComponentSpec>,
    pub timeseries: Option<TimeSeriesSection>,
    pub kernels: KernelAvailability,
    pub book_toc: serde_json::Value,
    pub book_config_keys: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct ComponentSpec {
    pub notebooks: Vec<NotebookSpec>,
    pub scripts: Vec<ScriptSpec>,
}

impl ComponentSpec {
    pub fn is_empty(&self) -> bool {
        self.notebooks.is_empty() && self.scripts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct NotebookSpec {
    pub id: String,
    pub component: Component,
    /// Template notebook executed for each parameter group.
    pub input: PathBuf,
    /// Directory receiving the executed notebooks.
    pub output_dir: PathBuf,
    pub kernel_name: String,
    pub default_params: ParamMap,
    pub parameter_groups: BTreeMap<String, ParamMap>,
    pub subset: Option<ParamMap>,
    pub dependency: Option<String>,
    pub external_tool: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ScriptSpec {
    pub id: String,
    pub component: Component,
    pub input: PathBuf,
    pub product: PathBuf,
    pub kernel_name: String,
    pub default_params: ParamMap,
    pub parameter_groups: BTreeMap<String, ParamMap>,
    pub subset: Option<ParamMap>,
    pub dependency: Option<String>,
}

/// Resolve a spec's kernel name: explicit → pipeline default → hard fallback
/// (with a warning).
fn resolve_kernel(
    spec_id: &str,
    explicit: Option<String>,
    default_kernel: Option<&str>,
) -> String {
    if let Some(kernel) = explicit {
        return kernel;
    }
    if let Some(kernel) = default_kernel {
        return kernel.to_string();
    }
    tracing::warn!(
        spec = spec_id,
        fallback = FALLBACK_KERNEL_NAME,
        "no kernel_name declared and no pipeline default; using fallback"
    );
    FALLBACK_KERNEL_NAME.to_string()
}

fn require_groups(kind: &str, id: &str, groups: &BTreeMap<String, ParamMap>) -> Result<()> {
    if groups.is_empty() {
        return Err(NimbusError::Config(format!(
            "{kind} '{id}' declares no parameter groups"
        )));
    }
    Ok(())
}

fn normalize_notebook(
    component: Component,
    id: &str,
    entry: NotebookEntry,
    model: &ConfigModel,
    prober: &dyn KernelProber,
    kernels: &mut KernelAvailability,
) -> Result<NotebookSpec> {
    require_groups("notebook", id, &entry.parameter_groups)?;
    let kernel_name = resolve_kernel(id, entry.kernel_name, model.default_kernel.as_deref());
    kernels.probe_once(&kernel_name, prober);
    Ok(NotebookSpec {
        id: id.to_string(),
        component,
        input: model.nb_path_root.join(format!("{id}.ipynb")),
        output_dir: model
            .run_dir
            .join("computed_notebooks")
            .join(component.as_str()),
        kernel_name,
        default_params: entry.default_params,
        parameter_groups: entry.parameter_groups,
        subset: entry.subset,
        dependency: entry.dependency,
        external_tool: entry.external_tool,
    })
}

fn normalize_script(
    component: Component,
    id: &str,
    entry: ScriptEntry,
    model: &ConfigModel,
    prober: &dyn KernelProber,
    kernels: &mut KernelAvailability,
) -> Result<ScriptSpec> {
    require_groups("script", id, &entry.parameter_groups)?;
    let kernel_name = resolve_kernel(id, entry.kernel_name, model.default_kernel.as_deref());
    kernels.probe_once(&kernel_name, prober);
    Ok(ScriptSpec {
        id: id.to_string(),
        component,
        input: model.nb_path_root.join(format!("{id}.py")),
        product: entry.product,
        kernel_name,
        default_params: entry.default_params,
        parameter_groups: entry.parameter_groups,
        subset: entry.subset,
        dependency: entry.dependency,
    })
}

/// Run the normalization pass.
///
/// Guarantees on success: every spec carries a non-empty kernel name, and the
/// returned model's [`KernelAvailability`] holds an entry for every kernel
/// name appearing anywhere in the config, each probed exactly once.
pub fn normalize(raw: RawConfig, prober: &dyn KernelProber) -> Result<ConfigModel> {
    let mut computation = raw.computation_config;
    let default_kernel = computation.default_kernel_name.take();

    let mut model = ConfigModel {
        run_dir: raw.data_sources.run_dir,
        sname: raw.data_sources.sname,
        nb_path_root: raw.data_sources.nb_path_root,
        path_to_cat: raw.data_sources.path_to_cat_json,
        subset: raw.data_sources.subset,
        global_params: raw.global_params,
        default_kernel,
        components: BTreeMap::new(),
        timeseries: raw.timeseries,
        kernels: KernelAvailability::new(),
        book_toc: raw.book_toc,
        book_config_keys: raw.book_config_keys,
    };

    let mut kernels = KernelAvailability::new();
    let mut components: BTreeMap<Component, ComponentSpec> = BTreeMap::new();

    for (component, entries) in raw.compute_notebooks {
        for (id, entry) in entries {
            let spec = normalize_notebook(component, &id, entry, &model, prober, &mut kernels)?;
            components.entry(component).or_default().notebooks.push(spec);
        }
    }
    for (component, entries) in raw.compute_scripts {
        for (id, entry) in entries {
            let spec = normalize_script(component, &id, entry, &model, prober, &mut kernels)?;
            components.entry(component).or_default().scripts.push(spec);
        }
    }

    model.components = components;
    model.kernels = kernels;
    Ok(model)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

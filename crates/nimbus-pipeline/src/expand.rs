//! Parameter-group expansion: one spec × one group → one [`Task`].
//!
//! Parameter layers merge low→high: `default_params` → `global_params` →
//! group map → injected `subset_kwargs` → injected `path_to_cat`. Global run
//! parameters therefore override a spec's own defaults, and a named group
//! overrides anything except the two injected keys.

use std::path::{Path, PathBuf};

use nimbus_config::{ComponentSpec, NotebookSpec, ScriptSpec};
use nimbus_types::{Component, ParamMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Notebook,
    Script,
}

/// One concrete, parameterized unit of work.
#[derive(Debug, Clone)]
pub struct Task {
    /// `{spec_id}` when the group is named `"none"`, else `{spec_id}-{group}`.
    pub id: String,
    pub component: Component,
    pub kind: TaskKind,
    pub input: PathBuf,
    /// Executed-notebook path for notebooks, declared product for scripts.
    pub output: PathBuf,
    pub kernel_name: String,
    pub params: ParamMap,
    pub dependency: Option<String>,
    pub external_tool: Option<serde_json::Value>,
}

fn task_identity(spec_id: &str, group: &str) -> String {
    if group == "none" {
        spec_id.to_string()
    } else {
        format!("{spec_id}-{group}")
    }
}

fn merge_params(
    default_params: &ParamMap,
    global_params: &ParamMap,
    group: &ParamMap,
    subset: Option<&ParamMap>,
    catalog_path: Option<&Path>,
) -> ParamMap {
    let mut params = default_params.clone();
    params.extend(global_params.iter().map(|(k, v)| (k.clone(), v.clone())));
    params.extend(group.iter().map(|(k, v)| (k.clone(), v.clone())));

    let subset_kwargs = subset.cloned().unwrap_or_default();
    params.insert(
        "subset_kwargs".to_string(),
        serde_json::to_value(subset_kwargs).expect("param maps are valid JSON"),
    );
    if let Some(path) = catalog_path {
        params.insert(
            "path_to_cat".to_string(),
            serde_json::Value::String(path.to_string_lossy().into_owned()),
        );
    }
    params
}

/// Expand a notebook spec into one task per parameter group.
pub fn expand_notebook(
    spec: &NotebookSpec,
    global_params: &ParamMap,
    catalog_path: Option<&Path>,
) -> Vec<Task> {
    spec.parameter_groups
        .iter()
        .map(|(group, group_params)| {
            let id = task_identity(&spec.id, group);
            Task {
                output: spec.output_dir.join(format!("{id}.ipynb")),
                id,
                component: spec.component,
                kind: TaskKind::Notebook,
                input: spec.input.clone(),
                kernel_name: spec.kernel_name.clone(),
                params: merge_params(
                    &spec.default_params,
                    global_params,
                    group_params,
                    spec.subset.as_ref(),
                    catalog_path,
                ),
                dependency: spec.dependency.clone(),
                external_tool: spec.external_tool.clone(),
            }
        })
        .collect()
}

/// Expand a script spec into one task per parameter group.
pub fn expand_script(
    spec: &ScriptSpec,
    global_params: &ParamMap,
    catalog_path: Option<&Path>,
) -> Vec<Task> {
    spec.parameter_groups
        .iter()
        .map(|(group, group_params)| Task {
            id: task_identity(&spec.id, group),
            component: spec.component,
            kind: TaskKind::Script,
            input: spec.input.clone(),
            output: spec.product.clone(),
            kernel_name: spec.kernel_name.clone(),
            params: merge_params(
                &spec.default_params,
                global_params,
                group_params,
                spec.subset.as_ref(),
                catalog_path,
            ),
            dependency: spec.dependency.clone(),
            external_tool: None,
        })
        .collect()
}

/// Expand every notebook and script of one component.
pub fn expand_component(
    spec: &ComponentSpec,
    global_params: &ParamMap,
    catalog_path: Option<&Path>,
) -> Vec<Task> {
    let mut tasks = Vec::new();
    for notebook in &spec.notebooks {
        tasks.extend(expand_notebook(notebook, global_params, catalog_path));
    }
    for script in &spec.scripts {
        tasks.extend(expand_script(script, global_params, catalog_path));
    }
    tasks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

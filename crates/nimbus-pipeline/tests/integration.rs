//! End-to-end integration tests for the nimbus pipeline.
//!
//! Each test exercises the full path: parse YAML -> normalize -> select ->
//! expand -> build graph -> execute -> verify.

use std::sync::Arc;

use nimbus_config::{normalize, RawConfig, StaticProber};
use nimbus_pipeline::{
    expand_component, resolve_catalog, select_components, ComponentFlags, ExecutionPolicy,
    Executor, RecordingRunner, Task, TaskGraph,
};
use nimbus_types::Component;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const CONFIG: &str = r#"
data_sources:
  run_dir: /tmp/diag
  sname: quick-run
  nb_path_root: nblibrary
global_params:
  case_name: b1850.f19_g17
computation_config:
  default_kernel_name: cupid-analysis
compute_notebooks:
  infrastructure:
    index:
      parameter_groups:
        none: {}
  atmosphere:
    summary:
      parameter_groups:
        none: {}
  ocean:
    surface_fields:
      kernel_name: momp-env
      parameter_groups:
        monthly: {}
        annual: {}
"#;

fn model(available_kernels: &[&str]) -> nimbus_config::ConfigModel {
    let raw: RawConfig = serde_yaml::from_str(CONFIG).expect("config should parse");
    normalize(raw, &StaticProber::new(available_kernels.to_vec())).expect("normalize should pass")
}

fn expand_selected(
    config: &nimbus_config::ConfigModel,
    flags: &ComponentFlags,
) -> Vec<Task> {
    let catalog = resolve_catalog(
        config.path_to_cat.as_deref(),
        config.subset.as_ref(),
        &config.run_dir,
    )
    .expect("catalog resolution should pass");

    let mut tasks = Vec::new();
    for component in select_components(flags, config) {
        if let Some(spec) = config.components.get(&component) {
            tasks.extend(expand_component(
                spec,
                &config.global_params,
                catalog.as_deref(),
            ));
        }
    }
    tasks
}

// ---------------------------------------------------------------------------
// Test 1: atmosphere-only selection still carries infrastructure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn atmosphere_flag_yields_infrastructure_plus_summary() {
    let config = model(&["cupid-analysis", "momp-env"]);
    let flags = ComponentFlags {
        atmosphere: true,
        ..Default::default()
    };

    let tasks = expand_selected(&config, &flags);
    let mut graph = TaskGraph::build(tasks, &config.kernels).expect("graph should build");

    let runner = Arc::new(RecordingRunner::new());
    let executor = Executor::new(ExecutionPolicy::Serial);
    let report = executor
        .execute(&mut graph, runner.clone())
        .await
        .expect("run should complete");

    assert_eq!(report.succeeded.len(), 2);
    let mut runs = runner.runs();
    runs.sort();
    assert_eq!(runs, vec!["index", "summary"]);
}

// ---------------------------------------------------------------------------
// Test 2: no flags selects everything; group identities are suffixed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn default_selection_expands_every_group() {
    let config = model(&["cupid-analysis", "momp-env"]);
    let tasks = expand_selected(&config, &ComponentFlags::default());

    let mut ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    ids.sort();
    assert_eq!(
        ids,
        vec![
            "index",
            "summary",
            "surface_fields-annual",
            "surface_fields-monthly"
        ]
    );

    let mut graph = TaskGraph::build(tasks, &config.kernels).expect("graph should build");
    let runner = Arc::new(RecordingRunner::new());
    let report = Executor::new(ExecutionPolicy::Parallel)
        .execute(&mut graph, runner)
        .await
        .expect("run should complete");
    assert_eq!(report.succeeded.len(), 4);
    assert!(report.all_succeeded());
}

// ---------------------------------------------------------------------------
// Test 3: missing kernel prunes tasks but the run continues
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_kernel_prunes_without_failing_the_run() {
    // momp-env is not installed on this machine.
    let config = model(&["cupid-analysis"]);
    let tasks = expand_selected(&config, &ComponentFlags::default());
    let mut graph = TaskGraph::build(tasks, &config.kernels).expect("graph should build");

    assert_eq!(graph.pruned().len(), 2);
    assert!(graph.task("surface_fields-annual").is_none());

    let runner = Arc::new(RecordingRunner::new());
    let report = Executor::new(ExecutionPolicy::Serial)
        .execute(&mut graph, runner.clone())
        .await
        .expect("run should complete");

    assert!(report.all_succeeded());
    assert_eq!(report.pruned.len(), 2);
    assert!(!runner.runs().iter().any(|id| id.starts_with("surface_fields")));
}

// ---------------------------------------------------------------------------
// Test 4: global params flow into every task
// ---------------------------------------------------------------------------

#[tokio::test]
async fn global_params_reach_every_expanded_task() {
    let config = model(&["cupid-analysis", "momp-env"]);
    let tasks = expand_selected(&config, &ComponentFlags::default());

    for task in &tasks {
        assert_eq!(
            task.params.get("case_name"),
            Some(&serde_json::json!("b1850.f19_g17")),
            "task '{}' is missing the global case_name",
            task.id
        );
    }
}

// ---------------------------------------------------------------------------
// Test 5: declared dependency fails loudly at graph construction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dependency_declaration_fails_graph_construction() {
    let source = r#"
data_sources:
  run_dir: /tmp/diag
  sname: s
  nb_path_root: nblibrary
computation_config:
  default_kernel_name: cupid-analysis
compute_notebooks:
  land:
    compute_indices:
      parameter_groups:
        none: {}
    index_plots:
      dependency: compute_indices
      parameter_groups:
        none: {}
"#;
    let raw: RawConfig = serde_yaml::from_str(source).expect("config should parse");
    let config = normalize(raw, &StaticProber::new(["cupid-analysis"])).unwrap();

    let flags = ComponentFlags {
        land: true,
        ..Default::default()
    };
    let tasks = expand_selected(&config, &flags);
    let err = TaskGraph::build(tasks, &config.kernels).unwrap_err();

    assert!(err.is_config_error());
    assert!(err.to_string().contains("dependency wiring is not implemented"));
}

// ---------------------------------------------------------------------------
// Test 6: run-level catalog subset path is injected into task params
// ---------------------------------------------------------------------------

#[tokio::test]
async fn catalog_subset_path_reaches_task_params() {
    let dir = tempfile::tempdir().unwrap();
    let cat_path = dir.path().join("catalog.json");
    std::fs::write(
        &cat_path,
        serde_json::json!({
            "catalog": [
                {"component": "atm", "path": "/d/a.nc"},
                {"component": "ocn", "path": "/d/b.nc"}
            ]
        })
        .to_string(),
    )
    .unwrap();

    let source = format!(
        r#"
data_sources:
  run_dir: {run_dir}
  sname: s
  nb_path_root: nblibrary
  path_to_cat_json: {cat}
  subset:
    component: atm
computation_config:
  default_kernel_name: cupid-analysis
compute_notebooks:
  atmosphere:
    summary:
      parameter_groups:
        none: {{}}
"#,
        run_dir = dir.path().display(),
        cat = cat_path.display()
    );
    let raw: RawConfig = serde_yaml::from_str(&source).unwrap();
    let config = normalize(raw, &StaticProber::new(["cupid-analysis"])).unwrap();

    let flags = ComponentFlags {
        atmosphere: true,
        ..Default::default()
    };
    let tasks = expand_selected(&config, &flags);
    let summary = tasks.iter().find(|t| t.id == "summary").unwrap();

    let injected = summary.params["path_to_cat"].as_str().unwrap();
    assert!(injected.ends_with("catalog-subset.json"));
    assert!(std::path::Path::new(injected).exists());

    // Only the atm record survived the subset.
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(injected).unwrap()).unwrap();
    assert_eq!(written["catalog"].as_array().unwrap().len(), 1);

    // Infrastructure selection behavior is orthogonal here, but the graph
    // must still build and run with the injected parameter present.
    let mut graph = TaskGraph::build(tasks, &config.kernels).unwrap();
    let report = Executor::new(ExecutionPolicy::Serial)
        .execute(&mut graph, Arc::new(RecordingRunner::new()))
        .await
        .unwrap();
    assert!(report.all_succeeded());
}

// ---------------------------------------------------------------------------
// Test 7: duplicate identities across specs are a configuration error
// ---------------------------------------------------------------------------

#[test]
fn duplicate_identities_across_components_are_rejected() {
    let source = r#"
data_sources:
  run_dir: /tmp/diag
  sname: s
  nb_path_root: nblibrary
computation_config:
  default_kernel_name: cupid-analysis
compute_notebooks:
  atmosphere:
    summary:
      parameter_groups:
        none: {}
  ocean:
    summary:
      parameter_groups:
        none: {}
"#;
    let raw: RawConfig = serde_yaml::from_str(source).unwrap();
    let config = normalize(raw, &StaticProber::new(["cupid-analysis"])).unwrap();
    let tasks = expand_selected(&config, &ComponentFlags::default());

    let err = TaskGraph::build(tasks, &config.kernels).unwrap_err();
    assert!(matches!(
        err,
        nimbus_types::NimbusError::DuplicateTask { id } if id == "summary"
    ));
}

// ---------------------------------------------------------------------------
// Test 8: infrastructure notebooks survive every flag combination
// ---------------------------------------------------------------------------

#[test]
fn infrastructure_tasks_present_for_all_flag_combinations() {
    let config = model(&["cupid-analysis", "momp-env"]);

    let combos = [
        ComponentFlags::default(),
        ComponentFlags {
            ocean: true,
            ..Default::default()
        },
        ComponentFlags {
            land: true,
            sea_ice: true,
            ..Default::default()
        },
    ];
    for flags in combos {
        let tasks = expand_selected(&config, &flags);
        assert!(
            tasks.iter().any(|t| t.component == Component::Infrastructure),
            "infrastructure tasks missing for flags {flags:?}"
        );
    }
}

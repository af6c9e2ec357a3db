//! CLI binary for running and validating nimbus diagnostics pipelines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use nimbus_config::{normalize, ConfigModel, JupyterProber};
use nimbus_pipeline::{
    expand_component, resolve_catalog, select_components, CommandRunner, ComponentFlags,
    ExecutionPolicy, Executor, RunEvent, Task, TaskGraph,
};
use nimbus_timeseries::{generate_timeseries, NcdumpInspector, VariableCatalog};
use nimbus_types::Component;

#[derive(Parser)]
#[command(name = "nimbus", version, about = "Diagnostics-pipeline driver for climate-model output")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the diagnostics pipeline described by a config file
    Run {
        /// Path to the pipeline config
        #[arg(default_value = "config.yml")]
        config_path: PathBuf,

        /// Execute tasks one at a time instead of in parallel
        #[arg(long)]
        serial: bool,

        /// Generate per-variable time series before running tasks
        #[arg(long = "time-series")]
        time_series: bool,

        /// Run atmosphere component diagnostics
        #[arg(long)]
        atmosphere: bool,

        /// Run ocean component diagnostics
        #[arg(long)]
        ocean: bool,

        /// Run land component diagnostics
        #[arg(long)]
        land: bool,

        /// Run sea ice component diagnostics
        #[arg(long)]
        seaice: bool,

        /// Run land ice component diagnostics
        #[arg(long)]
        landice: bool,

        /// Run river runoff component diagnostics
        #[arg(long = "river-runoff")]
        river_runoff: bool,
    },

    /// Validate a config file without running anything
    Validate {
        #[arg(default_value = "config.yml")]
        config_path: PathBuf,
    },

    /// Show information about a config file
    Info {
        #[arg(default_value = "config.yml")]
        config_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            config_path,
            serial,
            time_series,
            atmosphere,
            ocean,
            land,
            seaice,
            landice,
            river_runoff,
        } => {
            let flags = ComponentFlags {
                atmosphere,
                ocean,
                land,
                sea_ice: seaice,
                land_ice: landice,
                river_runoff,
            };
            cmd_run(&config_path, &flags, serial, time_series).await?;
        }
        Commands::Validate { config_path } => {
            cmd_validate(&config_path)?;
        }
        Commands::Info { config_path } => {
            cmd_info(&config_path)?;
        }
    }

    Ok(())
}

fn load_model(path: &Path) -> anyhow::Result<ConfigModel> {
    let raw = nimbus_config::load_config(path)?;
    Ok(normalize(raw, &JupyterProber)?)
}

fn expand_selected(config: &ConfigModel, components: &[Component]) -> anyhow::Result<Vec<Task>> {
    let catalog = resolve_catalog(
        config.path_to_cat.as_deref(),
        config.subset.as_ref(),
        &config.run_dir,
    )?;

    let mut tasks = Vec::new();
    for component in components {
        if let Some(spec) = config.components.get(component) {
            tasks.extend(expand_component(
                spec,
                &config.global_params,
                catalog.as_deref(),
            ));
        }
    }
    Ok(tasks)
}

async fn cmd_run(
    config_path: &Path,
    flags: &ComponentFlags,
    serial: bool,
    time_series: bool,
) -> anyhow::Result<()> {
    let config = load_model(config_path)?;
    let components = select_components(flags, &config);

    println!("Running pipeline: {}", config.sname);
    println!(
        "Components: {}",
        components
            .iter()
            .map(Component::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );

    if time_series {
        let metadata = match config
            .timeseries
            .as_ref()
            .and_then(|ts| ts.variable_metadata.as_deref())
        {
            Some(path) => VariableCatalog::load(path)?,
            None => VariableCatalog::empty(),
        };
        generate_timeseries(&config, &components, &NcdumpInspector, &metadata).await?;
    }

    let tasks = expand_selected(&config, &components)?;
    let mut graph = TaskGraph::build(tasks, &config.kernels)?;
    println!("Tasks: {} ({} pruned)", graph.len(), graph.pruned().len());

    let policy = if serial {
        ExecutionPolicy::Serial
    } else {
        ExecutionPolicy::Parallel
    };
    let executor = Executor::new(policy);

    // Progress lines from the event stream.
    let mut events = executor.events().subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RunEvent::TaskStarted { task_id } => println!("  [start] {task_id}"),
                RunEvent::TaskCompleted { task_id, .. } => println!("  [done]  {task_id}"),
                RunEvent::TaskFailed { task_id, error } => {
                    println!("  [fail]  {task_id}: {error}")
                }
                RunEvent::RunCompleted { .. } => break,
                RunEvent::RunStarted { .. } => {}
            }
        }
    });

    let report = executor.execute(&mut graph, Arc::new(CommandRunner)).await?;
    printer.await.ok();

    println!("\nRun finished");
    println!("  succeeded: {}", report.succeeded.len());
    println!("  failed:    {}", report.failed.len());
    println!("  pruned:    {}", report.pruned.len());

    if !report.all_succeeded() {
        for (task, error) in &report.failed {
            eprintln!("task '{task}' failed: {error}");
        }
        anyhow::bail!("{} task(s) failed", report.failed.len());
    }
    Ok(())
}

fn cmd_validate(config_path: &Path) -> anyhow::Result<()> {
    let config = load_model(config_path)?;

    println!("Config is well-formed");
    println!("Kernels:");
    for (kernel, available) in config.kernels.iter() {
        let status = if available { "available" } else { "MISSING" };
        println!("  {kernel}: {status}");
    }

    // Expanding everything catches duplicate identities and unimplemented
    // dependency declarations up front.
    let tasks = expand_selected(&config, &Component::ALL)?;
    let graph = TaskGraph::build(tasks, &config.kernels)?;
    println!("Tasks: {}", graph.len());
    for pruned in graph.pruned() {
        println!(
            "  WARN: task '{}' will be pruned (kernel '{}' missing)",
            pruned.id, pruned.kernel_name
        );
    }
    Ok(())
}

fn cmd_info(config_path: &Path) -> anyhow::Result<()> {
    let config = load_model(config_path)?;

    println!("Pipeline: {}", config.sname);
    println!("Run dir: {}", config.run_dir.display());
    if let Some(kernel) = &config.default_kernel {
        println!("Default kernel: {kernel}");
    }
    if let Some(cat) = &config.path_to_cat {
        println!("Catalog: {}", cat.display());
    }

    println!("\nComponents:");
    for (component, spec) in &config.components {
        println!(
            "  {} ({} notebooks, {} scripts)",
            component,
            spec.notebooks.len(),
            spec.scripts.len()
        );
        for notebook in &spec.notebooks {
            println!(
                "    {} [{}] groups={}",
                notebook.id,
                notebook.kernel_name,
                notebook.parameter_groups.len()
            );
        }
        for script in &spec.scripts {
            println!(
                "    {} [{}] product={}",
                script.id,
                script.kernel_name,
                script.product.display()
            );
        }
    }

    if let Some(ts) = &config.timeseries {
        println!("\nTime series:");
        println!("  cases: {}", ts.case_name.iter().cloned().collect::<Vec<_>>().join(", "));
        println!("  workers: {}", ts.num_procs);
        for (component, entry) in &ts.components {
            println!(
                "  {}: {} vars, {} derived, hist_str={}",
                component,
                entry.vars.len(),
                entry.derive_vars.len(),
                entry.hist_str
            );
        }
    }
    Ok(())
}

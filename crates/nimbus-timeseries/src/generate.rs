//! Per-component, per-case orchestration of time-series generation.

use std::path::PathBuf;

use nimbus_config::{ConfigModel, TsComponentEntry, TimeSeriesSection};
use nimbus_types::{Component, NimbusError, Result};

use crate::discover::discover_history_files;
use crate::inspect::HistoryInspector;
use crate::plan::{plan_derivations, plan_extractions, plan_remaps};
use crate::pool::run_commands;
use crate::resolve::{resolve_variables, VariableCatalog};
use crate::vertical::VerticalCoordinate;

fn output_root(config: &ConfigModel) -> Result<PathBuf> {
    config
        .global_params
        .get("CESM_output_dir")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .ok_or(NimbusError::MissingKey {
            key: "CESM_output_dir".to_string(),
        })
}

#[allow(clippy::too_many_arguments)]
async fn generate_case(
    ts: &TimeSeriesSection,
    entry: &TsComponentEntry,
    component: Component,
    subdir: &str,
    root: &PathBuf,
    case: &str,
    case_idx: usize,
    inspector: &dyn HistoryInspector,
    metadata: &VariableCatalog,
) -> Result<()> {
    if *ts.ts_done.for_case(case_idx).unwrap_or(&false) {
        tracing::info!(component = %component, case, "time series marked done; skipping case");
        return Ok(());
    }
    let overwrite = *ts.overwrite_ts.for_case(case_idx).unwrap_or(&false);

    let year_error = |field: &str| {
        NimbusError::Config(format!(
            "timeseries.{component}.{field} has no value for case '{case}'"
        ))
    };
    let start = *entry
        .start_years
        .for_case(case_idx)
        .ok_or_else(|| year_error("start_years"))?;
    let end = *entry
        .end_years
        .for_case(case_idx)
        .ok_or_else(|| year_error("end_years"))?;

    let in_dir = root.join(case).join(subdir).join("hist");
    let out_dir = entry
        .ts_output_dir
        .clone()
        .unwrap_or_else(|| root.join(case).join(subdir).join("proc").join("tseries"));

    let files = discover_history_files(&in_dir, case, &entry.hist_str, start, end)?;
    tracing::info!(
        component = %component,
        case,
        files = files.len(),
        "discovered history files"
    );

    let requested: Vec<String> = entry
        .vars
        .iter()
        .chain(entry.derive_vars.iter())
        .cloned()
        .collect();
    let present = inspector.variables(&files[0])?;
    let plan = resolve_variables(&requested, &present, metadata);
    let vertical = VerticalCoordinate::detect(&inspector.lev_attributes(&files[0])?);

    std::fs::create_dir_all(&out_dir)?;
    let extractions = plan_extractions(
        &plan.direct,
        &files,
        &out_dir,
        case,
        &entry.hist_str,
        start,
        end,
        vertical,
        overwrite,
    );
    tracing::info!(
        component = %component,
        case,
        direct = plan.direct.len(),
        derived = plan.derived.len(),
        skipped = plan.skipped.len(),
        commands = extractions.len(),
        "planned extraction work list"
    );
    // Every direct variable must exist on disk before derivation starts;
    // run_commands joins all workers, giving us that barrier.
    run_commands(extractions, ts.num_procs).await?;

    let derivations = plan_derivations(
        &plan.derived,
        &out_dir,
        case,
        &entry.hist_str,
        start,
        end,
        overwrite,
    );
    run_commands(derivations, ts.num_procs).await?;

    if let Some(mapping_file) = &entry.mapping_file {
        std::fs::create_dir_all(out_dir.join("regrid"))?;
        let remaps = plan_remaps(&out_dir, mapping_file, overwrite)?;
        tracing::info!(
            component = %component,
            case,
            commands = remaps.len(),
            "planned remap work list"
        );
        run_commands(remaps, ts.num_procs).await?;
    }
    Ok(())
}

/// Generate per-variable time series for every requested component and case.
///
/// Cases are processed sequentially; within a case the extraction work list
/// may run across a `num_procs`-bounded pool, and derived variables are
/// computed only after all direct extraction completes.
pub async fn generate_timeseries(
    config: &ConfigModel,
    components: &[Component],
    inspector: &dyn HistoryInspector,
    metadata: &VariableCatalog,
) -> Result<()> {
    let Some(ts) = &config.timeseries else {
        tracing::info!("no timeseries section configured; nothing to generate");
        return Ok(());
    };
    let root = output_root(config)?;

    for &component in components {
        let Some(entry) = ts.components.get(&component) else {
            continue;
        };
        let Some(subdir) = component.history_subdir() else {
            continue;
        };
        for (case_idx, case) in ts.case_name.iter().enumerate() {
            generate_case(
                ts, entry, component, subdir, &root, case, case_idx, inspector, metadata,
            )
            .await?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::StaticInspector;
    use nimbus_config::{normalize, RawConfig, StaticProber};
    use std::path::Path;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    fn model_for(root: &Path, num_procs: usize, overwrite: bool) -> ConfigModel {
        let source = format!(
            r#"
data_sources:
  run_dir: {root}/diag
  sname: s
  nb_path_root: nblibrary
global_params:
  CESM_output_dir: {root}
timeseries:
  case_name: b1850
  num_procs: {num_procs}
  overwrite_ts: {overwrite}
  atmosphere:
    vars: [PRECC, PRECL]
    derive_vars: [PRECT]
    hist_str: cam.h0
    start_years: 1
    end_years: 2
"#,
            root = root.display(),
        );
        let raw: RawConfig = serde_yaml::from_str(&source).unwrap();
        normalize(raw, &StaticProber::new(["cupid-analysis"])).unwrap()
    }

    fn seed_history(root: &Path) {
        for stamp in ["0001-01", "0001-02", "0002-01"] {
            touch(&root.join(format!("b1850/atm/hist/b1850.cam.h0.{stamp}.nc")));
        }
    }

    fn metadata() -> VariableCatalog {
        serde_yaml::from_str("PRECT:\n  derivable_from: [PRECC, PRECL]\n").unwrap()
    }

    #[tokio::test]
    async fn missing_output_root_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = model_for(dir.path(), 1, false);
        config.global_params.remove("CESM_output_dir");

        let err = generate_timeseries(
            &config,
            &[Component::Atmosphere],
            &StaticInspector::default(),
            &VariableCatalog::empty(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NimbusError::MissingKey { key } if key == "CESM_output_dir"));
    }

    #[tokio::test]
    async fn missing_history_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = model_for(dir.path(), 1, false);

        let err = generate_timeseries(
            &config,
            &[Component::Atmosphere],
            &StaticInspector::with_variables(["PRECC", "PRECL"]),
            &metadata(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NimbusError::InputData { .. }));
    }

    #[tokio::test]
    async fn ts_done_skips_the_case_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let source = format!(
            r#"
data_sources:
  run_dir: {root}/diag
  sname: s
  nb_path_root: nblibrary
global_params:
  CESM_output_dir: {root}
timeseries:
  case_name: b1850
  ts_done: true
  atmosphere:
    vars: [PRECC]
    hist_str: cam.h0
    start_years: 1
    end_years: 2
"#,
            root = dir.path().display(),
        );
        let raw: RawConfig = serde_yaml::from_str(&source).unwrap();
        let config = normalize(raw, &StaticProber::new(["cupid-analysis"])).unwrap();

        // No history files exist; ts_done must short-circuit before the
        // fatal discovery step.
        generate_timeseries(
            &config,
            &[Component::Atmosphere],
            &StaticInspector::default(),
            &VariableCatalog::empty(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn components_without_ts_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = model_for(dir.path(), 1, false);
        // Ocean has no timeseries entry; infrastructure has no history tree.
        generate_timeseries(
            &config,
            &[Component::Ocean, Component::Infrastructure],
            &StaticInspector::default(),
            &VariableCatalog::empty(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn missing_per_case_year_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        seed_history(dir.path());
        let source = format!(
            r#"
data_sources:
  run_dir: {root}/diag
  sname: s
  nb_path_root: nblibrary
global_params:
  CESM_output_dir: {root}
timeseries:
  case_name: [b1850, b1850.base]
  ts_done: [true, false]
  atmosphere:
    vars: [PRECC]
    hist_str: cam.h0
    start_years: [1]
    end_years: [2]
"#,
            root = dir.path().display(),
        );
        let raw: RawConfig = serde_yaml::from_str(&source).unwrap();
        let config = normalize(raw, &StaticProber::new(["cupid-analysis"])).unwrap();

        let err = generate_timeseries(
            &config,
            &[Component::Atmosphere],
            &StaticInspector::with_variables(["PRECC"]),
            &VariableCatalog::empty(),
        )
        .await
        .unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("start_years"));
    }
}

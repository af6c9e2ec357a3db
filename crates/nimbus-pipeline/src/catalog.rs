//! Run-level catalog subsetting.
//!
//! A data catalog is a JSON descriptor carrying a `catalog` array of flat
//! records. Subsetting is a pure filter: the source file is never touched,
//! and the filtered copy lands under `{run_dir}/temp_data/` with a name
//! derived from the source stem, so repeated runs overwrite rather than
//! accumulate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use nimbus_types::{NimbusError, ParamMap, Result};

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    catalog: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(flatten)]
    descriptor: serde_json::Map<String, serde_json::Value>,
}

/// A record matches a query entry when the column equals the wanted value,
/// or — if the wanted value is a list — when the column is one of its
/// members.
fn record_matches(
    record: &serde_json::Map<String, serde_json::Value>,
    key: &str,
    want: &serde_json::Value,
) -> bool {
    let Some(have) = record.get(key) else {
        return false;
    };
    match want {
        serde_json::Value::Array(options) => options.contains(have),
        scalar => have == scalar,
    }
}

fn subset_path(run_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    run_dir.join("temp_data").join(format!("{stem}-subset.json"))
}

/// Resolve the catalog path for this run.
///
/// Returns `None` when no catalog is configured. With a catalog but no
/// run-level subset query, the full catalog path passes through unchanged.
/// With a query, the filtered catalog is serialized under
/// `{run_dir}/temp_data/` and that path is returned.
pub fn resolve_catalog(
    path_to_cat: Option<&Path>,
    subset: Option<&ParamMap>,
    run_dir: &Path,
) -> Result<Option<PathBuf>> {
    let Some(source) = path_to_cat else {
        return Ok(None);
    };
    let Some(query) = subset else {
        return Ok(Some(source.to_path_buf()));
    };

    let raw = std::fs::read_to_string(source).map_err(|e| NimbusError::InputData {
        path: source.display().to_string(),
        message: format!("cannot read catalog: {e}"),
    })?;
    let mut catalog: CatalogFile = serde_json::from_str(&raw)?;

    let before = catalog.catalog.len();
    catalog.catalog.retain(|record| {
        query
            .iter()
            .all(|(key, want)| record_matches(record, key, want))
    });
    tracing::info!(
        source = %source.display(),
        records = before,
        kept = catalog.catalog.len(),
        "subset catalog"
    );

    let target = subset_path(run_dir, source);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, serde_json::to_string_pretty(&catalog)?)?;
    Ok(Some(target))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

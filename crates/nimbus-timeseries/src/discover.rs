//! Raw history-file discovery.

use std::path::{Path, PathBuf};

use globset::Glob;

use nimbus_types::{NimbusError, Result};

/// Find history files `{case}.{hist_str}.*.nc` under `in_dir` whose filename
/// date stamp falls inside `[start_year, end_year]`.
///
/// Both a missing directory and an empty match set are fatal: no partial
/// diagnostic output is meaningful without source data.
pub fn discover_history_files(
    in_dir: &Path,
    case: &str,
    hist_str: &str,
    start_year: i32,
    end_year: i32,
) -> Result<Vec<PathBuf>> {
    if !in_dir.is_dir() {
        return Err(NimbusError::InputData {
            path: in_dir.display().to_string(),
            message: "history directory does not exist".to_string(),
        });
    }

    let matcher = Glob::new(&format!("{case}.{hist_str}.*.nc"))
        .map_err(|e| NimbusError::Config(format!("invalid hist_str pattern: {e}")))?
        .compile_matcher();
    // Date stamp at the end of the name: yearly `.0001.nc`, monthly
    // `.0001-01.nc`, or daily `.0001-01-15.nc`.
    let date = regex::Regex::new(r"\.(\d{4})(?:-\d{2}){0,2}\.nc$").expect("static regex compiles");

    let mut files = Vec::new();
    for entry in std::fs::read_dir(in_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !matcher.is_match(name.as_ref()) {
            continue;
        }
        let Some(caps) = date.captures(&name) else {
            tracing::debug!(file = %name, "skipping history file without a date stamp");
            continue;
        };
        let year: i32 = caps[1].parse().expect("four digits parse as i32");
        if year >= start_year && year <= end_year {
            files.push(entry.path());
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(NimbusError::InputData {
            path: in_dir.display().to_string(),
            message: format!(
                "no history files matching '{case}.{hist_str}.*.nc' in years {start_year}-{end_year}"
            ),
        });
    }
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

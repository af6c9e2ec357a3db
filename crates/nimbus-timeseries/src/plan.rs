//! Extraction, derivation, and remap command construction with idempotent
//! skip logic.
//!
//! Every output filename is a deterministic function of case, history
//! stream, variable, and year range, so re-planning against existing outputs
//! yields an empty work list unless overwrite is requested.

use std::path::{Path, PathBuf};

use nimbus_types::Result;

use crate::resolve::DerivedVariable;
use crate::vertical::VerticalCoordinate;

/// One external command writing one output file. Output paths are disjoint
/// across a work list, so any execution interleaving is safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkCommand {
    pub program: String,
    pub args: Vec<String>,
    pub output: PathBuf,
}

impl WorkCommand {
    pub fn describe(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// Deterministic per-variable time-series filename.
pub fn ts_output_name(case: &str, hist_str: &str, var: &str, start: i32, end: i32) -> String {
    format!("{case}.{hist_str}.{var}.{start:04}-{end:04}.nc")
}

/// `ncrcat` invocation extracting one variable (plus vertical ancillaries)
/// from the history files into a single time series.
pub fn extraction_command(
    var: &str,
    ancillary: &[&str],
    files: &[PathBuf],
    output: &Path,
) -> WorkCommand {
    let mut vars = vec![var.to_string()];
    vars.extend(ancillary.iter().map(|s| s.to_string()));

    let mut args = vec![
        "-O".to_string(),
        "-4".to_string(),
        "-h".to_string(),
        "-v".to_string(),
        vars.join(","),
    ];
    args.extend(files.iter().map(|f| f.to_string_lossy().into_owned()));
    args.push("-o".to_string());
    args.push(output.to_string_lossy().into_owned());

    WorkCommand {
        program: "ncrcat".to_string(),
        args,
        output: output.to_path_buf(),
    }
}

/// `cdo` invocation summing the constituent series into the derived target
/// and renaming the result.
pub fn derive_command(
    derived: &DerivedVariable,
    constituent_files: &[PathBuf],
    output: &Path,
) -> WorkCommand {
    let mut args = vec![
        "-O".to_string(),
        format!("chname,{},{}", derived.constituents[0], derived.name),
        "-enssum".to_string(),
    ];
    args.extend(
        constituent_files
            .iter()
            .map(|f| f.to_string_lossy().into_owned()),
    );
    args.push(output.to_string_lossy().into_owned());

    WorkCommand {
        program: "cdo".to_string(),
        args,
        output: output.to_path_buf(),
    }
}

/// `ncremap` invocation re-projecting one finished series onto the grid
/// described by `mapping_file`.
pub fn remap_command(mapping_file: &Path, input: &Path, output: &Path) -> WorkCommand {
    WorkCommand {
        program: "ncremap".to_string(),
        args: vec![
            "-m".to_string(),
            mapping_file.to_string_lossy().into_owned(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
        ],
        output: output.to_path_buf(),
    }
}

fn skip_existing(output: &Path, overwrite: bool) -> bool {
    if !overwrite && output.exists() {
        tracing::info!(output = %output.display(), "time series exists; skipping");
        true
    } else {
        false
    }
}

/// Plan the extraction work list for the directly available variables.
#[allow(clippy::too_many_arguments)]
pub fn plan_extractions(
    direct: &[String],
    files: &[PathBuf],
    out_dir: &Path,
    case: &str,
    hist_str: &str,
    start: i32,
    end: i32,
    vertical: VerticalCoordinate,
    overwrite: bool,
) -> Vec<WorkCommand> {
    direct
        .iter()
        .filter_map(|var| {
            let output = out_dir.join(ts_output_name(case, hist_str, var, start, end));
            if skip_existing(&output, overwrite) {
                return None;
            }
            Some(extraction_command(
                var,
                vertical.ancillary_vars(),
                files,
                &output,
            ))
        })
        .collect()
}

/// Plan the derivation work list; runs only after every extraction has
/// completed, since the inputs are the freshly produced constituent series.
pub fn plan_derivations(
    derived: &[DerivedVariable],
    out_dir: &Path,
    case: &str,
    hist_str: &str,
    start: i32,
    end: i32,
    overwrite: bool,
) -> Vec<WorkCommand> {
    derived
        .iter()
        .filter_map(|d| {
            let output = out_dir.join(ts_output_name(case, hist_str, &d.name, start, end));
            if skip_existing(&output, overwrite) {
                return None;
            }
            let constituent_files: Vec<PathBuf> = d
                .constituents
                .iter()
                .map(|c| out_dir.join(ts_output_name(case, hist_str, c, start, end)))
                .collect();
            Some(derive_command(d, &constituent_files, &output))
        })
        .collect()
}

/// Plan the remap work list over every finished series in `ts_dir`,
/// targeting the `regrid/` subdirectory.
pub fn plan_remaps(
    ts_dir: &Path,
    mapping_file: &Path,
    overwrite: bool,
) -> Result<Vec<WorkCommand>> {
    let regrid_dir = ts_dir.join("regrid");
    let mut commands = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(ts_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map(|e| e == "nc").unwrap_or(false))
        .collect();
    entries.sort();

    for input in entries {
        let name = input.file_name().expect("files have names");
        let output = regrid_dir.join(name);
        if skip_existing(&output, overwrite) {
            continue;
        }
        commands.push(remap_command(mapping_file, &input, &output));
    }
    Ok(commands)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn output_name_is_deterministic() {
        assert_eq!(
            ts_output_name("b1850", "cam.h0", "PRECC", 1, 100),
            "b1850.cam.h0.PRECC.0001-0100.nc"
        );
    }

    #[test]
    fn extraction_command_lists_variable_and_ancillaries() {
        let files = vec![PathBuf::from("/hist/a.nc"), PathBuf::from("/hist/b.nc")];
        let cmd = extraction_command(
            "T",
            VerticalCoordinate::Hybrid.ancillary_vars(),
            &files,
            Path::new("/ts/out.nc"),
        );
        assert_eq!(cmd.program, "ncrcat");
        assert_eq!(cmd.args[3], "-v");
        assert_eq!(cmd.args[4], "T,hyam,hybm,PS");
        assert!(cmd.args.contains(&"/hist/a.nc".to_string()));
        assert_eq!(cmd.args.last().unwrap(), "/ts/out.nc");
    }

    #[test]
    fn derive_command_sums_and_renames() {
        let derived = DerivedVariable {
            name: "PRECT".into(),
            constituents: strings(&["PRECC", "PRECL"]),
        };
        let files = vec![
            PathBuf::from("/ts/b.cam.h0.PRECC.0001-0010.nc"),
            PathBuf::from("/ts/b.cam.h0.PRECL.0001-0010.nc"),
        ];
        let cmd = derive_command(&derived, &files, Path::new("/ts/b.cam.h0.PRECT.0001-0010.nc"));
        assert_eq!(cmd.program, "cdo");
        assert_eq!(cmd.args[1], "chname,PRECC,PRECT");
        assert_eq!(cmd.args[2], "-enssum");
    }

    #[test]
    fn existing_outputs_are_skipped_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir
            .path()
            .join(ts_output_name("b1850", "cam.h0", "TS", 1, 10));
        std::fs::write(&existing, b"").unwrap();

        let files = vec![PathBuf::from("/hist/a.nc")];
        let commands = plan_extractions(
            &strings(&["TS", "PS"]),
            &files,
            dir.path(),
            "b1850",
            "cam.h0",
            1,
            10,
            VerticalCoordinate::None,
            false,
        );
        assert_eq!(commands.len(), 1);
        assert!(commands[0].args[4].starts_with("PS"));
    }

    #[test]
    fn overwrite_replans_existing_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir
            .path()
            .join(ts_output_name("b1850", "cam.h0", "TS", 1, 10));
        std::fs::write(&existing, b"").unwrap();

        let files = vec![PathBuf::from("/hist/a.nc")];
        let commands = plan_extractions(
            &strings(&["TS"]),
            &files,
            dir.path(),
            "b1850",
            "cam.h0",
            1,
            10,
            VerticalCoordinate::None,
            true,
        );
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn second_plan_with_all_outputs_present_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        for var in ["PRECC", "PRECL"] {
            std::fs::write(
                dir.path()
                    .join(ts_output_name("b1850", "cam.h0", var, 1, 10)),
                b"",
            )
            .unwrap();
        }
        std::fs::write(
            dir.path()
                .join(ts_output_name("b1850", "cam.h0", "PRECT", 1, 10)),
            b"",
        )
        .unwrap();

        let files = vec![PathBuf::from("/hist/a.nc")];
        let extractions = plan_extractions(
            &strings(&["PRECC", "PRECL"]),
            &files,
            dir.path(),
            "b1850",
            "cam.h0",
            1,
            10,
            VerticalCoordinate::None,
            false,
        );
        let derivations = plan_derivations(
            &[DerivedVariable {
                name: "PRECT".into(),
                constituents: strings(&["PRECC", "PRECL"]),
            }],
            dir.path(),
            "b1850",
            "cam.h0",
            1,
            10,
            false,
        );
        assert!(extractions.is_empty());
        assert!(derivations.is_empty());
    }

    #[test]
    fn derivation_inputs_are_the_constituent_series() {
        let dir = tempfile::tempdir().unwrap();
        let commands = plan_derivations(
            &[DerivedVariable {
                name: "PRECT".into(),
                constituents: strings(&["PRECC", "PRECL"]),
            }],
            dir.path(),
            "b1850",
            "cam.h0",
            1,
            10,
            false,
        );
        assert_eq!(commands.len(), 1);
        let precc_ts = dir
            .path()
            .join("b1850.cam.h0.PRECC.0001-0010.nc")
            .to_string_lossy()
            .into_owned();
        assert!(commands[0].args.contains(&precc_ts));
    }

    #[test]
    fn remap_plan_targets_regrid_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.cam.h0.TS.0001-0010.nc"), b"").unwrap();
        std::fs::write(dir.path().join("b.cam.h0.PS.0001-0010.nc"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let commands = plan_remaps(dir.path(), Path::new("/maps/fv_to_1x1.nc"), false).unwrap();
        assert_eq!(commands.len(), 2);
        for cmd in &commands {
            assert_eq!(cmd.program, "ncremap");
            assert!(cmd.output.starts_with(dir.path().join("regrid")));
        }
    }

    #[test]
    fn remap_plan_is_idempotent_too() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.cam.h0.TS.0001-0010.nc"), b"").unwrap();
        let regrid = dir.path().join("regrid");
        std::fs::create_dir_all(&regrid).unwrap();
        std::fs::write(regrid.join("b.cam.h0.TS.0001-0010.nc"), b"").unwrap();

        let commands = plan_remaps(dir.path(), Path::new("/maps/m.nc"), false).unwrap();
        assert!(commands.is_empty());
    }
}

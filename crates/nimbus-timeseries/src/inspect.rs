//! The history-file inspection seam.
//!
//! Variable resolution and vertical-coordinate detection only need two
//! facts about a history file: which variables it holds and what the `lev`
//! coordinate's attributes say. [`NcdumpInspector`] answers both by parsing
//! `ncdump -h` output; [`StaticInspector`] answers from fixed data in tests.

use std::collections::BTreeMap;
use std::path::Path;

use nimbus_types::{NimbusError, Result};

pub trait HistoryInspector: Send + Sync {
    /// Names of all variables declared in the file.
    fn variables(&self, path: &Path) -> Result<Vec<String>>;

    /// String attributes of the `lev` coordinate, empty when the file has
    /// no `lev` dimension.
    fn lev_attributes(&self, path: &Path) -> Result<BTreeMap<String, String>>;
}

// ---------------------------------------------------------------------------
// NcdumpInspector — live implementation
// ---------------------------------------------------------------------------

/// Reads file headers with `ncdump -h`.
pub struct NcdumpInspector;

impl NcdumpInspector {
    fn header(path: &Path) -> Result<String> {
        let output = std::process::Command::new("ncdump")
            .arg("-h")
            .arg(path)
            .output()?;
        if !output.status.success() {
            return Err(NimbusError::CommandFailed {
                program: "ncdump".to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub(crate) fn parse_variables(header: &str) -> Vec<String> {
        let decl = regex::Regex::new(
            r"(?m)^\s*(?:float|double|int|int64|long|short|byte|ubyte|ushort|uint|uint64|char)\s+(\w+)\s*\(",
        )
        .expect("static regex compiles");
        decl.captures_iter(header)
            .map(|c| c[1].to_string())
            .collect()
    }

    pub(crate) fn parse_lev_attributes(header: &str) -> BTreeMap<String, String> {
        let attr = regex::Regex::new(r#"(?m)^\s*lev:(\w+)\s*=\s*"([^"]*)""#)
            .expect("static regex compiles");
        attr.captures_iter(header)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect()
    }
}

impl HistoryInspector for NcdumpInspector {
    fn variables(&self, path: &Path) -> Result<Vec<String>> {
        Ok(Self::parse_variables(&Self::header(path)?))
    }

    fn lev_attributes(&self, path: &Path) -> Result<BTreeMap<String, String>> {
        Ok(Self::parse_lev_attributes(&Self::header(path)?))
    }
}

// ---------------------------------------------------------------------------
// StaticInspector — test double
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct StaticInspector {
    pub variables: Vec<String>,
    pub lev_attrs: BTreeMap<String, String>,
}

impl StaticInspector {
    pub fn with_variables<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            lev_attrs: BTreeMap::new(),
        }
    }
}

impl HistoryInspector for StaticInspector {
    fn variables(&self, _path: &Path) -> Result<Vec<String>> {
        Ok(self.variables.clone())
    }

    fn lev_attributes(&self, _path: &Path) -> Result<BTreeMap<String, String>> {
        Ok(self.lev_attrs.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

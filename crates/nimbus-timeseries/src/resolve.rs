//! Two-pass variable resolution: direct extraction vs. derivation.
//!
//! A requested variable physically present in the source file is extracted
//! directly. An absent variable is checked against the variable-metadata
//! table's `derivable_from` list; its constituents join the direct set and
//! the target is computed afterwards from the produced series. Anything else
//! is skipped with a warning; one missing variable never aborts the run.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use nimbus_types::Result;

/// Variable-metadata table: variable name → metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariableCatalog {
    #[serde(flatten)]
    vars: BTreeMap<String, VariableInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariableInfo {
    #[serde(default)]
    pub derivable_from: Vec<String>,
}

impl VariableCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&source)?)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn derivable_from(&self, var: &str) -> Option<&[String]> {
        self.vars
            .get(var)
            .filter(|info| !info.derivable_from.is_empty())
            .map(|info| info.derivable_from.as_slice())
    }
}

/// A variable computed from constituents rather than extracted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedVariable {
    pub name: String,
    pub constituents: Vec<String>,
}

/// Outcome of resolution: what to extract, what to derive afterwards, and
/// what was dropped.
#[derive(Debug, Clone, Default)]
pub struct VariablePlan {
    pub direct: Vec<String>,
    pub derived: Vec<DerivedVariable>,
    pub skipped: Vec<String>,
}

/// Resolve `requested` against the variables `present` in the first history
/// file, consulting `catalog` for derivation recipes.
pub fn resolve_variables(
    requested: &[String],
    present: &[String],
    catalog: &VariableCatalog,
) -> VariablePlan {
    let mut plan = VariablePlan::default();
    let mut push_direct = |direct: &mut Vec<String>, var: &str| {
        if !direct.iter().any(|v| v == var) {
            direct.push(var.to_string());
        }
    };

    for var in requested {
        if present.iter().any(|p| p == var) {
            push_direct(&mut plan.direct, var);
            continue;
        }
        match catalog.derivable_from(var) {
            Some(constituents) => {
                let missing: Vec<&String> = constituents
                    .iter()
                    .filter(|c| !present.iter().any(|p| &p == c))
                    .collect();
                if !missing.is_empty() {
                    tracing::warn!(
                        variable = %var,
                        missing = ?missing,
                        "constituents absent from source file; skipping variable"
                    );
                    plan.skipped.push(var.clone());
                    continue;
                }
                for constituent in constituents {
                    push_direct(&mut plan.direct, constituent);
                }
                plan.derived.push(DerivedVariable {
                    name: var.clone(),
                    constituents: constituents.to_vec(),
                });
            }
            None => {
                tracing::warn!(
                    variable = %var,
                    "variable not in source file and not derivable; skipping"
                );
                plan.skipped.push(var.clone());
            }
        }
    }
    plan
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

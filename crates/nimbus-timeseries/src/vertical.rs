//! Vertical-coordinate detection from `lev` attribute heuristics.

use std::collections::BTreeMap;

/// Vertical-coordinate convention of a history file. Controls which
/// ancillary variables ride along with every per-variable extraction so the
/// resulting time series stays self-describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalCoordinate {
    /// Hybrid sigma-pressure levels; extractions carry the hybrid
    /// coefficients and surface pressure.
    Hybrid,
    /// Height levels; extractions carry mid-level pressure and surface
    /// pressure.
    Height,
    None,
}

impl VerticalCoordinate {
    pub fn detect(lev_attrs: &BTreeMap<String, String>) -> VerticalCoordinate {
        if lev_attrs.is_empty() {
            return VerticalCoordinate::None;
        }
        let standard_name = lev_attrs.get("standard_name").map(String::as_str);
        let long_name = lev_attrs.get("long_name").map(String::as_str).unwrap_or("");
        let units = lev_attrs.get("units").map(String::as_str);

        if standard_name == Some("atmosphere_hybrid_sigma_pressure_coordinate")
            || long_name.contains("hybrid level")
        {
            VerticalCoordinate::Hybrid
        } else if units == Some("m") || long_name.contains("height") {
            VerticalCoordinate::Height
        } else {
            VerticalCoordinate::None
        }
    }

    pub fn ancillary_vars(&self) -> &'static [&'static str] {
        match self {
            VerticalCoordinate::Hybrid => &["hyam", "hybm", "PS"],
            VerticalCoordinate::Height => &["PMID", "PS"],
            VerticalCoordinate::None => &[],
        }
    }
}

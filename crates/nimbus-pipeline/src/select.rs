//! Component selection from CLI flags.

use nimbus_config::ConfigModel;
use nimbus_types::Component;

/// One boolean per selectable component. `Infrastructure` has no flag; it is
/// always selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentFlags {
    pub atmosphere: bool,
    pub ocean: bool,
    pub land: bool,
    pub sea_ice: bool,
    pub land_ice: bool,
    pub river_runoff: bool,
}

impl ComponentFlags {
    pub fn any(&self) -> bool {
        self.atmosphere
            || self.ocean
            || self.land
            || self.sea_ice
            || self.land_ice
            || self.river_runoff
    }

    fn is_set(&self, component: Component) -> bool {
        match component {
            Component::Atmosphere => self.atmosphere,
            Component::Ocean => self.ocean,
            Component::Land => self.land,
            Component::SeaIce => self.sea_ice,
            Component::LandIce => self.land_ice,
            Component::RiverRunoff => self.river_runoff,
            Component::Infrastructure => true,
        }
    }
}

/// Resolve the active components for this run.
///
/// No flag set means "run everything". With explicit flags, the flagged
/// components plus `Infrastructure` are selected, and every explicitly
/// selected component with nothing declared in the config gets one warning.
/// The implicit all mode stays quiet.
pub fn select_components(flags: &ComponentFlags, config: &ConfigModel) -> Vec<Component> {
    if !flags.any() {
        return Component::ALL.to_vec();
    }

    let selected: Vec<Component> = Component::ALL
        .into_iter()
        .filter(|c| flags.is_set(*c))
        .collect();

    for component in &selected {
        let empty = config
            .components
            .get(component)
            .map(|spec| spec.is_empty())
            .unwrap_or(true);
        if empty {
            tracing::warn!(
                component = %component,
                "no notebooks or scripts specified for component"
            );
        }
    }

    selected
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

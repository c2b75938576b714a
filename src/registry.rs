//! Simulation-variable registry.
//!
//! The narrow surface the gauge consumes for live values and externally
//! managed geometry. Owned by the host, borrowed per call; the gauge
//! performs one registration write at construction and reads thereafter.

use std::collections::HashMap;

use log::debug;

/// A registered simulated quantity.
#[derive(Debug, Clone)]
pub struct VarDef {
    pub label: String,
    pub settable: bool,
    pub default: f64,
    pub update_rate: u32,
}

/// Stored position and size for a named instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub size: u32,
}

/// Host-owned store of simulated quantities and per-instrument settings.
#[derive(Debug, Default)]
pub struct SimVarRegistry {
    vars: HashMap<String, Vec<VarDef>>,
    settings: HashMap<String, Geometry>,
    airspeed: f64,
}

impl SimVarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a measured quantity under an instrument name.
    pub fn add_var(&mut self, name: &str, label: &str, settable: bool, default: f64, update_rate: u32) {
        debug!("{name}: registering \"{label}\"");
        self.vars.entry(name.to_string()).or_default().push(VarDef {
            label: label.to_string(),
            settable,
            default,
            update_rate,
        });
    }

    /// Variables registered under an instrument name.
    pub fn vars(&self, name: &str) -> &[VarDef] {
        self.vars.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Current indicated airspeed, in knots.
    pub fn airspeed(&self) -> f64 {
        self.airspeed
    }

    /// Feed a new indicated airspeed, in knots.
    pub fn set_airspeed(&mut self, knots: f64) {
        self.airspeed = knots;
    }

    /// Authoritative geometry for a named instrument. An entry that does
    /// not exist yet is seeded from the caller's current geometry, so an
    /// absent entry behaves like a freshly configured one.
    pub fn read_settings(&mut self, name: &str, x: i32, y: i32, size: u32) -> Geometry {
        *self
            .settings
            .entry(name.to_string())
            .or_insert(Geometry { x, y, size })
    }

    /// Reconfigure a named instrument from outside (panel editor, layout
    /// reload). Picked up by the instrument on its next update.
    pub fn store_settings(&mut self, name: &str, geometry: Geometry) {
        self.settings.insert(name.to_string(), geometry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_read_seeds_from_the_caller() {
        let mut registry = SimVarRegistry::new();
        let geometry = registry.read_settings("ASI Glider", 10, 20, 400);
        assert_eq!(geometry, Geometry { x: 10, y: 20, size: 400 });
        // A later read with a different fallback returns the seeded entry.
        let again = registry.read_settings("ASI Glider", 0, 0, 800);
        assert_eq!(again, geometry);
    }

    #[test]
    fn stored_settings_override_the_seed() {
        let mut registry = SimVarRegistry::new();
        registry.read_settings("ASI Glider", 0, 0, 400);
        registry.store_settings("ASI Glider", Geometry { x: 5, y: 6, size: 800 });
        let geometry = registry.read_settings("ASI Glider", 0, 0, 400);
        assert_eq!(geometry, Geometry { x: 5, y: 6, size: 800 });
    }

    #[test]
    fn variables_are_kept_per_instrument_name() {
        let mut registry = SimVarRegistry::new();
        registry.add_var("ASI Glider", "Airspeed Indicated", false, 1.0, 0);
        assert_eq!(registry.vars("ASI Glider").len(), 1);
        assert_eq!(registry.vars("ASI Glider")[0].label, "Airspeed Indicated");
        assert!(!registry.vars("ASI Glider")[0].settable);
        assert!(registry.vars("Altimeter").is_empty());
    }

    #[test]
    fn airspeed_round_trips() {
        let mut registry = SimVarRegistry::new();
        assert_eq!(registry.airspeed(), 0.0);
        registry.set_airspeed(54.0);
        assert_eq!(registry.airspeed(), 54.0);
    }
}

//! Property registry: native unit and label per property name

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{PlotError, Result};

/// A registered physical property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Native unit of the raw data, as understood by the unit system
    pub unit: String,
    /// Human readable label used for axis titles and legends
    pub label: String,
}

impl Property {
    pub fn new(unit: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            label: label.into(),
        }
    }
}

/// Built-in accelerator properties: name, native unit, label
const DEFAULT_PROPERTIES: &[(&str, &str, &str)] = &[
    // Coordinates
    ("s", "m", "s"),
    ("x", "m", "x"),
    ("y", "m", "y"),
    ("px", "1", "x'"),
    ("py", "1", "y'"),
    ("zeta", "m", "ζ"),
    ("delta", "1", "δ"),
    ("ptau", "1", "p_τ"),
    ("t", "s", "t"),
    ("energy", "eV", "E"),
    // Time structure
    ("count", "1", "Count"),
    ("rate", "1/s", "Rate"),
    ("cumulative", "1", "Cumulative count"),
    // Twiss functions
    ("alfx", "1", "α_x"),
    ("alfy", "1", "α_y"),
    ("betx", "m", "β_x"),
    ("bety", "m", "β_y"),
    ("gamx", "1/m", "γ_x"),
    ("gamy", "1/m", "γ_y"),
    ("mux", "1", "μ_x"),
    ("muy", "1", "μ_y"),
    ("dx", "m", "D_x"),
    ("dy", "m", "D_y"),
    ("dpx", "1", "D'_x"),
    ("dpy", "1", "D'_y"),
    ("qx", "1", "Q_x"),
    ("qy", "1", "Q_y"),
    ("dqx", "1", "Q'_x"),
    ("dqy", "1", "Q'_y"),
    // Multipole strengths
    ("k0l", "rad", "k_0l"),
    ("k1l", "1/m", "k_1l"),
    ("k2l", "1/m^2", "k_2l"),
    ("k3l", "1/m^3", "k_3l"),
    ("k4l", "1/m^4", "k_4l"),
    ("k5l", "1/m^5", "k_5l"),
];

/// Registry of known properties
///
/// Plots look up every series they draw here; a property missing from the
/// registry is an error at plot construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRegistry {
    properties: HashMap<String, Property>,
}

impl PropertyRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            properties: HashMap::new(),
        }
    }

    /// A registry pre-populated with coordinates, twiss functions and multipole strengths
    pub fn with_defaults() -> Self {
        let properties = DEFAULT_PROPERTIES
            .iter()
            .map(|(name, unit, label)| (name.to_string(), Property::new(*unit, *label)))
            .collect();
        Self { properties }
    }

    /// Register or replace a property, returning the previous definition
    pub fn register(
        &mut self,
        name: impl Into<String>,
        unit: impl Into<String>,
        label: impl Into<String>,
    ) -> Option<Property> {
        self.properties
            .insert(name.into(), Property::new(unit, label))
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Like [`get`](Self::get), but a missing property is an `UnknownProperty` error
    pub fn lookup(&self, name: &str) -> Result<&Property> {
        self.get(name)
            .ok_or_else(|| PlotError::UnknownProperty(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

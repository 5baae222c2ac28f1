//! Per-plot unit resolution

use std::collections::HashMap;
use std::sync::Arc;

use super::{Property, PropertyRegistry, SiUnits, UnitSystem};
use crate::{PlotError, Result};

/// Registry, unit system and requested display units of one plot
///
/// Display units are keyed by property name. A key may also name a property
/// pair without its plane suffix: `bet` applies to both `betx` and `bety`
/// unless one of them has its own entry.
#[derive(Debug, Clone)]
pub struct UnitContext {
    registry: Arc<PropertyRegistry>,
    system: Arc<dyn UnitSystem>,
    display_units: HashMap<String, String>,
}

impl UnitContext {
    pub fn new(
        registry: Arc<PropertyRegistry>,
        system: Arc<dyn UnitSystem>,
        display_units: HashMap<String, String>,
    ) -> Self {
        Self {
            registry,
            system,
            display_units,
        }
    }

    /// Default registry and SI units, no display unit overrides
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(PropertyRegistry::with_defaults()),
            Arc::new(SiUnits),
            HashMap::new(),
        )
    }

    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    pub fn property(&self, name: &str) -> Result<&Property> {
        self.registry.lookup(name)
    }

    /// Unit in which `name` is displayed
    pub fn display_unit_for(&self, name: &str) -> Result<String> {
        let property = self.property(name)?;
        let requested = self.display_units.get(name).or_else(|| {
            name.strip_suffix(&['x', 'y'][..])
                .filter(|group| !group.is_empty())
                .and_then(|group| self.display_units.get(group))
        });
        Ok(requested.unwrap_or(&property.unit).clone())
    }

    /// Factor converting raw values of `name` into its display unit
    pub fn factor_for(&self, name: &str) -> Result<f64> {
        let native = &self.property(name)?.unit;
        let display = self.display_unit_for(name)?;
        if *native == display {
            return Ok(1.0);
        }

        let factor = self
            .system
            .scale_factor(native, &display)?
            .ok_or_else(|| PlotError::UnitIncompatibility {
                property: name.to_string(),
                from: native.clone(),
                to: display.clone(),
            })?;
        if !factor.is_finite() || factor <= 0.0 {
            return Err(PlotError::UnitError(format!(
                "Conversion of '{}' from '{}' to '{}' gives invalid factor {}",
                name, native, display, factor
            )));
        }
        Ok(factor)
    }

    /// Axis label for a group of properties drawn on the same axis
    ///
    /// Properties sharing a display unit get one unit suffix, e.g.
    /// `β_x, β_y [m]`; mixed units are attached per property.
    pub fn label_for(&self, names: &[&str]) -> Result<String> {
        let mut parts = Vec::with_capacity(names.len());
        for name in names {
            parts.push((
                self.property(name)?.label.as_str(),
                self.display_unit_for(name)?,
            ));
        }

        let shared = match parts.first() {
            Some((_, unit)) if parts.iter().all(|(_, u)| u == unit) => Some(unit.clone()),
            _ => None,
        };
        let with_unit = |label: &str, unit: &str| {
            if unit.is_empty() || unit == "1" {
                label.to_string()
            } else {
                format!("{} [{}]", label, unit)
            }
        };

        Ok(match shared {
            Some(unit) => {
                let labels: Vec<&str> = parts.iter().map(|(label, _)| *label).collect();
                with_unit(&labels.join(", "), &unit)
            }
            None => parts
                .iter()
                .map(|(label, unit)| with_unit(label, unit))
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(units: &[(&str, &str)]) -> UnitContext {
        UnitContext::new(
            Arc::new(PropertyRegistry::with_defaults()),
            Arc::new(SiUnits),
            units
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_factor_is_one_for_native_unit() {
        let ctx = context(&[("bet", "m")]);
        assert_eq!(ctx.factor_for("betx").unwrap(), 1.0);
        assert_eq!(ctx.factor_for("s").unwrap(), 1.0);
    }

    #[test]
    fn test_group_display_unit_applies_to_both_planes() {
        let ctx = context(&[("x", "mm")]);
        assert_eq!(ctx.display_unit_for("x").unwrap(), "mm");
        assert_eq!(ctx.display_unit_for("px").unwrap(), "1");

        let ctx = context(&[("bet", "cm"), ("bety", "km")]);
        assert_eq!(ctx.display_unit_for("betx").unwrap(), "cm");
        assert_eq!(ctx.display_unit_for("bety").unwrap(), "km");
        assert!((ctx.factor_for("betx").unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_incompatible_display_unit() {
        let ctx = context(&[("betx", "s")]);
        let err = ctx.factor_for("betx").unwrap_err();
        assert!(matches!(
            err,
            PlotError::UnitIncompatibility { ref property, .. } if property == "betx"
        ));
    }

    #[test]
    fn test_unknown_property() {
        let ctx = context(&[]);
        assert!(matches!(
            ctx.factor_for("foo"),
            Err(PlotError::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_labels() {
        let ctx = context(&[("x", "mm")]);
        assert_eq!(ctx.label_for(&["betx", "bety"]).unwrap(), "β_x, β_y [m]");
        assert_eq!(ctx.label_for(&["x", "y"]).unwrap(), "x [mm], y [m]");
        assert_eq!(ctx.label_for(&["alfx"]).unwrap(), "α_x");
    }
}

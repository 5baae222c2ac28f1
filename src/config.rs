//! TOML configuration
//!
//! ```toml
//! [display_units]
//! bet = "cm"
//! x = "mm"
//!
//! [properties.emit]
//! unit = "m"
//! label = "ε"
//!
//! [figure]
//! width = 900
//! height = 700
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use toml_edit::{DocumentMut, Item, TableLike};
use tracing::{debug, warn};

use crate::figure::Figure;
use crate::plot::PlotOptions;
use crate::units::{Property, PropertyRegistry};
use crate::{PlotError, Result};

const SECTIONS: &[&str] = &["display_units", "properties", "figure"];

/// Settings shared by all plots of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotConfig {
    display_units: HashMap<String, String>,
    /// Extra properties in file order
    properties: Vec<(String, Property)>,
    width: Option<u32>,
    height: Option<u32>,
}

impl PlotConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let doc: DocumentMut = text
            .parse()
            .map_err(|e| PlotError::ConfigError(format!("Invalid TOML: {}", e)))?;

        for (key, _) in doc.iter() {
            if !SECTIONS.contains(&key) {
                warn!(section = key, "ignoring unknown configuration section");
            }
        }

        let mut config = PlotConfig::default();

        if let Some(units) = section(&doc, "display_units")? {
            for (property, unit) in units.iter() {
                let unit = string_value(unit, &format!("display_units.{}", property))?;
                config.display_units.insert(property.to_string(), unit);
            }
        }

        if let Some(properties) = section(&doc, "properties")? {
            for (name, item) in properties.iter() {
                let table = item.as_table_like().ok_or_else(|| {
                    PlotError::ConfigError(format!("properties.{} must be a table", name))
                })?;
                let unit = table
                    .get("unit")
                    .map(|u| string_value(u, &format!("properties.{}.unit", name)))
                    .transpose()?
                    .ok_or_else(|| {
                        PlotError::ConfigError(format!("properties.{} needs a unit", name))
                    })?;
                let label = table
                    .get("label")
                    .map(|l| string_value(l, &format!("properties.{}.label", name)))
                    .transpose()?
                    .unwrap_or_else(|| name.to_string());
                config
                    .properties
                    .push((name.to_string(), Property::new(unit, label)));
            }
        }

        if let Some(figure) = section(&doc, "figure")? {
            config.width = size_value(figure, "width")?;
            config.height = size_value(figure, "height")?;
        }

        debug!(
            display_units = config.display_units.len(),
            properties = config.properties.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PlotError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn display_units(&self) -> &HashMap<String, String> {
        &self.display_units
    }

    /// Default properties plus the configured ones; configured entries win
    pub fn registry(&self) -> PropertyRegistry {
        let mut registry = PropertyRegistry::with_defaults();
        for (name, property) in &self.properties {
            if let Some(previous) = registry.register(name, &property.unit, &property.label) {
                debug!(property = %name, previous = %previous.unit, "overriding property");
            }
        }
        registry
    }

    /// Configured width and height, if both are set
    pub fn size(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }

    /// An empty figure with the configured size
    pub fn figure(&self) -> Figure {
        match self.size() {
            Some((width, height)) => Figure::new().with_size(width, height),
            None => Figure::new(),
        }
    }

    /// Plot options carrying the configured units and registry
    pub fn plot_options(&self) -> PlotOptions {
        PlotOptions::new()
            .registry(Arc::new(self.registry()))
            .display_units(self.display_units.clone())
    }
}

fn section<'a>(doc: &'a DocumentMut, name: &str) -> Result<Option<&'a dyn TableLike>> {
    match doc.get(name) {
        None => Ok(None),
        Some(item) => item
            .as_table_like()
            .map(Some)
            .ok_or_else(|| PlotError::ConfigError(format!("[{}] must be a table", name))),
    }
}

fn string_value(item: &Item, key: &str) -> Result<String> {
    item.as_str()
        .map(str::to_string)
        .ok_or_else(|| PlotError::ConfigError(format!("{} must be a string", key)))
}

fn size_value(table: &dyn TableLike, key: &str) -> Result<Option<u32>> {
    let Some(item) = table.get(key) else {
        return Ok(None);
    };
    item.as_integer()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .map(Some)
        .ok_or_else(|| PlotError::ConfigError(format!("figure.{} must be a positive integer", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
[display_units]
bet = "cm"
x = "mm"

[properties.emit]
unit = "m"
label = "ε"

[properties.betx]
unit = "m"
label = "beta x"

[figure]
width = 900
height = 700
"#;

    #[test]
    fn test_parse_config() {
        let config = PlotConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.display_units().get("bet").unwrap(), "cm");
        assert_eq!(config.size(), Some((900, 700)));
        assert_eq!(config.figure().size(), (900, 700));

        let registry = config.registry();
        assert_eq!(registry.get("emit").unwrap().label, "ε");
        assert_eq!(registry.get("betx").unwrap().label, "beta x");
        assert!(registry.contains("bety"));
    }

    #[test]
    fn test_empty_config() {
        let config = PlotConfig::from_toml_str("").unwrap();
        assert_eq!(config, PlotConfig::default());
        assert_eq!(config.figure().size(), (800, 250));
    }

    #[test]
    fn test_invalid_values() {
        for text in [
            "display_units = 3",
            "[display_units]\nbet = 1",
            "[properties.emit]\nlabel = \"e\"",
            "[figure]\nwidth = -5",
            "[figure\n",
        ] {
            assert!(
                matches!(PlotConfig::from_toml_str(text), Err(PlotError::ConfigError(_))),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_load_and_plot_options() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let config = PlotConfig::load(file.path()).unwrap();
        let units = config.plot_options().unit_context(&[("bet", "m")]);
        assert_eq!(units.display_unit_for("betx").unwrap(), "cm");
        assert!(units.registry().contains("emit"));

        assert!(matches!(
            PlotConfig::load("/nonexistent/beamplot.toml"),
            Err(PlotError::ConfigError(_))
        ));
    }
}

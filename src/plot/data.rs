//! Column data handed to `update`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{PlotError, Result};

/// Named numeric columns, e.g. a twiss table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlotData {
    columns: HashMap<String, Vec<f64>>,
}

impl PlotData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(name, values);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> Option<Vec<f64>> {
        self.columns.insert(name.into(), values)
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// Like [`get`](Self::get), but a missing column is a `DataShapeError`
    pub fn require(&self, name: &str) -> Result<&[f64]> {
        self.get(name).ok_or_else(|| {
            let mut available: Vec<&str> = self.names().collect();
            available.sort_unstable();
            PlotError::DataShapeError(format!(
                "missing column '{}' (available: {})",
                name,
                available.join(", ")
            ))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<f64>)> for PlotData {
    fn from_iter<I: IntoIterator<Item = (K, Vec<f64>)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_lists_available_columns() {
        let data = PlotData::new()
            .with("s", vec![0.0, 1.0])
            .with("betx", vec![1.0, 2.0]);
        assert_eq!(data.require("s").unwrap(), &[0.0, 1.0]);
        let err = data.require("bety").unwrap_err().to_string();
        assert!(err.contains("'bety'"));
        assert!(err.contains("betx, s"));
    }

    #[test]
    fn test_deserialize_from_json_object() {
        let data: PlotData = serde_json::from_str(r#"{"s": [0, 1.5], "x": [1e-3, 2e-3]}"#).unwrap();
        assert_eq!(data.get("s").unwrap(), &[0.0, 1.5]);
        assert_eq!(data.len(), 2);
    }
}

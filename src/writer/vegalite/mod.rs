//! Vega-Lite JSON writer implementation
//!
//! Converts a [`Figure`] into a Vega-Lite document for web-based
//! interactive viewing.
//!
//! # Mapping Strategy
//!
//! - subplots -> `vconcat` entries sharing the x scale
//! - axes of a subplot -> layers with independent y scales, twins on the right
//! - series -> line, step or point layers with inline data
//! - reference lines and bands -> rule and rect layers on their axis
//!
//! # Example
//!
//! ```rust,ignore
//! use beamplot::writer::{VegaLiteWriter, Writer};
//!
//! let writer = VegaLiteWriter::new();
//! let vega_json = writer.write(plot.backend())?;
//! // Can be rendered in browser with vega-embed
//! ```

mod encoding;

use serde_json::{json, Value};
use tracing::debug;

use crate::figure::{AxisId, Figure};
use crate::writer::{color_to_hex, Writer};
use crate::{PlotError, Result};

use encoding::{
    color_channel, reference_layer, series_mark, series_values, x_channel, y_channel,
};

/// Conversion factor from points to pixels (CSS standard: 96 DPI, 72 points/inch)
const POINTS_TO_PIXELS: f64 = 96.0 / 72.0;

/// Conversion factor from marker radius in points to marker area in square pixels
const POINTS_TO_AREA: f64 = std::f64::consts::PI * POINTS_TO_PIXELS * POINTS_TO_PIXELS;

/// Horizontal distance between stacked right-hand axes, in pixels
const TWIN_AXIS_OFFSET: f64 = 60.0;

/// Vega-Lite JSON writer
///
/// Generates Vega-Lite v5 specifications from figures.
pub struct VegaLiteWriter {
    /// Vega-Lite schema version
    schema: String,
}

impl VegaLiteWriter {
    /// Create a new Vega-Lite writer with default settings
    pub fn new() -> Self {
        Self {
            schema: "https://vega.github.io/schema/vega-lite/v5.json".to_string(),
        }
    }

    /// Layer of one axis: its series followed by its references
    fn axis_layer(&self, figure: &Figure, axis: AxisId, xtitle: Option<&str>) -> Result<Option<Value>> {
        let Some(axes) = figure.axis(axis) else {
            return Ok(None);
        };

        let mut layers = Vec::new();
        for id in &axes.artists {
            let Some(artist) = figure.artist(*id) else {
                continue;
            };
            layers.push(json!({
                "data": {"values": series_values(artist)},
                "mark": series_mark(artist)?,
            }));
        }
        for id in &axes.references {
            if let Some(line) = figure.reference(*id) {
                layers.push(reference_layer(line)?);
            }
        }
        if layers.is_empty() {
            return Ok(None);
        }

        Ok(Some(json!({
            "encoding": {
                "x": x_channel(axes, xtitle),
                "y": y_channel(axes)?,
            },
            "layer": layers,
        })))
    }

    /// One `vconcat` entry
    fn subplot(&self, figure: &Figure, subplot: usize, width: f64, height: f64) -> Result<Value> {
        let bottom = subplot + 1 == figure.subplot_count();
        let axes = figure.axes_in(subplot);

        let xtitle = axes
            .first()
            .and_then(|id| figure.axis(*id))
            .and_then(|a| a.xlabel.as_deref())
            .filter(|_| bottom || !figure.shares_x());

        let mut labels = Vec::new();
        let mut colors = Vec::new();
        let mut layers = Vec::new();
        for axis in &axes {
            if let Some(layer) = self.axis_layer(figure, *axis, xtitle)? {
                layers.push(layer);
            }
            if let Some(a) = figure.axis(*axis) {
                for artist in a.artists.iter().filter_map(|id| figure.artist(*id)) {
                    if !labels.contains(&artist.style.label) {
                        labels.push(artist.style.label.clone());
                        colors.push(color_to_hex(&artist.style.color)?);
                    }
                }
            }
        }

        if layers.is_empty() {
            debug!(subplot, "empty subplot");
            return Ok(json!({
                "width": width,
                "height": height,
                "data": {"values": []},
                "mark": "point",
            }));
        }

        let mut spec = json!({
            "width": width,
            "height": height,
            "layer": layers,
            "resolve": {"scale": {"y": "independent"}},
        });
        if !labels.is_empty() {
            spec["encoding"] = json!({"color": color_channel(&labels, &colors)});
        }
        Ok(spec)
    }
}

impl Default for VegaLiteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for VegaLiteWriter {
    type Output = String;

    fn write(&self, figure: &Figure) -> Result<String> {
        self.validate(figure)?;

        let (width, height) = figure.size();
        let subplot_height = height as f64 / figure.subplot_count() as f64;

        let mut vl_spec = json!({
            "$schema": self.schema,
        });
        if let Some(title) = &figure.title {
            vl_spec["title"] = json!(title);
        }

        let subplots = (0..figure.subplot_count())
            .map(|i| self.subplot(figure, i, width as f64, subplot_height))
            .collect::<Result<Vec<_>>>()?;
        vl_spec["vconcat"] = json!(subplots);
        let x_scale = if figure.shares_x() { "shared" } else { "independent" };
        vl_spec["resolve"] = json!({"scale": {"x": x_scale, "color": "independent"}});

        debug!(subplots = figure.subplot_count(), "wrote Vega-Lite spec");
        serde_json::to_string_pretty(&vl_spec).map_err(|e| {
            PlotError::WriterError(format!("Failed to serialize Vega-Lite JSON: {}", e))
        })
    }
}

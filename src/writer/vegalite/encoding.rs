//! Marks, axes and inline data for the Vega-Lite writer

use serde_json::{json, Map, Value};

use super::{POINTS_TO_AREA, POINTS_TO_PIXELS, TWIN_AXIS_OFFSET};
use crate::figure::{Artist, Axes, Mark, Reference, ReferenceLine};
use crate::writer::color_to_hex;
use crate::Result;

/// Field names of the inline data rows
pub(super) const X_FIELD: &str = "x";
pub(super) const Y_FIELD: &str = "y";
pub(super) const SERIES_FIELD: &str = "series";

/// Vega-Lite mark of a series
pub(super) fn series_mark(artist: &Artist) -> Result<Value> {
    let color = color_to_hex(&artist.style.color)?;
    let width = artist.style.width;
    Ok(match artist.style.mark {
        Mark::Line => json!({
            "type": "line",
            "clip": true,
            "color": color,
            "strokeWidth": width * POINTS_TO_PIXELS,
        }),
        Mark::Step => json!({
            "type": "line",
            "clip": true,
            "interpolate": "step-after",
            "color": color,
            "strokeWidth": width * POINTS_TO_PIXELS,
        }),
        Mark::Scatter => json!({
            "type": "point",
            "clip": true,
            "filled": true,
            "color": color,
            "size": width * width * POINTS_TO_AREA,
        }),
    })
}

/// Inline rows of a series; non-finite points are dropped
pub(super) fn series_values(artist: &Artist) -> Vec<Value> {
    artist
        .x
        .iter()
        .zip(&artist.y)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| {
            json!({
                X_FIELD: x,
                Y_FIELD: y,
                SERIES_FIELD: artist.style.label,
            })
        })
        .collect()
}

/// Shared x channel; only the bottom subplot shows the axis title
pub(super) fn x_channel(axes: &Axes, title: Option<&str>) -> Value {
    let mut channel = json!({
        "field": X_FIELD,
        "type": "quantitative",
        "title": title,
    });
    if let Some((lo, hi)) = axes.xlim {
        channel["scale"] = json!({"domain": [lo, hi], "nice": false, "zero": false});
    } else {
        channel["scale"] = json!({"zero": false});
    }
    channel
}

/// y channel of one axis; twin axes are placed on the right with an offset
pub(super) fn y_channel(axes: &Axes) -> Result<Value> {
    let mut axis = Map::new();
    axis.insert("title".to_string(), json!(axes.ylabel));
    if axes.is_twin() {
        axis.insert("orient".to_string(), json!("right"));
        axis.insert(
            "offset".to_string(),
            json!(axes.offset as f64 * TWIN_AXIS_OFFSET),
        );
    }
    if let Some(color) = &axes.color {
        let color = color_to_hex(color)?;
        for key in ["titleColor", "labelColor", "tickColor", "domainColor"] {
            axis.insert(key.to_string(), json!(color));
        }
    }

    let mut channel = json!({
        "field": Y_FIELD,
        "type": "quantitative",
        "axis": Value::Object(axis),
    });
    if let Some((lo, hi)) = axes.ylim {
        channel["scale"] = json!({"domain": [lo, hi], "nice": false, "zero": false});
    } else {
        channel["scale"] = json!({"zero": false});
    }
    Ok(channel)
}

/// Legend entries of one subplot, used as a color scale
pub(super) fn color_channel(labels: &[String], colors: &[String]) -> Value {
    json!({
        "field": SERIES_FIELD,
        "type": "nominal",
        "scale": {"domain": labels, "range": colors},
        "legend": {"title": null, "orient": "top", "direction": "horizontal"},
    })
}

/// A rule or rect layer for a reference line or band
pub(super) fn reference_layer(line: &ReferenceLine) -> Result<Value> {
    let color = color_to_hex(&line.style.color)?;
    let (mark_type, encoding) = match line.reference {
        Reference::VLine { x } => ("rule", json!({"x": {"datum": x}})),
        Reference::HLine { y } => ("rule", json!({"y": {"datum": y}})),
        Reference::VSpan { x0, x1 } => ("rect", json!({"x": {"datum": x0}, "x2": {"datum": x1}})),
        Reference::HSpan { y0, y1 } => ("rect", json!({"y": {"datum": y0}, "y2": {"datum": y1}})),
    };

    let mut mark = json!({
        "type": mark_type,
        "color": color,
        "opacity": line.style.alpha,
    });
    if line.style.width > 0.0 {
        mark["strokeWidth"] = json!(line.style.width * POINTS_TO_PIXELS);
        if line.reference.is_span() {
            mark["stroke"] = json!(color);
        }
    }
    Ok(json!({"mark": mark, "encoding": encoding}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{ArtistStyle, AxisId, ReferenceStyle};

    fn artist(mark: Mark) -> Artist {
        Artist {
            axis: AxisId(0),
            style: ArtistStyle::new(mark, "red", "β_x"),
            x: vec![0.0, 1.0, 2.0],
            y: vec![1.0, f64::NAN, 3.0],
        }
    }

    #[test]
    fn test_series_marks() {
        let line = series_mark(&artist(Mark::Line)).unwrap();
        assert_eq!(line["type"], "line");
        assert_eq!(line["color"], "#ff0000");
        let step = series_mark(&artist(Mark::Step)).unwrap();
        assert_eq!(step["interpolate"], "step-after");
        let scatter = series_mark(&artist(Mark::Scatter)).unwrap();
        assert_eq!(scatter["type"], "point");
        assert!(scatter["size"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_series_values_skip_non_finite() {
        let values = series_values(&artist(Mark::Line));
        assert_eq!(values.len(), 2);
        assert_eq!(values[1], json!({"x": 2.0, "y": 3.0, "series": "β_x"}));
    }

    #[test]
    fn test_reference_layers() {
        let line = ReferenceLine {
            axis: AxisId(0),
            reference: Reference::VLine { x: 10.0 },
            style: ReferenceStyle::line(),
        };
        let layer = reference_layer(&line).unwrap();
        assert_eq!(layer["mark"]["type"], "rule");
        assert_eq!(layer["encoding"]["x"]["datum"], 10.0);

        let band = ReferenceLine {
            axis: AxisId(0),
            reference: Reference::HSpan { y0: -1.0, y1: 1.0 },
            style: ReferenceStyle::span(),
        };
        let layer = reference_layer(&band).unwrap();
        assert_eq!(layer["mark"]["type"], "rect");
        assert_eq!(layer["mark"]["color"], "#d3d3d3");
        assert_eq!(layer["encoding"]["y2"]["datum"], 1.0);
        assert!(layer["mark"].get("strokeWidth").is_none());
    }
}

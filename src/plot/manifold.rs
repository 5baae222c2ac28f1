//! The composition engine behind every domain plot

use std::collections::HashMap;
use tracing::debug;

use super::{palette, PlotData};
use crate::figure::{ArtistId, AxisId, Backend};
use crate::layout::{Layout, Leaf};
use crate::units::UnitContext;
use crate::{PlotError, Result};

/// What the artist factory gets to know about one series
#[derive(Debug, Clone, Copy)]
pub struct SeriesSlot<'a> {
    pub subplot: usize,
    pub axis: usize,
    pub series: usize,
    pub property: &'a str,
    /// Legend label of the property
    pub label: &'a str,
    /// Suggested color from the per-subplot cycle
    pub color: &'static str,
}

/// Subplots with primary and twin axes laid out from a [`Layout`]
///
/// All subplots share the independent axis `on_x`. Axes and artists are
/// created once on construction; [`update_series`](Self::update_series) only
/// replaces artist data.
#[derive(Debug)]
pub struct ManifoldPlot<B: Backend> {
    backend: B,
    on_x: String,
    layout: Layout,
    units: UnitContext,
    factors: HashMap<String, f64>,
    axes: Vec<Vec<AxisId>>,
    /// Parallel to `layout.slots()`, `None` for placeholders
    artists: Vec<Option<ArtistId>>,
}

impl<B: Backend> ManifoldPlot<B> {
    /// Build subplots, axes and artists for `layout`
    ///
    /// `factory` is called once per series, in layout order, and creates the
    /// artist on the given axis. Placeholders get no artist. Every label and
    /// scale factor is resolved before the backend is touched, so a failing
    /// construction leaves the backend as it was.
    pub fn new<F>(
        mut backend: B,
        on_x: impl Into<String>,
        layout: Layout,
        units: UnitContext,
        mut factory: F,
    ) -> Result<Self>
    where
        F: FnMut(&mut B, &SeriesSlot<'_>, AxisId) -> ArtistId,
    {
        let on_x = on_x.into();

        let mut factors = HashMap::new();
        factors.insert(on_x.clone(), units.factor_for(&on_x)?);
        let mut legend = HashMap::new();
        for property in layout.properties() {
            if !factors.contains_key(property) {
                factors.insert(property.to_string(), units.factor_for(property)?);
            }
            legend.insert(property, units.property(property)?.label.clone());
        }

        let xlabel = units.label_for(&[on_x.as_str()])?;
        let mut ylabels = Vec::with_capacity(layout.subplot_count());
        for groups in layout.subplots() {
            let mut row = Vec::with_capacity(groups.len());
            for leaves in groups {
                let properties: Vec<&str> = leaves.iter().filter_map(Leaf::property).collect();
                row.push(if properties.is_empty() {
                    None
                } else {
                    Some(units.label_for(&properties)?)
                });
            }
            ylabels.push(row);
        }

        // Axes
        let primaries = backend.add_subplots(layout.subplot_count());
        let mut axes = Vec::with_capacity(primaries.len());
        for (primary, groups) in primaries.iter().zip(layout.subplots()) {
            let mut row = vec![*primary];
            for twin in 1..groups.len() {
                row.push(backend.add_twin(*primary, twin - 1));
            }
            axes.push(row);
        }
        for (row, labels) in axes.iter().zip(&ylabels) {
            for (axis, label) in row.iter().zip(labels) {
                if let Some(label) = label {
                    backend.set_ylabel(*axis, label);
                }
            }
        }
        if let Some(bottom) = primaries.last() {
            backend.set_xlabel(*bottom, &xlabel);
        }

        // Artists
        let mut artists = Vec::with_capacity(layout.slots().len());
        let mut colors: Vec<Option<&'static str>> = Vec::with_capacity(layout.slots().len());
        let mut cycle_position = vec![0usize; layout.subplot_count()];
        for slot in layout.slots() {
            match &slot.leaf {
                Leaf::Placeholder => {
                    artists.push(None);
                    colors.push(None);
                }
                Leaf::Series(property) => {
                    let color = palette::cycle(cycle_position[slot.subplot]);
                    cycle_position[slot.subplot] += 1;
                    let series = SeriesSlot {
                        subplot: slot.subplot,
                        axis: slot.axis,
                        series: slot.series,
                        property,
                        label: legend.get(property.as_str()).map_or("", |l| l.as_str()),
                        color,
                    };
                    let axis = axes[slot.subplot][slot.axis];
                    artists.push(Some(factory(&mut backend, &series, axis)));
                    colors.push(Some(color));
                }
            }
        }

        // With twin axes, an axis holding a single series takes its color
        for (slot, color) in layout.slots().iter().zip(&colors) {
            let groups = &layout.subplots()[slot.subplot];
            if let Some(color) = color {
                if groups.len() > 1 && groups[slot.axis].len() == 1 {
                    backend.set_axis_color(axes[slot.subplot][slot.axis], color);
                }
            }
        }

        debug!(
            on_x = %on_x,
            layout = %layout,
            axes = layout.axis_count(),
            artists = layout.series_count(),
            "built manifold plot"
        );

        Ok(Self {
            backend,
            on_x,
            layout,
            units,
            factors,
            axes,
            artists,
        })
    }

    /// Name of the independent property shared by all subplots
    pub fn on_x(&self) -> &str {
        &self.on_x
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn units(&self) -> &UnitContext {
        &self.units
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Axis of an axis group; `axis` 0 is the primary axis of the subplot
    pub fn axis(&self, subplot: usize, axis: usize) -> Option<AxisId> {
        self.axes.get(subplot).and_then(|row| row.get(axis)).copied()
    }

    /// All axes, per subplot, primary first
    pub fn axes(&self) -> &[Vec<AxisId>] {
        &self.axes
    }

    /// Artist of one series; `None` for placeholders and out of range indices
    pub fn artist(&self, subplot: usize, axis: usize, series: usize) -> Option<ArtistId> {
        self.layout
            .slots()
            .iter()
            .position(|s| s.subplot == subplot && s.axis == axis && s.series == series)
            .and_then(|i| self.artists[i])
    }

    /// All artists in layout order
    pub fn artists(&self) -> Vec<ArtistId> {
        self.artists.iter().flatten().copied().collect()
    }

    /// Scale factor from native to display unit of `property`
    ///
    /// Factors of the layout's properties are computed once on construction;
    /// other registered properties are resolved on demand.
    pub fn factor_for(&self, property: &str) -> Result<f64> {
        match self.factors.get(property) {
            Some(factor) => Ok(*factor),
            None => self.units.factor_for(property),
        }
    }

    pub fn display_unit_for(&self, property: &str) -> Result<String> {
        self.units.display_unit_for(property)
    }

    pub fn label_for(&self, properties: &[&str]) -> Result<String> {
        self.units.label_for(properties)
    }

    /// Push new data into every series artist
    ///
    /// `data` must hold `on_x` and every property of the layout with equal
    /// lengths. The whole mapping is checked before any artist changes. With
    /// `autoscale`, y limits follow the data and x limits are set to the
    /// range of `on_x`.
    pub fn update_series(&mut self, data: &PlotData, autoscale: bool) -> Result<Vec<ArtistId>> {
        let x = data.require(&self.on_x)?;
        let fx = self.factor_for(&self.on_x)?;

        let mut pending = Vec::with_capacity(self.layout.series_count());
        for (slot, artist) in self.layout.slots().iter().zip(&self.artists) {
            let (Some(property), Some(artist)) = (slot.leaf.property(), *artist) else {
                continue;
            };
            let y = data.require(property)?;
            if y.len() != x.len() {
                return Err(PlotError::DataShapeError(format!(
                    "column '{}' has {} values but '{}' has {} (subplot {}, axis {})",
                    property,
                    y.len(),
                    self.on_x,
                    x.len(),
                    slot.subplot,
                    slot.axis
                )));
            }
            let f = self.factor_for(property)?;
            pending.push((artist, y.iter().map(|v| v * f).collect::<Vec<f64>>()));
        }

        let xs: Vec<f64> = x.iter().map(|v| v * fx).collect();
        let mut changed = Vec::with_capacity(pending.len());
        for (artist, ys) in pending {
            self.backend.set_data(artist, xs.clone(), ys);
            changed.push(artist);
        }

        if autoscale {
            self.autoscale(finite_range(&xs));
        }
        Ok(changed)
    }

    /// Like [`update_series`](Self::update_series), but each series brings
    /// its own x values
    ///
    /// `profile` returns the raw `(x, y)` of a property and is called in
    /// layout order. The first error aborts the update before any artist
    /// changes.
    pub fn update_profiles<F>(&mut self, mut profile: F, autoscale: bool) -> Result<Vec<ArtistId>>
    where
        F: FnMut(&str) -> Result<(Vec<f64>, Vec<f64>)>,
    {
        let fx = self.factor_for(&self.on_x)?;

        let mut pending = Vec::with_capacity(self.layout.series_count());
        for (slot, artist) in self.layout.slots().iter().zip(&self.artists) {
            let (Some(property), Some(artist)) = (slot.leaf.property(), *artist) else {
                continue;
            };
            let (x, y) = profile(property)?;
            if x.len() != y.len() {
                return Err(PlotError::DataShapeError(format!(
                    "profile of '{}' has {} x values but {} y values",
                    property,
                    x.len(),
                    y.len()
                )));
            }
            let fy = self.factor_for(property)?;
            pending.push((
                artist,
                x.into_iter().map(|v| v * fx).collect::<Vec<f64>>(),
                y.into_iter().map(|v| v * fy).collect::<Vec<f64>>(),
            ));
        }

        let xlim = finite_range(pending.iter().flat_map(|(_, xs, _)| xs));
        let mut changed = Vec::with_capacity(pending.len());
        for (artist, xs, ys) in pending {
            self.backend.set_data(artist, xs, ys);
            changed.push(artist);
        }

        if autoscale {
            self.autoscale(xlim);
        }
        Ok(changed)
    }

    /// Fit y limits of every axis to its data and set x limits to `xlim`
    fn autoscale(&mut self, xlim: Option<(f64, f64)>) {
        for axis in self.axes.iter().flatten() {
            self.backend.autoscale_y(*axis);
            if let Some((lo, hi)) = xlim {
                self.backend.set_xlim(*axis, lo, hi);
            }
        }
    }
}

/// Smallest and largest finite value
pub(crate) fn finite_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{ArtistStyle, Figure, Mark};
    use crate::layout::{parse, Abbreviations, LayoutSpec};

    fn build(kind: &str) -> ManifoldPlot<Figure> {
        let layout = parse(
            &LayoutSpec::from(kind),
            &Abbreviations::plane_pairs(&["bet", "d"]),
        )
        .unwrap();
        ManifoldPlot::new(
            Figure::new(),
            "s",
            layout,
            UnitContext::with_defaults(),
            |backend, slot, axis| {
                backend.add_artist(axis, ArtistStyle::new(Mark::Line, slot.color, slot.label))
            },
        )
        .unwrap()
    }

    fn twiss() -> PlotData {
        PlotData::new()
            .with("s", vec![0.0, 1.0, 2.0])
            .with("betx", vec![10.0, 20.0, 10.0])
            .with("bety", vec![5.0, 8.0, 5.0])
            .with("dx", vec![0.0, 1.0, 0.5])
            .with("x", vec![0.001, -0.002, 0.0])
            .with("y", vec![0.0, 0.0, 0.001])
    }

    #[test]
    fn test_axes_and_artists_follow_layout() {
        let plot = build("bet-dx,x+y");
        assert_eq!(plot.axes().len(), 2);
        assert_eq!(plot.axes()[0].len(), 2);
        assert_eq!(plot.axes()[1].len(), 1);
        assert_eq!(plot.artists().len(), 5);
        assert_eq!(plot.backend().axes().len(), 3);
        assert_eq!(plot.backend().artists().len(), 5);

        // Artists are created left to right, top to bottom
        let order: Vec<usize> = plot.artists().iter().map(|a| a.index()).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert_eq!(plot.artist(0, 1, 0), Some(plot.artists()[2]));
        assert_eq!(plot.artist(0, 1, 1), None);

        let dx = plot.backend().artist(plot.artist(0, 1, 0).unwrap()).unwrap();
        assert_eq!(dx.axis, plot.axis(0, 1).unwrap());
        assert_eq!(dx.style.label, "D_x");
    }

    #[test]
    fn test_labels_and_twin_colors() {
        let plot = build("bet-dx,x+y");
        let fig = plot.backend();
        let primary = fig.axis(plot.axis(0, 0).unwrap()).unwrap();
        let twin = fig.axis(plot.axis(0, 1).unwrap()).unwrap();
        let bottom = fig.axis(plot.axis(1, 0).unwrap()).unwrap();

        assert_eq!(primary.ylabel.as_deref(), Some("β_x, β_y [m]"));
        assert_eq!(twin.ylabel.as_deref(), Some("D_x [m]"));
        assert_eq!(bottom.xlabel.as_deref(), Some("s [m]"));
        assert_eq!(primary.xlabel, None);

        // Twin axis with a single series is colored like it; shared axes are not
        assert_eq!(twin.color.as_deref(), Some(CATEGORY10_THIRD));
        assert_eq!(primary.color, None);
        assert_eq!(bottom.color, None);
    }

    const CATEGORY10_THIRD: &str = "#2ca02c";

    #[test]
    fn test_update_sets_scaled_data() {
        let layout = parse(&LayoutSpec::from("x"), &Abbreviations::new()).unwrap();
        let units = crate::plot::PlotOptions::new()
            .display_unit("x", "mm")
            .display_unit("s", "km")
            .unit_context(&[]);
        let mut plot = ManifoldPlot::new(Figure::new(), "s", layout, units, |b, slot, axis| {
            b.add_artist(axis, ArtistStyle::new(Mark::Line, slot.color, slot.label))
        })
        .unwrap();

        let changed = plot.update_series(&twiss(), false).unwrap();
        assert_eq!(changed.len(), 1);
        let artist = plot.backend().artist(changed[0]).unwrap();
        let close = |a: &[f64], b: &[f64]| a.iter().zip(b).all(|(a, b)| (a - b).abs() < 1e-9);
        assert!(close(&artist.y, &[1.0, -2.0, 0.0]));
        assert!(close(&artist.x, &[0.0, 0.001, 0.002]));
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut plot = build("bet-dx,x+y");
        let first = plot.update_series(&twiss(), true).unwrap();
        let snapshot = plot.backend().clone();
        let second = plot.update_series(&twiss(), true).unwrap();
        assert_eq!(first, second);
        assert_eq!(&snapshot, plot.backend());
    }

    #[test]
    fn test_update_missing_key_changes_nothing() {
        let mut plot = build("bet-dx,x+y");
        plot.update_series(&twiss(), false).unwrap();
        let before = plot.backend().clone();

        let mut partial = twiss();
        partial.insert("betx", vec![0.0, 0.0, 0.0]);
        let partial: PlotData = partial
            .names()
            .filter(|n| *n != "y")
            .map(|n| (n.to_string(), partial.get(n).unwrap().to_vec()))
            .collect();

        let err = plot.update_series(&partial, true).unwrap_err();
        assert!(matches!(err, PlotError::DataShapeError(_)));
        assert_eq!(&before, plot.backend());
    }

    #[test]
    fn test_update_length_mismatch() {
        let mut plot = build("bet");
        let data = twiss().with("bety", vec![1.0]);
        let err = plot.update_series(&data, false).unwrap_err();
        assert!(err.to_string().contains("'bety' has 1 values"));
        let betx = plot.backend().artist(plot.artists()[0]).unwrap();
        assert!(betx.x.is_empty());
    }

    #[test]
    fn test_autoscale_sets_xlim_on_every_axis() {
        let mut plot = build("bet-dx,x+y");
        plot.update_series(&twiss(), true).unwrap();
        for axis in plot.axes().iter().flatten() {
            let axes = plot.backend().axis(*axis).unwrap();
            assert_eq!(axes.xlim, Some((0.0, 2.0)));
            assert!(axes.ylim.is_some());
        }
    }

    #[test]
    fn test_factor_cache_is_stable() {
        let plot = build("bet-dx,x+y");
        assert_eq!(plot.factor_for("betx").unwrap(), 1.0);
        assert_eq!(plot.factor_for("betx").unwrap(), plot.factor_for("betx").unwrap());
        // Registered but not in the layout
        assert_eq!(plot.factor_for("alfx").unwrap(), 1.0);
        assert!(matches!(
            plot.factor_for("nonsense"),
            Err(PlotError::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_placeholder_gets_no_artist() {
        let mut plot = build("_,bet");
        assert_eq!(plot.axes().len(), 2);
        assert_eq!(plot.artists().len(), 2);
        assert_eq!(plot.artist(0, 0, 0), None);
        let changed = plot.update_series(&twiss(), false).unwrap();
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn test_construction_is_atomic() {
        let layout = parse(&LayoutSpec::from("betx,nonsense"), &Abbreviations::new()).unwrap();
        let mut calls = 0;
        let result = ManifoldPlot::new(
            Figure::new(),
            "s",
            layout,
            UnitContext::with_defaults(),
            |b: &mut Figure, slot: &SeriesSlot<'_>, axis| {
                calls += 1;
                b.add_artist(axis, ArtistStyle::new(Mark::Line, slot.color, slot.label))
            },
        );
        assert!(matches!(result, Err(PlotError::UnknownProperty(ref p)) if p == "nonsense"));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_incompatible_display_unit_fails_construction() {
        let layout = parse(&LayoutSpec::from("betx"), &Abbreviations::new()).unwrap();
        let units = crate::plot::PlotOptions::new()
            .display_unit("betx", "s")
            .unit_context(&[]);
        let result = ManifoldPlot::new(Figure::new(), "s", layout, units, |b, slot, axis| {
            b.add_artist(axis, ArtistStyle::new(Mark::Line, slot.color, slot.label))
        });
        assert!(matches!(result, Err(PlotError::UnitIncompatibility { .. })));
    }

    #[test]
    fn test_update_profiles_with_own_x() {
        let layout = parse(&LayoutSpec::from("k0l-k1l"), &Abbreviations::new()).unwrap();
        let mut plot = ManifoldPlot::new(
            Figure::new(),
            "s",
            layout,
            UnitContext::with_defaults(),
            |b, slot, axis| b.add_artist(axis, ArtistStyle::new(Mark::Line, slot.color, slot.label)),
        )
        .unwrap();

        let changed = plot
            .update_profiles(
                |property| match property {
                    "k0l" => Ok((vec![0.0, 1.0], vec![0.1, 0.2])),
                    _ => Ok((vec![5.0, 6.0, 7.0], vec![1.0, 2.0, 3.0])),
                },
                true,
            )
            .unwrap();
        assert_eq!(changed.len(), 2);
        let k1l = plot.backend().artist(changed[1]).unwrap();
        assert_eq!(k1l.x, vec![5.0, 6.0, 7.0]);
        let primary = plot.backend().axis(plot.axis(0, 0).unwrap()).unwrap();
        assert_eq!(primary.xlim, Some((0.0, 7.0)));

        let err = plot
            .update_profiles(|_| Ok((vec![0.0], vec![])), false)
            .unwrap_err();
        assert!(matches!(err, PlotError::DataShapeError(_)));
        assert_eq!(plot.backend().artist(changed[1]).unwrap().x.len(), 3);
    }
}

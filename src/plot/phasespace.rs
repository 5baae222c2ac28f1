//! Phase space scatter plots

use tracing::debug;

use super::manifold::finite_range;
use super::{palette, PlotData, PlotOptions};
use crate::figure::{ArtistId, ArtistStyle, AxisId, Backend, Figure, Mark};
use crate::layout::{parse, Abbreviations, Leaf, LayoutSpec};
use crate::units::UnitContext;
use crate::{PlotError, Result};

/// Horizontal and vertical phase space
pub const DEFAULT_PHASE_SPACE_KIND: &str = "x-px,y-py";

/// One panel per coordinate pair, e.g. `x` against `px`
///
/// The kind uses the layout language with exactly two single-series axis
/// groups per subplot: `x-px,y-py` gives two panels. Unlike the other plots,
/// every panel has its own horizontal property, so the subplots do not share
/// their x scale.
#[derive(Debug)]
pub struct PhaseSpacePlot<B: Backend = Figure> {
    backend: B,
    units: UnitContext,
    pairs: Vec<(String, String)>,
    axes: Vec<AxisId>,
    artists: Vec<ArtistId>,
}

impl<B: Backend> PhaseSpacePlot<B> {
    pub fn new(
        mut backend: B,
        data: Option<&PlotData>,
        kind: impl Into<LayoutSpec>,
        options: PlotOptions,
    ) -> Result<Self> {
        let kind = kind.into();
        let layout = parse(&kind, &Abbreviations::new())?;
        let pairs = layout
            .subplots()
            .iter()
            .map(|groups| coordinate_pair(groups, &kind))
            .collect::<Result<Vec<_>>>()?;

        let units = options.unit_context(&[]);
        let mut labels = Vec::with_capacity(pairs.len());
        for (h, v) in &pairs {
            units.factor_for(h)?;
            units.factor_for(v)?;
            labels.push((
                units.label_for(&[h.as_str()])?,
                units.label_for(&[v.as_str()])?,
                format!("{}, {}", units.property(h)?.label, units.property(v)?.label),
            ));
        }

        backend.unshare_x();
        let axes = backend.add_subplots(pairs.len());
        let mark = options.mark.unwrap_or(Mark::Scatter);
        let mut artists = Vec::with_capacity(pairs.len());
        for (i, (axis, (xlabel, ylabel, legend))) in axes.iter().zip(labels).enumerate() {
            backend.set_xlabel(*axis, &xlabel);
            backend.set_ylabel(*axis, &ylabel);
            artists.push(backend.add_artist(*axis, ArtistStyle::new(mark, palette::cycle(i), legend)));
        }
        debug!(layout = %layout, panels = pairs.len(), "built phase space plot");

        let mut plot = Self {
            backend,
            units,
            pairs,
            axes,
            artists,
        };
        if let Some(data) = data {
            plot.update(data, true)?;
        }
        Ok(plot)
    }

    /// Replace the particle coordinates of every panel
    ///
    /// Every pair must be present with equal lengths; nothing changes
    /// otherwise. With `autoscale`, each panel fits both limits to its data.
    pub fn update(&mut self, data: &PlotData, autoscale: bool) -> Result<Vec<ArtistId>> {
        let mut pending = Vec::with_capacity(self.pairs.len());
        for (h, v) in &self.pairs {
            let (x, y) = (data.require(h)?, data.require(v)?);
            if x.len() != y.len() {
                return Err(PlotError::DataShapeError(format!(
                    "column '{}' has {} values but '{}' has {}",
                    v,
                    y.len(),
                    h,
                    x.len()
                )));
            }
            let (fx, fy) = (self.units.factor_for(h)?, self.units.factor_for(v)?);
            pending.push((
                x.iter().map(|value| value * fx).collect::<Vec<f64>>(),
                y.iter().map(|value| value * fy).collect::<Vec<f64>>(),
            ));
        }

        for ((axis, artist), (xs, ys)) in self.axes.iter().zip(&self.artists).zip(pending) {
            let xlim = finite_range(&xs);
            self.backend.set_data(*artist, xs, ys);
            if autoscale {
                self.backend.autoscale_y(*axis);
                if let Some((lo, hi)) = xlim {
                    self.backend.set_xlim(*axis, lo, hi);
                }
            }
        }
        Ok(self.artists.clone())
    }

    /// Horizontal and vertical property of each panel
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn axis(&self, panel: usize) -> Option<AxisId> {
        self.axes.get(panel).copied()
    }

    pub fn artist(&self, panel: usize) -> Option<ArtistId> {
        self.artists.get(panel).copied()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

fn coordinate_pair(groups: &[Vec<Leaf>], kind: &LayoutSpec) -> Result<(String, String)> {
    match groups {
        [h, v] => match (h.as_slice(), v.as_slice()) {
            ([Leaf::Series(h)], [Leaf::Series(v)]) => Ok((h.clone(), v.clone())),
            _ => Err(PlotError::spec(
                kind.to_string(),
                "each phase space panel needs one property per axis",
            )),
        },
        _ => Err(PlotError::spec(
            kind.to_string(),
            format!(
                "each phase space panel needs two axis groups, found {}",
                groups.len()
            ),
        )),
    }
}

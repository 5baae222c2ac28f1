//! Particle coordinates over time

use super::{DomainPlot, ManifoldPlot, PlotData, PlotOptions};
use crate::figure::{ArtistId, ArtistStyle, Backend, Figure, Mark};
use crate::layout::{parse, Abbreviations, LayoutSpec};
use crate::Result;

pub const DEFAULT_TIME_KIND: &str = "x+y";

/// Scatter of tracked or measured coordinates against `t`
#[derive(Debug)]
pub struct TimePlot<B: Backend = Figure> {
    plot: ManifoldPlot<B>,
}

impl<B: Backend> TimePlot<B> {
    /// `p` abbreviates `px+py`
    pub fn new(
        backend: B,
        data: Option<&PlotData>,
        kind: impl Into<LayoutSpec>,
        options: PlotOptions,
    ) -> Result<Self> {
        let layout = parse(&kind.into(), &Abbreviations::plane_pairs(&["p"]))?;
        let mark = options.mark.unwrap_or(Mark::Scatter);
        let plot = ManifoldPlot::new(
            backend,
            "t",
            layout,
            options.unit_context(&[("t", "s")]),
            |backend: &mut B, slot, axis| {
                backend.add_artist(axis, ArtistStyle::new(mark, slot.color, slot.label))
            },
        )?;

        let mut plot = Self { plot };
        if let Some(data) = data {
            plot.update(data, true)?;
        }
        Ok(plot)
    }

    pub fn update(&mut self, data: &PlotData, autoscale: bool) -> Result<Vec<ArtistId>> {
        self.plot.update_series(data, autoscale)
    }

    pub fn into_backend(self) -> B {
        self.plot.into_backend()
    }
}

impl<B: Backend> DomainPlot<B> for TimePlot<B> {
    fn manifold(&self) -> &ManifoldPlot<B> {
        &self.plot
    }

    fn manifold_mut(&mut self) -> &mut ManifoldPlot<B> {
        &mut self.plot
    }
}

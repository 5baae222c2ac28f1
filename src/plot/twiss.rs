//! Lattice functions and closed orbit along `s`

use tracing::{debug, warn};

use super::knl::{LatticeStrip, STRIP_ORDERS};
use super::{DomainPlot, Lattice, ManifoldPlot, PlotData, PlotOptions};
use crate::figure::{ArtistId, ArtistStyle, Backend, Figure, Mark};
use crate::layout::{parse, Abbreviations, LayoutSpec};
use crate::{PlotError, Result};

/// Beta functions with dispersion on a twin axis, closed orbit below
pub const DEFAULT_TWISS_KIND: &str = "bet-dx,x+y";

/// Property pairs that may be written without their plane suffix
const PLANE_PAIRS: &[&str] = &["alf", "bet", "gam", "mu", "d", "dp", "q", "dq"];

const DEFAULT_DISPLAY_UNITS: &[(&str, &str)] = &[("bet", "m"), ("d", "m")];

/// Abbreviations understood by [`TwissPlot`], `bet` for `betx+bety` and so on
pub fn twiss_abbreviations() -> Abbreviations {
    Abbreviations::plane_pairs(PLANE_PAIRS)
}

/// Twiss parameters along the ring
///
/// With [`PlotOptions::lattice`] an extra subplot on top shows the normalized
/// multipole strengths of the lattice.
#[derive(Debug)]
pub struct TwissPlot<B: Backend = Figure> {
    plot: ManifoldPlot<B>,
    strip: Option<LatticeStrip>,
}

impl<B: Backend> TwissPlot<B> {
    pub fn new(
        backend: B,
        data: Option<&PlotData>,
        kind: impl Into<LayoutSpec>,
        options: PlotOptions,
    ) -> Result<Self> {
        let mut layout = parse(&kind.into(), &twiss_abbreviations())?;
        if options.lattice.is_some() {
            layout.prepend_placeholder();
        }

        let mark = options.mark.unwrap_or(Mark::Line);
        let mut plot = ManifoldPlot::new(
            backend,
            "s",
            layout,
            options.unit_context(DEFAULT_DISPLAY_UNITS),
            |backend: &mut B, slot, axis| {
                backend.add_artist(axis, ArtistStyle::new(mark, slot.color, slot.label))
            },
        )?;

        let strip = match (&options.lattice, plot.axis(0, 0)) {
            (Some(_), Some(axis)) => Some(LatticeStrip::attach(
                plot.backend_mut(),
                axis,
                STRIP_ORDERS,
            )),
            _ => None,
        };

        let mut twiss = Self { plot, strip };
        if let Some(lattice) = &options.lattice {
            twiss.update_line(lattice, true)?;
        }
        if let Some(data) = data {
            twiss.update(data, true)?;
        }
        Ok(twiss)
    }

    /// Replace the data of every series
    pub fn update(&mut self, data: &PlotData, autoscale: bool) -> Result<Vec<ArtistId>> {
        self.plot.update_series(data, autoscale)
    }

    /// Replace the lattice shown in the strip
    pub fn update_line(&mut self, lattice: &Lattice, autoscale: bool) -> Result<Vec<ArtistId>> {
        let Some(strip) = &self.strip else {
            warn!("twiss plot was built without a lattice strip");
            return Err(PlotError::DataShapeError(
                "no lattice strip, construct the plot with a lattice".to_string(),
            ));
        };
        let s_factor = self.plot.factor_for("s")?;
        debug!(elements = lattice.len(), "updating lattice strip");
        Ok(strip.update(self.plot.backend_mut(), lattice, s_factor, autoscale))
    }

    pub fn strip(&self) -> Option<&LatticeStrip> {
        self.strip.as_ref()
    }

    pub fn into_backend(self) -> B {
        self.plot.into_backend()
    }
}

impl<B: Backend> DomainPlot<B> for TwissPlot<B> {
    fn manifold(&self) -> &ManifoldPlot<B> {
        &self.plot
    }

    fn manifold_mut(&mut self) -> &mut ManifoldPlot<B> {
        &mut self.plot
    }
}

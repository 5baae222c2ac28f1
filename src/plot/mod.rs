//! Plots
//!
//! [`ManifoldPlot`] is the generic engine: it turns a parsed [`Layout`] into
//! subplots, primary and twin axes and one artist per series, and keeps those
//! artists in sync with new data. The domain plots bind it to a default
//! layout, units and marks:
//!
//! - [`TwissPlot`] - lattice functions and closed orbit along `s`
//! - [`KnlPlot`] - multipole strengths of a lattice along `s`
//! - [`TimePlot`] - particle coordinates over time
//! - [`TimeBinPlot`] - particle counts binned over time
//!
//! [`PhaseSpacePlot`] draws coordinate pairs against each other and has its
//! own layout logic, since its panels do not share an x axis.
//!
//! [`Layout`]: crate::layout::Layout

mod annotate;
mod data;
mod knl;
mod manifold;
mod palette;
mod phasespace;
mod time;
mod timebin;
mod twiss;

use std::collections::HashMap;
use std::sync::Arc;

use crate::figure::{AxisId, Backend, Mark, ReferenceId, ReferenceStyle};
use crate::units::{PropertyRegistry, SiUnits, UnitContext, UnitSystem};
use crate::Result;

pub use data::PlotData;
pub use knl::{Element, KnlPlot, Lattice, LatticeStrip, DEFAULT_KNL_KIND};
pub use manifold::{ManifoldPlot, SeriesSlot};
#[cfg(feature = "plotters")]
pub(crate) use manifold::finite_range;
pub use palette::CATEGORY10;
pub use phasespace::{PhaseSpacePlot, DEFAULT_PHASE_SPACE_KIND};
pub use time::{TimePlot, DEFAULT_TIME_KIND};
pub use timebin::{Binning, TimeBinPlot, TimeBins, DEFAULT_TIME_BIN_KIND};
pub use twiss::{twiss_abbreviations, TwissPlot, DEFAULT_TWISS_KIND};

/// Which subplots an annotation goes onto
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Subplots {
    #[default]
    All,
    Only(Vec<usize>),
}

impl Subplots {
    pub fn contains(&self, subplot: usize) -> bool {
        match self {
            Subplots::All => true,
            Subplots::Only(indices) => indices.contains(&subplot),
        }
    }
}

impl From<Vec<usize>> for Subplots {
    fn from(indices: Vec<usize>) -> Self {
        Subplots::Only(indices)
    }
}

impl From<usize> for Subplots {
    fn from(index: usize) -> Self {
        Subplots::Only(vec![index])
    }
}

/// Options shared by the domain plots
#[derive(Debug, Clone, Default)]
pub struct PlotOptions {
    /// Display unit per property or property pair (`bet` covers `betx` and `bety`)
    pub display_units: HashMap<String, String>,
    /// Property registry; the built-in defaults when unset
    pub registry: Option<Arc<PropertyRegistry>>,
    /// Unit system; SI when unset
    pub unit_system: Option<Arc<dyn UnitSystem>>,
    /// Overrides the plot's default mark
    pub mark: Option<Mark>,
    /// Lattice drawn as a strip above a twiss plot
    pub lattice: Option<Lattice>,
}

impl PlotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_unit(mut self, property: impl Into<String>, unit: impl Into<String>) -> Self {
        self.display_units.insert(property.into(), unit.into());
        self
    }

    pub fn display_units(mut self, units: HashMap<String, String>) -> Self {
        self.display_units.extend(units);
        self
    }

    pub fn registry(mut self, registry: impl Into<Arc<PropertyRegistry>>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    pub fn unit_system(mut self, system: Arc<dyn UnitSystem>) -> Self {
        self.unit_system = Some(system);
        self
    }

    pub fn mark(mut self, mark: Mark) -> Self {
        self.mark = Some(mark);
        self
    }

    pub fn lattice(mut self, lattice: Lattice) -> Self {
        self.lattice = Some(lattice);
        self
    }

    /// Unit context with the plot's default display units under the caller's
    pub(crate) fn unit_context(&self, defaults: &[(&str, &str)]) -> UnitContext {
        let mut display_units: HashMap<String, String> = defaults
            .iter()
            .map(|(p, u)| (p.to_string(), u.to_string()))
            .collect();
        display_units.extend(self.display_units.clone());

        UnitContext::new(
            self.registry
                .clone()
                .unwrap_or_else(|| Arc::new(PropertyRegistry::with_defaults())),
            self.unit_system
                .clone()
                .unwrap_or_else(|| Arc::new(SiUnits)),
            display_units,
        )
    }
}

/// Shared surface of the domain plots, forwarded to their [`ManifoldPlot`]
pub trait DomainPlot<B: Backend> {
    fn manifold(&self) -> &ManifoldPlot<B>;

    fn manifold_mut(&mut self) -> &mut ManifoldPlot<B>;

    fn backend(&self) -> &B {
        self.manifold().backend()
    }

    fn axis(&self, subplot: usize, axis: usize) -> Option<AxisId> {
        self.manifold().axis(subplot, axis)
    }

    fn factor_for(&self, property: &str) -> Result<f64> {
        self.manifold().factor_for(property)
    }

    fn axline(
        &mut self,
        property: &str,
        value: f64,
        subplots: Subplots,
    ) -> Result<Vec<ReferenceId>> {
        self.manifold_mut().axline(property, value, subplots)
    }

    fn axline_styled(
        &mut self,
        property: &str,
        value: f64,
        subplots: Subplots,
        style: ReferenceStyle,
    ) -> Result<Vec<ReferenceId>> {
        self.manifold_mut()
            .axline_styled(property, value, subplots, style)
    }

    fn axspan(
        &mut self,
        property: &str,
        value: f64,
        value_to: Option<f64>,
        subplots: Subplots,
    ) -> Result<Vec<ReferenceId>> {
        self.manifold_mut().axspan(property, value, value_to, subplots)
    }

    fn axspan_styled(
        &mut self,
        property: &str,
        value: f64,
        value_to: Option<f64>,
        subplots: Subplots,
        style: ReferenceStyle,
    ) -> Result<Vec<ReferenceId>> {
        self.manifold_mut()
            .axspan_styled(property, value, value_to, subplots, style)
    }
}

//! Lattice multipole strengths

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

use super::{palette, DomainPlot, ManifoldPlot, PlotData, PlotOptions};
use crate::figure::{ArtistId, ArtistStyle, AxisId, Backend, Figure, Mark};
use crate::layout::{parse, Abbreviations, LayoutSpec};
use crate::{PlotError, Result};

pub const DEFAULT_KNL_KIND: &str = "k0l-k1l-k2l";

/// Highest multipole order with a registered property (`k5l`)
const MAX_ORDER: usize = 5;

/// Orders shown by the lattice strip above a twiss plot
pub(crate) const STRIP_ORDERS: &[usize] = &[0, 1, 2];

fn knl_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^k(\d+)l$").unwrap())
}

/// Multipole order of a `k{n}l` property name
fn order_of(property: &str) -> Option<usize> {
    knl_regex()
        .captures(property)
        .and_then(|c| c[1].parse().ok())
}

/// One lattice element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    /// Position of the element entry
    pub s: f64,
    /// Zero for thin elements
    #[serde(default)]
    pub length: f64,
    /// Integrated strengths, index = multipole order
    #[serde(default)]
    pub knl: Vec<f64>,
}

impl Element {
    pub fn new(name: impl Into<String>, s: f64, length: f64, knl: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            s,
            length,
            knl,
        }
    }

    pub fn strength(&self, order: usize) -> f64 {
        self.knl.get(order).copied().unwrap_or(0.0)
    }

    pub fn is_thin(&self) -> bool {
        self.length == 0.0
    }
}

/// Elements of a beam line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lattice {
    elements: Vec<Element>,
}

impl Lattice {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn with(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Build a lattice from a table with an `s` column, an optional `length`
    /// column and any of `k0l` .. `k5l`
    ///
    /// Element names are not part of numeric tables; elements are named by row.
    pub fn from_table(data: &PlotData) -> Result<Self> {
        let s = data.require("s")?;
        let length = data.get("length");
        let columns: Vec<Option<&[f64]>> =
            (0..=MAX_ORDER).map(|n| data.get(&format!("k{}l", n))).collect();

        for (name, column) in length
            .map(|l| ("length".to_string(), l))
            .into_iter()
            .chain(
                columns
                    .iter()
                    .enumerate()
                    .filter_map(|(n, c)| c.map(|c| (format!("k{}l", n), c))),
            )
        {
            if column.len() != s.len() {
                return Err(PlotError::DataShapeError(format!(
                    "column '{}' has {} values but 's' has {}",
                    name,
                    column.len(),
                    s.len()
                )));
            }
        }

        let order = columns.iter().rposition(Option::is_some).map_or(0, |n| n + 1);
        let elements = (0..s.len())
            .map(|i| Element {
                name: format!("element{}", i),
                s: s[i],
                length: length.map_or(0.0, |l| l[i]),
                knl: columns[..order]
                    .iter()
                    .map(|c| c.map_or(0.0, |c| c[i]))
                    .collect(),
            })
            .collect();
        Ok(Self { elements })
    }

    /// Strength profile of one order along `s`
    ///
    /// Thick elements are drawn as rectangles, thin ones as spikes. Elements
    /// without strength in this order are left out.
    pub fn profile(&self, order: usize) -> (Vec<f64>, Vec<f64>) {
        let mut elements: Vec<&Element> = self
            .elements
            .iter()
            .filter(|e| e.strength(order) != 0.0)
            .collect();
        elements.sort_by(|a, b| a.s.total_cmp(&b.s));

        let mut x = Vec::with_capacity(elements.len() * 4);
        let mut y = Vec::with_capacity(elements.len() * 4);
        for element in elements {
            let k = element.strength(order);
            if element.is_thin() {
                x.extend([element.s; 3]);
                y.extend([0.0, k, 0.0]);
            } else {
                let end = element.s + element.length;
                x.extend([element.s, element.s, end, end]);
                y.extend([0.0, k, k, 0.0]);
            }
        }
        (x, y)
    }

    /// [`profile`](Self::profile) scaled into `[-1, 1]`
    pub fn normalized_profile(&self, order: usize) -> (Vec<f64>, Vec<f64>) {
        let (x, mut y) = self.profile(order);
        let peak = y.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if peak > 0.0 {
            y.iter_mut().for_each(|v| *v /= peak);
        }
        (x, y)
    }
}

/// Normalized multipole profiles drawn on a reserved subplot
#[derive(Debug, Clone)]
pub struct LatticeStrip {
    axis: AxisId,
    orders: Vec<usize>,
    artists: Vec<ArtistId>,
}

impl LatticeStrip {
    /// Create one line artist per order on `axis`
    pub fn attach<B: Backend>(backend: &mut B, axis: AxisId, orders: &[usize]) -> Self {
        let artists = orders
            .iter()
            .enumerate()
            .map(|(i, n)| {
                backend.add_artist(
                    axis,
                    ArtistStyle::new(Mark::Line, palette::cycle(i), format!("k_{}l", n)),
                )
            })
            .collect();
        Self {
            axis,
            orders: orders.to_vec(),
            artists,
        }
    }

    pub fn axis(&self) -> AxisId {
        self.axis
    }

    pub fn artists(&self) -> &[ArtistId] {
        &self.artists
    }

    /// Replace the profiles; `s_factor` converts `s` into its display unit
    pub fn update<B: Backend>(
        &self,
        backend: &mut B,
        lattice: &Lattice,
        s_factor: f64,
        autoscale: bool,
    ) -> Vec<ArtistId> {
        for (order, artist) in self.orders.iter().zip(&self.artists) {
            let (x, y) = lattice.normalized_profile(*order);
            backend.set_data(*artist, x.into_iter().map(|v| v * s_factor).collect(), y);
        }
        if autoscale {
            backend.autoscale_y(self.axis);
        }
        self.artists.clone()
    }
}

/// Multipole strengths along `s`, one rectangular profile per element
#[derive(Debug)]
pub struct KnlPlot<B: Backend = Figure> {
    plot: ManifoldPlot<B>,
}

impl<B: Backend> KnlPlot<B> {
    /// Every series of `kind` must be a `k{n}l` property; `knl` abbreviates
    /// `k0l+k1l+k2l`
    pub fn new(
        backend: B,
        lattice: Option<&Lattice>,
        kind: impl Into<LayoutSpec>,
        options: PlotOptions,
    ) -> Result<Self> {
        let abbreviations = Abbreviations::new().with("knl", "k0l+k1l+k2l");
        let layout = parse(&kind.into(), &abbreviations)?;
        if let Some(property) = layout.properties().into_iter().find(|p| order_of(p).is_none()) {
            return Err(PlotError::spec(
                property,
                "multipole plots only show k{n}l properties",
            ));
        }

        let mark = options.mark.unwrap_or(Mark::Line);
        let plot = ManifoldPlot::new(
            backend,
            "s",
            layout,
            options.unit_context(&[]),
            |backend: &mut B, slot, axis| {
                backend.add_artist(axis, ArtistStyle::new(mark, slot.color, slot.label))
            },
        )?;

        let mut plot = Self { plot };
        if let Some(lattice) = lattice {
            plot.update(lattice, true)?;
        }
        Ok(plot)
    }

    /// Replace all profiles with those of `lattice`
    pub fn update(&mut self, lattice: &Lattice, autoscale: bool) -> Result<Vec<ArtistId>> {
        debug!(elements = lattice.len(), "updating multipole profiles");
        self.plot.update_profiles(
            |property| {
                let order = order_of(property)
                    .ok_or_else(|| PlotError::UnknownProperty(property.to_string()))?;
                Ok(lattice.profile(order))
            },
            autoscale,
        )
    }

    pub fn into_backend(self) -> B {
        self.plot.into_backend()
    }
}

impl<B: Backend> DomainPlot<B> for KnlPlot<B> {
    fn manifold(&self) -> &ManifoldPlot<B> {
        &self.plot
    }

    fn manifold_mut(&mut self) -> &mut ManifoldPlot<B> {
        &mut self.plot
    }
}

//! In-memory figure

use serde::Serialize;
use tracing::warn;

use super::{ArtistId, ArtistStyle, AxisId, Backend, Reference, ReferenceId, ReferenceStyle};

/// Relative padding added around autoscaled data
const AUTOSCALE_MARGIN: f64 = 0.05;

const DEFAULT_WIDTH: u32 = 800;
const SUBPLOT_HEIGHT: u32 = 250;

/// One coordinate system of a figure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axes {
    /// Index of the subplot, top to bottom
    pub subplot: usize,
    /// 0 for the primary axis, 1.. for twin axes
    pub twin: usize,
    /// Primary axis this twin shares x with
    pub parent: Option<AxisId>,
    /// Position among the right-hand spines
    pub offset: usize,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub color: Option<String>,
    pub xlim: Option<(f64, f64)>,
    pub ylim: Option<(f64, f64)>,
    pub artists: Vec<ArtistId>,
    pub references: Vec<ReferenceId>,
}

impl Axes {
    fn new(subplot: usize, twin: usize, parent: Option<AxisId>, offset: usize) -> Self {
        Self {
            subplot,
            twin,
            parent,
            offset,
            xlabel: None,
            ylabel: None,
            color: None,
            xlim: None,
            ylim: None,
            artists: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn is_twin(&self) -> bool {
        self.parent.is_some()
    }
}

/// A series and its data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artist {
    pub axis: AxisId,
    pub style: ArtistStyle,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// A reference line or band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub axis: AxisId,
    pub reference: Reference,
    pub style: ReferenceStyle,
}

/// Scene graph of stacked subplots, recorded for the writers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: Option<String>,
    shared_x: bool,
    width: u32,
    height: Option<u32>,
    subplots: usize,
    axes: Vec<Axes>,
    artists: Vec<Artist>,
    references: Vec<ReferenceLine>,
}

impl Default for Figure {
    fn default() -> Self {
        Self::new()
    }
}

impl Figure {
    pub fn new() -> Self {
        Self {
            title: None,
            shared_x: true,
            width: DEFAULT_WIDTH,
            height: None,
            subplots: 0,
            axes: Vec::new(),
            artists: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Fixed size in pixels; without it the height grows with the subplot count
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = Some(height);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn size(&self) -> (u32, u32) {
        let height = self
            .height
            .unwrap_or(SUBPLOT_HEIGHT * self.subplots.max(1) as u32);
        (self.width, height)
    }

    /// Whether the subplots share one x scale (the default)
    pub fn shares_x(&self) -> bool {
        self.shared_x
    }

    pub fn subplot_count(&self) -> usize {
        self.subplots
    }

    pub fn axes(&self) -> &[Axes] {
        &self.axes
    }

    pub fn axis(&self, id: AxisId) -> Option<&Axes> {
        self.axes.get(id.0)
    }

    /// Axes of one subplot, primary first
    pub fn axes_in(&self, subplot: usize) -> Vec<AxisId> {
        let mut ids: Vec<AxisId> = self
            .axes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.subplot == subplot)
            .map(|(i, _)| AxisId(i))
            .collect();
        ids.sort_by_key(|id| self.axes[id.0].twin);
        ids
    }

    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    pub fn artist(&self, id: ArtistId) -> Option<&Artist> {
        self.artists.get(id.0)
    }

    pub fn references(&self) -> &[ReferenceLine] {
        &self.references
    }

    pub fn reference(&self, id: ReferenceId) -> Option<&ReferenceLine> {
        self.references.get(id.0)
    }

    fn axis_mut(&mut self, id: AxisId) -> Option<&mut Axes> {
        let axis = self.axes.get_mut(id.0);
        if axis.is_none() {
            warn!(axis = id.0, "unknown axis handle");
        }
        axis
    }
}

impl Backend for Figure {
    fn add_subplots(&mut self, count: usize) -> Vec<AxisId> {
        let first = self.subplots;
        self.subplots += count;
        (first..first + count)
            .map(|subplot| {
                self.axes.push(Axes::new(subplot, 0, None, 0));
                AxisId(self.axes.len() - 1)
            })
            .collect()
    }

    fn unshare_x(&mut self) {
        self.shared_x = false;
    }

    fn add_twin(&mut self, primary: AxisId, offset: usize) -> AxisId {
        let subplot = self.axes.get(primary.0).map(|a| a.subplot).unwrap_or(0);
        let twin = self.axes.iter().filter(|a| a.subplot == subplot).count();
        let xlim = self.axes.get(primary.0).and_then(|a| a.xlim);
        let mut axes = Axes::new(subplot, twin, Some(primary), offset);
        axes.xlim = xlim;
        self.axes.push(axes);
        AxisId(self.axes.len() - 1)
    }

    fn add_artist(&mut self, axis: AxisId, style: ArtistStyle) -> ArtistId {
        let id = ArtistId(self.artists.len());
        self.artists.push(Artist {
            axis,
            style,
            x: Vec::new(),
            y: Vec::new(),
        });
        if let Some(axes) = self.axis_mut(axis) {
            axes.artists.push(id);
        }
        id
    }

    fn set_data(&mut self, artist: ArtistId, x: Vec<f64>, y: Vec<f64>) {
        match self.artists.get_mut(artist.0) {
            Some(a) => {
                a.x = x;
                a.y = y;
            }
            None => warn!(artist = artist.0, "unknown artist handle"),
        }
    }

    fn set_xlabel(&mut self, axis: AxisId, label: &str) {
        if let Some(axes) = self.axis_mut(axis) {
            axes.xlabel = Some(label.to_string());
        }
    }

    fn set_ylabel(&mut self, axis: AxisId, label: &str) {
        if let Some(axes) = self.axis_mut(axis) {
            axes.ylabel = Some(label.to_string());
        }
    }

    fn set_axis_color(&mut self, axis: AxisId, color: &str) {
        if let Some(axes) = self.axis_mut(axis) {
            axes.color = Some(color.to_string());
        }
    }

    fn set_xlim(&mut self, axis: AxisId, lower: f64, upper: f64) {
        if let Some(axes) = self.axis_mut(axis) {
            axes.xlim = Some((lower, upper));
        }
    }

    fn autoscale_y(&mut self, axis: AxisId) {
        let Some(axes) = self.axes.get(axis.0) else {
            warn!(axis = axis.0, "unknown axis handle");
            return;
        };
        let bounds = axes
            .artists
            .iter()
            .filter_map(|id| self.artists.get(id.0))
            .flat_map(|a| a.y.iter().copied())
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            });

        if let Some((lo, hi)) = bounds {
            let pad = if hi > lo {
                (hi - lo) * AUTOSCALE_MARGIN
            } else {
                lo.abs().max(1.0) * AUTOSCALE_MARGIN
            };
            self.axes[axis.0].ylim = Some((lo - pad, hi + pad));
        }
    }

    fn add_reference(
        &mut self,
        axis: AxisId,
        reference: Reference,
        style: ReferenceStyle,
    ) -> ReferenceId {
        let id = ReferenceId(self.references.len());
        self.references.push(ReferenceLine {
            axis,
            reference,
            style,
        });
        if let Some(axes) = self.axis_mut(axis) {
            axes.references.push(id);
        }
        id
    }
}

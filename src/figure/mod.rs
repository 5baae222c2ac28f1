//! Graphics backend abstraction
//!
//! Plots never draw directly. They talk to a [`Backend`], which hands out
//! opaque handles for axes, artists and reference lines and keeps the actual
//! drawing state. [`Figure`] is the in-memory backend used by the writers.

mod scene;
mod types;

pub use scene::{Artist, Axes, Figure, ReferenceLine};
pub use types::{ArtistId, ArtistStyle, AxisId, Mark, Reference, ReferenceId, ReferenceStyle};

/// Capabilities a plot needs from its graphics layer
///
/// Handles passed back into a backend must have been issued by the same
/// backend instance.
pub trait Backend {
    /// Create `count` vertically stacked subplots sharing the x axis,
    /// returning their primary axes top to bottom
    fn add_subplots(&mut self, count: usize) -> Vec<AxisId>;

    /// Give every subplot its own x scale and x label
    fn unshare_x(&mut self);

    /// Create a twin axis sharing x with `primary`; `offset` counts twin
    /// axes already present on the right spine
    fn add_twin(&mut self, primary: AxisId, offset: usize) -> AxisId;

    /// Create an empty series on `axis`
    fn add_artist(&mut self, axis: AxisId, style: ArtistStyle) -> ArtistId;

    /// Replace the data of a series
    fn set_data(&mut self, artist: ArtistId, x: Vec<f64>, y: Vec<f64>);

    fn set_xlabel(&mut self, axis: AxisId, label: &str);

    fn set_ylabel(&mut self, axis: AxisId, label: &str);

    /// Color of the y spine, ticks and label
    fn set_axis_color(&mut self, axis: AxisId, color: &str);

    fn set_xlim(&mut self, axis: AxisId, lower: f64, upper: f64);

    /// Recompute the y limits of `axis` from the data of its series
    fn autoscale_y(&mut self, axis: AxisId);

    fn add_reference(
        &mut self,
        axis: AxisId,
        reference: Reference,
        style: ReferenceStyle,
    ) -> ReferenceId;
}

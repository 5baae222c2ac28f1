//! Reference lines and bands

use tracing::debug;

use super::{ManifoldPlot, Subplots};
use crate::figure::{AxisId, Backend, Reference, ReferenceId, ReferenceStyle};
use crate::{PlotError, Result};

impl<B: Backend> ManifoldPlot<B> {
    /// Draw a reference line at `value` of `property`
    ///
    /// For the independent property this is a vertical line on every targeted
    /// subplot. For any other property it is a horizontal line on each axis
    /// showing that property; nothing is drawn when the layout does not show
    /// it. `value` is in native units.
    pub fn axline(
        &mut self,
        property: &str,
        value: f64,
        subplots: Subplots,
    ) -> Result<Vec<ReferenceId>> {
        self.axline_styled(property, value, subplots, ReferenceStyle::line())
    }

    pub fn axline_styled(
        &mut self,
        property: &str,
        value: f64,
        subplots: Subplots,
        style: ReferenceStyle,
    ) -> Result<Vec<ReferenceId>> {
        let (targets, factor) = self.annotation_targets(property, &subplots)?;
        let reference = if property == self.on_x() {
            Reference::VLine { x: value * factor }
        } else {
            Reference::HLine { y: value * factor }
        };
        Ok(self.add_references(property, targets, reference, style))
    }

    /// Draw a band from `value` to `value_to`
    ///
    /// Without `value_to` this falls back to [`axline`](Self::axline) with
    /// the line style. Both bounds are in native units of `property`.
    pub fn axspan(
        &mut self,
        property: &str,
        value: f64,
        value_to: Option<f64>,
        subplots: Subplots,
    ) -> Result<Vec<ReferenceId>> {
        let style = match value_to {
            Some(_) => ReferenceStyle::span(),
            None => ReferenceStyle::line(),
        };
        self.axspan_styled(property, value, value_to, subplots, style)
    }

    pub fn axspan_styled(
        &mut self,
        property: &str,
        value: f64,
        value_to: Option<f64>,
        subplots: Subplots,
        style: ReferenceStyle,
    ) -> Result<Vec<ReferenceId>> {
        let Some(value_to) = value_to else {
            return self.axline_styled(property, value, subplots, style);
        };

        let (targets, factor) = self.annotation_targets(property, &subplots)?;
        let (lower, upper) = (value * factor, value_to * factor);
        let reference = if property == self.on_x() {
            Reference::VSpan {
                x0: lower,
                x1: upper,
            }
        } else {
            Reference::HSpan {
                y0: lower,
                y1: upper,
            }
        };
        Ok(self.add_references(property, targets, reference, style))
    }

    /// Axes an annotation of `property` goes onto, with its scale factor
    fn annotation_targets(
        &self,
        property: &str,
        subplots: &Subplots,
    ) -> Result<(Vec<AxisId>, f64)> {
        if !self.units().registry().contains(property) && property != self.on_x() {
            return Err(PlotError::UnknownProperty(property.to_string()));
        }
        let factor = self.factor_for(property)?;

        let targets = if property == self.on_x() {
            self.axes()
                .iter()
                .enumerate()
                .filter(|(i, _)| subplots.contains(*i))
                .filter_map(|(_, row)| row.first().copied())
                .collect()
        } else {
            self.layout()
                .axis_groups_with(property)
                .filter(|(i, _)| subplots.contains(*i))
                .filter_map(|(i, j)| self.axis(i, j))
                .collect()
        };
        Ok((targets, factor))
    }

    fn add_references(
        &mut self,
        property: &str,
        targets: Vec<AxisId>,
        reference: Reference,
        style: ReferenceStyle,
    ) -> Vec<ReferenceId> {
        debug!(property, axes = targets.len(), ?reference, "adding reference");
        targets
            .into_iter()
            .map(|axis| {
                self.backend_mut()
                    .add_reference(axis, reference, style.clone())
            })
            .collect()
    }
}

//! Particle counts binned over time

use std::fmt;

use super::manifold::finite_range;
use super::{DomainPlot, ManifoldPlot, PlotData, PlotOptions};
use crate::figure::{ArtistId, ArtistStyle, Backend, Figure, Mark};
use crate::layout::{parse, Abbreviations, LayoutSpec};
use crate::{PlotError, Result};

pub const DEFAULT_TIME_BIN_KIND: &str = "count";

/// Properties derived from the binned arrival times
const BIN_PROPERTIES: &[&str] = &["count", "rate", "cumulative"];

const MAX_BINS: usize = 1_000_000;

/// How arrival times are grouped
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binning {
    /// Fixed bin width in native time units, starting at the first arrival
    Width(f64),
    /// Fixed number of bins spanning the first to the last arrival
    Count(usize),
}

impl Default for Binning {
    fn default() -> Self {
        Binning::Count(100)
    }
}

impl fmt::Display for Binning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binning::Width(width) => write!(f, "bin width {}", width),
            Binning::Count(count) => write!(f, "{} bins", count),
        }
    }
}

impl Binning {
    fn validate(&self) -> Result<()> {
        let valid = match *self {
            Binning::Width(width) => width.is_finite() && width > 0.0,
            Binning::Count(count) => (1..=MAX_BINS).contains(&count),
        };
        if valid {
            Ok(())
        } else {
            Err(PlotError::spec(
                self.to_string(),
                format!("binning needs a positive width or 1 to {} bins", MAX_BINS),
            ))
        }
    }
}

/// Histogram of arrival times
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeBins {
    /// `counts.len() + 1` bin edges, ascending
    edges: Vec<f64>,
    counts: Vec<f64>,
}

impl TimeBins {
    /// Bin the finite entries of `times`
    ///
    /// All arrivals at the same instant give bins spanning one time unit.
    pub fn histogram(times: &[f64], binning: Binning) -> Result<Self> {
        binning.validate()?;
        let Some((lo, hi)) = finite_range(times) else {
            return Ok(Self::default());
        };
        let span = if hi > lo { hi - lo } else { 1.0 };

        let (count, width) = match binning {
            Binning::Width(width) => {
                let count = (span / width).floor() + 1.0;
                if count > MAX_BINS as f64 {
                    return Err(PlotError::spec(
                        binning.to_string(),
                        format!("{} s of arrivals would need more than {} bins", span, MAX_BINS),
                    ));
                }
                (count as usize, width)
            }
            Binning::Count(count) => (count, span / count as f64),
        };

        let edges = (0..=count).map(|i| lo + i as f64 * width).collect();
        let mut counts = vec![0.0; count];
        for t in times.iter().filter(|t| t.is_finite()) {
            let index = (((t - lo) / width).floor() as usize).min(count - 1);
            counts[index] += 1.0;
        }
        Ok(Self { edges, counts })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Counts per unit time
    pub fn rate(&self) -> Vec<f64> {
        self.counts
            .iter()
            .zip(self.edges.windows(2))
            .map(|(count, edge)| count / (edge[1] - edge[0]))
            .collect()
    }

    pub fn cumulative(&self) -> Vec<f64> {
        self.counts
            .iter()
            .scan(0.0, |total, count| {
                *total += count;
                Some(*total)
            })
            .collect()
    }

    /// Step profile of a bin property: every edge, the last value repeated
    pub fn profile(&self, property: &str) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut values = match property {
            "count" => self.counts.clone(),
            "rate" => self.rate(),
            "cumulative" => self.cumulative(),
            other => return Err(PlotError::UnknownProperty(other.to_string())),
        };
        if let Some(last) = values.last().copied() {
            values.push(last);
        }
        Ok((self.edges.clone(), values))
    }
}

/// Histogram of particle arrival times `t`, drawn as steps
#[derive(Debug)]
pub struct TimeBinPlot<B: Backend = Figure> {
    plot: ManifoldPlot<B>,
    binning: Binning,
}

impl<B: Backend> TimeBinPlot<B> {
    /// Series of `kind` are `count`, `rate` and `cumulative`
    pub fn new(
        backend: B,
        data: Option<&PlotData>,
        kind: impl Into<LayoutSpec>,
        binning: Binning,
        options: PlotOptions,
    ) -> Result<Self> {
        binning.validate()?;
        let kind = kind.into();
        let layout = parse(&kind, &Abbreviations::new())?;
        if let Some(property) = layout
            .properties()
            .into_iter()
            .find(|p| !BIN_PROPERTIES.contains(p))
        {
            return Err(PlotError::spec(
                property,
                format!("binned time plots show {}", BIN_PROPERTIES.join(", ")),
            ));
        }

        let mark = options.mark.unwrap_or(Mark::Step);
        let plot = ManifoldPlot::new(
            backend,
            "t",
            layout,
            options.unit_context(&[("t", "s")]),
            |backend: &mut B, slot, axis| {
                backend.add_artist(axis, ArtistStyle::new(mark, slot.color, slot.label))
            },
        )?;

        let mut plot = Self { plot, binning };
        if let Some(data) = data {
            plot.update(data, true)?;
        }
        Ok(plot)
    }

    /// Bin the arrival times in column `t` and redraw every series
    pub fn update(&mut self, data: &PlotData, autoscale: bool) -> Result<Vec<ArtistId>> {
        let bins = TimeBins::histogram(data.require("t")?, self.binning)?;
        self.plot
            .update_profiles(|property| bins.profile(property), autoscale)
    }

    pub fn binning(&self) -> Binning {
        self.binning
    }

    pub fn into_backend(self) -> B {
        self.plot.into_backend()
    }
}

impl<B: Backend> DomainPlot<B> for TimeBinPlot<B> {
    fn manifold(&self) -> &ManifoldPlot<B> {
        &self.plot
    }

    fn manifold_mut(&mut self) -> &mut ManifoldPlot<B> {
        &mut self.plot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::Subplots;

    const ARRIVALS: [f64; 5] = [0.0, 0.5, 1.0, f64::NAN, 2.5];

    #[test]
    fn test_fixed_width_bins() {
        let bins = TimeBins::histogram(&ARRIVALS, Binning::Width(1.0)).unwrap();
        assert_eq!(bins.edges(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(bins.counts(), &[2.0, 1.0, 1.0]);
        assert_eq!(bins.cumulative(), vec![2.0, 3.0, 4.0]);

        let bins = TimeBins::histogram(&ARRIVALS, Binning::Width(0.5)).unwrap();
        assert_eq!(bins.counts(), &[1.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(bins.rate(), vec![2.0, 2.0, 2.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_fixed_count_bins() {
        let bins = TimeBins::histogram(&ARRIVALS, Binning::Count(2)).unwrap();
        assert_eq!(bins.edges(), &[0.0, 1.25, 2.5]);
        // The last arrival falls on the upper edge and stays in the last bin
        assert_eq!(bins.counts(), &[3.0, 1.0]);
    }

    #[test]
    fn test_degenerate_arrivals() {
        let bins = TimeBins::histogram(&[f64::NAN], Binning::default()).unwrap();
        assert!(bins.counts().is_empty());
        assert_eq!(bins.profile("count").unwrap(), (vec![], vec![]));

        let bins = TimeBins::histogram(&[3.0, 3.0], Binning::Count(1)).unwrap();
        assert_eq!(bins.edges(), &[3.0, 4.0]);
        assert_eq!(bins.counts(), &[2.0]);
    }

    #[test]
    fn test_invalid_binning() {
        for binning in [Binning::Width(0.0), Binning::Width(f64::NAN), Binning::Count(0)] {
            assert!(matches!(
                TimeBins::histogram(&ARRIVALS, binning),
                Err(PlotError::SpecificationError { .. })
            ));
        }
        assert!(TimeBins::histogram(&[0.0, 1.0], Binning::Width(1e-9)).is_err());
    }

    #[test]
    fn test_step_profiles_on_twin_axes() {
        let data = PlotData::new().with("t", ARRIVALS.to_vec());
        let options = PlotOptions::new().display_unit("t", "ms");
        let plot = TimeBinPlot::new(
            Figure::new(),
            Some(&data),
            "count-cumulative",
            Binning::Width(1.0),
            options,
        )
        .unwrap();

        let fig = plot.backend();
        let count = fig.artist(plot.manifold().artist(0, 0, 0).unwrap()).unwrap();
        assert_eq!(count.style.mark, Mark::Step);
        assert_eq!(count.y, vec![2.0, 1.0, 1.0, 1.0]);
        assert!((count.x[3] - 3000.0).abs() < 1e-9);

        let cumulative = fig.artist(plot.manifold().artist(0, 1, 0).unwrap()).unwrap();
        assert_eq!(cumulative.y, vec![2.0, 3.0, 4.0, 4.0]);
        let primary = fig.axis(plot.axis(0, 0).unwrap()).unwrap();
        assert_eq!(primary.xlabel.as_deref(), Some("t [ms]"));
    }

    #[test]
    fn test_rejects_other_properties() {
        assert!(matches!(
            TimeBinPlot::new(Figure::new(), None, "count,x", Binning::default(), PlotOptions::new()),
            Err(PlotError::SpecificationError { .. })
        ));
    }

    #[test]
    fn test_update_and_annotate() {
        let mut plot =
            TimeBinPlot::new(Figure::new(), None, DEFAULT_TIME_BIN_KIND, Binning::Count(4), PlotOptions::new())
                .unwrap();
        assert!(matches!(
            plot.update(&PlotData::new(), true),
            Err(PlotError::DataShapeError(_))
        ));

        let changed = plot
            .update(&PlotData::new().with("t", vec![0.0, 1.0, 2.0, 4.0]), true)
            .unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(plot.axspan("t", 1.0, Some(2.0), Subplots::All).unwrap().len(), 1);
    }
}

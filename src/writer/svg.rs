//! Static SVG output through plotters

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{debug, warn};

use crate::figure::{Artist, Axes, AxisId, Figure, Mark, Reference, ReferenceLine};
use crate::plot::finite_range;
use crate::writer::Writer;
use crate::{PlotError, Result};

const MARGIN: u32 = 10;
const X_LABEL_AREA: u32 = 35;
const Y_LABEL_AREA: u32 = 60;
const FONT_SIZE: u32 = 14;

/// SVG writer backed by plotters
///
/// Draws every subplot with its primary axis and at most one twin axis. Further
/// twin axes are not supported by plotters and are left out with a warning.
#[derive(Debug, Clone)]
pub struct PlottersWriter {
    font: String,
}

impl PlottersWriter {
    pub fn new() -> Self {
        Self {
            font: "sans-serif".to_string(),
        }
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    fn draw_subplot(
        &self,
        figure: &Figure,
        subplot: usize,
        area: &DrawingArea<SVGBackend<'_>, Shift>,
    ) -> Result<()> {
        let axis_ids = figure.axes_in(subplot);
        let Some(primary) = axis_ids.first().and_then(|id| figure.axis(*id)) else {
            return Ok(());
        };
        let twin = axis_ids.get(1).and_then(|id| figure.axis(*id));
        if axis_ids.len() > 2 {
            warn!(
                subplot,
                skipped = axis_ids.len() - 2,
                "plotters draws one twin axis per subplot"
            );
        }

        let xs = axis_ids
            .iter()
            .filter_map(|id| figure.axis(*id))
            .flat_map(|a| artists_of(figure, a))
            .flat_map(|artist| artist.x.iter());
        let (x0, x1) = primary
            .xlim
            .or_else(|| finite_range(xs))
            .map_or((0.0, 1.0), widen);
        let (y0, y1) = y_range(figure, primary);
        let (t0, t1) = twin.map_or((0.0, 1.0), |t| y_range(figure, t));

        let bottom = subplot + 1 == figure.subplot_count();
        let mut chart = ChartBuilder::on(area)
            .margin(MARGIN)
            .x_label_area_size(X_LABEL_AREA)
            .y_label_area_size(Y_LABEL_AREA)
            .right_y_label_area_size(if twin.is_some() { Y_LABEL_AREA } else { 0 })
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(draw_error)?
            .set_secondary_coord(x0..x1, t0..t1);

        let xdesc = if bottom || !figure.shares_x() {
            primary.xlabel.clone()
        } else {
            None
        };
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(xdesc.unwrap_or_default())
            .y_desc(primary.ylabel.clone().unwrap_or_default())
            .axis_desc_style((self.font.as_str(), FONT_SIZE))
            .y_label_style((self.font.as_str(), FONT_SIZE).into_font().color(&axis_color(primary)?))
            .draw()
            .map_err(draw_error)?;

        for artist in artists_of(figure, primary) {
            let color = rgb(&artist.style.color)?;
            let width = artist.style.width.round().max(1.0) as u32;
            let points = points_of(artist);
            let series = match artist.style.mark {
                Mark::Scatter => chart
                    .draw_series(points.into_iter().map(|p| Circle::new(p, width, color.filled())))
                    .map_err(draw_error)?,
                Mark::Line | Mark::Step => chart
                    .draw_series(LineSeries::new(
                        path_of(points, artist.style.mark),
                        color.stroke_width(width),
                    ))
                    .map_err(draw_error)?,
            };
            series
                .label(artist.style.label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }
        for line in references_of(figure, primary) {
            let style = reference_style(line)?;
            match line.reference {
                Reference::VLine { x } => chart
                    .draw_series(std::iter::once(PathElement::new(vec![(x, y0), (x, y1)], style)))
                    .map_err(draw_error)?,
                Reference::HLine { y } => chart
                    .draw_series(std::iter::once(PathElement::new(vec![(x0, y), (x1, y)], style)))
                    .map_err(draw_error)?,
                Reference::VSpan { x0: a, x1: b } => chart
                    .draw_series(std::iter::once(Rectangle::new([(a, y0), (b, y1)], style)))
                    .map_err(draw_error)?,
                Reference::HSpan { y0: a, y1: b } => chart
                    .draw_series(std::iter::once(Rectangle::new([(x0, a), (x1, b)], style)))
                    .map_err(draw_error)?,
            };
        }

        if let Some(twin) = twin {
            chart
                .configure_secondary_axes()
                .y_desc(twin.ylabel.clone().unwrap_or_default())
                .axis_desc_style((self.font.as_str(), FONT_SIZE))
                .label_style((self.font.as_str(), FONT_SIZE).into_font().color(&axis_color(twin)?))
                .draw()
                .map_err(draw_error)?;

            for artist in artists_of(figure, twin) {
                let color = rgb(&artist.style.color)?;
                let width = artist.style.width.round().max(1.0) as u32;
                let points = points_of(artist);
                let series = match artist.style.mark {
                    Mark::Scatter => chart
                        .draw_secondary_series(
                            points.into_iter().map(|p| Circle::new(p, width, color.filled())),
                        )
                        .map_err(draw_error)?,
                    Mark::Line | Mark::Step => chart
                        .draw_secondary_series(LineSeries::new(
                            path_of(points, artist.style.mark),
                            color.stroke_width(width),
                        ))
                        .map_err(draw_error)?,
                };
                series
                    .label(artist.style.label.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
            for line in references_of(figure, twin) {
                let style = reference_style(line)?;
                match line.reference {
                    Reference::HLine { y } => chart
                        .draw_secondary_series(std::iter::once(PathElement::new(vec![(x0, y), (x1, y)], style)))
                        .map_err(draw_error)?,
                    Reference::HSpan { y0: a, y1: b } => chart
                        .draw_secondary_series(std::iter::once(Rectangle::new([(x0, a), (x1, b)], style)))
                        .map_err(draw_error)?,
                    // Vertical references live on the primary axis
                    Reference::VLine { .. } | Reference::VSpan { .. } => continue,
                };
            }
        }

        if figure.axes_in(subplot).iter().any(|id| has_artists(figure, *id)) {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .label_font((self.font.as_str(), FONT_SIZE))
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8))
                .draw()
                .map_err(draw_error)?;
        }
        Ok(())
    }
}

impl Default for PlottersWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for PlottersWriter {
    type Output = String;

    fn write(&self, figure: &Figure) -> Result<String> {
        self.validate(figure)?;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, figure.size()).into_drawing_area();
            root.fill(&WHITE).map_err(draw_error)?;
            let root = match &figure.title {
                Some(title) => root
                    .titled(title, (self.font.as_str(), FONT_SIZE + 6))
                    .map_err(draw_error)?,
                None => root,
            };

            let panels = root.split_evenly((figure.subplot_count(), 1));
            for (subplot, panel) in panels.iter().enumerate() {
                self.draw_subplot(figure, subplot, panel)?;
            }
            root.present().map_err(draw_error)?;
        }
        debug!(bytes = svg.len(), "wrote SVG");
        Ok(svg)
    }
}

fn draw_error<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::WriterError(format!("plotters: {}", e))
}

fn rgb(color: &str) -> Result<RGBColor> {
    let [r, g, b, _] = csscolorparser::parse(color)
        .map_err(|e| PlotError::WriterError(format!("Invalid color '{}': {}", color, e)))?
        .to_rgba8();
    Ok(RGBColor(r, g, b))
}

fn axis_color(axes: &Axes) -> Result<RGBColor> {
    axes.color.as_deref().map_or(Ok(BLACK), rgb)
}

fn reference_style(line: &ReferenceLine) -> Result<ShapeStyle> {
    let color = rgb(&line.style.color)?.mix(line.style.alpha);
    Ok(if line.reference.is_span() {
        color.filled()
    } else {
        color.stroke_width(line.style.width.round().max(1.0) as u32)
    })
}

fn artists_of<'a>(figure: &'a Figure, axes: &'a Axes) -> impl Iterator<Item = &'a Artist> + 'a {
    axes.artists.iter().filter_map(|id| figure.artist(*id))
}

fn references_of<'a>(
    figure: &'a Figure,
    axes: &'a Axes,
) -> impl Iterator<Item = &'a ReferenceLine> + 'a {
    axes.references.iter().filter_map(|id| figure.reference(*id))
}

fn has_artists(figure: &Figure, axis: AxisId) -> bool {
    figure.axis(axis).is_some_and(|a| !a.artists.is_empty())
}

fn points_of(artist: &Artist) -> Vec<(f64, f64)> {
    artist
        .x
        .iter()
        .zip(&artist.y)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect()
}

/// Step marks hold each value until the next point
fn path_of(points: Vec<(f64, f64)>, mark: Mark) -> Vec<(f64, f64)> {
    if mark != Mark::Step {
        return points;
    }
    let mut path = Vec::with_capacity(points.len() * 2);
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            path.push((*x, points[i - 1].1));
        }
        path.push((*x, *y));
    }
    path
}

fn y_range(figure: &Figure, axes: &Axes) -> (f64, f64) {
    axes.ylim
        .or_else(|| finite_range(artists_of(figure, axes).flat_map(|a| a.y.iter())))
        .map_or((0.0, 1.0), widen)
}

/// Plotters needs a non-empty range
fn widen((lo, hi): (f64, f64)) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{DomainPlot, PlotData, PlotOptions, Subplots, TwissPlot};

    #[test]
    fn test_step_path() {
        let path = path_of(vec![(0.0, 1.0), (1.0, 2.0), (2.0, 0.0)], Mark::Step);
        assert_eq!(
            path,
            vec![(0.0, 1.0), (1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 0.0)]
        );
        let line = path_of(vec![(0.0, 1.0)], Mark::Line);
        assert_eq!(line, vec![(0.0, 1.0)]);
    }

    #[test]
    fn test_widen_degenerate_range() {
        assert_eq!(widen((1.0, 1.0)), (0.5, 1.5));
        assert_eq!(widen((0.0, 2.0)), (0.0, 2.0));
    }

    #[test]
    fn test_writes_svg() {
        let data = PlotData::new()
            .with("s", vec![0.0, 1.0, 2.0])
            .with("betx", vec![1.0, 2.0, 1.0])
            .with("bety", vec![2.0, 1.0, 2.0])
            .with("dx", vec![0.1, 0.2, 0.1])
            .with("x", vec![0.0, 1e-3, 0.0])
            .with("y", vec![0.0, 0.0, 0.0]);
        let mut plot = TwissPlot::new(Figure::new(), Some(&data), "bet-dx,x+y", PlotOptions::new())
            .unwrap();
        plot.axspan("s", 0.5, Some(1.0), Subplots::All).unwrap();
        let svg = PlottersWriter::new().write(plot.backend()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<polyline") || svg.contains("<path"));
    }
}

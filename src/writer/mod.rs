//! Output writers
//!
//! A writer turns a finished [`Figure`] into an output format. Writers are
//! feature gated:
//!
//! - `vegalite` (default) - [`VegaLiteWriter`], a Vega-Lite v5 JSON document
//! - `plotters` - [`PlottersWriter`], a static SVG image

use crate::figure::Figure;
use crate::{PlotError, Result};

#[cfg(feature = "vegalite")]
mod vegalite;

#[cfg(feature = "plotters")]
mod svg;

#[cfg(feature = "vegalite")]
pub use vegalite::VegaLiteWriter;

#[cfg(feature = "plotters")]
pub use svg::PlottersWriter;

/// Renders a figure
pub trait Writer {
    type Output;

    fn write(&self, figure: &Figure) -> Result<Self::Output>;

    /// Checks every writer relies on before rendering
    fn validate(&self, figure: &Figure) -> Result<()> {
        if figure.subplot_count() == 0 {
            return Err(PlotError::WriterError(
                "figure has no subplots".to_string(),
            ));
        }
        for (i, artist) in figure.artists().iter().enumerate() {
            if artist.x.len() != artist.y.len() {
                return Err(PlotError::WriterError(format!(
                    "artist {} ('{}') has {} x values but {} y values",
                    i,
                    artist.style.label,
                    artist.x.len(),
                    artist.y.len()
                )));
            }
        }
        Ok(())
    }
}

/// Normalize a CSS color to `#rrggbb`
pub(crate) fn color_to_hex(value: &str) -> Result<String> {
    csscolorparser::parse(value)
        .map(|c| c.to_css_hex())
        .map_err(|e| PlotError::WriterError(format!("Invalid color '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{ArtistStyle, Backend, Mark};

    struct Noop;

    impl Writer for Noop {
        type Output = ();

        fn write(&self, figure: &Figure) -> Result<()> {
            self.validate(figure)
        }
    }

    #[test]
    fn test_validation() {
        assert!(Noop.write(&Figure::new()).is_err());

        let mut fig = Figure::new();
        let ax = fig.add_subplots(1)[0];
        let artist = fig.add_artist(ax, ArtistStyle::new(Mark::Line, "red", "x"));
        assert!(Noop.write(&fig).is_ok());
        fig.set_data(artist, vec![1.0, 2.0], vec![1.0]);
        assert!(Noop.write(&fig).is_err());
    }

    #[test]
    fn test_color_to_hex() {
        assert_eq!(color_to_hex("red").unwrap(), "#ff0000");
        assert_eq!(color_to_hex("#1f77b4").unwrap(), "#1f77b4");
        assert!(color_to_hex("not-a-color").is_err());
    }
}

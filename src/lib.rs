/*!
# beamplot - multi-panel accelerator physics plots

beamplot draws lattice functions, closed orbits, multipole strengths and time
structure from precomputed tabular data. Which quantities go where is described
with a compact layout mini-language:

```text
bet-dx,x+y
```

- `,` separates subplots (stacked vertically, sharing the x axis)
- `-` separates axis groups within a subplot (the first is the primary axis,
  the others are twin axes on the right)
- `+` separates series drawn on the same axis

Group abbreviations such as `bet` for `betx+bety` are expanded before parsing.

## Example

```rust,ignore
use beamplot::figure::Figure;
use beamplot::plot::{DomainPlot, PlotOptions, Subplots, TwissPlot};
use beamplot::writer::{VegaLiteWriter, Writer};

let mut plot = TwissPlot::new(Figure::new(), Some(&twiss), "bet-dx,x+y", PlotOptions::default())?;
plot.axspan("s", 10.0, Some(12.0), Subplots::All)?;
let json = VegaLiteWriter::new().write(plot.backend())?;
```

## Core Components

- [`units`] - property registry, unit system and scale factors
- [`layout`] - layout mini-language parser
- [`plot`] - composition engine, domain plots and annotations
- [`figure`] - graphics backend trait and in-memory figure
- [`writer`] - Vega-Lite and plotters output
- [`reader`] - tabular data loading
- [`config`] - TOML configuration
*/

pub mod config;
pub mod figure;
pub mod layout;
pub mod plot;
pub mod reader;
pub mod units;
pub mod writer;

pub use figure::{ArtistId, AxisId, Backend, Figure, Mark};
pub use layout::{Abbreviations, Layout, LayoutSpec, Leaf};
pub use plot::{
    DomainPlot, KnlPlot, ManifoldPlot, PhaseSpacePlot, PlotData, PlotOptions, Subplots, TimeBinPlot,
    TimePlot, TwissPlot,
};
pub use units::{PropertyRegistry, SiUnits, UnitSystem};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum PlotError {
    #[error("Specification error in '{fragment}': {message}")]
    SpecificationError { fragment: String, message: String },

    #[error("Unknown property '{0}': no unit registered")]
    UnknownProperty(String),

    #[error("Data shape error: {0}")]
    DataShapeError(String),

    #[error("Cannot display property '{property}' in '{to}': not convertible from '{from}'")]
    UnitIncompatibility {
        property: String,
        from: String,
        to: String,
    },

    #[error("Unit error: {0}")]
    UnitError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Reader error: {0}")]
    ReaderError(String),

    #[error("Writer error: {0}")]
    WriterError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PlotError {
    pub(crate) fn spec(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        PlotError::SpecificationError {
            fragment: fragment.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlotError>;

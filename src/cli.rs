/*!
beamplot Command Line Interface

Parses layout specifications and renders accelerator physics plots from
tabular data files.
*/

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beamplot::config::PlotConfig;
use beamplot::figure::{Backend, Figure};
use beamplot::layout::{parse, Abbreviations, Layout, LayoutSpec};
use beamplot::plot::{
    twiss_abbreviations, Binning, DomainPlot, KnlPlot, Lattice, PhaseSpacePlot, Subplots,
    TimeBinPlot, TimePlot, TwissPlot, DEFAULT_KNL_KIND, DEFAULT_PHASE_SPACE_KIND,
    DEFAULT_TIME_BIN_KIND, DEFAULT_TIME_KIND, DEFAULT_TWISS_KIND,
};
use beamplot::reader::read_table;
use beamplot::VERSION;

#[cfg(feature = "vegalite")]
use beamplot::writer::VegaLiteWriter;

#[cfg(feature = "plotters")]
use beamplot::writer::PlottersWriter;

#[cfg(any(feature = "vegalite", feature = "plotters"))]
use beamplot::writer::Writer;

#[derive(Parser)]
#[command(name = "beamplot")]
#[command(about = "Multi-panel accelerator physics plots")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Variant {
    /// Twiss functions along s
    Twiss,
    /// Multipole strengths of a lattice table
    Knl,
    /// Particle coordinates over time
    Time,
    /// Particle count histogram over time
    TimeBin,
    /// Coordinate pairs such as x against px
    PhaseSpace,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a layout and show its normalized form
    Parse {
        /// Layout string such as "bet-dx,x+y", or a JSON nested list
        kind: String,

        /// Additional abbreviation, e.g. --abbrev optics=bet-d
        #[arg(long = "abbrev", value_parser = parse_key_value)]
        abbreviations: Vec<(String, String)>,

        /// Do not apply the twiss plane abbreviations (bet, alf, d, ...)
        #[arg(long)]
        no_twiss: bool,

        /// Output format (pretty, json, debug)
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Render a plot from a data file
    Render {
        /// Plot variant
        #[arg(value_enum)]
        variant: Variant,

        /// Data file (.csv, .tsv, .json, .parquet)
        data: PathBuf,

        /// Layout, defaults to the variant's default
        #[arg(long)]
        kind: Option<String>,

        /// Display unit, e.g. --unit bet=cm --unit x=mm
        #[arg(long = "unit", value_parser = parse_key_value)]
        units: Vec<(String, String)>,

        /// Lattice table drawn as a strip above a twiss plot
        #[arg(long)]
        lattice: Option<PathBuf>,

        /// Number of time bins for time-bin plots
        #[arg(long, conflicts_with = "bin_width")]
        bins: Option<usize>,

        /// Time bin width in seconds for time-bin plots
        #[arg(long)]
        bin_width: Option<f64>,

        /// Reference line, e.g. --line s=120.5
        #[arg(long = "line", value_parser = parse_key_value)]
        lines: Vec<(String, String)>,

        /// Reference band, e.g. --span s=100:140
        #[arg(long = "span", value_parser = parse_key_value)]
        spans: Vec<(String, String)>,

        /// Configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Figure title
        #[arg(long)]
        title: Option<String>,

        /// Output format (vegalite, svg)
        #[arg(long, default_value = "vegalite")]
        writer: String,

        /// Output file path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_key_value(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", text)),
    }
}

/// A layout argument: JSON when it starts with '[', the string form otherwise
fn layout_spec(text: &str) -> anyhow::Result<LayoutSpec> {
    if text.trim_start().starts_with('[') {
        serde_json::from_str(text).with_context(|| format!("Invalid JSON layout '{}'", text))
    } else {
        Ok(LayoutSpec::from(text))
    }
}

fn print_layout(layout: &Layout, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(layout)?),
        "debug" => println!("{:#?}", layout),
        "pretty" => {
            println!("{}", layout);
            println!(
                "{} subplot(s), {} axes, {} series",
                layout.subplot_count(),
                layout.axis_count(),
                layout.series_count()
            );
            for (i, groups) in layout.subplots().iter().enumerate() {
                println!("\nSubplot #{}:", i);
                for (j, leaves) in groups.iter().enumerate() {
                    let side = if j == 0 { "primary" } else { "twin" };
                    let names: Vec<String> = leaves.iter().map(|leaf| leaf.to_string()).collect();
                    println!("  {} axis: {}", side, names.join(", "));
                }
            }
        }
        _ => bail!("Unknown format: {}", format),
    }
    Ok(())
}

fn annotate<B: Backend, P: DomainPlot<B>>(
    plot: &mut P,
    lines: &[(String, String)],
    spans: &[(String, String)],
) -> anyhow::Result<()> {
    for (property, value) in lines {
        let value: f64 = value
            .parse()
            .with_context(|| format!("Invalid line position '{}'", value))?;
        plot.axline(property, value, Subplots::All)?;
    }
    for (property, range) in spans {
        let (lo, hi) = range
            .split_once(':')
            .ok_or_else(|| anyhow!("Invalid span '{}', expected lower:upper", range))?;
        let lo: f64 = lo.trim().parse().with_context(|| format!("Invalid span '{}'", range))?;
        let hi: f64 = hi.trim().parse().with_context(|| format!("Invalid span '{}'", range))?;
        plot.axspan(property, lo, Some(hi), Subplots::All)?;
    }
    Ok(())
}

fn write_figure(figure: &Figure, writer: &str) -> anyhow::Result<String> {
    match writer {
        #[cfg(feature = "vegalite")]
        "vegalite" => Ok(VegaLiteWriter::new().write(figure)?),

        #[cfg(feature = "plotters")]
        "svg" => Ok(PlottersWriter::new().write(figure)?),

        "vegalite" | "svg" => bail!(
            "Writer '{}' not compiled in. Rebuild with --features {}",
            writer,
            if writer == "svg" { "plotters" } else { "vegalite" }
        ),
        other => bail!("Unknown writer '{}'. Available writers: vegalite, svg", other),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beamplot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            kind,
            abbreviations,
            no_twiss,
            format,
        } => {
            let base = if no_twiss {
                Abbreviations::new()
            } else {
                twiss_abbreviations()
            };
            let table = abbreviations
                .into_iter()
                .fold(base, |table, (token, expansion)| table.with(token, expansion));
            let layout = parse(&layout_spec(&kind)?, &table)?;
            print_layout(&layout, &format)?;
        }

        Commands::Render {
            variant,
            data,
            kind,
            units,
            lattice,
            bins,
            bin_width,
            lines,
            spans,
            config,
            title,
            writer,
            output,
        } => {
            let config = match &config {
                Some(path) => PlotConfig::load(path)?,
                None => PlotConfig::default(),
            };
            let options = config
                .plot_options()
                .display_units(units.into_iter().collect());
            let mut figure = config.figure();
            figure.title = title;

            let table = read_table(&data)
                .with_context(|| format!("Failed to load {}", data.display()))?;
            let kind = kind.as_deref().map(layout_spec).transpose()?;

            let figure = match variant {
                Variant::Twiss => {
                    let options = match &lattice {
                        Some(path) => {
                            let elements = read_table(path)
                                .with_context(|| format!("Failed to load {}", path.display()))?;
                            options.lattice(Lattice::from_table(&elements)?)
                        }
                        None => options,
                    };
                    let kind = kind.unwrap_or_else(|| DEFAULT_TWISS_KIND.into());
                    let mut plot = TwissPlot::new(figure, Some(&table), kind, options)?;
                    annotate(&mut plot, &lines, &spans)?;
                    plot.into_backend()
                }
                Variant::Knl => {
                    let lattice = Lattice::from_table(&table)?;
                    let kind = kind.unwrap_or_else(|| DEFAULT_KNL_KIND.into());
                    let mut plot = KnlPlot::new(figure, Some(&lattice), kind, options)?;
                    annotate(&mut plot, &lines, &spans)?;
                    plot.into_backend()
                }
                Variant::Time => {
                    let kind = kind.unwrap_or_else(|| DEFAULT_TIME_KIND.into());
                    let mut plot = TimePlot::new(figure, Some(&table), kind, options)?;
                    annotate(&mut plot, &lines, &spans)?;
                    plot.into_backend()
                }
                Variant::TimeBin => {
                    let binning = match (bins, bin_width) {
                        (_, Some(width)) => Binning::Width(width),
                        (Some(count), None) => Binning::Count(count),
                        (None, None) => Binning::default(),
                    };
                    let kind = kind.unwrap_or_else(|| DEFAULT_TIME_BIN_KIND.into());
                    let mut plot = TimeBinPlot::new(figure, Some(&table), kind, binning, options)?;
                    annotate(&mut plot, &lines, &spans)?;
                    plot.into_backend()
                }
                Variant::PhaseSpace => {
                    if !lines.is_empty() || !spans.is_empty() {
                        bail!("Phase space plots take no --line or --span references");
                    }
                    let kind = kind.unwrap_or_else(|| DEFAULT_PHASE_SPACE_KIND.into());
                    PhaseSpacePlot::new(figure, Some(&table), kind, options)?.into_backend()
                }
            };

            let rendered = write_figure(&figure, &writer)?;
            match &output {
                Some(path) => {
                    std::fs::write(path, &rendered)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), writer = %writer, "wrote figure");
                }
                None => println!("{}", rendered),
            }
        }
    }

    Ok(())
}

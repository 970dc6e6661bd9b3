//! Geococo: tile a georeferenced raster and polygon layers into COCO
//! train/test datasets.
//!
//! The raster is cut into a grid of fixed-size pixel windows. Every polygon
//! feature is clipped to every tile; each non-empty intersection becomes a
//! COCO annotation in tile-local pixel coordinates. Each tile is sent to the
//! train or test partition by one random draw, and one grayscale JPEG chip is
//! written per tile and band.
//!
//! # Modules
//!
//! - [`grid`]: geotransform, tile windows and tile footprints
//! - [`source`]: raster and vector inputs
//! - [`annotate`]: clipping features into annotation drafts
//! - [`split`]: train/test assembly and ID allocation
//! - [`pipeline`]: the end-to-end tiling run
//! - [`ir`]: typed COCO records and their JSON codec
//! - [`validation`]: checks for produced output directories
//! - [`config`]: run configuration
//! - [`error`]: error types

pub mod annotate;
pub mod config;
pub mod error;
pub mod grid;
pub mod ir;
pub mod pipeline;
pub mod source;
pub mod split;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use annotate::{AreaUnits, SegmentationMode};
use config::TilerConfig;
use grid::EdgePolicy;
use pipeline::Tiler;
use source::io_geojson::read_geojson_layer;
use source::{FeatureCursor, ImageRaster};

pub use error::GeococoError;

/// The geococo CLI application.
#[derive(Parser)]
#[command(name = "geococo")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Tile a raster and its polygon layers into train/test COCO datasets.
    Tile(TileArgs),
    /// Check a tiling output directory for errors and warnings.
    Validate(ValidateArgs),
}

#[derive(clap::Args)]
struct TileArgs {
    /// Georeferenced raster: a GeoTIFF, or a PNG, JPEG or TIFF with a world file.
    #[arg(long)]
    raster: PathBuf,

    /// GeoJSON polygon layer. Repeat for several layers.
    #[arg(long = "vector", required = true)]
    vectors: Vec<PathBuf>,

    /// YAML config file; flags given here override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory [default: output].
    #[arg(long)]
    output: Option<PathBuf>,

    /// Tile width in pixels [default: 300].
    #[arg(long)]
    tile_width: Option<u32>,

    /// Tile height in pixels [default: 300].
    #[arg(long)]
    tile_height: Option<u32>,

    /// Share of tiles sent to the train partition [default: 0.8].
    #[arg(long)]
    train_percent: Option<f64>,

    /// 1-based band to export. Repeat for several; all bands if omitted.
    #[arg(long = "band")]
    bands: Vec<usize>,

    /// Seed for the train/test split.
    #[arg(long)]
    seed: Option<u64>,

    /// Geotransform "origin_x,pixel_w,row_rot,origin_y,col_rot,pixel_h",
    /// used instead of the raster's GeoTIFF tags or world file.
    #[arg(long, value_parser = parse_geotransform, allow_hyphen_values = true)]
    geotransform: Option<[f64; 6]>,

    /// How tiles at the right and bottom edges are sized.
    #[arg(long, value_enum)]
    edge_policy: Option<EdgePolicy>,

    /// How multi-ring intersections become segmentation lists.
    #[arg(long, value_enum)]
    segmentation: Option<SegmentationMode>,

    /// Units of the annotation area.
    #[arg(long, value_enum)]
    area_units: Option<AreaUnits>,

    /// Skip writing JPEG chips.
    #[arg(long)]
    no_chips: bool,

    /// Indent the annotation documents.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Output directory produced by `geococo tile`.
    dir: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Run the geococo CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), GeococoError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Tile(args)) => run_tile(args),
        Some(Commands::Validate(args)) => run_validate(args),
        None => {
            println!("geococo {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Tile georeferenced rasters and polygon layers into COCO datasets.");
            println!();
            println!("Run 'geococo --help' for usage information.");
            Ok(())
        }
    }
}

fn parse_geotransform(value: &str) -> Result<[f64; 6], String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in geotransform: {e}"))?;

    <[f64; 6]>::try_from(parts)
        .map_err(|parts| format!("expected 6 comma-separated values, got {}", parts.len()))
}

fn tile_config(args: &TileArgs) -> Result<TilerConfig, GeococoError> {
    let mut config = match &args.config {
        Some(path) => TilerConfig::load_yaml(path)?,
        None => TilerConfig::default(),
    };

    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(width) = args.tile_width {
        config.tile_width = width;
    }
    if let Some(height) = args.tile_height {
        config.tile_height = height;
    }
    if let Some(train_percent) = args.train_percent {
        config.train_percent = train_percent;
    }
    if !args.bands.is_empty() {
        config.bands = args.bands.clone();
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.geotransform.is_some() {
        config.geotransform = args.geotransform;
    }
    if let Some(policy) = args.edge_policy {
        config.edge_policy = policy;
    }
    if let Some(mode) = args.segmentation {
        config.segmentation = mode;
    }
    if let Some(units) = args.area_units {
        config.area_units = units;
    }
    if args.no_chips {
        config.write_chips = false;
    }
    if args.pretty {
        config.pretty = true;
    }

    config.validate()?;
    Ok(config)
}

fn run_tile(args: TileArgs) -> Result<(), GeococoError> {
    let config = tile_config(&args)?;

    let raster = ImageRaster::open(&args.raster, config.geo_transform()?)?;
    let mut layers = args
        .vectors
        .iter()
        .map(|path| read_geojson_layer(path))
        .collect::<Result<Vec<_>, _>>()?;
    for layer in &layers {
        info!("Loaded layer '{}' with {} feature(s)", layer.layer_name(), layer.len());
    }

    let summary = Tiler::new(config)?.run(&raster, &mut layers)?;
    print!("{}", summary);
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), GeococoError> {
    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_output_dir(&args.dir, &opts)?;

    match args.output {
        ReportFormat::Json => {
            let issues: Vec<serde_json::Value> = report
                .issues()
                .map(|(section, issue)| {
                    serde_json::json!({
                        "section": section,
                        "severity": issue.severity,
                        "code": issue.code,
                        "message": issue.message,
                        "context": issue.context.to_string(),
                    })
                })
                .collect();
            let value = serde_json::json!({
                "dir": report.dir,
                "bands": report.bands,
                "error_count": report.error_count(),
                "warning_count": report.warning_count(),
                "issues": issues,
            });
            println!("{:#}", value);
        }
        ReportFormat::Text => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(GeococoError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

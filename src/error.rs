use std::path::PathBuf;
use thiserror::Error;

use crate::validation::OutputReport;

/// The main error type for geococo operations.
///
/// Every variant is fatal for a tiling run. Per-feature problems found while
/// clipping are reported through [`ExtractError`](crate::annotate::ExtractError)
/// and never reach this type.
#[derive(Debug, Error)]
pub enum GeococoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open raster {path}: {source}")]
    RasterOpen {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to decode GeoTIFF {path}: {source}")]
    TiffDecode {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    #[error("Unsupported raster layout in {path}: {message}")]
    UnsupportedRaster { path: PathBuf, message: String },

    #[error("Raster {path} has no geotransform (no GeoTIFF tags or world file found and none given)")]
    MissingGeoTransform { path: PathBuf },

    #[error("Failed to parse world file {path}: {message}")]
    WorldFileParse { path: PathBuf, message: String },

    #[error("Degenerate geotransform {coefficients:?}: pixel size must be non-zero and finite")]
    DegenerateGeoTransform { coefficients: [f64; 6] },

    #[error("Band {band} is out of range (raster has {band_count} band(s))")]
    InvalidBand { band: usize, band_count: usize },

    #[error("Failed to write chip {path}: {source}")]
    ChipWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to parse GeoJSON from {path}: {source}")]
    GeoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid output directory {path}: {message}")]
    OutputLayoutInvalid { path: PathBuf, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: OutputReport,
    },
}

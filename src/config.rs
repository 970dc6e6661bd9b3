//! Run configuration for the tiler.
//!
//! A [`TilerConfig`] can be loaded from YAML; any key left out takes its
//! default. The CLI applies its flags on top of the loaded values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::annotate::{AreaUnits, ExtractOptions, SegmentationMode};
use crate::error::GeococoError;
use crate::grid::{EdgePolicy, GeoTransform};

pub const DEFAULT_TILE_SIZE: u32 = 300;
pub const DEFAULT_TRAIN_PERCENT: f64 = 0.8;

/// Settings for one tiling run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TilerConfig {
    /// Root of the output tree.
    pub output_dir: PathBuf,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Share of tiles routed to the train partition, in `[0, 1]`.
    pub train_percent: f64,
    /// 1-based bands to export. Empty means every band.
    pub bands: Vec<usize>,
    /// Seed for the train/test draw.
    pub seed: Option<u64>,
    /// Geotransform used instead of the raster's GeoTIFF tags or world file.
    pub geotransform: Option<[f64; 6]>,
    pub edge_policy: EdgePolicy,
    pub segmentation: SegmentationMode,
    pub area_units: AreaUnits,
    /// Write JPEG chips. When false only the annotation documents are
    /// produced.
    pub write_chips: bool,
    /// Indent the annotation documents.
    pub pretty: bool,
}

impl Default for TilerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            train_percent: DEFAULT_TRAIN_PERCENT,
            bands: Vec::new(),
            seed: None,
            geotransform: None,
            edge_policy: EdgePolicy::default(),
            segmentation: SegmentationMode::default(),
            area_units: AreaUnits::default(),
            write_chips: true,
            pretty: false,
        }
    }
}

impl TilerConfig {
    /// Reads a config from a YAML file and validates it.
    pub fn load_yaml(path: &Path) -> Result<Self, GeococoError> {
        let data = fs::read_to_string(path)?;
        let config: TilerConfig =
            serde_yaml::from_str(&data).map_err(|source| GeococoError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), GeococoError> {
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(invalid(format!(
                "tile size must be positive, got {}x{}",
                self.tile_width, self.tile_height
            )));
        }
        if !(0.0..=1.0).contains(&self.train_percent) {
            return Err(invalid(format!(
                "train_percent must be within [0, 1], got {}",
                self.train_percent
            )));
        }
        if let Some(band) = self.bands.iter().find(|band| **band == 0) {
            return Err(invalid(format!("bands are numbered from 1, got {}", band)));
        }
        if let Some(coefficients) = self.geotransform {
            GeoTransform::new(coefficients)?;
        }
        Ok(())
    }

    /// The explicit geotransform, if one is configured.
    pub fn geo_transform(&self) -> Result<Option<GeoTransform>, GeococoError> {
        self.geotransform.map(GeoTransform::new).transpose()
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            segmentation: self.segmentation,
            area_units: self.area_units,
        }
    }
}

fn invalid(message: String) -> GeococoError {
    GeococoError::InvalidConfig { message }
}

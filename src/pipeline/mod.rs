//! The tiling run: grid, clip, assemble, write.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::annotate::{extract_annotations, SkippedFeature};
use crate::config::TilerConfig;
use crate::error::GeococoError;
use crate::grid::{window_to_polygon, TileGrid};
use crate::ir::io_coco_json::write_coco_json;
use crate::source::{FeatureCursor, RasterSource};
use crate::split::{DatasetAssembler, Partition, SplitDatasets};

/// Per-partition counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PartitionCounts {
    pub images: usize,
    pub annotations: usize,
}

/// What a run produced.
#[derive(Clone, Debug, Default)]
pub struct TilingSummary {
    pub tiles: usize,
    pub bands: Vec<usize>,
    pub train: PartitionCounts,
    pub test: PartitionCounts,
    pub chips_written: usize,
    /// Windows that reached past the raster edge.
    pub out_of_bounds_windows: usize,
    pub skipped: Vec<SkippedFeature>,
    pub datasets: SplitDatasets,
    pub output_dir: PathBuf,
}

impl fmt::Display for TilingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Tiled {} tile(s) over {} band(s) into {}",
            self.tiles,
            self.bands.len(),
            self.output_dir.display()
        )?;
        writeln!(
            f,
            "  train: {} images, {} annotations",
            self.train.images, self.train.annotations
        )?;
        writeln!(
            f,
            "  test:  {} images, {} annotations",
            self.test.images, self.test.annotations
        )?;
        writeln!(f, "  chips written: {}", self.chips_written)?;
        if self.out_of_bounds_windows > 0 {
            writeln!(
                f,
                "  {} edge tile(s) extend past the raster",
                self.out_of_bounds_windows
            )?;
        }
        if !self.skipped.is_empty() {
            writeln!(f, "  skipped features: {}", self.skipped.len())?;
        }
        Ok(())
    }
}

/// Runs the tiling pipeline for one configuration.
#[derive(Clone, Debug)]
pub struct Tiler {
    config: TilerConfig,
}

impl Tiler {
    pub fn new(config: TilerConfig) -> Result<Self, GeococoError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TilerConfig {
        &self.config
    }

    /// Tiles `raster`, clips every feature of `layers` to each tile and
    /// writes chips plus the two annotation documents.
    pub fn run<R, C>(&self, raster: &R, layers: &mut [C]) -> Result<TilingSummary, GeococoError>
    where
        R: RasterSource + ?Sized,
        C: FeatureCursor,
    {
        let config = &self.config;
        let bands = resolve_bands(&config.bands, raster.band_count())?;
        let gt = raster.geo_transform();
        let grid = TileGrid::new(
            raster.size(),
            (config.tile_width, config.tile_height),
            config.edge_policy,
        )?;
        let options = config.extract_options();
        let mut assembler = DatasetAssembler::new(config.train_percent, config.seed)?;

        info!(
            "Tiling {}x{} raster into {} tile(s) ({}x{}, {:?}) across {} layer(s)",
            raster.size().0,
            raster.size().1,
            grid.len(),
            config.tile_width,
            config.tile_height,
            grid.policy(),
            layers.len()
        );

        let (raster_width, raster_height) = raster.size();
        let mut summary = TilingSummary {
            tiles: grid.len(),
            bands: bands.clone(),
            output_dir: config.output_dir.clone(),
            ..Default::default()
        };

        for window in grid.windows() {
            if window.exceeds(raster_width, raster_height) {
                summary.out_of_bounds_windows += 1;
                warn!(
                    "Tile at ({}, {}) extends past the {}x{} raster; chip will be padded",
                    window.x_off, window.y_off, raster_width, raster_height
                );
            }

            let slot = assembler.begin_tile(window.width, window.height);
            let tile = window_to_polygon(&window, &gt);
            let extraction = extract_annotations(&tile, layers, &gt, &options);

            debug!(
                "Tile {} at ({}, {}) -> {} {}: {} annotation(s), {} skipped",
                slot.image_id,
                window.x_off,
                window.y_off,
                slot.partition,
                slot.file_name,
                extraction.drafts.len(),
                extraction.skipped.len()
            );

            for draft in extraction.drafts {
                assembler.add_annotation(&slot, draft);
            }
            summary.skipped.extend(extraction.skipped);

            if config.write_chips {
                for &band in &bands {
                    let dir = band_dir(&config.output_dir, slot.partition, band);
                    fs::create_dir_all(&dir)?;
                    raster.extract_window(&window, band, &dir.join(&slot.file_name))?;
                    summary.chips_written += 1;
                }
            }
        }

        let datasets = assembler.finish();
        fs::create_dir_all(&config.output_dir)?;
        for partition in Partition::ALL {
            let path = config.output_dir.join(partition.annotations_file_name());
            write_coco_json(&path, datasets.get(partition), config.pretty)?;
        }

        summary.train = counts(&datasets, Partition::Train);
        summary.test = counts(&datasets, Partition::Test);
        summary.datasets = datasets;

        info!(
            "Wrote {} train and {} test image(s) with {} annotation(s); {} feature(s) skipped",
            summary.train.images,
            summary.test.images,
            summary.train.annotations + summary.test.annotations,
            summary.skipped.len()
        );

        Ok(summary)
    }
}

/// Directory holding one partition's chips for one band.
pub fn band_dir(output_dir: &Path, partition: Partition, band: usize) -> PathBuf {
    output_dir
        .join(partition.dir_name())
        .join(format!("Band{}", band))
}

/// Expands an empty band list to every band and range-checks the rest.
pub fn resolve_bands(requested: &[usize], band_count: usize) -> Result<Vec<usize>, GeococoError> {
    if requested.is_empty() {
        return Ok((1..=band_count).collect());
    }

    if let Some(&band) = requested
        .iter()
        .find(|&&band| band == 0 || band > band_count)
    {
        return Err(GeococoError::InvalidBand { band, band_count });
    }

    Ok(requested.to_vec())
}

fn counts(datasets: &SplitDatasets, partition: Partition) -> PartitionCounts {
    let dataset = datasets.get(partition);
    PartitionCounts {
        images: dataset.images.len(),
        annotations: dataset.annotations.len(),
    }
}

//! ESRI world file sidecars (`.tfw`, `.pgw`, `.jgw`, `.wld`, ...).
//!
//! A world file holds six lines `A D B E C F` where `C`/`F` locate the
//! *center* of the top-left pixel. GDAL geotransforms locate its corner, so
//! the origin is shifted by half a pixel on load.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::GeococoError;
use crate::grid::GeoTransform;

/// Candidate sidecar paths for `raster`, in lookup order:
/// `<stem>.<first+last letter of ext>w`, `<stem>.<ext>w`, `<stem>.wld`.
pub fn world_file_candidates(raster: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(ext) = raster.extension().and_then(|e| e.to_str()) {
        if let (Some(first), Some(last)) = (ext.chars().next(), ext.chars().last()) {
            candidates.push(raster.with_extension(format!("{}{}w", first, last)));
        }
        candidates.push(raster.with_extension(format!("{}w", ext)));
    }
    candidates.push(raster.with_extension("wld"));

    candidates.dedup();
    candidates
}

/// Looks for a world file next to `raster` and parses the first one found.
///
/// Returns `Ok(None)` when no candidate exists.
pub fn find_world_file(raster: &Path) -> Result<Option<GeoTransform>, GeococoError> {
    for candidate in world_file_candidates(raster) {
        if candidate.is_file() {
            return read_world_file(&candidate).map(Some);
        }
    }
    Ok(None)
}

/// Parses a world file into a geotransform.
pub fn read_world_file(path: &Path) -> Result<GeoTransform, GeococoError> {
    let text = fs::read_to_string(path)?;
    let coefficients = parse_world_file(&text).map_err(|message| {
        GeococoError::WorldFileParse {
            path: path.to_path_buf(),
            message,
        }
    })?;
    GeoTransform::new(coefficients)
}

/// Converts world file text into GDAL-ordered coefficients.
fn parse_world_file(text: &str) -> Result<[f64; 6], String> {
    let values: Vec<f64> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| {
            line.parse::<f64>()
                .map_err(|e| format!("line {}: '{}' is not a number ({})", i + 1, line, e))
        })
        .collect::<Result<_, _>>()?;

    let [a, d, b, e, c, f]: [f64; 6] = values
        .as_slice()
        .try_into()
        .map_err(|_| format!("expected 6 values, found {}", values.len()))?;

    Ok([c - a / 2.0 - b / 2.0, a, b, f - d / 2.0 - e / 2.0, d, e])
}

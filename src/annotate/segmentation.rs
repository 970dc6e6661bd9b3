//! Conversion of clipped geometry rings into COCO polygon lists.

use geo::{LineString, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::grid::GeoTransform;

/// How a clipped geometry's rings become segmentation lists.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentationMode {
    /// Concatenate every ring of every polygon (holes included) into one
    /// list. Multi-part results are not kept apart.
    #[default]
    Flatten,
    /// One list per polygon exterior ring; holes are dropped.
    PerPolygon,
}

/// Builds tile-local segmentation lists for `geometry`.
pub(crate) fn segmentation_lists(
    geometry: &MultiPolygon<f64>,
    gt: &GeoTransform,
    offset: (f64, f64),
    mode: SegmentationMode,
) -> Vec<Vec<f64>> {
    match mode {
        SegmentationMode::Flatten => {
            let mut flat = Vec::new();
            for polygon in geometry {
                push_ring(&mut flat, polygon.exterior(), gt, offset);
                for interior in polygon.interiors() {
                    push_ring(&mut flat, interior, gt, offset);
                }
            }
            vec![flat]
        }
        SegmentationMode::PerPolygon => geometry
            .iter()
            .map(|polygon| {
                let mut list = Vec::new();
                push_ring(&mut list, polygon.exterior(), gt, offset);
                list
            })
            .collect(),
    }
}

fn push_ring(out: &mut Vec<f64>, ring: &LineString<f64>, gt: &GeoTransform, offset: (f64, f64)) {
    out.reserve(ring.0.len() * 2);
    for coord in ring.coords() {
        let (col, row) = gt.map_to_pixel(coord.x, coord.y, offset);
        out.push(col);
        out.push(row);
    }
}

//! Clipping features against tiles and turning the results into annotations.
//!
//! [`extract_feature`] handles one tile/feature pair and reports degenerate
//! results as a typed [`ExtractError`]. [`extract_annotations`] runs it over
//! every feature of every layer, logs and collects the failures, and resets
//! each layer cursor after its pass.

mod segmentation;

pub use segmentation::SegmentationMode;

use geo::{Area, BooleanOps, Intersects, MultiPolygon};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{GeoTransform, TilePolygon};
use crate::ir::{BBoxXYXY, Coord, Pixel};
use crate::source::{Feature, FeatureCursor};
use segmentation::segmentation_lists;

/// Units reported in an annotation's `area`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum AreaUnits {
    /// Map units of the raster's spatial reference (e.g. square metres).
    #[default]
    Map,
    /// Raster pixels.
    Pixel,
}

/// Options for annotation extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    pub segmentation: SegmentationMode,
    pub area_units: AreaUnits,
}

/// An annotation before it has been given an ID and an owning image.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationDraft {
    pub area: f64,
    pub bbox: BBoxXYXY<Pixel>,
    pub segmentation: Vec<Vec<f64>>,
}

/// Why a tile/feature pair that intersects produced no annotation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The shapes touch but share no area (an edge or a corner).
    #[error("intersection is empty or degenerate")]
    EmptyIntersection,

    /// A derived pixel coordinate is NaN or infinite.
    #[error("intersection produced a non-finite pixel coordinate")]
    NonFiniteCoordinate,
}

/// A feature skipped during a tile's pass.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedFeature {
    pub layer: String,
    pub feature_index: usize,
    pub feature_id: Option<String>,
    pub reason: ExtractError,
}

/// Everything one tile's pass over the layers produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileExtraction {
    pub drafts: Vec<AnnotationDraft>,
    pub skipped: Vec<SkippedFeature>,
}

/// Clips `feature` to `tile` and converts the result to tile-local pixels.
///
/// Returns `Ok(None)` when the two are disjoint.
pub fn extract_feature(
    tile: &TilePolygon,
    feature: &Feature,
    gt: &GeoTransform,
    options: &ExtractOptions,
) -> Result<Option<AnnotationDraft>, ExtractError> {
    if !tile.as_polygon().intersects(&feature.geometry) {
        return Ok(None);
    }

    let clipped = tile.as_multi_polygon().intersection(&feature.geometry);
    draft_from_geometry(&clipped, gt, tile.window().offset(), options).map(Some)
}

/// Builds the bbox, segmentation and area for an intersection geometry.
pub fn draft_from_geometry(
    geometry: &MultiPolygon<f64>,
    gt: &GeoTransform,
    offset: (f64, f64),
    options: &ExtractOptions,
) -> Result<AnnotationDraft, ExtractError> {
    if geometry.0.is_empty() {
        return Err(ExtractError::EmptyIntersection);
    }

    // Exterior rings bound every hole, so they alone fix the pixel extent.
    let exterior_pixels = geometry
        .iter()
        .flat_map(|polygon| polygon.exterior().coords())
        .map(|c| Coord::<Pixel>::from(gt.map_to_pixel(c.x, c.y, offset)));
    let bbox = BBoxXYXY::from_corners(exterior_pixels).ok_or(ExtractError::EmptyIntersection)?;
    if !bbox.is_finite() {
        return Err(ExtractError::NonFiniteCoordinate);
    }

    let segmentation = segmentation_lists(geometry, gt, offset, options.segmentation);
    if segmentation.iter().all(|list| list.is_empty()) {
        return Err(ExtractError::EmptyIntersection);
    }
    if segmentation.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ExtractError::NonFiniteCoordinate);
    }

    let map_area = geometry.unsigned_area();
    let area = match options.area_units {
        AreaUnits::Map => map_area,
        AreaUnits::Pixel => map_area / gt.pixel_area(),
    };
    if area <= 0.0 {
        return Err(ExtractError::EmptyIntersection);
    }

    Ok(AnnotationDraft {
        area,
        bbox,
        segmentation,
    })
}

/// Clips every feature of every layer against `tile`.
///
/// Failures are logged with their layer and feature, collected in
/// [`TileExtraction::skipped`], and never abort the pass. Each layer is
/// reset once its features are exhausted.
pub fn extract_annotations<C: FeatureCursor>(
    tile: &TilePolygon,
    layers: &mut [C],
    gt: &GeoTransform,
    options: &ExtractOptions,
) -> TileExtraction {
    let mut extraction = TileExtraction::default();
    let window = tile.window();

    for layer in layers.iter_mut() {
        let layer_name = layer.layer_name().to_string();

        while let Some(feature) = layer.next_feature() {
            match extract_feature(tile, feature, gt, options) {
                Ok(Some(draft)) => extraction.drafts.push(draft),
                Ok(None) => {}
                Err(reason) => {
                    warn!(
                        "Skipping feature {} of layer '{}' in tile ({}, {}): {}",
                        feature, layer_name, window.x_off, window.y_off, reason
                    );
                    extraction.skipped.push(SkippedFeature {
                        layer: layer_name.clone(),
                        feature_index: feature.index,
                        feature_id: feature.id.clone(),
                        reason,
                    });
                }
            }
        }

        layer.reset();
    }

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{window_to_polygon, PixelWindow};
    use crate::source::VectorLayer;
    use geo::{polygon, Polygon};

    fn unit_gt() -> GeoTransform {
        GeoTransform::north_up(0.0, 0.0, 1.0, -1.0).unwrap()
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
    }

    fn assert_bbox(bbox: &BBoxXYXY<Pixel>, expected: (f64, f64, f64, f64)) {
        assert_bbox_near(bbox, expected, 1e-6);
    }

    fn assert_bbox_near(bbox: &BBoxXYXY<Pixel>, expected: (f64, f64, f64, f64), tolerance: f64) {
        let (x, y, w, h) = bbox.to_xywh();
        for (actual, wanted) in [(x, expected.0), (y, expected.1), (w, expected.2), (h, expected.3)] {
            assert!((actual - wanted).abs() < tolerance, "{:?} != {:?}", bbox, expected);
        }
    }

    #[test]
    fn test_containing_feature_covers_whole_tile() {
        let gt = unit_gt();
        let tile = window_to_polygon(&PixelWindow::new(300, 0, 300, 300), &gt);
        let feature = Feature::new(0, rect(-100.0, 100.0, 1000.0, -1000.0));

        let draft = extract_feature(&tile, &feature, &gt, &ExtractOptions::default())
            .unwrap()
            .expect("intersects");

        assert_bbox(&draft.bbox, (0.0, 0.0, 300.0, 300.0));
        assert!((draft.area - tile.area()).abs() < 1e-6);
        assert_eq!(draft.segmentation.len(), 1);
        assert!(draft.segmentation[0]
            .iter()
            .all(|v| (-1e-6..=300.0 + 1e-6).contains(v)));
    }

    #[test]
    fn test_partial_overlap_is_tile_local() {
        let gt = unit_gt();
        let tile = window_to_polygon(&PixelWindow::new(300, 0, 300, 300), &gt);
        // Pixel columns 250..350, rows 10..60.
        let feature = Feature::new(0, rect(250.0, -10.0, 350.0, -60.0));

        let draft = extract_feature(&tile, &feature, &gt, &ExtractOptions::default())
            .unwrap()
            .expect("intersects");

        assert_bbox(&draft.bbox, (0.0, 10.0, 50.0, 50.0));
        assert!((draft.area - 2500.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_feature_yields_nothing() {
        let gt = unit_gt();
        let tile = window_to_polygon(&PixelWindow::new(0, 0, 300, 300), &gt);
        let feature = Feature::new(0, rect(5000.0, -5000.0, 5010.0, -5010.0));

        let result = extract_feature(&tile, &feature, &gt, &ExtractOptions::default());
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn test_touching_feature_is_skipped_as_empty() {
        let gt = unit_gt();
        let tile = window_to_polygon(&PixelWindow::new(0, 0, 300, 300), &gt);
        // Shares only the tile's right edge.
        let feature = Feature::new(0, rect(300.0, 0.0, 400.0, -300.0));

        let result = extract_feature(&tile, &feature, &gt, &ExtractOptions::default());
        assert_eq!(result, Err(ExtractError::EmptyIntersection));
    }

    #[test]
    fn test_pixel_area_units() {
        let gt = GeoTransform::north_up(0.0, 0.0, 10.0, -10.0).unwrap();
        let tile = window_to_polygon(&PixelWindow::new(0, 0, 30, 30), &gt);
        let feature = Feature::new(0, rect(0.0, 0.0, 100.0, -100.0));

        let options = ExtractOptions {
            area_units: AreaUnits::Pixel,
            ..Default::default()
        };
        let draft = extract_feature(&tile, &feature, &gt, &options)
            .unwrap()
            .unwrap();
        assert!((draft.area - 100.0).abs() < 1e-6);
        assert_bbox(&draft.bbox, (0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_rotated_transform_keeps_bbox_inside_tile() {
        let (sin, cos) = 30f64.to_radians().sin_cos();
        let gt = GeoTransform::new([0.0, cos, sin, 0.0, sin, -cos]).unwrap();
        let tile = window_to_polygon(&PixelWindow::new(300, 300, 300, 300), &gt);
        let feature = Feature::new(0, rect(-2000.0, 2000.0, 2000.0, -2000.0));

        let draft = extract_feature(&tile, &feature, &gt, &ExtractOptions::default())
            .unwrap()
            .expect("intersects");

        assert!(draft.bbox.is_within(300.0, 300.0, 1e-3), "{:?}", draft.bbox);
        assert_bbox_near(&draft.bbox, (0.0, 0.0, 300.0, 300.0), 1e-3);
        assert!((draft.area - 90_000.0).abs() < 1e-3);

        // The bbox is exactly the extent of the segmentation.
        let ring = &draft.segmentation[0];
        let xs = ring.iter().step_by(2).copied();
        let ys = ring.iter().skip(1).step_by(2).copied();
        let (xmin, xmax) = xs.fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let (ymin, ymax) = ys.fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        assert!((draft.bbox.xmin() - xmin).abs() < 1e-9);
        assert!((draft.bbox.xmax() - xmax).abs() < 1e-9);
        assert!((draft.bbox.ymin() - ymin).abs() < 1e-9);
        assert!((draft.bbox.ymax() - ymax).abs() < 1e-9);
    }

    #[test]
    fn test_rotated_partial_overlap_is_tight() {
        let (sin, cos) = 30f64.to_radians().sin_cos();
        let gt = GeoTransform::new([0.0, cos, sin, 0.0, sin, -cos]).unwrap();
        let tile = window_to_polygon(&PixelWindow::new(0, 0, 300, 300), &gt);
        // Pixel square (100, 100)..(150, 150), expressed in map space.
        let corners = [(100.0, 100.0), (150.0, 100.0), (150.0, 150.0), (100.0, 150.0)]
            .map(|(col, row)| gt.pixel_to_map(col, row));
        let square = Polygon::new(geo::LineString::from(corners.to_vec()), Vec::new());
        let feature = Feature::new(0, square);

        let draft = extract_feature(&tile, &feature, &gt, &ExtractOptions::default())
            .unwrap()
            .unwrap();
        assert_bbox_near(&draft.bbox, (100.0, 100.0, 50.0, 50.0), 1e-6);
    }

    #[test]
    fn test_multi_part_intersection() {
        let gt = unit_gt();
        let tile = window_to_polygon(&PixelWindow::new(0, 0, 100, 100), &gt);
        let feature = Feature::new(
            0,
            MultiPolygon::new(vec![
                rect(10.0, -10.0, 20.0, -20.0),
                rect(60.0, -60.0, 80.0, -90.0),
            ]),
        );

        let flat = extract_feature(&tile, &feature, &gt, &ExtractOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(flat.segmentation.len(), 1);
        assert_bbox(&flat.bbox, (10.0, 10.0, 70.0, 80.0));
        assert!((flat.area - 700.0).abs() < 1e-6);

        let options = ExtractOptions {
            segmentation: SegmentationMode::PerPolygon,
            ..Default::default()
        };
        let split = extract_feature(&tile, &feature, &gt, &options)
            .unwrap()
            .unwrap();
        assert_eq!(split.segmentation.len(), 2);
    }

    #[test]
    fn test_empty_geometry_is_rejected() {
        let result = draft_from_geometry(
            &MultiPolygon::new(Vec::new()),
            &unit_gt(),
            (0.0, 0.0),
            &ExtractOptions::default(),
        );
        assert_eq!(result, Err(ExtractError::EmptyIntersection));
    }

    #[test]
    fn test_extract_annotations_resets_layers_and_records_skips() {
        let gt = unit_gt();
        let mut layers = vec![
            VectorLayer::new(
                "inside",
                vec![
                    Feature::new(0, rect(10.0, -10.0, 20.0, -20.0)),
                    Feature::new(1, rect(900.0, -900.0, 910.0, -910.0)),
                ],
            ),
            VectorLayer::new(
                "edges",
                vec![Feature::new(0, rect(100.0, 0.0, 200.0, -100.0)).with_id("touch")],
            ),
        ];
        let tile = window_to_polygon(&PixelWindow::new(0, 0, 100, 100), &gt);

        let first = extract_annotations(&tile, &mut layers, &gt, &ExtractOptions::default());
        assert_eq!(first.drafts.len(), 1);
        assert_eq!(first.skipped.len(), 1);
        assert_eq!(first.skipped[0].layer, "edges");
        assert_eq!(first.skipped[0].feature_id.as_deref(), Some("touch"));

        // A second pass sees the same features again.
        let second = extract_annotations(&tile, &mut layers, &gt, &ExtractOptions::default());
        assert_eq!(first, second);
    }
}

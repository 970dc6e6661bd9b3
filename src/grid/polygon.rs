//! Map-space polygons for pixel windows.

use geo::{Area, LineString, MultiPolygon, Polygon};

use super::transform::GeoTransform;
use super::window::PixelWindow;
use crate::ir::{Coord, Map};

/// The map-space footprint of one tile.
///
/// The ring is closed: five points, the last repeating the first. Under a
/// north-up transform it is a rectangle, otherwise a parallelogram.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePolygon {
    window: PixelWindow,
    ring: [Coord<Map>; 5],
    footprint: MultiPolygon<f64>,
}

impl TilePolygon {
    /// The pixel window this polygon was built from.
    #[inline]
    pub fn window(&self) -> PixelWindow {
        self.window
    }

    /// The closed corner ring in map coordinates.
    #[inline]
    pub fn ring(&self) -> &[Coord<Map>; 5] {
        &self.ring
    }

    /// The footprint as a `geo` polygon.
    #[inline]
    pub fn as_polygon(&self) -> &Polygon<f64> {
        &self.footprint.0[0]
    }

    /// The footprint as a single-member multi-polygon, the operand shape
    /// used for clipping.
    #[inline]
    pub fn as_multi_polygon(&self) -> &MultiPolygon<f64> {
        &self.footprint
    }

    /// Map-space area of the footprint.
    pub fn area(&self) -> f64 {
        self.footprint.unsigned_area()
    }
}

/// Builds the map-space polygon for `window`.
///
/// ```text
/// (a,b)-------(a+w,b)
///   |            |
/// (a,b+h)-----(a+w,b+h)
/// ```
pub fn window_to_polygon(window: &PixelWindow, gt: &GeoTransform) -> TilePolygon {
    let (a, b) = window.offset();
    let (w, h) = (window.width as f64, window.height as f64);

    let corners = [(a, b), (a + w, b), (a + w, b + h), (a, b + h), (a, b)];
    let ring = corners.map(|(x, y)| Coord::<Map>::from(gt.pixel_to_map(x, y)));

    let exterior: LineString<f64> = ring.iter().map(|c| (c.x, c.y)).collect::<Vec<_>>().into();

    TilePolygon {
        window: *window,
        ring,
        footprint: MultiPolygon::new(vec![Polygon::new(exterior, Vec::new())]),
    }
}

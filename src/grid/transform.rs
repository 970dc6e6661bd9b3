//! Affine conversions between pixel offsets and map coordinates.

use crate::error::GeococoError;

/// A six-coefficient affine geotransform in GDAL order:
/// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
///
/// ```text
/// X = gt[0] + col * gt[1] + row * gt[2]
/// Y = gt[3] + col * gt[4] + row * gt[5]
/// ```
///
/// Construction rejects singular transforms, so both conversion directions
/// are infallible once a `GeoTransform` exists.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoTransform {
    coefficients: [f64; 6],
    // Inverse of the 2x2 linear part, row-major.
    inverse: [f64; 4],
}

impl GeoTransform {
    /// Creates a geotransform, failing when the pixel size is zero (or the
    /// linear part is otherwise singular) or any coefficient is not finite.
    pub fn new(coefficients: [f64; 6]) -> Result<Self, GeococoError> {
        let [_, a, b, _, d, e] = coefficients;
        let det = a * e - b * d;

        if coefficients.iter().any(|c| !c.is_finite()) || det == 0.0 || !det.is_finite() {
            return Err(GeococoError::DegenerateGeoTransform { coefficients });
        }

        Ok(Self {
            coefficients,
            inverse: [e / det, -b / det, -d / det, a / det],
        })
    }

    /// Creates a north-up transform from an origin and a pixel size.
    pub fn north_up(
        origin_x: f64,
        origin_y: f64,
        pixel_width: f64,
        pixel_height: f64,
    ) -> Result<Self, GeococoError> {
        Self::new([origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height])
    }

    /// Returns the raw coefficients.
    #[inline]
    pub fn coefficients(&self) -> [f64; 6] {
        self.coefficients
    }

    /// Returns true if both rotation terms are zero.
    #[inline]
    pub fn is_north_up(&self) -> bool {
        self.coefficients[2] == 0.0 && self.coefficients[4] == 0.0
    }

    /// Map-space area covered by a single pixel.
    #[inline]
    pub fn pixel_area(&self) -> f64 {
        let [_, a, b, _, d, e] = self.coefficients;
        (a * e - b * d).abs()
    }

    /// Converts a pixel offset to map coordinates.
    #[inline]
    pub fn pixel_to_map(&self, x: f64, y: f64) -> (f64, f64) {
        let [x0, a, b, y0, d, e] = self.coefficients;
        (x0 + x * a + y * b, y0 + x * d + y * e)
    }

    /// Converts map coordinates to a pixel offset, then subtracts `offset`.
    ///
    /// Passing the tile's pixel offset yields tile-local coordinates. No
    /// rounding is applied.
    #[inline]
    pub fn map_to_pixel(&self, x: f64, y: f64, offset: (f64, f64)) -> (f64, f64) {
        let [x0, a, _, y0, _, e] = self.coefficients;
        let (dx, dy) = (x - x0, y - y0);

        let (col, row) = if self.is_north_up() {
            (dx / a, dy / e)
        } else {
            let [i00, i01, i10, i11] = self.inverse;
            (i00 * dx + i01 * dy, i10 * dx + i11 * dy)
        };

        (col - offset.0, row - offset.1)
    }
}

impl TryFrom<[f64; 6]> for GeoTransform {
    type Error = GeococoError;

    fn try_from(coefficients: [f64; 6]) -> Result<Self, Self::Error> {
        Self::new(coefficients)
    }
}

//! Raster grid geometry: geotransforms, tile windows, and tile footprints.
//!
//! - [`GeoTransform`] converts between pixel offsets and map coordinates.
//! - [`TileGrid`] enumerates the fixed-size [`PixelWindow`]s covering a
//!   raster.
//! - [`window_to_polygon`] turns a window into its map-space
//!   [`TilePolygon`].

mod polygon;
mod transform;
mod window;

pub use polygon::{window_to_polygon, TilePolygon};
pub use transform::GeoTransform;
pub use window::{EdgePolicy, PixelWindow, TileGrid, TileWindows};

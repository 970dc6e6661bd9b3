//! Input collaborators: rasters and polygon layers.
//!
//! The tiler only sees the [`RasterSource`] and [`FeatureCursor`] traits.
//! [`ImageRaster`] and [`VectorLayer`] are the bundled implementations,
//! loaded from GeoTIFFs or world-file georeferenced images and from GeoJSON.

pub mod geotiff;
pub mod io_geojson;
mod raster;
mod vector;
pub mod world_file;

pub use raster::{ImageRaster, RasterSource};
pub use vector::{Feature, FeatureCursor, VectorLayer};

//! Intermediate representation (IR) for tiled datasets.
//!
//! This module defines the typed records a tiling run produces, and the
//! COCO JSON codec that writes them out.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: newtype IDs and coordinate-space markers keep map
//!    coordinates, tile-local pixels and the three kinds of ID apart at
//!    compile time.
//!
//! 2. **Canonical Format**: boxes are XYXY in tile-local pixel space; the
//!    COCO writer converts to XYWH.
//!
//! 3. **Permissive Construction**: records read back from disk may hold
//!    "invalid" values (misordered boxes, gaps in IDs) so that validation
//!    can report them instead of the reader failing.
//!
//! # Example
//!
//! ```
//! use geococo::ir::{Annotation, BBoxXYXY, Dataset, Image, ImageId, Pixel};
//!
//! let mut dataset = Dataset::with_about("Train Dataset");
//! dataset.images.push(Image::chip(ImageId(1), 300, 300));
//! dataset.annotations.push(Annotation::new(
//!     1u64,
//!     1u64,
//!     900.0,
//!     BBoxXYXY::<Pixel>::from_xyxy(0.0, 0.0, 30.0, 30.0),
//!     vec![vec![0.0, 0.0, 30.0, 0.0, 30.0, 30.0, 0.0, 30.0, 0.0, 0.0]],
//! ));
//! ```

mod bbox;
mod coord;
mod ids;
pub mod io_coco_json;
mod model;
mod space;

// Re-export core types for convenient access
pub use bbox::BBoxXYXY;
pub use coord::Coord;
pub use ids::{AnnotationId, CategoryId, ImageId};
pub use model::{
    Annotation, Category, Dataset, DatasetInfo, Image, OBJECT_CATEGORY_ID, OBJECT_CATEGORY_NAME,
};
pub use space::{Map, Pixel};

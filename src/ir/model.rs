//! Typed records for a tiled COCO-style dataset.
//!
//! One [`Dataset`] exists per partition. Records are explicit structs so the
//! writer in [`io_coco_json`](super::io_coco_json) is the only place that
//! knows the on-disk key names.

use super::bbox::BBoxXYXY;
use super::ids::{AnnotationId, CategoryId, ImageId};
use super::space::Pixel;

/// Id of the single category every annotation belongs to.
pub const OBJECT_CATEGORY_ID: u64 = 100;

/// Name (and supercategory) of the single category.
pub const OBJECT_CATEGORY_NAME: &str = "Object of Interest";

/// A complete dataset for one partition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    /// Metadata block.
    pub info: DatasetInfo,

    /// Category definitions. Tiling datasets carry exactly one.
    pub categories: Vec<Category>,

    /// One image per tile, in tile order.
    pub images: Vec<Image>,

    /// Annotations in the order they were produced.
    pub annotations: Vec<Annotation>,
}

impl Dataset {
    /// Creates an empty dataset with the given `about` text and the fixed
    /// object category.
    pub fn with_about(about: impl Into<String>) -> Self {
        Self {
            info: DatasetInfo::new(about),
            categories: vec![Category::object_of_interest()],
            images: Vec::new(),
            annotations: Vec::new(),
        }
    }
}

/// Metadata about the dataset.
///
/// Every field is always written, empty strings included.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetInfo {
    pub about: String,
    pub contributor: String,
    pub date_created: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub year: u32,
}

impl DatasetInfo {
    /// Creates an info block with the given `about` text and defaults for
    /// every other field.
    pub fn new(about: impl Into<String>) -> Self {
        Self {
            about: about.into(),
            ..Default::default()
        }
    }
}

impl Default for DatasetInfo {
    fn default() -> Self {
        Self {
            about: String::new(),
            contributor: String::new(),
            date_created: String::new(),
            description: String::new(),
            url: String::new(),
            version: String::new(),
            year: 2018,
        }
    }
}

/// An image (tile chip) in the dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    /// Partition-scoped identifier.
    pub id: ImageId,

    /// Chip filename, relative to each band directory.
    pub file_name: String,

    /// Width of the chip in pixels.
    pub width: u32,

    /// Height of the chip in pixels.
    pub height: u32,
}

impl Image {
    /// Creates a new image with the given properties.
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
        }
    }

    /// Creates the image record for a tile chip, named `{id}.jpg`.
    pub fn chip(id: ImageId, width: u32, height: u32) -> Self {
        Self::new(id, format!("{}.jpg", id), width, height)
    }
}

/// A category (class label) in the dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub supercategory: String,
}

impl Category {
    /// Creates a new category.
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        supercategory: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: supercategory.into(),
        }
    }

    /// The fixed category used for every tiled annotation.
    pub fn object_of_interest() -> Self {
        Self::new(
            OBJECT_CATEGORY_ID,
            OBJECT_CATEGORY_NAME,
            OBJECT_CATEGORY_NAME,
        )
    }
}

/// An annotation: one clipped feature inside one tile.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// Partition-scoped identifier.
    pub id: AnnotationId,

    /// ID of the tile image this annotation belongs to.
    pub image_id: ImageId,

    /// ID of the category (class) for this annotation.
    pub category_id: CategoryId,

    /// Area of the clipped geometry (map units unless configured otherwise).
    pub area: f64,

    /// Bounding box in tile-local pixel coordinates (XYXY format).
    pub bbox: BBoxXYXY<Pixel>,

    /// Tile-local polygons as flat `[x1, y1, x2, y2, ...]` lists.
    pub segmentation: Vec<Vec<f64>>,

    /// COCO crowd flag; tiled annotations are never crowds.
    pub iscrowd: u8,
}

impl Annotation {
    /// Creates a new annotation in the fixed object category.
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        area: f64,
        bbox: BBoxXYXY<Pixel>,
        segmentation: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: CategoryId::new(OBJECT_CATEGORY_ID),
            area,
            bbox,
            segmentation,
            iscrowd: 0,
        }
    }
}

//! COCO JSON reader and writer for tiled datasets.
//!
//! # Schema
//!
//! Each partition document is an object with the keys `info`, `categories`,
//! `images` and `annotations`. Two details differ from stock COCO and are
//! kept for compatibility with existing consumers of tiled output:
//!
//! - image entries name their chip with `filename` (not `file_name`);
//! - the `info` block carries an `about` field and always writes every key.
//!
//! Bounding boxes use `[x, y, width, height]` with `(x, y)` the top-left
//! corner in tile-local pixels, while the IR holds XYXY.
//!
//! # Deterministic Output
//!
//! The writer sorts images and annotations by ID, which for tiler output
//! is the production order.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::{Annotation, Category, Dataset, DatasetInfo, Image};
use super::{AnnotationId, BBoxXYXY, CategoryId, ImageId, Pixel};
use crate::error::GeococoError;

// ============================================================================
// COCO Schema Types (internal to this module)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct CocoDataset {
    #[serde(default)]
    info: CocoInfo,

    categories: Vec<CocoCategory>,

    images: Vec<CocoImage>,

    annotations: Vec<CocoAnnotation>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CocoInfo {
    #[serde(default)]
    about: String,
    #[serde(default)]
    contributor: String,
    #[serde(default)]
    date_created: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    year: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,
    #[serde(default)]
    supercategory: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoImage {
    id: u64,
    filename: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u64,
    area: f64,
    #[serde(default)]
    iscrowd: u8,

    /// COCO bbox format: [x, y, width, height] with (x,y) as top-left corner
    bbox: [f64; 4],

    /// Polygon segmentation, one flat coordinate list per polygon.
    #[serde(default)]
    segmentation: Vec<Vec<f64>>,
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a partition dataset from a COCO JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_coco_json(path: &Path) -> Result<Dataset, GeococoError> {
    let file = File::open(path).map_err(GeococoError::Io)?;
    let reader = BufReader::new(file);

    let coco: CocoDataset =
        serde_json::from_reader(reader).map_err(|source| GeococoError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(coco_to_ir(coco))
}

/// Writes a partition dataset to a COCO JSON file.
///
/// `pretty` selects indented output; the default tiler output is compact.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_coco_json(path: &Path, dataset: &Dataset, pretty: bool) -> Result<(), GeococoError> {
    let file = File::create(path).map_err(GeococoError::Io)?;
    let mut writer = BufWriter::new(file);

    let coco = ir_to_coco(dataset);

    let result = if pretty {
        serde_json::to_writer_pretty(&mut writer, &coco)
    } else {
        serde_json::to_writer(&mut writer, &coco)
    };

    result.map_err(|source| GeococoError::CocoJsonWrite {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(GeococoError::Io)
}

/// Reads a partition dataset from a COCO JSON string.
///
/// Useful for testing without file I/O.
pub fn from_coco_str(json: &str) -> Result<Dataset, serde_json::Error> {
    let coco: CocoDataset = serde_json::from_str(json)?;
    Ok(coco_to_ir(coco))
}

/// Writes a partition dataset to a compact COCO JSON string.
///
/// Useful for testing without file I/O.
pub fn to_coco_string(dataset: &Dataset) -> Result<String, serde_json::Error> {
    let coco = ir_to_coco(dataset);
    serde_json::to_string(&coco)
}

// ============================================================================
// Conversion: COCO -> IR
// ============================================================================

fn coco_to_ir(coco: CocoDataset) -> Dataset {
    let info = DatasetInfo {
        about: coco.info.about,
        contributor: coco.info.contributor,
        date_created: coco.info.date_created,
        description: coco.info.description,
        url: coco.info.url,
        version: coco.info.version,
        year: coco.info.year,
    };

    let categories = coco
        .categories
        .into_iter()
        .map(|cat| Category::new(cat.id, cat.name, cat.supercategory))
        .collect();

    let images = coco
        .images
        .into_iter()
        .map(|img| Image::new(img.id, img.filename, img.width, img.height))
        .collect();

    let annotations = coco
        .annotations
        .into_iter()
        .map(|ann| {
            let [x, y, w, h] = ann.bbox;
            Annotation {
                id: AnnotationId::new(ann.id),
                image_id: ImageId::new(ann.image_id),
                category_id: CategoryId::new(ann.category_id),
                area: ann.area,
                bbox: BBoxXYXY::<Pixel>::from_xywh(x, y, w, h),
                segmentation: ann.segmentation,
                iscrowd: ann.iscrowd,
            }
        })
        .collect();

    Dataset {
        info,
        categories,
        images,
        annotations,
    }
}

// ============================================================================
// Conversion: IR -> COCO
// ============================================================================

fn ir_to_coco(dataset: &Dataset) -> CocoDataset {
    let info = CocoInfo {
        about: dataset.info.about.clone(),
        contributor: dataset.info.contributor.clone(),
        date_created: dataset.info.date_created.clone(),
        description: dataset.info.description.clone(),
        url: dataset.info.url.clone(),
        version: dataset.info.version.clone(),
        year: dataset.info.year,
    };

    let categories = dataset
        .categories
        .iter()
        .map(|cat| CocoCategory {
            id: cat.id.as_u64(),
            name: cat.name.clone(),
            supercategory: cat.supercategory.clone(),
        })
        .collect();

    let mut images: Vec<CocoImage> = dataset
        .images
        .iter()
        .map(|img| CocoImage {
            id: img.id.as_u64(),
            filename: img.file_name.clone(),
            width: img.width,
            height: img.height,
        })
        .collect();
    images.sort_by_key(|i| i.id);

    let mut annotations: Vec<CocoAnnotation> = dataset
        .annotations
        .iter()
        .map(|ann| {
            let (x, y, w, h) = ann.bbox.to_xywh();
            CocoAnnotation {
                id: ann.id.as_u64(),
                image_id: ann.image_id.as_u64(),
                category_id: ann.category_id.as_u64(),
                area: ann.area,
                iscrowd: ann.iscrowd,
                bbox: [x, y, w, h],
                segmentation: ann.segmentation.clone(),
            }
        })
        .collect();
    annotations.sort_by_key(|a| a.id);

    CocoDataset {
        info,
        categories,
        images,
        annotations,
    }
}

// ============================================================================
// Tests
// ============================================================================

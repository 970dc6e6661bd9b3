//! Validation of tiling output.
//!
//! [`validate_dataset`] checks one annotation document on its own: unique
//! and contiguous IDs, valid references, finite and in-tile boxes, and
//! well-formed segmentation lists. [`validate_output_dir`] loads both
//! documents from an output directory and also checks that every image has
//! a chip of the right size in every band directory.

mod report;

pub use report::{
    IssueCode, IssueContext, OutputReport, Severity, ValidationIssue, ValidationReport,
};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::GeococoError;
use crate::ir::io_coco_json::read_coco_json;
use crate::ir::{AnnotationId, CategoryId, Dataset, ImageId};
use crate::split::Partition;

/// Slack allowed on tile bounds, in pixels.
const BOUNDS_TOLERANCE: f64 = 0.5;

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
}

/// Validates one partition's dataset.
pub fn validate_dataset(dataset: &Dataset, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    let image_ids: HashSet<ImageId> = dataset.images.iter().map(|i| i.id).collect();
    let category_ids: HashSet<CategoryId> = dataset.categories.iter().map(|c| c.id).collect();

    validate_images(dataset, &mut report);
    validate_categories(dataset, &mut report);
    validate_annotations(dataset, &image_ids, &category_ids, &mut report);

    report
}

fn validate_images(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();

    for (idx, image) in dataset.images.iter().enumerate() {
        let id = image.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "Duplicate image ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_ids.insert(image.id, idx);
        }

        if image.width == 0 || image.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!(
                    "Invalid dimensions {}x{} (must be positive)",
                    image.width, image.height
                ),
                IssueContext::Image { id },
            ));
        }

        if image.file_name.is_empty() {
            report.add(ValidationIssue::error(
                IssueCode::EmptyFileName,
                "Empty filename",
                IssueContext::Image { id },
            ));
        }
    }

    if let Some(position) = first_gap(dataset.images.iter().map(|i| i.id.as_u64())) {
        report.add(ValidationIssue::warning(
            IssueCode::NonContiguousImageIds,
            format!(
                "Image IDs are not 1..={} in order (first break at index {})",
                dataset.images.len(),
                position
            ),
            IssueContext::Dataset,
        ));
    }
}

fn validate_categories(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashSet<CategoryId> = HashSet::new();

    for category in &dataset.categories {
        if !seen_ids.insert(category.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!("Duplicate category ID {}", category.id),
                IssueContext::Category {
                    id: category.id.as_u64(),
                },
            ));
        }
    }
}

fn validate_annotations(
    dataset: &Dataset,
    image_ids: &HashSet<ImageId>,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let mut seen_ids: HashMap<AnnotationId, usize> = HashMap::new();

    let image_dims: HashMap<ImageId, (u32, u32)> = dataset
        .images
        .iter()
        .map(|i| (i.id, (i.width, i.height)))
        .collect();

    for (idx, annotation) in dataset.annotations.iter().enumerate() {
        let id = annotation.id.as_u64();
        let context = || IssueContext::Annotation { id };

        if let Some(first_idx) = seen_ids.get(&annotation.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!(
                    "Duplicate annotation ID {} (first seen at index {})",
                    id, first_idx
                ),
                context(),
            ));
        } else {
            seen_ids.insert(annotation.id, idx);
        }

        if !image_ids.contains(&annotation.image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!("References non-existent image {}", annotation.image_id),
                context(),
            ));
        }

        if !category_ids.contains(&annotation.category_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingCategoryRef,
                format!(
                    "References non-existent category {}",
                    annotation.category_id
                ),
                context(),
            ));
        }

        if !annotation.area.is_finite() || annotation.area <= 0.0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidArea,
                format!("Area must be positive and finite, got {}", annotation.area),
                context(),
            ));
        }

        validate_segmentation(&annotation.segmentation, id, report);

        let bbox = &annotation.bbox;
        if !bbox.is_finite() {
            report.add(ValidationIssue::error(
                IssueCode::BBoxNotFinite,
                format!(
                    "Non-finite coordinates ({}, {}, {}, {})",
                    bbox.xmin(),
                    bbox.ymin(),
                    bbox.xmax(),
                    bbox.ymax()
                ),
                context(),
            ));
            continue;
        }

        if !bbox.is_ordered() {
            report.add(ValidationIssue::error(
                IssueCode::InvalidBBoxOrdering,
                format!(
                    "Invalid ordering: min ({}, {}) should be <= max ({}, {})",
                    bbox.xmin(),
                    bbox.ymin(),
                    bbox.xmax(),
                    bbox.ymax()
                ),
                context(),
            ));
        }

        if let Some((width, height)) = image_dims.get(&annotation.image_id) {
            if !bbox.is_within(*width as f64, *height as f64, BOUNDS_TOLERANCE) {
                report.add(ValidationIssue::warning(
                    IssueCode::BBoxOutOfBounds,
                    format!(
                        "Bounding box ({:.1}, {:.1}, {:.1}, {:.1}) extends outside tile bounds (0, 0, {}, {})",
                        bbox.xmin(), bbox.ymin(), bbox.xmax(), bbox.ymax(), width, height
                    ),
                    context(),
                ));
            }
        }
    }

    if let Some(position) = first_gap(dataset.annotations.iter().map(|a| a.id.as_u64())) {
        report.add(ValidationIssue::warning(
            IssueCode::NonContiguousAnnotationIds,
            format!(
                "Annotation IDs are not 1..={} in order (first break at index {})",
                dataset.annotations.len(),
                position
            ),
            IssueContext::Dataset,
        ));
    }
}

fn validate_segmentation(segmentation: &[Vec<f64>], id: u64, report: &mut ValidationReport) {
    if segmentation.iter().all(|list| list.is_empty()) {
        report.add(ValidationIssue::warning(
            IssueCode::EmptySegmentation,
            "Segmentation has no coordinates",
            IssueContext::Annotation { id },
        ));
        return;
    }

    for (i, list) in segmentation.iter().enumerate() {
        if list.len() % 2 != 0 {
            report.add(ValidationIssue::error(
                IssueCode::MalformedSegmentation,
                format!(
                    "Segmentation list {} has an odd number of values ({})",
                    i,
                    list.len()
                ),
                IssueContext::Annotation { id },
            ));
        } else if list.iter().any(|v| !v.is_finite()) {
            report.add(ValidationIssue::error(
                IssueCode::MalformedSegmentation,
                format!("Segmentation list {} contains non-finite values", i),
                IssueContext::Annotation { id },
            ));
        }
    }
}

/// Index of the first ID that breaks the sequence `1, 2, 3, ...`.
fn first_gap(ids: impl Iterator<Item = u64>) -> Option<usize> {
    ids.enumerate()
        .find(|(idx, id)| *id != *idx as u64 + 1)
        .map(|(idx, _)| idx)
}

/// Validates everything under a tiling output directory.
///
/// Missing annotation documents and chip problems are reported as issues;
/// an annotation document that cannot be parsed is a hard error.
pub fn validate_output_dir(
    dir: &Path,
    opts: &ValidateOptions,
) -> Result<OutputReport, GeococoError> {
    if !dir.is_dir() {
        return Err(GeococoError::OutputLayoutInvalid {
            path: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut report = OutputReport::new(dir);
    let mut datasets = Vec::new();

    for partition in Partition::ALL {
        let path = dir.join(partition.annotations_file_name());
        if !path.is_file() {
            report.layout.add(ValidationIssue::error(
                IssueCode::MissingAnnotationsFile,
                format!("Missing {}", partition.annotations_file_name()),
                IssueContext::File { path },
            ));
            continue;
        }

        let dataset = read_coco_json(&path)?;
        *report.partition_mut(partition) = validate_dataset(&dataset, opts);
        datasets.push((partition, dataset));
    }

    let mut bands = BTreeSet::new();
    for partition in Partition::ALL {
        bands.extend(band_directories(&dir.join(partition.dir_name()))?);
    }
    report.bands = bands.iter().copied().collect();

    let total_images: usize = datasets.iter().map(|(_, d)| d.images.len()).sum();
    if bands.is_empty() {
        if total_images > 0 {
            report.layout.add(ValidationIssue::warning(
                IssueCode::NoBandDirectories,
                "No Band<n> directories found; chips were not checked",
                IssueContext::File {
                    path: dir.to_path_buf(),
                },
            ));
        }
        return Ok(report);
    }

    for (partition, dataset) in &datasets {
        for &band in &bands {
            let band_dir = dir
                .join(partition.dir_name())
                .join(format!("Band{}", band));
            validate_chips(dataset, &band_dir, &mut report.layout)?;
        }
    }

    Ok(report)
}

/// Band numbers of the `Band<n>` directories directly under `dir`.
fn band_directories(dir: &Path) -> Result<Vec<usize>, GeococoError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut bands = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| GeococoError::OutputLayoutInvalid {
            path: dir.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let band = entry
            .file_name()
            .to_str()
            .and_then(|name| name.strip_prefix("Band"))
            .and_then(|n| n.parse::<usize>().ok());
        if let Some(band) = band {
            bands.push(band);
        }
    }

    Ok(bands)
}

fn validate_chips(
    dataset: &Dataset,
    band_dir: &Path,
    report: &mut ValidationReport,
) -> Result<(), GeococoError> {
    for image in &dataset.images {
        let path = band_dir.join(&image.file_name);
        if !path.is_file() {
            report.add(ValidationIssue::error(
                IssueCode::MissingChip,
                format!("No chip for image {}", image.id),
                IssueContext::File { path },
            ));
            continue;
        }

        match imagesize::size(&path) {
            Ok(size) => {
                if size.width != image.width as usize || size.height != image.height as usize {
                    report.add(ValidationIssue::error(
                        IssueCode::ChipSizeMismatch,
                        format!(
                            "Chip is {}x{} but image {} is {}x{}",
                            size.width, size.height, image.id, image.width, image.height
                        ),
                        IssueContext::File { path },
                    ));
                }
            }
            Err(source) => report.add(ValidationIssue::error(
                IssueCode::UnreadableChip,
                format!("Cannot read chip header: {source}"),
                IssueContext::File { path },
            )),
        }
    }

    if !band_dir.is_dir() {
        return Ok(());
    }

    let known: HashSet<&str> = dataset.images.iter().map(|i| i.file_name.as_str()).collect();
    for path in chip_files(band_dir)? {
        let name = path.file_name().and_then(|name| name.to_str()).unwrap_or("");
        if !known.contains(name) {
            report.add(ValidationIssue::warning(
                IssueCode::OrphanChip,
                "Chip has no image record",
                IssueContext::File { path },
            ));
        }
    }

    Ok(())
}

fn chip_files(dir: &Path) -> Result<Vec<PathBuf>, GeococoError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| GeococoError::OutputLayoutInvalid {
            path: dir.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;
        let is_jpeg = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
        if entry.file_type().is_file() && is_jpeg {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

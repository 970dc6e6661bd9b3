//! Validation report types.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::split::Partition;

/// Issues found in one annotation document.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

/// The result of validating a whole output directory.
#[derive(Clone, Debug, Serialize)]
pub struct OutputReport {
    pub dir: PathBuf,
    /// Band numbers found under the partition directories.
    pub bands: Vec<usize>,
    /// Issues with the directory layout and chip files.
    pub layout: ValidationReport,
    pub train: ValidationReport,
    pub test: ValidationReport,
}

impl OutputReport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            bands: Vec::new(),
            layout: ValidationReport::new(),
            train: ValidationReport::new(),
            test: ValidationReport::new(),
        }
    }

    pub fn partition_mut(&mut self, partition: Partition) -> &mut ValidationReport {
        match partition {
            Partition::Train => &mut self.train,
            Partition::Test => &mut self.test,
        }
    }

    fn sections(&self) -> [(&'static str, &ValidationReport); 3] {
        [
            ("layout", &self.layout),
            ("train", &self.train),
            ("test", &self.test),
        ]
    }

    pub fn error_count(&self) -> usize {
        self.sections().iter().map(|(_, r)| r.error_count()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.sections().iter().map(|(_, r)| r.warning_count()).sum()
    }

    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    pub fn is_clean(&self) -> bool {
        self.sections().iter().all(|(_, r)| r.is_clean())
    }

    /// Iterates over every issue with the name of its section.
    pub fn issues(&self) -> impl Iterator<Item = (&'static str, &ValidationIssue)> + '_ {
        self.sections()
            .into_iter()
            .flat_map(|(name, report)| report.issues.iter().map(move |issue| (name, issue)))
    }
}

impl fmt::Display for OutputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(
                f,
                "Validation passed for {}: no issues found",
                self.dir.display()
            );
        }

        writeln!(
            f,
            "Validation of {} completed with {} error(s) and {} warning(s):",
            self.dir.display(),
            self.error_count(),
            self.warning_count()
        )?;

        for (name, report) in self.sections() {
            if report.is_clean() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{}:", name)?;
            write!(f, "{}", report)?;
        }

        Ok(())
    }
}

/// A single validation issue (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Output a COCO reader will still accept, but that looks wrong.
    Warning,
    /// Invalid or inconsistent output.
    Error,
}

/// A stable code identifying the type of validation issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    // IDs
    DuplicateImageId,
    DuplicateAnnotationId,
    DuplicateCategoryId,
    /// IDs are not exactly 1..=N in order.
    NonContiguousImageIds,
    NonContiguousAnnotationIds,

    // References
    MissingImageRef,
    MissingCategoryRef,

    // Images
    InvalidImageDimensions,
    EmptyFileName,

    // Annotations
    BBoxNotFinite,
    InvalidBBoxOrdering,
    /// The bbox reaches outside its tile.
    BBoxOutOfBounds,
    /// Area is negative, zero or non-finite.
    InvalidArea,
    /// A segmentation list has an odd number of values or non-finite ones.
    MalformedSegmentation,
    EmptySegmentation,

    // Layout
    MissingAnnotationsFile,
    NoBandDirectories,
    MissingChip,
    OrphanChip,
    UnreadableChip,
    ChipSizeMismatch,
}

/// Where a validation issue occurred.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IssueContext {
    Dataset,
    Image { id: u64 },
    Annotation { id: u64 },
    Category { id: u64 },
    /// A file or directory in the output tree.
    File { path: PathBuf },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Dataset => write!(f, "dataset"),
            IssueContext::Image { id } => write!(f, "image {}", id),
            IssueContext::Annotation { id } => write!(f, "annotation {}", id),
            IssueContext::Category { id } => write!(f, "category {}", id),
            IssueContext::File { path } => write!(f, "{}", path.display()),
        }
    }
}

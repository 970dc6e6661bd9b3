//! Train/test dataset assembly.
//!
//! Each tile draws one partition decision; the tile's image record and all
//! of its annotations land in that partition. IDs come from per-partition
//! counters owned here.

use std::fmt;

use rand::{rngs::StdRng, Rng, RngExt, SeedableRng};

use crate::annotate::AnnotationDraft;
use crate::error::GeococoError;
use crate::ir::{Annotation, AnnotationId, Dataset, Image, ImageId};

/// The two output partitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    Train,
    Test,
}

impl Partition {
    /// Both partitions, test first (the order documents are written in).
    pub const ALL: [Partition; 2] = [Partition::Test, Partition::Train];

    /// Directory holding this partition's chips.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Partition::Train => "Train",
            Partition::Test => "Test",
        }
    }

    /// Annotation document filename.
    pub fn annotations_file_name(&self) -> &'static str {
        match self {
            Partition::Train => "annotations-train.json",
            Partition::Test => "annotations-test.json",
        }
    }

    /// `about` text of the partition's info block.
    pub fn about(&self) -> &'static str {
        match self {
            Partition::Train => "Train Dataset for GeoTIFF and Polygon Annotations",
            Partition::Test => "Test Dataset for GeoTIFF and Polygon Annotations",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Train => write!(f, "train"),
            Partition::Test => write!(f, "test"),
        }
    }
}

/// A sequential 1-based ID allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IdCounter {
    last: u64,
}

impl IdCounter {
    /// Returns the next ID.
    #[inline]
    pub fn next_id(&mut self) -> u64 {
        self.last += 1;
        self.last
    }

    /// Number of IDs handed out so far.
    #[inline]
    pub fn issued(&self) -> u64 {
        self.last
    }
}

/// One partition's dataset and its ID counters.
#[derive(Clone, Debug)]
struct PartitionDataset {
    dataset: Dataset,
    image_ids: IdCounter,
    annotation_ids: IdCounter,
}

impl PartitionDataset {
    fn new(partition: Partition) -> Self {
        Self {
            dataset: Dataset::with_about(partition.about()),
            image_ids: IdCounter::default(),
            annotation_ids: IdCounter::default(),
        }
    }
}

/// Where a tile was placed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileSlot {
    pub partition: Partition,
    pub image_id: ImageId,
    pub file_name: String,
}

/// The finished train and test datasets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplitDatasets {
    pub train: Dataset,
    pub test: Dataset,
}

impl SplitDatasets {
    /// Returns the dataset for `partition`.
    pub fn get(&self, partition: Partition) -> &Dataset {
        match partition {
            Partition::Train => &self.train,
            Partition::Test => &self.test,
        }
    }

    /// Total number of images across both partitions.
    pub fn total_images(&self) -> usize {
        self.train.images.len() + self.test.images.len()
    }

    /// Total number of annotations across both partitions.
    pub fn total_annotations(&self) -> usize {
        self.train.annotations.len() + self.test.annotations.len()
    }
}

/// Draws the partition for one tile: a uniform `u` in `[0, 1)` goes to test
/// when `u >= train_percent`.
pub fn draw_partition<R: Rng + ?Sized>(rng: &mut R, train_percent: f64) -> Partition {
    if rng.random::<f64>() >= train_percent {
        Partition::Test
    } else {
        Partition::Train
    }
}

/// Accumulates tiles and annotations into the two partitions.
#[derive(Debug)]
pub struct DatasetAssembler {
    train_percent: f64,
    rng: StdRng,
    train: PartitionDataset,
    test: PartitionDataset,
}

impl DatasetAssembler {
    /// Creates an assembler routing roughly `train_percent` of tiles to
    /// train.
    ///
    /// With a `seed` the split is reproducible; otherwise it is seeded from
    /// the thread RNG.
    pub fn new(train_percent: f64, seed: Option<u64>) -> Result<Self, GeococoError> {
        if !(0.0..=1.0).contains(&train_percent) {
            return Err(GeococoError::InvalidConfig {
                message: format!("train_percent must be within [0, 1], got {}", train_percent),
            });
        }

        let seed = match seed {
            Some(seed) => seed,
            None => rand::rng().random::<u64>(),
        };

        Ok(Self {
            train_percent,
            rng: StdRng::seed_from_u64(seed),
            train: PartitionDataset::new(Partition::Train),
            test: PartitionDataset::new(Partition::Test),
        })
    }

    fn partition_mut(&mut self, partition: Partition) -> &mut PartitionDataset {
        match partition {
            Partition::Train => &mut self.train,
            Partition::Test => &mut self.test,
        }
    }

    /// Places a new tile: draws its partition and appends its image record.
    pub fn begin_tile(&mut self, width: u32, height: u32) -> TileSlot {
        let partition = draw_partition(&mut self.rng, self.train_percent);
        let target = self.partition_mut(partition);

        let image_id = ImageId::new(target.image_ids.next_id());
        let image = Image::chip(image_id, width, height);
        let file_name = image.file_name.clone();
        target.dataset.images.push(image);

        TileSlot {
            partition,
            image_id,
            file_name,
        }
    }

    /// Appends an annotation to the tile's partition.
    pub fn add_annotation(&mut self, slot: &TileSlot, draft: AnnotationDraft) -> AnnotationId {
        let target = self.partition_mut(slot.partition);

        let id = AnnotationId::new(target.annotation_ids.next_id());
        target.dataset.annotations.push(Annotation::new(
            id,
            slot.image_id,
            draft.area,
            draft.bbox,
            draft.segmentation,
        ));
        id
    }

    /// Returns the in-progress dataset for `partition`.
    pub fn dataset(&self, partition: Partition) -> &Dataset {
        match partition {
            Partition::Train => &self.train.dataset,
            Partition::Test => &self.test.dataset,
        }
    }

    /// Consumes the assembler and returns both datasets.
    pub fn finish(self) -> SplitDatasets {
        SplitDatasets {
            train: self.train.dataset,
            test: self.test.dataset,
        }
    }
}

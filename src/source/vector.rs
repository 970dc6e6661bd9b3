//! Vector features and resettable layer cursors.

use std::fmt;

use geo::MultiPolygon;

/// A polygonal feature in map coordinates.
///
/// Single polygons are stored as one-member multi-polygons so the clipping
/// code handles one shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    /// Position within the layer, 0-based.
    pub index: usize,

    /// Identifier from the source file, if it carried one.
    pub id: Option<String>,

    pub geometry: MultiPolygon<f64>,
}

impl Feature {
    /// Creates a feature without a source identifier.
    pub fn new(index: usize, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        Self {
            index,
            id: None,
            geometry: geometry.into(),
        }
    }

    /// Sets the source identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "#{} (id {})", self.index, id),
            None => write!(f, "#{}", self.index),
        }
    }
}

/// A single-pass cursor over a layer's features.
///
/// Iterating consumes the cursor; callers must [`reset`](Self::reset) it
/// before the next pass.
pub trait FeatureCursor {
    /// Human-readable layer name, used in log context.
    fn layer_name(&self) -> &str;

    /// Returns the next feature, or `None` once the layer is exhausted.
    fn next_feature(&mut self) -> Option<&Feature>;

    /// Rewinds the cursor to the first feature.
    fn reset(&mut self);
}

impl<C: FeatureCursor + ?Sized> FeatureCursor for Box<C> {
    fn layer_name(&self) -> &str {
        (**self).layer_name()
    }

    fn next_feature(&mut self) -> Option<&Feature> {
        (**self).next_feature()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// An in-memory layer with its own cursor.
#[derive(Clone, Debug)]
pub struct VectorLayer {
    name: String,
    features: Vec<Feature>,
    position: usize,
}

impl VectorLayer {
    /// Creates a layer positioned at its first feature.
    pub fn new(name: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            name: name.into(),
            features,
            position: 0,
        }
    }

    /// All features, independent of the cursor position.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FeatureCursor for VectorLayer {
    fn layer_name(&self) -> &str {
        &self.name
    }

    fn next_feature(&mut self) -> Option<&Feature> {
        let feature = self.features.get(self.position)?;
        self.position += 1;
        Some(feature)
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}

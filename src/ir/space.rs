//! Coordinate space marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! between map coordinates and tile-local pixel coordinates at compile time.

use std::fmt;

/// Marker type for tile-local pixel coordinates.
///
/// Pixel coordinates are floats measured from the top-left corner of the
/// owning tile, never from the raster origin.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for map coordinates in the raster's spatial reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Map {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

//! Fixed-size pixel windows covering a raster.

use serde::{Deserialize, Serialize};

use crate::error::GeococoError;

/// A rectangular region of the raster grid, half-open on the high edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelWindow {
    pub x_off: u32,
    pub y_off: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelWindow {
    /// Creates a new window.
    #[inline]
    pub fn new(x_off: u32, y_off: u32, width: u32, height: u32) -> Self {
        Self {
            x_off,
            y_off,
            width,
            height,
        }
    }

    /// The window's top-left corner as a floating-point pixel offset.
    #[inline]
    pub fn offset(&self) -> (f64, f64) {
        (self.x_off as f64, self.y_off as f64)
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u64 {
        self.x_off as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u64 {
        self.y_off as u64 + self.height as u64
    }

    /// Returns true if any part of the window lies outside a raster of the
    /// given size.
    #[inline]
    pub fn exceeds(&self, raster_width: u32, raster_height: u32) -> bool {
        self.right() > raster_width as u64 || self.bottom() > raster_height as u64
    }
}

/// How the last window along each axis treats the raster boundary.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum EdgePolicy {
    /// Keep full tile dimensions; edge windows may extend past the raster
    /// and their chips are padded.
    #[default]
    Extend,
    /// Shrink edge windows to end at the raster boundary.
    Clip,
}

/// The covering grid of tiles over a raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    raster_width: u32,
    raster_height: u32,
    tile_width: u32,
    tile_height: u32,
    policy: EdgePolicy,
}

impl TileGrid {
    /// Creates a grid, rejecting zero tile dimensions.
    pub fn new(
        raster_size: (u32, u32),
        tile_size: (u32, u32),
        policy: EdgePolicy,
    ) -> Result<Self, GeococoError> {
        if tile_size.0 == 0 || tile_size.1 == 0 {
            return Err(GeococoError::InvalidConfig {
                message: format!(
                    "tile size must be positive, got {}x{}",
                    tile_size.0, tile_size.1
                ),
            });
        }

        Ok(Self {
            raster_width: raster_size.0,
            raster_height: raster_size.1,
            tile_width: tile_size.0,
            tile_height: tile_size.1,
            policy,
        })
    }

    /// Number of tiles along x, `ceil(W / tw)`.
    #[inline]
    pub fn columns(&self) -> u32 {
        self.raster_width.div_ceil(self.tile_width)
    }

    /// Number of tiles along y, `ceil(H / th)`.
    #[inline]
    pub fn rows(&self) -> u32 {
        self.raster_height.div_ceil(self.tile_height)
    }

    /// Total number of tiles.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    /// Returns true if the raster is empty along either axis.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The edge policy this grid was built with.
    #[inline]
    pub fn policy(&self) -> EdgePolicy {
        self.policy
    }

    /// Returns the window at grid position (`column`, `row`).
    pub fn window(&self, column: u32, row: u32) -> PixelWindow {
        let x_off = column * self.tile_width;
        let y_off = row * self.tile_height;

        let (width, height) = match self.policy {
            EdgePolicy::Extend => (self.tile_width, self.tile_height),
            EdgePolicy::Clip => (
                self.tile_width.min(self.raster_width - x_off),
                self.tile_height.min(self.raster_height - y_off),
            ),
        };

        PixelWindow::new(x_off, y_off, width, height)
    }

    /// Iterates all windows in column-major order: the outer loop walks x
    /// offsets, the inner loop walks y offsets.
    ///
    /// Calling this again restarts the sequence.
    pub fn windows(&self) -> TileWindows {
        TileWindows {
            grid: *self,
            next: 0,
            len: self.len(),
        }
    }
}

/// Iterator over the windows of a [`TileGrid`].
#[derive(Clone, Debug)]
pub struct TileWindows {
    grid: TileGrid,
    next: usize,
    len: usize,
}

impl Iterator for TileWindows {
    type Item = PixelWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }

        let rows = self.grid.rows() as usize;
        let column = (self.next / rows) as u32;
        let row = (self.next % rows) as u32;
        self.next += 1;

        Some(self.grid.window(column, row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileWindows {}

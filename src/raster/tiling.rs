//! Decomposition of a raster extent into fixed-size tiles.

use crate::errors::{RasterError, Result};

/// Default tile edge length used by the conversion pipeline.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// A rectangular, extent-clipped subdivision of a raster.
///
/// `width`/`height` are already clipped to the raster extent, so tiles in
/// the last row/column may be smaller than the nominal tile size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Tile {
    /// Tile origin as a band-I/O window position.
    pub fn window(&self) -> (isize, isize) {
        (self.x as isize, self.y as isize)
    }

    /// Tile dimensions as a band-I/O window size.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Deterministic decomposition of a `(width, height)` extent into
/// non-overlapping tiles of at most `tile_size`, iterated in row-major
/// order (all tiles of one row, left to right, before the next row down).
///
/// The layout is stateless; [`iter`](TileLayout::iter) can be called any
/// number of times and always yields the same sequence.
#[derive(Debug, Clone, Copy)]
pub struct TileLayout {
    raster_size: (usize, usize),
    tile_size: (usize, usize),
}

impl TileLayout {
    pub fn new(raster_size: (usize, usize), tile_size: (usize, usize)) -> Result<Self> {
        if tile_size.0 == 0 || tile_size.1 == 0 {
            return Err(RasterError::BadArgument(format!(
                "tile size must be non-zero, got {}x{}",
                tile_size.0, tile_size.1
            )));
        }
        Ok(TileLayout {
            raster_size,
            tile_size,
        })
    }

    pub fn tiles_across(&self) -> usize {
        self.raster_size.0.div_ceil(self.tile_size.0)
    }

    pub fn tiles_down(&self) -> usize {
        self.raster_size.1.div_ceil(self.tile_size.1)
    }

    /// Total tile count: `ceil(W/tw) * ceil(H/th)`.
    pub fn tile_count(&self) -> usize {
        self.tiles_across() * self.tiles_down()
    }

    pub fn iter(&self) -> Tiles {
        Tiles {
            layout: *self,
            next: 0,
        }
    }
}

/// Iterator over the tiles of a [`TileLayout`].
#[derive(Debug, Clone)]
pub struct Tiles {
    layout: TileLayout,
    next: usize,
}

impl Iterator for Tiles {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.next >= self.layout.tile_count() {
            return None;
        }
        let across = self.layout.tiles_across();
        let (col, row) = (self.next % across, self.next / across);
        self.next += 1;

        let (tw, th) = self.layout.tile_size;
        let (w, h) = self.layout.raster_size;
        let x = col * tw;
        let y = row * th;
        Some(Tile {
            x,
            y,
            width: tw.min(w - x),
            height: th.min(h - y),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.layout.tile_count() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Tiles {}

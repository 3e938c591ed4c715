//! Raster data access: bands, buffers, pixel types and tiling.

mod buffer;
mod rasterband;
mod tiling;
mod types;

pub use buffer::{Buffer, ByteBuffer};
pub use rasterband::RasterBand;
pub use tiling::{Tile, TileLayout, Tiles, DEFAULT_TILE_SIZE};
pub use types::{Pixel, RasterDataType};

#[cfg(test)]
mod tests;

//! Pluggable per-tile transformation stage.

use crate::convert::CancelToken;
use crate::errors::Result;
use crate::raster::{RasterDataType, Tile};

/// Raw pixel data of one band for one tile.
///
/// Buffers are tile-scoped: allocated for a single tile, handed to exactly
/// one processor invocation, then handed back to the orchestration thread
/// for the write. No buffer is ever visible to two invocations at once.
#[derive(Debug, Clone)]
pub struct BandBuffer {
    pub data_type: RasterDataType,
    /// Native-endian pixel bytes, `tile.pixel_count() * data_type.size_bytes()` long.
    pub data: Vec<u8>,
}

/// A per-tile transform running on a worker drawn from the conversion's
/// bounded pool.
///
/// Implementations receive every band of one tile and may rewrite the
/// pixel bytes in place; shape and type must be preserved. They must check
/// `cancel` before doing real work and return without touching the buffers
/// once it is set.
pub trait TileProcessor: Send + Sync {
    fn process(&self, tile: &Tile, bands: &mut [BandBuffer], cancel: &CancelToken) -> Result<()>;
}

/// The baseline processor: leaves every tile untouched.
#[derive(Debug, Default)]
pub struct IdentityProcessor;

impl TileProcessor for IdentityProcessor {
    fn process(&self, _tile: &Tile, _bands: &mut [BandBuffer], cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Ok(());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_leaves_bands_untouched() {
        let tile = Tile {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
        };
        let mut bands = vec![BandBuffer {
            data_type: RasterDataType::UInt8,
            data: vec![1, 2, 3, 4],
        }];
        IdentityProcessor
            .process(&tile, &mut bands, &CancelToken::new())
            .unwrap();
        assert_eq!(bands[0].data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_identity_is_a_noop_when_cancelled() {
        let tile = Tile {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        };
        let token = CancelToken::new();
        token.cancel();
        let mut bands = vec![BandBuffer {
            data_type: RasterDataType::UInt8,
            data: vec![9],
        }];
        assert!(IdentityProcessor.process(&tile, &mut bands, &token).is_ok());
    }
}

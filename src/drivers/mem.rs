//! In-memory raster driver.

use std::path::Path;

use crate::dataset::RasterStore;
use crate::driver::{DriverCapabilities, DriverImpl};
use crate::errors::{RasterError, Result};
use crate::geo_transform::GeoTransform;
use crate::options::{CreationOptionDef, CreationOptions};
use crate::raster::RasterDataType;

/// `MEM`: datasets held entirely in process memory. Mostly useful for
/// intermediate results and tests; the path passed to create is only a
/// label and such datasets cannot be reopened.
pub(crate) struct MemDriver;

impl DriverImpl for MemDriver {
    fn short_name(&self) -> &'static str {
        "MEM"
    }

    fn long_name(&self) -> &'static str {
        "In-memory raster"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities::RASTER | DriverCapabilities::CREATE | DriverCapabilities::CREATE_COPY
    }

    fn creation_option_defs(&self) -> &'static [CreationOptionDef] {
        &[]
    }

    fn identify(&self, _path: &Path) -> bool {
        false
    }

    fn open(&self, path: &Path, _writable: bool) -> Result<Box<dyn RasterStore>> {
        Err(RasterError::OpenFailed {
            path: path.to_path_buf(),
            message: "the MEM driver cannot open files".to_string(),
        })
    }

    fn create(
        &self,
        _path: &Path,
        size: (usize, usize),
        bands: usize,
        data_type: RasterDataType,
        _options: &CreationOptions,
    ) -> Result<Box<dyn RasterStore>> {
        let band_bytes = size.0 * size.1 * data_type.size_bytes();
        Ok(Box::new(MemStore {
            size,
            data_type,
            bands: vec![vec![0u8; band_bytes]; bands],
            projection: None,
            geo_transform: None,
        }))
    }
}

struct MemStore {
    size: (usize, usize),
    data_type: RasterDataType,
    bands: Vec<Vec<u8>>,
    projection: Option<String>,
    geo_transform: Option<GeoTransform>,
}

impl MemStore {
    fn check_region(
        &self,
        band_index: usize,
        window: (usize, usize),
        size: (usize, usize),
        len: usize,
    ) -> Result<()> {
        if band_index >= self.bands.len() {
            return Err(RasterError::BadArgument(format!(
                "band index {band_index} out of range"
            )));
        }
        if window.0 + size.0 > self.size.0 || window.1 + size.1 > self.size.1 {
            return Err(RasterError::BadArgument(format!(
                "region {window:?}+{size:?} exceeds raster extent {:?}",
                self.size
            )));
        }
        let expected = size.0 * size.1 * self.data_type.size_bytes();
        if len != expected {
            return Err(RasterError::BadArgument(format!(
                "region buffer holds {len} bytes, expected {expected}"
            )));
        }
        Ok(())
    }
}

impl RasterStore for MemStore {
    fn size(&self) -> (usize, usize) {
        self.size
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn band_type(&self, _band_index: usize) -> RasterDataType {
        self.data_type
    }

    fn projection(&self) -> Option<String> {
        self.projection.clone()
    }

    fn set_projection(&mut self, projection: &str) -> Result<()> {
        self.projection = Some(projection.to_string());
        Ok(())
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.geo_transform
    }

    fn set_geo_transform(&mut self, transform: &GeoTransform) -> Result<()> {
        self.geo_transform = Some(*transform);
        Ok(())
    }

    fn read_region(
        &mut self,
        band_index: usize,
        window: (usize, usize),
        size: (usize, usize),
        out: &mut [u8],
    ) -> Result<()> {
        self.check_region(band_index, window, size, out.len())?;
        let bpp = self.data_type.size_bytes();
        let row_bytes = size.0 * bpp;
        let stride = self.size.0 * bpp;
        let band = &self.bands[band_index];
        for row in 0..size.1 {
            let src = (window.1 + row) * stride + window.0 * bpp;
            out[row * row_bytes..(row + 1) * row_bytes]
                .copy_from_slice(&band[src..src + row_bytes]);
        }
        Ok(())
    }

    fn write_region(
        &mut self,
        band_index: usize,
        window: (usize, usize),
        size: (usize, usize),
        data: &[u8],
    ) -> Result<()> {
        self.check_region(band_index, window, size, data.len())?;
        let bpp = self.data_type.size_bytes();
        let row_bytes = size.0 * bpp;
        let stride = self.size.0 * bpp;
        let band = &mut self.bands[band_index];
        for row in 0..size.1 {
            let dst = (window.1 + row) * stride + window.0 * bpp;
            band[dst..dst + row_bytes].copy_from_slice(&data[row * row_bytes..(row + 1) * row_bytes]);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

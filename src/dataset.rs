use std::cell::{RefCell, RefMut};
use std::fmt::{Debug, Formatter};
use std::path::Path;

use crate::driver::{Driver, DriverManager, ProgressFn};
use crate::errors::{RasterError, Result};
use crate::geo_transform::GeoTransform;
use crate::options::{CreationOptions, DatasetOptions, OpenFlags};
use crate::raster::{RasterBand, RasterDataType};

/// Storage backend behind a [`Dataset`].
///
/// Implemented by each driver's container. All pixel I/O is type-erased:
/// regions are native-endian byte runs whose element width follows the
/// band's declared [`RasterDataType`]. Band indexes are zero-based at this
/// seam; [`Dataset`] exposes the conventional one-based indexing.
pub(crate) trait RasterStore: Send {
    fn size(&self) -> (usize, usize);
    fn band_count(&self) -> usize;
    fn band_type(&self, band_index: usize) -> RasterDataType;
    fn projection(&self) -> Option<String>;
    fn set_projection(&mut self, projection: &str) -> Result<()>;
    fn geo_transform(&self) -> Option<GeoTransform>;
    fn set_geo_transform(&mut self, transform: &GeoTransform) -> Result<()>;
    /// Reads `size` pixels at `window` from band `band_index` into `out`.
    /// `out.len()` must equal `size.0 * size.1 * band_type.size_bytes()`.
    fn read_region(
        &mut self,
        band_index: usize,
        window: (usize, usize),
        size: (usize, usize),
        out: &mut [u8],
    ) -> Result<()>;
    /// Writes `size` pixels at `window` to band `band_index` from `data`.
    fn write_region(
        &mut self,
        band_index: usize,
        window: (usize, usize),
        size: (usize, usize),
        data: &[u8],
    ) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// An opened raster dataset: a multi-band 2-D pixel grid with optional
/// spatial reference metadata.
///
/// Obtained from [`Dataset::open`] (read-only by default) or from a
/// [`Driver`]'s create methods (writable). The dataset is flushed when
/// dropped; [`flush_cache`](Dataset::flush_cache) forces it earlier.
pub struct Dataset {
    store: RefCell<Box<dyn RasterStore>>,
    driver: Driver,
    writable: bool,
}

impl Dataset {
    pub(crate) fn new(store: Box<dyn RasterStore>, driver: Driver, writable: bool) -> Self {
        Dataset {
            store: RefCell::new(store),
            driver,
            writable,
        }
    }

    /// Opens the raster at `path` read-only, probing all registered drivers.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        Self::open_ex(path, DatasetOptions::default())
    }

    /// Opens the raster at `path` with explicit [`DatasetOptions`].
    pub fn open_ex<P: AsRef<Path>>(path: P, options: DatasetOptions<'_>) -> Result<Dataset> {
        DriverManager::register_all();
        let path = path.as_ref();
        let writable = options.open_flags.contains(OpenFlags::UPDATE);

        // Surface the low-level diagnostic before any format probing.
        if let Err(e) = std::fs::metadata(path) {
            return Err(RasterError::OpenFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }

        for driver in DriverManager::drivers() {
            if let Some(allowed) = options.allowed_drivers {
                if !allowed
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(driver.short_name()))
                {
                    continue;
                }
            }
            if driver.identify(path) {
                return driver.open(path, writable);
            }
        }
        Err(RasterError::OpenFailed {
            path: path.to_path_buf(),
            message: "not recognized as a supported raster format".to_string(),
        })
    }

    /// The driver that opened or created this dataset.
    pub fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Raster dimensions `(width, height)` in pixels.
    pub fn raster_size(&self) -> (usize, usize) {
        self.store.borrow().size()
    }

    /// Number of bands.
    pub fn raster_count(&self) -> usize {
        self.store.borrow().band_count()
    }

    /// Returns the band at `band_index`, like all band indexes starting from 1.
    pub fn rasterband(&self, band_index: usize) -> Result<RasterBand<'_>> {
        let count = self.raster_count();
        if band_index == 0 || band_index > count {
            return Err(RasterError::BadArgument(format!(
                "band index {band_index} out of range (dataset has {count} band(s))"
            )));
        }
        Ok(RasterBand::new(self, band_index))
    }

    /// The spatial reference of this dataset, if it has one.
    pub fn projection(&self) -> Option<String> {
        self.store.borrow().projection()
    }

    pub fn set_projection(&self, projection: &str) -> Result<()> {
        self.ensure_writable()?;
        self.store.borrow_mut().set_projection(projection)
    }

    /// The affine geo-transform of this dataset, if it has one.
    pub fn geo_transform(&self) -> Result<GeoTransform> {
        self.store.borrow().geo_transform().ok_or_else(|| {
            RasterError::BadArgument("dataset has no geo-transform".to_string())
        })
    }

    pub fn set_geo_transform(&self, transform: &GeoTransform) -> Result<()> {
        self.ensure_writable()?;
        self.store.borrow_mut().set_geo_transform(transform)
    }

    /// Copies this dataset to `path` through `driver`'s copy routine.
    ///
    /// Convenience for [`Driver::create_copy`] without a progress callback.
    pub fn create_copy<P: AsRef<Path>>(
        &self,
        driver: &Driver,
        path: P,
        options: &CreationOptions,
    ) -> Result<Dataset> {
        driver.create_copy(path, self, options, None::<ProgressFn>)
    }

    /// Flushes pending writes to the backing store.
    pub fn flush_cache(&self) -> Result<()> {
        self.store.borrow_mut().flush()
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(RasterError::BadArgument(
                "dataset was opened read-only".to_string(),
            ))
        }
    }

    pub(crate) fn store(&self) -> RefMut<'_, Box<dyn RasterStore>> {
        self.store.borrow_mut()
    }
}

impl Debug for Dataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (w, h) = self.raster_size();
        f.debug_struct("Dataset")
            .field("driver", &self.driver.short_name())
            .field("size", &format_args!("{w}x{h}"))
            .field("bands", &self.raster_count())
            .field("writable", &self.writable)
            .finish()
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        // Errors on the final flush have nowhere to go.
        let _ = self.store.borrow_mut().flush();
    }
}

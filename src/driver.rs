use std::path::Path;
use std::sync::{Arc, OnceLock};

use bitflags::bitflags;
use log::debug;

use crate::dataset::{Dataset, RasterStore};
use crate::drivers;
use crate::errors::{RasterError, Result};
use crate::options::{validate_creation_options, CreationOptionDef, CreationOptions};
use crate::raster::{Pixel, RasterDataType};

bitflags! {
    /// Capabilities a format driver advertises.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DriverCapabilities: u32 {
        /// The format holds raster data.
        const RASTER = 0x01;
        /// Datasets can be created from scratch with explicit geometry,
        /// type and band count, enabling tile-by-tile writes.
        const CREATE = 0x02;
        /// Datasets can be created by copying an existing dataset in one
        /// driver-internal pass.
        const CREATE_COPY = 0x04;
    }
}

/// Which creation path a conversion will take for a destination format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationStrategy {
    /// Full-control creation: create an empty destination, then stream
    /// tiles through the read/transform/write loop.
    Create,
    /// Streaming copy: hand the whole job to the driver's copy routine,
    /// observable only through its progress callback.
    CreateCopy,
}

impl CreationStrategy {
    /// Selects the creation strategy for a capability set.
    ///
    /// Creation is preferred over copying when both are advertised, since
    /// only the full-control path supports per-tile transformation.
    /// Returns `None` when the capabilities allow neither.
    pub fn resolve(capabilities: DriverCapabilities) -> Option<CreationStrategy> {
        if capabilities.contains(DriverCapabilities::CREATE) {
            Some(CreationStrategy::Create)
        } else if capabilities.contains(DriverCapabilities::CREATE_COPY) {
            Some(CreationStrategy::CreateCopy)
        } else {
            None
        }
    }
}

/// Driver-internal copy progress callback: receives the completed fraction
/// and a short message, and returns `true` to continue or `false` to abort
/// the copy. The only suspension point the copy strategy offers.
pub type ProgressFn<'a> = &'a mut dyn FnMut(f64, &str) -> bool;

/// Backend interface implemented by each registered format.
pub(crate) trait DriverImpl: Send + Sync {
    fn short_name(&self) -> &'static str;
    fn long_name(&self) -> &'static str;
    fn capabilities(&self) -> DriverCapabilities;
    fn creation_option_defs(&self) -> &'static [CreationOptionDef];
    /// Cheap content probe: does `path` look like this format?
    fn identify(&self, path: &Path) -> bool;
    fn open(&self, path: &Path, writable: bool) -> Result<Box<dyn RasterStore>>;
    fn create(
        &self,
        path: &Path,
        size: (usize, usize),
        bands: usize,
        data_type: RasterDataType,
        options: &CreationOptions,
    ) -> Result<Box<dyn RasterStore>>;
}

/// A raster format driver.
///
/// Cheap to clone; all clones refer to the same registered backend.
#[derive(Clone)]
pub struct Driver {
    inner: Arc<dyn DriverImpl>,
}

impl Driver {
    /// Shorthand for [`DriverManager::get_driver_by_name`].
    pub fn get(name: &str) -> Result<Driver> {
        DriverManager::get_driver_by_name(name)
    }

    pub fn short_name(&self) -> &'static str {
        self.inner.short_name()
    }

    pub fn long_name(&self) -> &'static str {
        self.inner.long_name()
    }

    pub fn capabilities(&self) -> DriverCapabilities {
        self.inner.capabilities()
    }

    /// The creation option schema this format advertises. Opaque to the
    /// conversion pipeline beyond validation.
    pub fn creation_option_defs(&self) -> &'static [CreationOptionDef] {
        self.inner.creation_option_defs()
    }

    /// Resolves the creation strategy for this driver, or fails with
    /// [`RasterError::NoCreationSupport`] when neither path is available.
    pub fn creation_strategy(&self) -> Result<CreationStrategy> {
        CreationStrategy::resolve(self.capabilities()).ok_or_else(|| {
            RasterError::NoCreationSupport {
                driver: self.short_name().to_string(),
            }
        })
    }

    pub(crate) fn identify(&self, path: &Path) -> bool {
        self.inner.identify(path)
    }

    pub(crate) fn open(&self, path: &Path, writable: bool) -> Result<Dataset> {
        let store = self.inner.open(path, writable)?;
        Ok(Dataset::new(store, self.clone(), writable))
    }

    /// Creates a dataset of `u8` bands; see
    /// [`create_with_options`](Driver::create_with_options).
    pub fn create<P: AsRef<Path>>(
        &self,
        path: P,
        size_x: usize,
        size_y: usize,
        bands: usize,
    ) -> Result<Dataset> {
        self.create_with_band_type::<u8, _>(path, size_x, size_y, bands)
    }

    /// Creates a dataset with the band type given statically as `T`.
    pub fn create_with_band_type<T: Pixel, P: AsRef<Path>>(
        &self,
        path: P,
        size_x: usize,
        size_y: usize,
        bands: usize,
    ) -> Result<Dataset> {
        self.create_with_options(
            path,
            (size_x, size_y),
            bands,
            T::data_type(),
            &CreationOptions::new(),
        )
    }

    /// Creates a new writable dataset with explicit geometry, band count
    /// and pixel type, applying `options` after validating them against
    /// the driver's option schema.
    pub fn create_with_options<P: AsRef<Path>>(
        &self,
        path: P,
        size: (usize, usize),
        bands: usize,
        data_type: RasterDataType,
        options: &CreationOptions,
    ) -> Result<Dataset> {
        let path = path.as_ref();
        if !self.capabilities().contains(DriverCapabilities::CREATE) {
            return Err(RasterError::BadArgument(format!(
                "driver '{}' does not support Create",
                self.short_name()
            )));
        }
        self.check_creation_args(path, size, bands, data_type, options)?;
        let store = self.inner.create(path, size, bands, data_type, options)?;
        Ok(Dataset::new(store, self.clone(), true))
    }

    /// Creates a copy of `src` at `path` through the driver-internal copy
    /// routine.
    ///
    /// `progress` is invoked with non-decreasing completion fractions; a
    /// `false` return aborts the copy, which then fails with
    /// [`RasterError::CreateFailed`]. The destination file may be left
    /// partially written.
    pub fn create_copy<P: AsRef<Path>>(
        &self,
        path: P,
        src: &Dataset,
        options: &CreationOptions,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<Dataset> {
        let path = path.as_ref();
        if !self.capabilities().contains(DriverCapabilities::CREATE_COPY) {
            return Err(RasterError::BadArgument(format!(
                "driver '{}' does not support CreateCopy",
                self.short_name()
            )));
        }
        let size = src.raster_size();
        let bands = src.raster_count();
        if bands == 0 {
            return Err(RasterError::BadArgument(
                "source dataset has no raster bands".to_string(),
            ));
        }
        let data_type = src.rasterband(1)?.band_type();
        self.check_creation_args(path, size, bands, data_type, options)?;

        let mut store = self.inner.create(path, size, bands, data_type, options)?;
        if let Some(projection) = src.projection() {
            store.set_projection(&projection)?;
        }
        if let Ok(gt) = src.geo_transform() {
            store.set_geo_transform(&gt)?;
        }

        let mut always = |_: f64, _: &str| true;
        let progress = progress.unwrap_or(&mut always);
        let completed =
            copy_scanlines(src, store.as_mut(), progress).map_err(|e| RasterError::CreateFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if !completed {
            return Err(RasterError::CreateFailed {
                path: path.to_path_buf(),
                message: "copy interrupted by progress callback".to_string(),
            });
        }
        store.flush()?;
        Ok(Dataset::new(store, self.clone(), true))
    }

    fn check_creation_args(
        &self,
        path: &Path,
        size: (usize, usize),
        bands: usize,
        data_type: RasterDataType,
        options: &CreationOptions,
    ) -> Result<()> {
        if !self.capabilities().contains(DriverCapabilities::CREATE)
            && !self.capabilities().contains(DriverCapabilities::CREATE_COPY)
        {
            return Err(RasterError::NoCreationSupport {
                driver: self.short_name().to_string(),
            });
        }
        if size.0 == 0 || size.1 == 0 || bands == 0 {
            return Err(RasterError::CreateFailed {
                path: path.to_path_buf(),
                message: format!(
                    "invalid geometry: {}x{} with {bands} band(s)",
                    size.0, size.1
                ),
            });
        }
        if data_type == RasterDataType::Unknown || data_type.is_complex() {
            return Err(RasterError::BadArgument(format!(
                "driver '{}' cannot create {data_type} bands",
                self.short_name()
            )));
        }
        validate_creation_options(self.creation_option_defs(), options)
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("short_name", &self.short_name())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// The driver-internal copy loop: duplicates every band of `src` into
/// `dst` one scanline at a time, reporting progress after each line.
///
/// Returns `Ok(false)` when the progress callback requested an abort.
fn copy_scanlines(
    src: &Dataset,
    dst: &mut dyn RasterStore,
    progress: ProgressFn<'_>,
) -> Result<bool> {
    let (width, height) = src.raster_size();
    let bands = src.raster_count();
    let total_lines = (height * bands) as f64;

    let mut lines_done = 0usize;
    for band_index in 1..=bands {
        let band = src.rasterband(band_index)?;
        for y in 0..height {
            let line = band.read_raw((0, y as isize), (width, 1))?;
            dst.write_region(band_index - 1, (0, y), (width, 1), &line)?;
            lines_done += 1;
            if !progress(lines_done as f64 / total_lines, "copying") {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

static DRIVERS: OnceLock<Vec<Arc<dyn DriverImpl>>> = OnceLock::new();

/// Process-wide registry of format drivers.
pub struct DriverManager;

impl DriverManager {
    /// Registers the built-in drivers.
    ///
    /// Idempotent; called lazily by every entry point that needs the
    /// registry, so hosts normally never call it themselves.
    pub fn register_all() {
        Self::registry();
    }

    fn registry() -> &'static [Arc<dyn DriverImpl>] {
        DRIVERS
            .get_or_init(|| {
                let all = drivers::builtin_drivers();
                debug!("registered {} raster driver(s)", all.len());
                all
            })
            .as_slice()
    }

    /// Number of registered drivers.
    pub fn count() -> usize {
        Self::registry().len()
    }

    /// Returns the driver at `index` in registration order.
    pub fn get_driver(index: usize) -> Result<Driver> {
        Self::registry()
            .get(index)
            .map(|inner| Driver {
                inner: Arc::clone(inner),
            })
            .ok_or_else(|| {
                RasterError::BadArgument(format!("driver index {index} out of range"))
            })
    }

    /// Looks a driver up by its short name, case-insensitively.
    pub fn get_driver_by_name(name: &str) -> Result<Driver> {
        Self::registry()
            .iter()
            .find(|d| d.short_name().eq_ignore_ascii_case(name))
            .map(|inner| Driver {
                inner: Arc::clone(inner),
            })
            .ok_or_else(|| RasterError::DriverNotFound(name.to_string()))
    }

    pub(crate) fn drivers() -> impl Iterator<Item = Driver> {
        Self::registry().iter().map(|inner| Driver {
            inner: Arc::clone(inner),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_prefers_create() {
        let both = DriverCapabilities::RASTER
            | DriverCapabilities::CREATE
            | DriverCapabilities::CREATE_COPY;
        assert_eq!(
            CreationStrategy::resolve(both),
            Some(CreationStrategy::Create)
        );
        assert_eq!(
            CreationStrategy::resolve(DriverCapabilities::RASTER | DriverCapabilities::CREATE),
            Some(CreationStrategy::Create)
        );
    }

    #[test]
    fn test_strategy_falls_back_to_copy() {
        assert_eq!(
            CreationStrategy::resolve(
                DriverCapabilities::RASTER | DriverCapabilities::CREATE_COPY
            ),
            Some(CreationStrategy::CreateCopy)
        );
    }

    #[test]
    fn test_strategy_unsupported() {
        assert_eq!(CreationStrategy::resolve(DriverCapabilities::RASTER), None);
        assert_eq!(CreationStrategy::resolve(DriverCapabilities::empty()), None);
    }

    #[test]
    fn test_unknown_driver_name() {
        assert!(matches!(
            DriverManager::get_driver_by_name("NOPE"),
            Err(RasterError::DriverNotFound(_))
        ));
    }
}

use crate::dataset::Dataset;
use crate::errors::{RasterError, Result};
use crate::raster::{Buffer, Pixel, RasterDataType};

/// Represents a single band of a dataset.
///
/// This object carries the lifetime of the dataset that contains it. This
/// is necessary to prevent the dataset from being dropped before the band.
pub struct RasterBand<'a> {
    dataset: &'a Dataset,
    /// One-based band index.
    index: usize,
}

impl<'a> RasterBand<'a> {
    pub(crate) fn new(dataset: &'a Dataset, index: usize) -> Self {
        RasterBand { dataset, index }
    }

    /// One-based index of this band within its dataset.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The pixel data type of this band.
    pub fn band_type(&self) -> RasterDataType {
        self.dataset.store().band_type(self.index - 1)
    }

    /// Get x-size of the band
    pub fn x_size(&self) -> usize {
        self.dataset.raster_size().0
    }

    /// Get y-size of the band
    pub fn y_size(&self) -> usize {
        self.dataset.raster_size().1
    }

    /// Get dimensions of the band.
    pub fn size(&self) -> (usize, usize) {
        (self.x_size(), self.y_size())
    }

    fn checked_window(
        &self,
        window: (isize, isize),
        size: (usize, usize),
    ) -> Result<(usize, usize)> {
        let (bx, by) = self.size();
        let in_bounds = window.0 >= 0
            && window.1 >= 0
            && window.0 as usize + size.0 <= bx
            && window.1 as usize + size.1 <= by;
        if !in_bounds {
            return Err(RasterError::BadArgument(format!(
                "window {window:?} + size {size:?} exceeds band extent {bx}x{by}"
            )));
        }
        Ok((window.0 as usize, window.1 as usize))
    }

    /// Read a type-erased region from this band.
    ///
    /// Returns `size.0 * size.1 * band_type().size_bytes()` native-endian
    /// bytes. This is the access path used by the conversion loop, which
    /// handles bands of any data type uniformly.
    ///
    /// # Arguments
    /// * window - the window position from top left
    /// * size - the window size
    pub fn read_raw(&self, window: (isize, isize), size: (usize, usize)) -> Result<Vec<u8>> {
        let window = self
            .checked_window(window, size)
            .map_err(|e| self.read_err(e))?;
        let mut out = vec![0u8; size.0 * size.1 * self.band_type().size_bytes()];
        self.dataset
            .store()
            .read_region(self.index - 1, window, size, &mut out)
            .map_err(|e| self.read_err(e))?;
        Ok(out)
    }

    /// Write a type-erased region to this band; the counterpart of
    /// [`read_raw`](RasterBand::read_raw).
    pub fn write_raw(
        &self,
        window: (isize, isize),
        size: (usize, usize),
        data: &[u8],
    ) -> Result<()> {
        self.dataset.ensure_writable().map_err(|e| self.write_err(e))?;
        let window = self
            .checked_window(window, size)
            .map_err(|e| self.write_err(e))?;
        let expected = size.0 * size.1 * self.band_type().size_bytes();
        if data.len() != expected {
            return Err(self.write_err(RasterError::BadArgument(format!(
                "expected {expected} bytes for {}x{} region, got {}",
                size.0,
                size.1,
                data.len()
            ))));
        }
        self.dataset
            .store()
            .write_region(self.index - 1, window, size, data)
            .map_err(|e| self.write_err(e))
    }

    /// Read data from this band into a slice. T implements [`Pixel`] and
    /// must match the band's data type.
    ///
    /// # Arguments
    /// * window - the window position from top left
    /// * size - the window size (length of `buffer` must equal its product)
    pub fn read_into_slice<T: Pixel>(
        &self,
        window: (isize, isize),
        size: (usize, usize),
        buffer: &mut [T],
    ) -> Result<()> {
        self.check_type::<T>().map_err(|e| self.read_err(e))?;
        let pixels = size.0 * size.1;
        assert_eq!(buffer.len(), pixels);

        let raw = self.read_raw(window, size)?;
        let width = T::data_type().size_bytes();
        for (value, chunk) in buffer.iter_mut().zip(raw.chunks_exact(width)) {
            *value = T::from_raw(chunk);
        }
        Ok(())
    }

    /// Read a [`Buffer<T>`] from this band. T implements [`Pixel`] and must
    /// match the band's data type.
    pub fn read_as<T: Pixel>(
        &self,
        window: (isize, isize),
        size: (usize, usize),
    ) -> Result<Buffer<T>> {
        let mut data = vec![T::default(); size.0 * size.1];
        self.read_into_slice(window, size, &mut data)?;
        Ok(Buffer::new(size, data))
    }

    /// Read the entire band.
    pub fn read_band_as<T: Pixel>(&self) -> Result<Buffer<T>> {
        self.read_as((0, 0), self.size())
    }

    /// Write a [`Buffer<T>`] into this band at `window`.
    pub fn write<T: Pixel>(&self, window: (isize, isize), buffer: &Buffer<T>) -> Result<()> {
        self.check_type::<T>().map_err(|e| self.write_err(e))?;
        let width = T::data_type().size_bytes();
        let mut raw = vec![0u8; buffer.data.len() * width];
        for (value, chunk) in buffer.data.iter().zip(raw.chunks_exact_mut(width)) {
            value.write_raw(chunk);
        }
        self.write_raw(window, buffer.size, &raw)
    }

    fn check_type<T: Pixel>(&self) -> Result<()> {
        let band_type = self.band_type();
        if T::data_type() != band_type {
            return Err(RasterError::BadArgument(format!(
                "requested pixel type {} does not match band type {band_type}",
                T::data_type()
            )));
        }
        Ok(())
    }

    fn read_err(&self, source: RasterError) -> RasterError {
        match source {
            e @ RasterError::ReadFailed { .. } => e,
            e => RasterError::ReadFailed {
                band: self.index,
                message: e.to_string(),
            },
        }
    }

    fn write_err(&self, source: RasterError) -> RasterError {
        match source {
            e @ RasterError::WriteFailed { .. } => e,
            e => RasterError::WriteFailed {
                band: self.index,
                message: e.to_string(),
            },
        }
    }
}

use crate::raster::Pixel;

#[cfg(feature = "array")]
use ndarray::Array2;

/// A 2-D pixel array backed by its `size` (cols, rows) and a row-major `Vec<T>`.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct Buffer<T> {
    pub size: (usize, usize),
    pub data: Vec<T>,
}

impl<T: Pixel> Buffer<T> {
    /// Construct a new buffer from `size` (`(cols, rows)`) and `Vec<T>`.
    ///
    /// # Panic
    /// Will panic if `size.0 * size.1 != data.len()`.
    pub fn new(size: (usize, usize), data: Vec<T>) -> Self {
        assert_eq!(
            size.0 * size.1,
            data.len(),
            "size {:?} does not match length {}",
            size,
            data.len()
        );
        Buffer { size, data }
    }

    /// A buffer of `size` filled with `T::default()`.
    pub fn zeroed(size: (usize, usize)) -> Self {
        Buffer {
            size,
            data: vec![T::default(); size.0 * size.1],
        }
    }

    #[cfg(feature = "array")]
    /// Convert `self` into an [`ndarray::Array2`].
    pub fn to_array(self) -> crate::errors::Result<Array2<T>> {
        // Array2 shape is (rows, cols) and Buffer shape is (cols in x-axis, rows in y-axis)
        Array2::from_shape_vec((self.size.1, self.size.0), self.data).map_err(|e| {
            crate::errors::RasterError::BadArgument(format!("buffer shape mismatch: {e}"))
        })
    }
}

pub type ByteBuffer = Buffer<u8>;

#[cfg(feature = "array")]
impl<T: Pixel> TryFrom<Buffer<T>> for Array2<T> {
    type Error = crate::errors::RasterError;

    fn try_from(value: Buffer<T>) -> Result<Self, Self::Error> {
        value.to_array()
    }
}

#[cfg(feature = "array")]
impl<T: Pixel> From<Array2<T>> for Buffer<T> {
    fn from(value: Array2<T>) -> Self {
        // Array2 shape is (rows, cols) and Buffer shape is (cols in x-axis, rows in y-axis)
        let shape = value.shape();
        let (rows, cols) = (shape[0], shape[1]);
        let data = value
            .as_standard_layout()
            .iter()
            .copied()
            .collect::<Vec<T>>();
        Buffer::new((cols, rows), data)
    }
}

#[cfg(test)]
mod tests {
    use crate::raster::Buffer;

    #[test]
    fn test_zeroed() {
        let b = Buffer::<u16>::zeroed((4, 3));
        assert_eq!(b.data.len(), 12);
        assert!(b.data.iter().all(|&v| v == 0));
    }

    #[test]
    #[should_panic]
    fn test_size_mismatch_panics() {
        let _ = Buffer::new((3, 3), vec![0u8; 8]);
    }

    #[cfg(feature = "array")]
    #[test]
    fn test_array_round_trip() {
        let b = Buffer::new((5, 10), (0i32..5 * 10).collect());
        let a = b.clone().to_array().unwrap();
        let b2: Buffer<_> = a.into();
        assert_eq!(b, b2);
    }
}

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::{RasterError, Result};

/// Per-band pixel data types.
///
/// This is a closed enumeration: band storage is always one of these tags,
/// never an open-ended dynamic type. The complex variants are representable
/// so datasets advertising them can be described, but they have no [`Pixel`]
/// mapping and the built-in drivers reject them at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterDataType {
    Unknown,
    /// Eight bit unsigned integer
    UInt8,
    /// Eight bit signed integer
    Int8,
    /// Sixteen bit unsigned integer
    UInt16,
    /// Sixteen bit signed integer
    Int16,
    /// Thirty two bit unsigned integer
    UInt32,
    /// Thirty two bit signed integer
    Int32,
    /// Sixty four bit unsigned integer
    UInt64,
    /// Sixty four bit signed integer
    Int64,
    /// Thirty two bit floating point
    Float32,
    /// Sixty four bit floating point
    Float64,
    /// Complex Int16
    CInt16,
    /// Complex Int32
    CInt32,
    /// Complex Float32
    CFloat32,
    /// Complex Float64
    CFloat64,
}

impl RasterDataType {
    /// Size of a single pixel of this type in bytes. Zero for `Unknown`.
    pub const fn size_bytes(&self) -> usize {
        use RasterDataType::*;
        match self {
            Unknown => 0,
            UInt8 | Int8 => 1,
            UInt16 | Int16 => 2,
            UInt32 | Int32 | Float32 | CInt16 => 4,
            UInt64 | Int64 | Float64 | CInt32 | CFloat32 => 8,
            CFloat64 => 16,
        }
    }

    pub const fn name(&self) -> &'static str {
        use RasterDataType::*;
        match self {
            Unknown => "Unknown",
            UInt8 => "UInt8",
            Int8 => "Int8",
            UInt16 => "UInt16",
            Int16 => "Int16",
            UInt32 => "UInt32",
            Int32 => "Int32",
            UInt64 => "UInt64",
            Int64 => "Int64",
            Float32 => "Float32",
            Float64 => "Float64",
            CInt16 => "CInt16",
            CInt32 => "CInt32",
            CFloat32 => "CFloat32",
            CFloat64 => "CFloat64",
        }
    }

    pub const fn is_signed(&self) -> bool {
        use RasterDataType::*;
        !matches!(self, Unknown | UInt8 | UInt16 | UInt32 | UInt64)
    }

    pub const fn is_floating(&self) -> bool {
        use RasterDataType::*;
        matches!(self, Float32 | Float64 | CFloat32 | CFloat64)
    }

    pub const fn is_complex(&self) -> bool {
        use RasterDataType::*;
        matches!(self, CInt16 | CInt32 | CFloat32 | CFloat64)
    }

    /// All tags except `Unknown`, in declaration order.
    pub const fn iter() -> [RasterDataType; 14] {
        use RasterDataType::*;
        [
            UInt8, Int8, UInt16, Int16, UInt32, Int32, UInt64, Int64, Float32, Float64, CInt16,
            CInt32, CFloat32, CFloat64,
        ]
    }

    /// Stable numeric tag used by the on-disk containers.
    pub(crate) const fn tag(&self) -> u16 {
        use RasterDataType::*;
        match self {
            Unknown => 0,
            UInt8 => 1,
            Int8 => 2,
            UInt16 => 3,
            Int16 => 4,
            UInt32 => 5,
            Int32 => 6,
            UInt64 => 7,
            Int64 => 8,
            Float32 => 9,
            Float64 => 10,
            CInt16 => 11,
            CInt32 => 12,
            CFloat32 => 13,
            CFloat64 => 14,
        }
    }

    pub(crate) fn from_tag(tag: u16) -> Option<RasterDataType> {
        RasterDataType::iter().into_iter().find(|t| t.tag() == tag)
    }
}

impl Display for RasterDataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RasterDataType {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        RasterDataType::iter()
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RasterError::BadArgument(format!("unknown data type name '{s}'")))
    }
}

/// Type-level constraint limiting which primitive numeric values can be
/// used for typed band I/O, and how they map to a [`RasterDataType`] tag.
pub trait Pixel: Copy + Default + Send + 'static {
    fn data_type() -> RasterDataType;
    fn from_raw(raw: &[u8]) -> Self;
    fn write_raw(self, out: &mut [u8]);
}

macro_rules! impl_pixel {
    ($rust:ty, $tag:expr) => {
        impl Pixel for $rust {
            fn data_type() -> RasterDataType {
                $tag
            }

            fn from_raw(raw: &[u8]) -> Self {
                let mut bytes = [0u8; std::mem::size_of::<$rust>()];
                bytes.copy_from_slice(raw);
                <$rust>::from_ne_bytes(bytes)
            }

            fn write_raw(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }
        }
    };
}

impl_pixel!(u8, RasterDataType::UInt8);
impl_pixel!(i8, RasterDataType::Int8);
impl_pixel!(u16, RasterDataType::UInt16);
impl_pixel!(i16, RasterDataType::Int16);
impl_pixel!(u32, RasterDataType::UInt32);
impl_pixel!(i32, RasterDataType::Int32);
impl_pixel!(u64, RasterDataType::UInt64);
impl_pixel!(i64, RasterDataType::Int64);
impl_pixel!(f32, RasterDataType::Float32);
impl_pixel!(f64, RasterDataType::Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(RasterDataType::UInt8.size_bytes(), 1);
        assert_eq!(RasterDataType::Int16.size_bytes(), 2);
        assert_eq!(RasterDataType::Float32.size_bytes(), 4);
        assert_eq!(RasterDataType::Float64.size_bytes(), 8);
        assert_eq!(RasterDataType::CFloat64.size_bytes(), 16);
        assert_eq!(RasterDataType::Unknown.size_bytes(), 0);
    }

    #[test]
    fn test_predicates() {
        assert!(RasterDataType::Int8.is_signed());
        assert!(!RasterDataType::UInt32.is_signed());
        assert!(RasterDataType::Float64.is_floating());
        assert!(!RasterDataType::Int32.is_floating());
        assert!(RasterDataType::CInt16.is_complex());
        assert!(!RasterDataType::Float32.is_complex());
    }

    #[test]
    fn test_tag_round_trip() {
        for t in RasterDataType::iter() {
            assert_eq!(RasterDataType::from_tag(t.tag()), Some(t));
        }
        assert_eq!(RasterDataType::from_tag(0), None);
        assert_eq!(RasterDataType::from_tag(999), None);
    }

    #[test]
    fn test_name_round_trip() {
        for t in RasterDataType::iter() {
            assert_eq!(t.name().parse::<RasterDataType>().unwrap(), t);
        }
        assert!("NoSuchType".parse::<RasterDataType>().is_err());
    }

    #[test]
    fn test_pixel_mapping() {
        assert_eq!(<u8 as Pixel>::data_type(), RasterDataType::UInt8);
        assert_eq!(<f64 as Pixel>::data_type(), RasterDataType::Float64);

        let mut raw = [0u8; 4];
        1234.5f32.write_raw(&mut raw);
        assert_eq!(f32::from_raw(&raw), 1234.5);
    }
}

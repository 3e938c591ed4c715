//! Flat band-sequential file container.
//!
//! A fixed 512-byte header followed by raw band-sequential pixel data at
//! final offsets, so partial output of an interrupted job is directly
//! observable on disk. Two registered personalities share the container:
//! `BSQ` (full creation support) and `SNAP` (copy-only snapshots).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::dataset::RasterStore;
use crate::driver::{DriverCapabilities, DriverImpl};
use crate::errors::{RasterError, Result};
use crate::geo_transform::GeoTransform;
use crate::options::{CreationOptionDef, CreationOptions, OptionType};
use crate::raster::RasterDataType;

const HEADER_LEN: usize = 512;
const FORMAT_VERSION: u16 = 1;
const PROJ_CAPACITY: usize = HEADER_LEN - PROJ_OFFSET;

// Fixed field offsets within the header.
const MAGIC_OFFSET: usize = 0;
const VERSION_OFFSET: usize = 4;
const TYPE_OFFSET: usize = 6;
const WIDTH_OFFSET: usize = 8;
const HEIGHT_OFFSET: usize = 16;
const BANDS_OFFSET: usize = 24;
const FLAGS_OFFSET: usize = 28;
const GEO_OFFSET: usize = 32;
const PROJ_LEN_OFFSET: usize = 80;
const PROJ_OFFSET: usize = 82;

const FLAG_GEO_TRANSFORM: u32 = 0x01;

/// Static description of one registered container personality.
pub(crate) struct FileProfile {
    short_name: &'static str,
    long_name: &'static str,
    magic: [u8; 4],
    capabilities: DriverCapabilities,
    creation_options: &'static [CreationOptionDef],
}

const BSQ_OPTIONS: &[CreationOptionDef] = &[CreationOptionDef {
    name: "FILL",
    option_type: OptionType::Int,
    default: Some("0"),
    allowed: &[],
}];

const BSQ_PROFILE: FileProfile = FileProfile {
    short_name: "BSQ",
    long_name: "Band-sequential raster",
    magic: *b"BSQr",
    capabilities: DriverCapabilities::RASTER
        .union(DriverCapabilities::CREATE)
        .union(DriverCapabilities::CREATE_COPY),
    creation_options: BSQ_OPTIONS,
};

const SNAP_PROFILE: FileProfile = FileProfile {
    short_name: "SNAP",
    long_name: "Band-sequential snapshot (copy only)",
    magic: *b"SNPr",
    capabilities: DriverCapabilities::RASTER.union(DriverCapabilities::CREATE_COPY),
    creation_options: &[],
};

pub(crate) struct FileDriver {
    profile: &'static FileProfile,
}

impl FileDriver {
    pub(crate) fn bsq() -> Self {
        FileDriver {
            profile: &BSQ_PROFILE,
        }
    }

    pub(crate) fn snap() -> Self {
        FileDriver {
            profile: &SNAP_PROFILE,
        }
    }
}

impl DriverImpl for FileDriver {
    fn short_name(&self) -> &'static str {
        self.profile.short_name
    }

    fn long_name(&self) -> &'static str {
        self.profile.long_name
    }

    fn capabilities(&self) -> DriverCapabilities {
        self.profile.capabilities
    }

    fn creation_option_defs(&self) -> &'static [CreationOptionDef] {
        self.profile.creation_options
    }

    fn identify(&self, path: &Path) -> bool {
        let mut magic = [0u8; 4];
        match File::open(path) {
            Ok(mut file) => file.read_exact(&mut magic).is_ok() && magic == self.profile.magic,
            Err(_) => false,
        }
    }

    fn open(&self, path: &Path, writable: bool) -> Result<Box<dyn RasterStore>> {
        let open_failed = |message: String| RasterError::OpenFailed {
            path: path.to_path_buf(),
            message,
        };
        let mut file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path)
            .map_err(|e| open_failed(e.to_string()))?;
        let mut raw = [0u8; HEADER_LEN];
        file.read_exact(&mut raw)
            .map_err(|e| open_failed(format!("truncated header: {e}")))?;
        let header = Header::decode(&raw, self.profile.magic).map_err(|e| open_failed(e.to_string()))?;
        Ok(Box::new(FileStore { file, header }))
    }

    fn create(
        &self,
        path: &Path,
        size: (usize, usize),
        bands: usize,
        data_type: RasterDataType,
        options: &CreationOptions,
    ) -> Result<Box<dyn RasterStore>> {
        let create_failed = |message: String| RasterError::CreateFailed {
            path: path.to_path_buf(),
            message,
        };
        let fill = match options.fetch_name_value("FILL") {
            Some(value) => value
                .parse::<u8>()
                .map_err(|_| RasterError::BadArgument(format!("FILL must be a byte value, got '{value}'")))?,
            None => 0,
        };

        let header = Header {
            magic: self.profile.magic,
            size,
            bands,
            data_type,
            projection: None,
            geo_transform: None,
        };
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| create_failed(e.to_string()))?;
        file.write_all(&header.encode()?)
            .map_err(|e| create_failed(e.to_string()))?;

        // Prefill the pixel area so every later region write lands at its
        // final offset.
        let mut remaining = size.0 * size.1 * data_type.size_bytes() * bands;
        let chunk = vec![fill; 64 * 1024];
        while remaining > 0 {
            let n = remaining.min(chunk.len());
            file.write_all(&chunk[..n])
                .map_err(|e| create_failed(e.to_string()))?;
            remaining -= n;
        }
        Ok(Box::new(FileStore { file, header }))
    }
}

#[derive(Debug, Clone)]
struct Header {
    magic: [u8; 4],
    size: (usize, usize),
    bands: usize,
    data_type: RasterDataType,
    projection: Option<String>,
    geo_transform: Option<GeoTransform>,
}

impl Header {
    fn encode(&self) -> Result<[u8; HEADER_LEN]> {
        let mut raw = [0u8; HEADER_LEN];
        raw[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(&self.magic);
        raw[VERSION_OFFSET..VERSION_OFFSET + 2].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        raw[TYPE_OFFSET..TYPE_OFFSET + 2].copy_from_slice(&self.data_type.tag().to_le_bytes());
        raw[WIDTH_OFFSET..WIDTH_OFFSET + 8].copy_from_slice(&(self.size.0 as u64).to_le_bytes());
        raw[HEIGHT_OFFSET..HEIGHT_OFFSET + 8].copy_from_slice(&(self.size.1 as u64).to_le_bytes());
        raw[BANDS_OFFSET..BANDS_OFFSET + 4].copy_from_slice(&(self.bands as u32).to_le_bytes());
        let mut flags = 0u32;
        if let Some(gt) = &self.geo_transform {
            flags |= FLAG_GEO_TRANSFORM;
            for (i, coefficient) in gt.iter().enumerate() {
                let at = GEO_OFFSET + i * 8;
                raw[at..at + 8].copy_from_slice(&coefficient.to_le_bytes());
            }
        }
        raw[FLAGS_OFFSET..FLAGS_OFFSET + 4].copy_from_slice(&flags.to_le_bytes());
        if let Some(projection) = &self.projection {
            let bytes = projection.as_bytes();
            if bytes.len() > PROJ_CAPACITY {
                return Err(RasterError::BadArgument(format!(
                    "projection string of {} bytes exceeds header capacity of {PROJ_CAPACITY}",
                    bytes.len()
                )));
            }
            raw[PROJ_LEN_OFFSET..PROJ_LEN_OFFSET + 2]
                .copy_from_slice(&(bytes.len() as u16).to_le_bytes());
            raw[PROJ_OFFSET..PROJ_OFFSET + bytes.len()].copy_from_slice(bytes);
        }
        Ok(raw)
    }

    fn decode(raw: &[u8; HEADER_LEN], expected_magic: [u8; 4]) -> Result<Header> {
        let bad = |message: String| RasterError::BadArgument(message);
        let magic: [u8; 4] = raw[MAGIC_OFFSET..MAGIC_OFFSET + 4].try_into().unwrap();
        if magic != expected_magic {
            return Err(bad("magic number mismatch".to_string()));
        }
        let version = u16::from_le_bytes(raw[VERSION_OFFSET..VERSION_OFFSET + 2].try_into().unwrap());
        if version != FORMAT_VERSION {
            return Err(bad(format!("unsupported container version {version}")));
        }
        let tag = u16::from_le_bytes(raw[TYPE_OFFSET..TYPE_OFFSET + 2].try_into().unwrap());
        let data_type = RasterDataType::from_tag(tag)
            .ok_or_else(|| bad(format!("unknown data type tag {tag}")))?;
        let width = u64::from_le_bytes(raw[WIDTH_OFFSET..WIDTH_OFFSET + 8].try_into().unwrap());
        let height = u64::from_le_bytes(raw[HEIGHT_OFFSET..HEIGHT_OFFSET + 8].try_into().unwrap());
        let bands = u32::from_le_bytes(raw[BANDS_OFFSET..BANDS_OFFSET + 4].try_into().unwrap());
        let flags = u32::from_le_bytes(raw[FLAGS_OFFSET..FLAGS_OFFSET + 4].try_into().unwrap());

        let geo_transform = if flags & FLAG_GEO_TRANSFORM != 0 {
            let mut gt: GeoTransform = [0.0; 6];
            for (i, coefficient) in gt.iter_mut().enumerate() {
                let at = GEO_OFFSET + i * 8;
                *coefficient = f64::from_le_bytes(raw[at..at + 8].try_into().unwrap());
            }
            Some(gt)
        } else {
            None
        };

        let proj_len =
            u16::from_le_bytes(raw[PROJ_LEN_OFFSET..PROJ_LEN_OFFSET + 2].try_into().unwrap())
                as usize;
        let projection = if proj_len > 0 {
            if proj_len > PROJ_CAPACITY {
                return Err(bad(format!("corrupt projection length {proj_len}")));
            }
            let text = std::str::from_utf8(&raw[PROJ_OFFSET..PROJ_OFFSET + proj_len])
                .map_err(|e| bad(format!("projection is not valid UTF-8: {e}")))?;
            Some(text.to_string())
        } else {
            None
        };

        Ok(Header {
            magic,
            size: (width as usize, height as usize),
            bands: bands as usize,
            data_type,
            projection,
            geo_transform,
        })
    }
}

struct FileStore {
    file: File,
    header: Header,
}

impl FileStore {
    fn rewrite_header(&mut self) -> Result<()> {
        let raw = self.header.encode()?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&raw)?;
        Ok(())
    }

    fn region_offsets(
        &self,
        band_index: usize,
        window: (usize, usize),
        size: (usize, usize),
        len: usize,
    ) -> Result<RegionOffsets> {
        let (width, height) = self.header.size;
        if band_index >= self.header.bands {
            return Err(RasterError::BadArgument(format!(
                "band index {band_index} out of range"
            )));
        }
        if window.0 + size.0 > width || window.1 + size.1 > height {
            return Err(RasterError::BadArgument(format!(
                "region {window:?}+{size:?} exceeds raster extent {width}x{height}"
            )));
        }
        let bpp = self.header.data_type.size_bytes();
        let expected = size.0 * size.1 * bpp;
        if len != expected {
            return Err(RasterError::BadArgument(format!(
                "region buffer holds {len} bytes, expected {expected}"
            )));
        }
        let band_bytes = width * height * bpp;
        Ok(RegionOffsets {
            start: (HEADER_LEN + band_index * band_bytes + window.1 * width * bpp + window.0 * bpp)
                as u64,
            stride: (width * bpp) as u64,
            row_bytes: size.0 * bpp,
            rows: size.1,
        })
    }
}

struct RegionOffsets {
    start: u64,
    stride: u64,
    row_bytes: usize,
    rows: usize,
}

impl RasterStore for FileStore {
    fn size(&self) -> (usize, usize) {
        self.header.size
    }

    fn band_count(&self) -> usize {
        self.header.bands
    }

    fn band_type(&self, _band_index: usize) -> RasterDataType {
        self.header.data_type
    }

    fn projection(&self) -> Option<String> {
        self.header.projection.clone()
    }

    fn set_projection(&mut self, projection: &str) -> Result<()> {
        self.header.projection = Some(projection.to_string());
        self.rewrite_header()
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.header.geo_transform
    }

    fn set_geo_transform(&mut self, transform: &GeoTransform) -> Result<()> {
        self.header.geo_transform = Some(*transform);
        self.rewrite_header()
    }

    fn read_region(
        &mut self,
        band_index: usize,
        window: (usize, usize),
        size: (usize, usize),
        out: &mut [u8],
    ) -> Result<()> {
        let offsets = self.region_offsets(band_index, window, size, out.len())?;
        for row in 0..offsets.rows {
            self.file
                .seek(SeekFrom::Start(offsets.start + row as u64 * offsets.stride))?;
            self.file
                .read_exact(&mut out[row * offsets.row_bytes..(row + 1) * offsets.row_bytes])?;
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
        let offsets = self.region_offsets(band_index, window, size, data.len())?;
        for row in 0..offsets.rows {
            self.file
                .seek(SeekFrom::Start(offsets.start + row as u64 * offsets.stride))?;
            self.file
                .write_all(&data[row * offsets.row_bytes..(row + 1) * offsets.row_bytes])?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            magic: *b"BSQr",
            size: (600, 400),
            bands: 3,
            data_type: RasterDataType::UInt8,
            projection: Some("EPSG:32633".to_string()),
            geo_transform: Some([1000.0, 10.0, 0.0, 2000.0, 0.0, -10.0]),
        }
    }

    #[test]
    fn test_header_round_trip() {
        let header = sample_header();
        let raw = header.encode().unwrap();
        let decoded = Header::decode(&raw, *b"BSQr").unwrap();
        assert_eq!(decoded.size, (600, 400));
        assert_eq!(decoded.bands, 3);
        assert_eq!(decoded.data_type, RasterDataType::UInt8);
        assert_eq!(decoded.projection.as_deref(), Some("EPSG:32633"));
        assert_eq!(decoded.geo_transform, header.geo_transform);
    }

    #[test]
    fn test_header_without_metadata() {
        let mut header = sample_header();
        header.projection = None;
        header.geo_transform = None;
        let raw = header.encode().unwrap();
        let decoded = Header::decode(&raw, *b"BSQr").unwrap();
        assert_eq!(decoded.projection, None);
        assert_eq!(decoded.geo_transform, None);
    }

    #[test]
    fn test_header_magic_mismatch() {
        let raw = sample_header().encode().unwrap();
        assert!(Header::decode(&raw, *b"SNPr").is_err());
    }

    #[test]
    fn test_projection_capacity() {
        let mut header = sample_header();
        header.projection = Some("x".repeat(PROJ_CAPACITY + 1));
        assert!(header.encode().is_err());
    }
}

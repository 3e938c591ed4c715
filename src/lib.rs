//! Tiled raster dataset conversion.
//!
//! `rastile` opens multi-band raster datasets through a registry of format
//! drivers and converts them between formats with a tiled
//! read → transform → write pipeline: capability-based strategy selection,
//! a pluggable per-tile processor running on a bounded worker pool,
//! progress/ETA reporting and cooperative cancellation.
//!
//! ## Use
//!
//! ```
//! use rastile::convert::{Conversion, ConversionJob};
//! use rastile::Driver;
//!
//! # fn main() -> rastile::errors::Result<()> {
//! # let dir = std::env::temp_dir();
//! # let src_path = dir.join("rastile-doc-src.bsq");
//! # let dst_path = dir.join("rastile-doc-dst.bsq");
//! // A small dataset to convert.
//! let driver = Driver::get("BSQ")?;
//! let src = driver.create(&src_path, 64, 48, 3)?;
//! drop(src);
//!
//! let job = ConversionJob::new(&src_path, &dst_path, "BSQ");
//! let conversion = Conversion::new(job);
//! let message = conversion.run(&())?;
//! assert!(message.contains("completed"));
//! # std::fs::remove_file(&src_path).ok();
//! # std::fs::remove_file(&dst_path).ok();
//! # Ok(())
//! # }
//! ```

pub mod convert;
mod dataset;
mod driver;
mod drivers;
pub mod errors;
mod geo_transform;
mod options;
pub mod raster;
mod workqueue;

#[cfg(test)]
pub(crate) mod test_utils;

pub use dataset::Dataset;
pub use driver::{CreationStrategy, Driver, DriverCapabilities, DriverManager, ProgressFn};
pub use geo_transform::{GeoTransform, GeoTransformEx};
pub use options::{
    validate_creation_options, CreationOptionDef, CreationOptions, DatasetOptions, OpenFlags,
    OptionType,
};

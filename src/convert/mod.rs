//! Tiled dataset conversion.
//!
//! [`Conversion`] drives one job: open the source, resolve the destination
//! driver's creation strategy, then either stream tiles through the
//! read/transform/write loop or hand the whole copy to the driver. The
//! host observes the job through a [`ConvertSink`] (log lines, progress
//! fractions, one finished signal) and may cancel it at any time through
//! the job's [`CancelToken`].

mod processor;
mod progress;

pub use processor::{BandBuffer, IdentityProcessor, TileProcessor};
pub use progress::{estimate_remaining, CancelToken, ProgressReporter};

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};

use crate::dataset::Dataset;
use crate::driver::{CreationStrategy, Driver, DriverManager};
use crate::errors::{RasterError, Result};
use crate::options::CreationOptions;
use crate::raster::{Tile, TileLayout, DEFAULT_TILE_SIZE};
use crate::workqueue::WorkQueue;

/// How tile data is transformed between read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    #[default]
    Cpu,
    /// Accepted for forward compatibility; always fails with
    /// [`RasterError::GpuNotImplemented`].
    Gpu,
}

impl Display for ProcessingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingMode::Cpu => f.write_str("CPU"),
            ProcessingMode::Gpu => f.write_str("GPU"),
        }
    }
}

/// Everything describing one conversion run. Immutable once the job has
/// been handed to [`Conversion::run`].
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub src_path: PathBuf,
    pub dst_path: PathBuf,
    /// Destination driver short name.
    pub driver_name: String,
    pub options: CreationOptions,
    pub mode: ProcessingMode,
    /// Size of the per-tile processing pool.
    pub worker_count: usize,
    pub tile_size: (usize, usize),
}

impl ConversionJob {
    /// A job with default options: CPU mode, 256x256 tiles, and one worker
    /// per available core.
    pub fn new(
        src_path: impl Into<PathBuf>,
        dst_path: impl Into<PathBuf>,
        driver_name: impl Into<String>,
    ) -> Self {
        ConversionJob {
            src_path: src_path.into(),
            dst_path: dst_path.into(),
            driver_name: driver_name.into(),
            options: CreationOptions::new(),
            mode: ProcessingMode::Cpu,
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            tile_size: (DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE),
        }
    }
}

/// Receives the observable signals of a running job.
///
/// Log messages are informational strings with no parsing contract.
/// Progress fractions are in `[0, 1]` and non-decreasing within one job.
/// `finished` is emitted exactly once per job, after which no further
/// signals follow.
pub trait ConvertSink {
    fn log(&self, _message: &str) {}
    fn progress(&self, _fraction: f64) {}
    fn finished(&self, _success: bool, _message: &str) {}
}

/// A sink that discards everything.
impl ConvertSink for () {}

/// One conversion run; see the [module docs](self).
pub struct Conversion {
    job: ConversionJob,
    cancel: CancelToken,
    processor: Arc<dyn TileProcessor>,
}

impl Conversion {
    pub fn new(job: ConversionJob) -> Self {
        Conversion {
            job,
            cancel: CancelToken::new(),
            processor: Arc::new(IdentityProcessor),
        }
    }

    /// Replaces the baseline identity processor.
    pub fn with_processor(mut self, processor: Arc<dyn TileProcessor>) -> Self {
        self.processor = processor;
        self
    }

    /// A handle the host can use to cancel this job from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the job to its terminal state.
    ///
    /// Emits exactly one `finished` signal through `sink` and returns the
    /// same outcome: the success message, or the error that terminated the
    /// job ([`RasterError::Cancelled`] for a user cancellation).
    pub fn run(&self, sink: &dyn ConvertSink) -> Result<String> {
        let outcome = self.execute(sink);
        match &outcome {
            Ok(message) => sink.finished(true, message),
            Err(e) => sink.finished(false, &e.to_string()),
        }
        outcome
    }

    fn execute(&self, sink: &dyn ConvertSink) -> Result<String> {
        let job = &self.job;
        sink.log("Starting conversion...");
        sink.log(&format!("Processing mode: {}", job.mode));
        if job.mode == ProcessingMode::Gpu {
            return Err(RasterError::GpuNotImplemented);
        }

        let src = Dataset::open(&job.src_path)?;
        let (width, height) = src.raster_size();
        sink.log(&format!(
            "Source opened: {width}x{height}, {} band(s)",
            src.raster_count()
        ));

        let driver = DriverManager::get_driver_by_name(&job.driver_name)?;
        sink.log(&format!("Destination driver found: {}", driver.short_name()));
        for (key, value) in job.options.iter() {
            sink.log(&format!("Setting creation option: {key} = {value}"));
        }

        match driver.creation_strategy()? {
            CreationStrategy::Create => self.run_tiled(&src, &driver, sink),
            CreationStrategy::CreateCopy => self.run_driver_copy(&src, &driver, sink),
        }
    }

    /// Full-control path: create an empty destination and stream every
    /// tile through read, transform, write.
    fn run_tiled(&self, src: &Dataset, driver: &Driver, sink: &dyn ConvertSink) -> Result<String> {
        let job = &self.job;
        sink.log("Using Create method.");

        let band_count = src.raster_count();
        if band_count == 0 {
            return Err(RasterError::BadArgument(
                "source dataset has no raster bands".to_string(),
            ));
        }
        let data_type = src.rasterband(1)?.band_type();
        let size = src.raster_size();

        let dst = driver.create_with_options(&job.dst_path, size, band_count, data_type, &job.options)?;

        // Georeferencing is copied best-effort; a source without it is fine.
        if let Some(projection) = src.projection() {
            if let Err(e) = dst.set_projection(&projection) {
                warn!("could not copy projection: {e}");
            }
        }
        if let Ok(gt) = src.geo_transform() {
            if let Err(e) = dst.set_geo_transform(&gt) {
                warn!("could not copy geo-transform: {e}");
            }
        }

        let layout = TileLayout::new(size, job.tile_size)?;
        let total = layout.tile_count();
        let reporter = ProgressReporter::new(total);
        let pool = WorkQueue::new(job.worker_count);
        sink.log(&format!(
            "Starting tile processing: {total} tile(s) using {} worker(s)...",
            job.worker_count.max(1)
        ));

        for tile in layout.iter() {
            if self.cancel.is_cancelled() {
                return Err(RasterError::Cancelled);
            }

            // All I/O stays on this thread; only the transform runs on the
            // pool, one in-flight invocation at a time.
            let mut bands = Vec::with_capacity(band_count);
            for band_index in 1..=band_count {
                let band = src.rasterband(band_index)?;
                bands.push(BandBuffer {
                    data_type: band.band_type(),
                    data: band.read_raw(tile.window(), tile.size())?,
                });
            }
            let bands = self.process_on_pool(&pool, tile, bands)?;

            if self.cancel.is_cancelled() {
                return Err(RasterError::Cancelled);
            }
            for (band_index, buffer) in bands.iter().enumerate() {
                let band = dst.rasterband(band_index + 1)?;
                band.write_raw(tile.window(), tile.size(), &buffer.data)?;
            }

            let fraction = reporter.complete_one();
            sink.progress(fraction);
            debug!(
                "tile {}/{total} done, eta {:?}",
                reporter.completed(),
                reporter.eta()
            );
        }

        dst.flush_cache()?;
        Ok(format!(
            "Conversion completed successfully: {}",
            job.dst_path.display()
        ))
    }

    /// Submits one tile to the worker pool and blocks until the transform
    /// hands the buffers back.
    fn process_on_pool(
        &self,
        pool: &WorkQueue,
        tile: Tile,
        mut bands: Vec<BandBuffer>,
    ) -> Result<Vec<BandBuffer>> {
        let processor = Arc::clone(&self.processor);
        let token = self.cancel.clone();
        pool.execute(move || {
            processor.process(&tile, &mut bands, &token)?;
            Ok(bands)
        })
        .recv()
        .map_err(|_| {
            RasterError::BadArgument("tile processing worker terminated unexpectedly".to_string())
        })?
    }

    /// Streaming-copy path: the driver owns the loop; its progress
    /// callback is the only suspension and cancellation point.
    fn run_driver_copy(
        &self,
        src: &Dataset,
        driver: &Driver,
        sink: &dyn ConvertSink,
    ) -> Result<String> {
        let job = &self.job;
        sink.log("Using CreateCopy method.");

        let token = self.cancel.clone();
        let started = Instant::now();
        let mut forward = |fraction: f64, _message: &str| {
            if token.is_cancelled() {
                return false;
            }
            sink.progress(fraction);
            debug!(
                "copy {:.1}% done, eta {:?}",
                fraction * 100.0,
                estimate_remaining(fraction, started.elapsed())
            );
            true
        };
        match driver.create_copy(&job.dst_path, src, &job.options, Some(&mut forward)) {
            Ok(dst) => {
                dst.flush_cache()?;
                Ok(format!(
                    "Conversion completed successfully: {}",
                    job.dst_path.display()
                ))
            }
            Err(_) if self.cancel.is_cancelled() => Err(RasterError::Cancelled),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_defaults() {
        let job = ConversionJob::new("in.bsq", "out.bsq", "BSQ");
        assert_eq!(job.mode, ProcessingMode::Cpu);
        assert_eq!(job.tile_size, (256, 256));
        assert!(job.worker_count >= 1);
        assert!(job.options.is_empty());
    }

    #[test]
    fn test_gpu_mode_is_rejected_up_front() {
        // The source path does not exist; GPU rejection must come first.
        let mut job = ConversionJob::new("/no/such/input", "/no/such/output", "BSQ");
        job.mode = ProcessingMode::Gpu;
        let got = Conversion::new(job).run(&());
        assert!(matches!(got, Err(RasterError::GpuNotImplemented)));
    }

    #[test]
    fn test_missing_source_is_an_open_failure() {
        let job = ConversionJob::new("/no/such/input", "/tmp/never-created", "BSQ");
        let got = Conversion::new(job).run(&());
        assert!(matches!(got, Err(RasterError::OpenFailed { .. })));
    }
}

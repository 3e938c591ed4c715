//! Progress accounting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Estimated time remaining for a job at `fraction` completion after
/// `elapsed` wall time: `elapsed * (1/fraction - 1)`.
///
/// Returns `None` ("unknown") for fractions outside `(0, 1]`, where the
/// extrapolation would divide by zero or go negative.
pub fn estimate_remaining(fraction: f64, elapsed: Duration) -> Option<Duration> {
    if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
        return None;
    }
    Some(elapsed.mul_f64(1.0 / fraction - 1.0))
}

/// Tracks completed work units out of a precomputed total.
///
/// The completed counter may be read from any thread; it is written by the
/// orchestration loop only. The ETA is recomputed from scratch on every
/// call, never cached.
#[derive(Debug)]
pub struct ProgressReporter {
    started: Instant,
    total: usize,
    completed: AtomicUsize,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        ProgressReporter {
            started: Instant::now(),
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Marks one unit complete and returns the new fraction.
    pub fn complete_one(&self) -> f64 {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        done as f64 / self.total.max(1) as f64
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn fraction(&self) -> f64 {
        self.completed() as f64 / self.total.max(1) as f64
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Estimated time remaining, or `None` while nothing has completed.
    pub fn eta(&self) -> Option<Duration> {
        estimate_remaining(self.fraction(), self.elapsed())
    }
}

/// A shared cancellation flag.
///
/// Settable once from any thread; polled by the conversion loop at tile
/// boundaries and inside the driver-copy progress callback. There is no
/// way to unset it: a cancelled job cannot resume.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Default::default()
    }

    /// Requests cancellation. Advisory: takes effect at the next polled
    /// suspension point.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

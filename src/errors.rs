//! Error types and the crate-wide [`Result`] alias.

use std::path::PathBuf;

use thiserror::Error;

/// Error variants produced throughout the crate.
///
/// Every failure is detected synchronously at the point it occurs and
/// terminates the operation that raised it; nothing is retried internally.
/// Messages carry the lowest-level diagnostic available from the failing
/// call.
#[derive(Debug, Error)]
pub enum RasterError {
    /// The source dataset could not be opened.
    #[error("failed to open dataset '{path}': {message}")]
    OpenFailed { path: PathBuf, message: String },
    /// No registered driver matches the requested short name.
    #[error("no driver registered with name '{0}'")]
    DriverNotFound(String),
    /// The destination driver supports neither creation path.
    #[error("driver '{driver}' supports neither Create nor CreateCopy")]
    NoCreationSupport { driver: String },
    /// The destination dataset could not be created.
    #[error("failed to create dataset '{path}': {message}")]
    CreateFailed { path: PathBuf, message: String },
    /// A band read failed, aborting the surrounding operation.
    #[error("failed to read from band {band}: {message}")]
    ReadFailed { band: usize, message: String },
    /// A band write failed, aborting the surrounding operation.
    #[error("failed to write to band {band}: {message}")]
    WriteFailed { band: usize, message: String },
    /// The GPU processing mode was requested; no GPU path exists.
    #[error("GPU processing is not yet implemented")]
    GpuNotImplemented,
    /// The job was cancelled through its [`CancelToken`].
    ///
    /// Not a true error: a distinct terminal outcome hosts can match on
    /// instead of conflating it with an I/O failure.
    ///
    /// [`CancelToken`]: crate::convert::CancelToken
    #[error("conversion cancelled by user")]
    Cancelled,
    /// An argument failed validation.
    #[error("invalid argument: {0}")]
    BadArgument(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = RasterError> = std::result::Result<T, E>;

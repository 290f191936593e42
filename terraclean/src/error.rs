//! Error types for the terraclean library.

use thiserror::Error;

/// Errors that can occur while classifying sections.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error when reading tiles, settings or region folders.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A range was built with its upper bound below its lower bound.
    #[error("Invalid range: [{lower}, {upper}] (upper bound is below lower bound)")]
    InvalidRange { lower: i64, upper: i64 },

    /// A point lies outside of what the projection or elevation source covers.
    #[error("Out of coverage: ({a}, {b})")]
    OutOfCoverage { a: f64, b: f64 },

    /// File size doesn't match SRTM1 or SRTM3 format.
    #[error("Invalid file size: {size} bytes (expected 25934402 for SRTM1 or 2884802 for SRTM3)")]
    InvalidFileSize { size: usize },

    /// A file name does not follow the `x.y.z.3dr` convention.
    #[error("Not a 3D region file name: {name}")]
    InvalidFilename { name: String },

    /// World settings or classifier parameters are unusable.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// World settings could not be parsed.
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A worker pool could not be started.
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The classifier was terminated before the work completed.
    #[error("Classifier terminated")]
    Terminated,
}

impl Error {
    /// Whether this error only means a single sample point is not covered.
    pub fn is_out_of_coverage(&self) -> bool {
        matches!(self, Error::OutOfCoverage { .. })
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

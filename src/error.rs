//! Error types for the head pointer library.

use serde::Serialize;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or out-of-range configuration value
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Calibration run aborted
    #[error("Calibration failed: {0}")]
    Calibration(#[from] CalibrationFailure),

    /// Platform cursor move or click failed
    #[error("Cursor actuation error: {0}")]
    Actuation(String),

    /// `X11` window system operation failed
    #[error("X11 error: {0}")]
    X11(String),

    /// Encoding or decoding of a persisted document failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Reasons a calibration run can abort. No partial calibration is kept.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationFailure {
    /// The collection window closed before enough detected frames arrived
    #[error("insufficient samples for point {point}: collected {collected} of {required}")]
    InsufficientSamples {
        /// Zero-based index of the calibration point
        point: usize,
        /// Samples gathered before the window closed
        collected: usize,
        /// Samples required per point
        required: usize,
    },

    /// The point pairs used for the fit do not define an invertible mapping
    #[error("degenerate calibration fit: {0}")]
    DegenerateFit(String),

    /// The user or the application cancelled the run
    #[error("calibration cancelled")]
    Cancelled,

    /// An operation was requested in a phase that does not accept it
    #[error("invalid calibration state: {0}")]
    InvalidState(String),

    /// The fitted calibration could not be written to disk
    #[error("failed to save calibration: {0}")]
    Persistence(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

//! Persisted calibration record.

use super::{transform::AffineTransform, QualityMetrics, ScreenPoint};
use crate::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Default calibration file name
pub const CALIBRATION_FILENAME: &str = "calibration.json";

/// On-disk calibration document.
///
/// A record with no matrix means "not calibrated".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// UNIX time of the run, in seconds
    pub timestamp: f64,
    /// Eye-to-screen affine matrix
    pub matrix: Option<[[f32; 3]; 2]>,
    pub grid_size: (usize, usize),
    pub calibration_points: Vec<ScreenPoint>,
    /// Number of calibrated points
    pub sample_count: usize,
    pub quality_metrics: QualityMetrics,
}

impl Default for CalibrationRecord {
    fn default() -> Self {
        Self {
            timestamp: 0.0,
            matrix: None,
            grid_size: crate::constants::CALIBRATION_GRID,
            calibration_points: Vec::new(),
            sample_count: 0,
            quality_metrics: QualityMetrics::default(),
        }
    }
}

impl CalibrationRecord {
    /// The stored mapping, if present and usable
    #[must_use]
    pub fn transform(&self) -> Option<AffineTransform> {
        let matrix = self.matrix?;
        match AffineTransform::from_matrix(matrix) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("Ignoring stored calibration matrix: {}", e);
                None
            }
        }
    }

    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.transform().is_some()
    }
}

/// Reads and writes a `CalibrationRecord` as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the record, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or encoded.
    pub fn save(&self, record: &CalibrationRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, record)?;
        info!("Saved calibration to {}", self.path.display());
        Ok(())
    }

    /// Load the record; `Ok(None)` when no calibration has been saved yet
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn load(&self) -> Result<Option<CalibrationRecord>> {
        if !self.path.exists() {
            info!("No calibration file found at {}", self.path.display());
            return Ok(None);
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let record: CalibrationRecord = serde_json::from_reader(reader)?;
        info!("Loaded calibration from {}", self.path.display());
        Ok(Some(record))
    }

    /// Remove the stored record if one exists
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Removed calibration file {}", self.path.display());
        }
        Ok(())
    }
}

//! Continuous 2D control signal derived from face landmarks.
//!
//! Without calibration the signal is the raw head pose (nose tip relative to
//! the outer eye corners), optionally re-centred on a neutral baseline. With a
//! calibration mapping installed, the eye midpoint is mapped to a screen point
//! and expressed as the deviation that makes the cursor loop target exactly
//! that point.

use crate::{
    calibration::AffineTransform, geometry::Point, landmarks::LandmarkSet,
    utils::normalize_coordinates,
};
use log::{debug, info};

#[derive(Debug, Clone)]
pub struct DeviationExtractor {
    screen: (u32, u32),
    rest: Point,
    sensitivity: f64,
    baseline: Option<Point>,
    calibration: Option<AffineTransform>,
}

impl DeviationExtractor {
    /// `sensitivity` must match the cursor loop's so calibrated targets line up
    #[must_use]
    pub fn new(screen_width: u32, screen_height: u32, sensitivity: f64) -> Self {
        Self {
            screen: (screen_width, screen_height),
            rest: (
                f64::from(screen_width / 2),
                f64::from(screen_height / 2),
            ),
            sensitivity,
            baseline: None,
            calibration: None,
        }
    }

    pub fn install_calibration(&mut self, transform: AffineTransform) {
        info!("Gaze mapping enabled");
        self.calibration = Some(transform);
    }

    pub fn clear_calibration(&mut self) {
        if self.calibration.take().is_some() {
            info!("Gaze mapping disabled, using head pose");
        }
    }

    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Treat the current head pose as neutral
    pub fn capture_baseline(&mut self, landmarks: &LandmarkSet) {
        let pose = landmarks.head_pose();
        debug!("Neutral head pose captured: ({:.4}, {:.4})", pose.0, pose.1);
        self.baseline = Some(pose);
    }

    pub fn clear_baseline(&mut self) {
        self.baseline = None;
    }

    pub const fn baseline(&self) -> Option<Point> {
        self.baseline
    }

    /// Deviation for one frame, in normalized units
    #[must_use]
    pub fn extract(&self, landmarks: &LandmarkSet) -> Point {
        match &self.calibration {
            Some(mapping) => self.gaze_deviation(mapping.apply(landmarks.eye_midpoint())),
            None => {
                let (h, v) = landmarks.head_pose();
                let (bh, bv) = self.baseline.unwrap_or((0.0, 0.0));
                (h - bh, v - bv)
            }
        }
    }

    // Inverse of the cursor loop's target formula
    fn gaze_deviation(&self, screen_point: Point) -> Point {
        let (nx, ny) = normalize_coordinates(
            screen_point.0 - self.rest.0,
            screen_point.1 - self.rest.1,
            self.screen.0,
            self.screen.1,
        );
        (nx / self.sensitivity, ny / self.sensitivity)
    }
}

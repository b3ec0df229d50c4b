//! Movement classification over a rolling window of 2D positions.
//!
//! `LinearMovementDetector` flags straight-line sweeps and remembers their
//! direction; `FixationDetector` flags a signal that stays put.

use crate::{
    buffer::RollingBuffer,
    geometry::{angle, centroid, detect_fixation, is_linear_movement, Point},
    Result,
};

/// Tracks whether recent positions follow a straight line
#[derive(Debug, Clone)]
pub struct LinearMovementDetector {
    threshold: f64,
    points: RollingBuffer<Point>,
    is_linear: bool,
    last_direction: Option<f64>,
}

impl LinearMovementDetector {
    /// Create a detector over `window_size` points
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `window_size` is zero.
    pub fn new(window_size: usize, threshold: f64) -> Result<Self> {
        Ok(Self {
            threshold,
            points: RollingBuffer::new(window_size)?,
            is_linear: false,
            last_direction: None,
        })
    }

    /// Add a point and re-classify the window
    pub fn add_point(&mut self, point: Point) -> bool {
        self.points.push(point);
        if self.points.len() < 3 {
            return false;
        }

        let window = self.points.snapshot();
        self.is_linear = is_linear_movement(&window, self.threshold);
        if self.is_linear {
            if let (Some(&first), Some(&last)) = (window.first(), window.last()) {
                self.last_direction = Some(angle(first, last));
            }
        }
        self.is_linear
    }

    pub const fn is_linear(&self) -> bool {
        self.is_linear
    }

    /// Direction of the last linear sweep, in radians
    pub const fn last_direction(&self) -> Option<f64> {
        self.last_direction
    }

    /// Net displacement across the window while moving linearly
    #[must_use]
    pub fn movement_vector(&self) -> Option<Point> {
        if !self.is_linear {
            return None;
        }
        let start = self.points.iter().next()?;
        let end = self.points.latest()?;
        Some((end.0 - start.0, end.1 - start.1))
    }

    pub fn reset(&mut self) {
        self.points.clear();
        self.is_linear = false;
        self.last_direction = None;
    }
}

/// Tracks whether recent positions stay inside a small circle
#[derive(Debug, Clone)]
pub struct FixationDetector {
    radius: f64,
    min_samples: usize,
    points: RollingBuffer<Point>,
}

impl FixationDetector {
    /// Create a detector; the window holds `min_samples` points
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `min_samples` is zero.
    pub fn new(radius: f64, min_samples: usize) -> Result<Self> {
        Ok(Self {
            radius,
            min_samples,
            points: RollingBuffer::new(min_samples)?,
        })
    }

    pub fn add_point(&mut self, point: Point) -> bool {
        self.points.push(point);
        self.is_fixating()
    }

    #[must_use]
    pub fn is_fixating(&self) -> bool {
        detect_fixation(&self.points.snapshot(), self.radius, self.min_samples)
    }

    /// Centre of the current window
    #[must_use]
    pub fn center(&self) -> Option<Point> {
        centroid(&self.points.snapshot())
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_linear_sweep_direction() {
        let mut detector = LinearMovementDetector::new(10, 0.15).unwrap();
        assert!(!detector.add_point((0.0, 0.0)));
        assert!(!detector.add_point((0.01, 0.01)));
        assert!(detector.add_point((0.02, 0.02)));
        assert!((detector.last_direction().unwrap() - FRAC_PI_4).abs() < 1e-9);
        let (dx, dy) = detector.movement_vector().unwrap();
        assert!((dx - 0.02).abs() < 1e-12 && (dy - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_zigzag_is_not_linear() {
        let mut detector = LinearMovementDetector::new(10, 0.15).unwrap();
        for p in [(0.0, 0.0), (0.01, 0.01), (0.02, 0.0), (0.03, 0.01), (0.04, 0.0)] {
            detector.add_point(p);
        }
        assert!(!detector.is_linear());
        assert!(detector.movement_vector().is_none());
    }

    #[test]
    fn test_reset_clears_direction() {
        let mut detector = LinearMovementDetector::new(10, 0.15).unwrap();
        for i in 0..4 {
            detector.add_point((f64::from(i) * 0.01, 0.0));
        }
        assert!(detector.last_direction().is_some());
        detector.reset();
        assert!(detector.last_direction().is_none());
        assert!(!detector.is_linear());
    }

    #[test]
    fn test_fixation() {
        let mut detector = FixationDetector::new(0.02, 5).unwrap();
        for i in 0..4 {
            assert!(!detector.add_point((0.5 + f64::from(i) * 0.001, 0.5)));
        }
        assert!(detector.add_point((0.5, 0.501)));
        assert!(!detector.add_point((0.6, 0.5)));
    }
}

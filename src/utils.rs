//! Utility functions for coordinate conversion and frame pacing.

pub mod safe_cast;

use std::time::{Duration, Instant};

/// Express pixel coordinates (or offsets) as fractions of the screen size
#[must_use]
pub fn normalize_coordinates(x: f64, y: f64, width: u32, height: u32) -> (f64, f64) {
    (x / f64::from(width.max(1)), y / f64::from(height.max(1)))
}

/// Paces a loop to a target frame rate by sleeping off the remainder of each
/// frame interval
#[derive(Debug)]
pub struct FpsLimiter {
    frame_time: Duration,
    last: Option<Instant>,
}

impl FpsLimiter {
    /// Create a limiter for `target_fps` frames per second. Non-positive
    /// rates disable pacing.
    #[must_use]
    pub fn new(target_fps: f64) -> Self {
        let frame_time = if target_fps > 0.0 && target_fps.is_finite() {
            Duration::from_secs_f64(1.0 / target_fps)
        } else {
            Duration::ZERO
        };
        Self { frame_time, last: None }
    }

    /// Block until the next frame is due and return the frame timestamp
    pub fn wait(&mut self) -> Instant {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.frame_time {
                std::thread::sleep(self.frame_time - elapsed);
            }
        }
        let now = Instant::now();
        self.last = Some(now);
        now
    }

    pub const fn frame_time(&self) -> Duration {
        self.frame_time
    }
}

//! Stateless geometry and filtering helpers.
//!
//! Every function here is pure: no hidden state is carried between calls, so
//! the same input always yields the same output.

use crate::constants::{EPSILON, MIN_SEGMENT_LENGTH};
use std::f64::consts::PI;

/// 2D point or vector in normalized or pixel space
pub type Point = (f64, f64);

/// Euclidean distance between two points
#[must_use]
pub fn distance(a: Point, b: Point) -> f64 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

/// Direction of the vector `a -> b` in radians, within (-π, π]
#[must_use]
pub fn angle(a: Point, b: Point) -> f64 {
    let theta = (b.1 - a.1).atan2(b.0 - a.0);
    // atan2 returns -π for (-0.0, negative x); fold it onto +π
    if theta <= -PI {
        PI
    } else {
        theta
    }
}

/// Linear interpolation from `a` to `b`
#[must_use]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Clamp `value` into `[lo, hi]`. Callers guarantee `lo <= hi`.
#[must_use]
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Zero out vectors shorter than `dead_zone` and shrink the rest by the
/// dead-zone radius, keeping direction. Output magnitude is continuous at
/// the boundary.
#[must_use]
pub fn apply_dead_zone(x: f64, y: f64, dead_zone: f64) -> Point {
    let magnitude = x.hypot(y);
    if magnitude < dead_zone || magnitude <= EPSILON {
        return (0.0, 0.0);
    }
    let scale = (magnitude - dead_zone) / magnitude;
    (x * scale, y * scale)
}

/// Zero out vectors shorter than `dead_zone`, pass the rest through unchanged
#[must_use]
pub fn gate_dead_zone(x: f64, y: f64, dead_zone: f64) -> Point {
    if x.hypot(y) < dead_zone {
        (0.0, 0.0)
    } else {
        (x, y)
    }
}

/// Exponential smoothing over a whole sequence:
/// `s[0] = p[0]`, `s[i] = alpha * p[i] + (1 - alpha) * s[i-1]`
#[must_use]
pub fn exponential_smooth(points: &[Point], alpha: f64) -> Vec<Point> {
    let mut smoothed: Vec<Point> = Vec::with_capacity(points.len());
    for &(x, y) in points {
        let next = match smoothed.last() {
            Some(&(sx, sy)) => (alpha * x + (1.0 - alpha) * sx, alpha * y + (1.0 - alpha) * sy),
            None => (x, y),
        };
        smoothed.push(next);
    }
    smoothed
}

/// Mean turn (radians) treated as no turn at all
const STRAIGHT_TURN_TOLERANCE: f64 = 1e-9;

/// Whether a point sequence moves along a straight line.
///
/// Consecutive segment pairs whose endpoints are closer than
/// `MIN_SEGMENT_LENGTH` are skipped. The turn between the remaining pairs is
/// folded into `[0, π]`; the sequence is linear when the mean turn is below
/// `threshold`, or is rounding noise on a straight line (so collinear points
/// pass even at a zero threshold). Fewer than three points, or no usable
/// pair, is not linear.
#[must_use]
pub fn is_linear_movement(points: &[Point], threshold: f64) -> bool {
    if points.len() < 3 {
        return false;
    }

    let deviations: Vec<f64> = points
        .windows(3)
        .filter(|w| distance(w[0], w[1]) >= MIN_SEGMENT_LENGTH && distance(w[1], w[2]) >= MIN_SEGMENT_LENGTH)
        .map(|w| {
            let diff = (angle(w[1], w[2]) - angle(w[0], w[1])).abs();
            diff.min(2.0 * PI - diff)
        })
        .collect();

    if deviations.is_empty() {
        return false;
    }

    let mean = deviations.iter().sum::<f64>() / deviations.len() as f64;
    mean < threshold || mean <= STRAIGHT_TURN_TOLERANCE
}

/// Centroid of a point set
#[must_use]
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
    Some((sx / n, sy / n))
}

/// Whether the points stay within `radius` of their centroid for at least
/// `min_samples` samples
#[must_use]
pub fn detect_fixation(points: &[Point], radius: f64, min_samples: usize) -> bool {
    if points.len() < min_samples {
        return false;
    }
    match centroid(points) {
        Some(center) => points.iter().all(|&p| distance(p, center) <= radius),
        None => false,
    }
}

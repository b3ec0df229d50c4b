//! Affine eye-space to screen-space mapping.

use crate::{constants::DEGENERACY_EPSILON, error::CalibrationFailure, geometry::Point};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// 2×3 affine transform `[a b c; d e f]` mapping `(x, y)` to
/// `(a*x + b*y + c, d*x + e*y + f)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[[f32; 3]; 2]", into = "[[f32; 3]; 2]")]
pub struct AffineTransform {
    matrix: [[f32; 3]; 2],
}

impl AffineTransform {
    /// Wrap a raw matrix, rejecting non-finite or non-invertible ones
    ///
    /// # Errors
    ///
    /// Returns `DegenerateFit` if the linear part is singular.
    pub fn from_matrix(matrix: [[f32; 3]; 2]) -> Result<Self, CalibrationFailure> {
        if matrix.iter().flatten().any(|v| !v.is_finite()) {
            return Err(CalibrationFailure::DegenerateFit(
                "matrix contains non-finite values".to_string(),
            ));
        }
        let transform = Self { matrix };
        let [[a, b, _], [d, e, _]] = matrix.map(|row| row.map(f64::from));
        let scale = a.hypot(b).max(d.hypot(e));
        if transform.determinant().abs() <= DEGENERACY_EPSILON * scale * scale {
            return Err(CalibrationFailure::DegenerateFit(
                "mapping is not invertible".to_string(),
            ));
        }
        Ok(transform)
    }

    /// Exact affine solve through three point pairs
    ///
    /// # Errors
    ///
    /// Returns `DegenerateFit` if either point triple is collinear.
    pub fn from_triple(src: &[Point; 3], dst: &[Point; 3]) -> Result<Self, CalibrationFailure> {
        check_spread(src)?;
        let a = Matrix3::new(
            src[0].0, src[0].1, 1.0,
            src[1].0, src[1].1, 1.0,
            src[2].0, src[2].1, 1.0,
        );
        let inverse = a.try_inverse().ok_or_else(|| {
            CalibrationFailure::DegenerateFit("eye-space matrix is singular".to_string())
        })?;

        let row_x = inverse * Vector3::new(dst[0].0, dst[1].0, dst[2].0);
        let row_y = inverse * Vector3::new(dst[0].1, dst[1].1, dst[2].1);
        Self::from_rows(&row_x, &row_y)
    }

    /// Least-squares affine fit over all point pairs
    ///
    /// # Errors
    ///
    /// Returns `DegenerateFit` if fewer than three pairs are given, the slices
    /// differ in length, or the source points are collinear.
    pub fn least_squares(src: &[Point], dst: &[Point]) -> Result<Self, CalibrationFailure> {
        if src.len() != dst.len() || src.len() < 3 {
            return Err(CalibrationFailure::DegenerateFit(format!(
                "need at least 3 matched pairs, got {} and {}",
                src.len(),
                dst.len()
            )));
        }

        check_spread(src)?;

        // Normal equations: (AᵀA) p = Aᵀb, one right-hand side per output axis
        let mut ata = Matrix3::<f64>::zeros();
        let mut atb_x = Vector3::<f64>::zeros();
        let mut atb_y = Vector3::<f64>::zeros();
        for (&(x, y), &(u, v)) in src.iter().zip(dst.iter()) {
            let row = Vector3::new(x, y, 1.0);
            ata += row * row.transpose();
            atb_x += row * u;
            atb_y += row * v;
        }

        let inverse = ata.try_inverse().ok_or_else(|| {
            CalibrationFailure::DegenerateFit("normal matrix is singular".to_string())
        })?;

        Self::from_rows(&(inverse * atb_x), &(inverse * atb_y))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_rows(row_x: &Vector3<f64>, row_y: &Vector3<f64>) -> Result<Self, CalibrationFailure> {
        Self::from_matrix([
            [row_x[0] as f32, row_x[1] as f32, row_x[2] as f32],
            [row_y[0] as f32, row_y[1] as f32, row_y[2] as f32],
        ])
    }

    /// Map an eye-space point to screen space
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        let [[a, b, c], [d, e, f]] = self.matrix.map(|row| row.map(f64::from));
        (a * p.0 + b * p.1 + c, d * p.0 + e * p.1 + f)
    }

    /// Determinant of the linear part
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let [[a, b, _], [d, e, _]] = self.matrix.map(|row| row.map(f64::from));
        a * e - b * d
    }

    #[must_use]
    pub const fn matrix(&self) -> [[f32; 3]; 2] {
        self.matrix
    }
}

/// Reject point sets whose centered scatter is (nearly) rank deficient.
/// The test is scale free: `det(S) / trace(S)^2` is at most 1/4.
fn check_spread(points: &[Point]) -> Result<(), CalibrationFailure> {
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let (mx, my) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x / n, sy + y / n));
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in points {
        let (dx, dy) = (x - mx, y - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let trace = sxx + syy;
    if trace.is_nan() || trace <= 0.0 || sxx * syy - sxy * sxy <= DEGENERACY_EPSILON * trace * trace {
        return Err(CalibrationFailure::DegenerateFit(
            "eye-space points are collinear".to_string(),
        ));
    }
    Ok(())
}

impl TryFrom<[[f32; 3]; 2]> for AffineTransform {
    type Error = CalibrationFailure;

    fn try_from(matrix: [[f32; 3]; 2]) -> Result<Self, Self::Error> {
        Self::from_matrix(matrix)
    }
}

impl From<AffineTransform> for [[f32; 3]; 2] {
    fn from(transform: AffineTransform) -> Self {
        transform.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known_map(p: Point) -> Point {
        (1000.0 * p.0 + 200.0 * p.1 - 100.0, -50.0 * p.0 + 800.0 * p.1 + 40.0)
    }

    #[test]
    fn test_triple_recovers_known_mapping() {
        let src = [(0.40, 0.40), (0.60, 0.41), (0.41, 0.55)];
        let dst = src.map(known_map);
        let t = AffineTransform::from_triple(&src, &dst).unwrap();

        let probe = (0.5, 0.47);
        let (x, y) = t.apply(probe);
        let (ex, ey) = known_map(probe);
        assert!((x - ex).abs() < 0.05, "x {x} vs {ex}");
        assert!((y - ey).abs() < 0.05, "y {y} vs {ey}");
    }

    #[test]
    fn test_collinear_triple_is_degenerate() {
        let src = [(0.1, 0.1), (0.2, 0.2), (0.3, 0.3)];
        let dst = [(100.0, 80.0), (500.0, 80.0), (100.0, 720.0)];
        assert!(matches!(
            AffineTransform::from_triple(&src, &dst),
            Err(CalibrationFailure::DegenerateFit(_))
        ));
    }

    #[test]
    fn test_collinear_targets_not_invertible() {
        let src = [(0.40, 0.40), (0.60, 0.41), (0.41, 0.55)];
        let dst = [(100.0, 80.0), (500.0, 80.0), (900.0, 80.0)];
        assert!(AffineTransform::from_triple(&src, &dst).is_err());
    }

    #[test]
    fn test_least_squares_matches_exact_data() {
        let src: Vec<Point> = (0..3)
            .flat_map(|r| (0..3).map(move |c| (0.4 + 0.05 * f64::from(c), 0.4 + 0.04 * f64::from(r))))
            .collect();
        let dst: Vec<Point> = src.iter().copied().map(known_map).collect();
        let t = AffineTransform::least_squares(&src, &dst).unwrap();
        for (&s, &d) in src.iter().zip(dst.iter()) {
            let (x, y) = t.apply(s);
            assert!((x - d.0).abs() < 0.05);
            assert!((y - d.1).abs() < 0.05);
        }
    }

    #[test]
    fn test_collinear_targets_rejected_at_any_scale() {
        let src = [(0.40, 0.40), (0.60, 0.41), (0.41, 0.55)];
        for scale in [1.0, 1920.0, 1e5] {
            let dst = [(1.0, 0.5), (2.0, 1.0), (3.0, 1.5)].map(|(x, y)| (x * scale, y * scale));
            assert!(AffineTransform::from_triple(&src, &dst).is_err(), "scale {scale}");
        }
    }

    #[test]
    fn test_small_eye_motion_still_fits() {
        // Eye positions spanning only a few thousandths of the frame
        let src = [(0.500, 0.500), (0.503, 0.5001), (0.5001, 0.502)];
        let dst = [(100.0, 80.0), (900.0, 80.0), (100.0, 720.0)];
        let t = AffineTransform::from_triple(&src, &dst).unwrap();
        let (x, y) = t.apply(src[1]);
        assert!((x - 900.0).abs() < 1.0 && (y - 80.0).abs() < 1.0);
    }

    #[test]
    fn test_near_collinear_cloud_rejected_by_least_squares() {
        let src: Vec<Point> = (0..9_i32).map(|i| (0.4 + 0.01 * f64::from(i), 0.4 + 0.02 * f64::from(i))).collect();
        let dst: Vec<Point> = (0..9_i32).map(|i| (f64::from(i) * 100.0, f64::from(i % 3) * 300.0)).collect();
        assert!(AffineTransform::least_squares(&src, &dst).is_err());
    }

    #[test]
    fn test_least_squares_needs_three_pairs() {
        assert!(AffineTransform::least_squares(&[(0.0, 0.0)], &[(1.0, 1.0)]).is_err());
    }

    #[test]
    fn test_serde_rejects_singular_matrix() {
        let json = "[[0.0,0.0,1.0],[0.0,0.0,2.0]]";
        assert!(serde_json::from_str::<AffineTransform>(json).is_err());
        let ok = "[[1000.0,0.0,-100.0],[0.0,800.0,40.0]]";
        let t: AffineTransform = serde_json::from_str(ok).unwrap();
        assert_eq!(t.apply((0.5, 0.5)), (400.0, 440.0));
    }
}

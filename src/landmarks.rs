//! Typed access to face-mesh landmarks.
//!
//! The external detector produces a fixed-size list of normalized 2D points
//! per frame. `LandmarkSet` validates the list once at construction so every
//! accessor below can index without further checks.

use crate::{constants::NUM_FACE_MESH_LANDMARKS, geometry::Point, Error, Result};

/// Named single-point landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landmark {
    /// Tip of the nose
    NoseTip,
    /// Outer corner of the left eye
    LeftEyeOuter,
    /// Outer corner of the right eye
    RightEyeOuter,
}

impl Landmark {
    /// Position of this landmark in the face-mesh index scheme
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::NoseTip => 1,
            Self::LeftEyeOuter => 33,
            Self::RightEyeOuter => 263,
        }
    }
}

/// Landmark indices describing one eye
#[derive(Debug, Clone, Copy)]
pub struct EyeRegion {
    /// Full contour used for the eye center
    pub contour: [usize; 16],
    /// Upper lid points, paired with `bottom` for vertical openings
    pub top: [usize; 4],
    /// Lower lid points
    pub bottom: [usize; 4],
}

pub const LEFT_EYE: EyeRegion = EyeRegion {
    contour: [33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246],
    top: [159, 158, 157, 173],
    bottom: [144, 145, 153, 154],
};

pub const RIGHT_EYE: EyeRegion = EyeRegion {
    contour: [362, 382, 381, 380, 374, 373, 390, 249, 263, 466, 388, 387, 386, 385, 384, 398],
    top: [386, 387, 388, 466],
    bottom: [374, 373, 390, 249],
};

/// One frame of face-mesh landmarks in normalized image coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Box<[(f32, f32); NUM_FACE_MESH_LANDMARKS]>,
}

impl LandmarkSet {
    /// Build a landmark set from detector output.
    ///
    /// Points beyond the base mesh (refined iris points) are dropped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if fewer than `NUM_FACE_MESH_LANDMARKS` points
    /// are given or any coordinate is not finite.
    pub fn new(mut points: Vec<(f32, f32)>) -> Result<Self> {
        if points.len() < NUM_FACE_MESH_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Expected at least {NUM_FACE_MESH_LANDMARKS} landmarks, got {}",
                points.len()
            )));
        }
        if let Some(i) = points.iter().position(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(Error::InvalidInput(format!("Landmark {i} is not finite")));
        }
        points.truncate(NUM_FACE_MESH_LANDMARKS);

        let points: Box<[(f32, f32); NUM_FACE_MESH_LANDMARKS]> = points
            .into_boxed_slice()
            .try_into()
            .map_err(|_| Error::InvalidInput("Landmark count mismatch".to_string()))?;

        Ok(Self { points })
    }

    /// Raw point by mesh index
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Point> {
        self.points.get(index).map(|&(x, y)| (f64::from(x), f64::from(y)))
    }

    /// Named landmark
    #[must_use]
    pub fn point(&self, landmark: Landmark) -> Point {
        self.at(landmark.index())
    }

    pub fn as_slice(&self) -> &[(f32, f32)] {
        &self.points[..]
    }

    // Region indices are compile-time constants below the mesh size
    fn at(&self, index: usize) -> Point {
        let (x, y) = self.points[index];
        (f64::from(x), f64::from(y))
    }

    /// Mean of the eye contour points
    #[must_use]
    pub fn eye_center(&self, eye: &EyeRegion) -> Point {
        let n = eye.contour.len() as f64;
        let (sx, sy) = eye
            .contour
            .iter()
            .map(|&i| self.at(i))
            .fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
        (sx / n, sy / n)
    }

    /// Centers of the (left, right) eyes
    #[must_use]
    pub fn eye_centers(&self) -> (Point, Point) {
        (self.eye_center(&LEFT_EYE), self.eye_center(&RIGHT_EYE))
    }

    /// Midpoint between both eye centers
    #[must_use]
    pub fn eye_midpoint(&self) -> Point {
        let (left, right) = self.eye_centers();
        ((left.0 + right.0) / 2.0, (left.1 + right.1) / 2.0)
    }

    /// Head deviation: nose tip relative to the midpoint of the outer eye corners
    #[must_use]
    pub fn head_pose(&self) -> Point {
        let nose = self.point(Landmark::NoseTip);
        let left = self.point(Landmark::LeftEyeOuter);
        let right = self.point(Landmark::RightEyeOuter);
        let center = ((left.0 + right.0) / 2.0, (left.1 + right.1) / 2.0);
        (nose.0 - center.0, nose.1 - center.1)
    }

    /// Eye aspect ratio: mean lid opening divided by eye width.
    ///
    /// Returns 0.0 when the eye has no horizontal extent.
    #[must_use]
    pub fn eye_aspect_ratio(&self, eye: &EyeRegion) -> f64 {
        let vertical = eye
            .top
            .iter()
            .zip(eye.bottom.iter())
            .map(|(&t, &b)| (self.at(t).1 - self.at(b).1).abs())
            .sum::<f64>()
            / eye.top.len() as f64;

        let xs = eye.top.iter().chain(eye.bottom.iter()).map(|&i| self.at(i).0);
        let (min_x, max_x) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
        let width = max_x - min_x;

        if width > 0.0 {
            vertical / width
        } else {
            0.0
        }
    }

    /// EAR averaged over both eyes
    #[must_use]
    pub fn average_ear(&self) -> f64 {
        (self.eye_aspect_ratio(&LEFT_EYE) + self.eye_aspect_ratio(&RIGHT_EYE)) / 2.0
    }

    /// Vertical position of the nose tip
    #[must_use]
    pub fn nose_tip_y(&self) -> f64 {
        self.point(Landmark::NoseTip).1
    }
}

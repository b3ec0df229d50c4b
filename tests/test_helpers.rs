//! Helper functions and utilities for tests
#![allow(dead_code)]

use head_pointer::{
    constants::NUM_FACE_MESH_LANDMARKS,
    cursor_control::{ClickKind, CursorActuator},
    landmarks::{Landmark, LandmarkSet, EyeRegion, LEFT_EYE, RIGHT_EYE},
    Error, Result,
};
use std::time::Duration;

/// Eye width used by `FaceBuilder`, in normalized units
const EYE_WIDTH: f32 = 0.1;

/// Builds synthetic face-mesh frames with controllable nose position, eye
/// position and eye openness.
///
/// Every contour point of an eye sits on its center except the lid points,
/// which are spread symmetrically so the contour mean stays on the center.
#[derive(Debug, Clone, Copy)]
pub struct FaceBuilder {
    nose: (f32, f32),
    eye_offset: (f32, f32),
    ear: f32,
}

impl Default for FaceBuilder {
    fn default() -> Self {
        Self {
            nose: (0.5, 0.5),
            eye_offset: (0.0, 0.0),
            ear: 0.8,
        }
    }
}

impl FaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nose(mut self, x: f32, y: f32) -> Self {
        self.nose = (x, y);
        self
    }

    /// Shift both eyes away from (0.4, 0.4) / (0.6, 0.4)
    pub fn eye_offset(mut self, dx: f32, dy: f32) -> Self {
        self.eye_offset = (dx, dy);
        self
    }

    pub fn ear(mut self, ear: f32) -> Self {
        self.ear = ear;
        self
    }

    pub fn build(self) -> LandmarkSet {
        let mut points = vec![(0.5f32, 0.5f32); NUM_FACE_MESH_LANDMARKS];
        let (dx, dy) = self.eye_offset;
        place_eye(&mut points, &LEFT_EYE, (0.4 + dx, 0.4 + dy), self.ear);
        place_eye(&mut points, &RIGHT_EYE, (0.6 + dx, 0.4 + dy), self.ear);
        points[Landmark::NoseTip.index()] = self.nose;
        LandmarkSet::new(points).unwrap()
    }
}

fn place_eye(points: &mut [(f32, f32)], eye: &EyeRegion, center: (f32, f32), ear: f32) {
    for &i in &eye.contour {
        points[i] = center;
    }
    let opening = ear * EYE_WIDTH;
    for (k, (&top, &bottom)) in eye.top.iter().zip(eye.bottom.iter()).enumerate() {
        let x = center.0 - EYE_WIDTH / 2.0 + EYE_WIDTH * k as f32 / 3.0;
        points[top] = (x, center.1 - opening / 2.0);
        points[bottom] = (x, center.1 + opening / 2.0);
    }
}

/// Neutral face with open eyes
pub fn neutral_face() -> LandmarkSet {
    FaceBuilder::new().build()
}

/// Face whose eye midpoint encodes a screen target on a 1000x800 screen:
/// one pixel per 1/10000 of normalized eye travel around the center.
pub fn face_looking_at(target: (i32, i32)) -> LandmarkSet {
    let dx = (target.0 - 500) as f32 / 10_000.0;
    let dy = (target.1 - 400) as f32 / 10_000.0;
    FaceBuilder::new().eye_offset(dx, dy).build()
}

/// Cursor actuator that records every call and can be told to fail
#[derive(Debug, Clone)]
pub struct RecordingCursor {
    pub screen: (u32, u32),
    pub position: (i32, i32),
    pub moves: Vec<(i32, i32)>,
    pub clicks: Vec<ClickKind>,
    pub fail_moves: bool,
    pub fail_clicks: bool,
    pub fail_position: bool,
}

impl RecordingCursor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: (width, height),
            position: (0, 0),
            moves: Vec::new(),
            clicks: Vec::new(),
            fail_moves: false,
            fail_clicks: false,
            fail_position: false,
        }
    }
}

impl CursorActuator for RecordingCursor {
    fn move_to(&mut self, x: i32, y: i32, _duration: Duration) -> Result<()> {
        if self.fail_moves {
            return Err(Error::Actuation("injected move failure".to_string()));
        }
        self.position = (x, y);
        self.moves.push((x, y));
        Ok(())
    }

    fn click(&mut self, kind: ClickKind) -> Result<()> {
        if self.fail_clicks {
            return Err(Error::Actuation("injected click failure".to_string()));
        }
        self.clicks.push(kind);
        Ok(())
    }

    fn position(&self) -> Result<(i32, i32)> {
        if self.fail_position {
            return Err(Error::Actuation("injected query failure".to_string()));
        }
        Ok(self.position)
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }
}

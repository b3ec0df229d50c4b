//! Guided eye-to-screen calibration.
//!
//! A session walks a fixed grid of screen targets. For each target it waits
//! out a settle delay, then collects one sample per frame with a detected face
//! until enough samples arrive or the collection window closes. Once every
//! target is covered, the averaged eye positions are fitted to the targets
//! with an affine transform.
//!
//! The session is driven by the caller's frame loop: `update` is called once
//! per frame with the frame time and the landmarks (if any). No call blocks.
//!
//! ```
//! use head_pointer::calibration::generate_points;
//!
//! let points = generate_points(1000, 800);
//! assert_eq!(points.len(), 9);
//! assert_eq!(points[0], (100, 80));
//! assert_eq!(points[8], (900, 720));
//! ```

pub mod store;
pub mod transform;

pub use store::{CalibrationRecord, CalibrationStore};
pub use transform::AffineTransform;

use crate::{
    constants::{
        CALIBRATION_GRID, CALIBRATION_MARGIN, DEFAULT_COLLECT_DELAY, DEFAULT_COLLECT_DURATION,
        DEFAULT_SAMPLES_PER_POINT,
    },
    error::CalibrationFailure,
    geometry::{distance, Point},
    landmarks::LandmarkSet,
    Error, Result,
};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Integer pixel position of a calibration target
pub type ScreenPoint = (i32, i32);

/// How the eye-to-screen mapping is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    /// Exact solve through the top-left, top-right and bottom-left targets
    #[default]
    Minimal,
    /// Least squares over every target
    LeastSquares,
}

/// Timing and sampling policy for one calibration run
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    pub collect_delay: Duration,
    pub collect_duration: Duration,
    pub samples_per_point: usize,
    pub fit_method: FitMethod,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            collect_delay: Duration::from_secs_f64(DEFAULT_COLLECT_DELAY),
            collect_duration: Duration::from_secs_f64(DEFAULT_COLLECT_DURATION),
            samples_per_point: DEFAULT_SAMPLES_PER_POINT,
            fit_method: FitMethod::default(),
        }
    }
}

/// Row-major grid of targets with a 10% margin on each axis.
///
/// # Errors
///
/// Returns `InvalidInput` if `cols` or `rows` is below 2.
pub fn generate_grid(
    screen_width: u32,
    screen_height: u32,
    cols: usize,
    rows: usize,
) -> Result<Vec<ScreenPoint>> {
    if cols < 2 || rows < 2 {
        return Err(Error::InvalidInput(format!(
            "Calibration grid needs at least 2x2 points, got {cols}x{rows}"
        )));
    }
    Ok(grid_points(screen_width, screen_height, cols, rows))
}

/// The fixed 3×3 calibration grid
#[must_use]
pub fn generate_points(screen_width: u32, screen_height: u32) -> Vec<ScreenPoint> {
    let (cols, rows) = CALIBRATION_GRID;
    grid_points(screen_width, screen_height, cols, rows)
}

// Integer arithmetic throughout so targets land on exact pixels
#[allow(clippy::cast_possible_truncation)]
fn axis_positions(extent: u32, count: usize) -> Vec<i32> {
    let extent = i64::from(extent);
    let margin = (extent as f64 * CALIBRATION_MARGIN) as i64;
    let usable = extent - 2 * margin;
    let steps = count as i64 - 1;
    (0..count as i64)
        .map(|i| i32::try_from(margin + i * usable / steps).unwrap_or(i32::MAX))
        .collect()
}

fn grid_points(screen_width: u32, screen_height: u32, cols: usize, rows: usize) -> Vec<ScreenPoint> {
    let xs = axis_positions(screen_width, cols);
    let ys = axis_positions(screen_height, rows);
    ys.iter()
        .flat_map(|&y| xs.iter().map(move |&x| (x, y)))
        .collect()
}

/// One eye observation taken while the user fixates a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the session started
    pub timestamp: f64,
    pub screen_point: ScreenPoint,
    pub left_eye: (f32, f32),
    pub right_eye: (f32, f32),
    pub head_pose: (f32, f32),
}

impl Sample {
    #[allow(clippy::cast_possible_truncation)]
    fn from_landmarks(timestamp: f64, screen_point: ScreenPoint, landmarks: &LandmarkSet) -> Self {
        let narrow = |(x, y): Point| (x as f32, y as f32);
        let (left, right) = landmarks.eye_centers();
        Self {
            timestamp,
            screen_point,
            left_eye: narrow(left),
            right_eye: narrow(right),
            head_pose: narrow(landmarks.head_pose()),
        }
    }

    /// Midpoint of both eyes
    #[must_use]
    pub fn eye_point(&self) -> Point {
        (
            (f64::from(self.left_eye.0) + f64::from(self.right_eye.0)) / 2.0,
            (f64::from(self.left_eye.1) + f64::from(self.right_eye.1)) / 2.0,
        )
    }
}

/// Averaged observations for one target
#[derive(Debug, Clone, PartialEq)]
pub struct PointSummary {
    pub screen_point: ScreenPoint,
    pub avg_left_eye: Point,
    pub avg_right_eye: Point,
    pub samples: Vec<Sample>,
}

impl PointSummary {
    fn from_samples(screen_point: ScreenPoint, samples: Vec<Sample>) -> Self {
        let n = samples.len().max(1) as f64;
        let mut left = (0.0, 0.0);
        let mut right = (0.0, 0.0);
        for s in &samples {
            left.0 += f64::from(s.left_eye.0);
            left.1 += f64::from(s.left_eye.1);
            right.0 += f64::from(s.right_eye.0);
            right.1 += f64::from(s.right_eye.1);
        }
        Self {
            screen_point,
            avg_left_eye: (left.0 / n, left.1 / n),
            avg_right_eye: (right.0 / n, right.1 / n),
            samples,
        }
    }

    /// Eye-space point for the fit: average of the two eye averages
    #[must_use]
    pub fn eye_point(&self) -> Point {
        (
            (self.avg_left_eye.0 + self.avg_right_eye.0) / 2.0,
            (self.avg_left_eye.1 + self.avg_right_eye.1) / 2.0,
        )
    }

    fn target(&self) -> Point {
        (f64::from(self.screen_point.0), f64::from(self.screen_point.1))
    }
}

/// Calibration quality, in screen pixels where applicable
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Mean distance between each target and its mapped average eye point
    pub accuracy: f64,
    /// Mean RMS spread of mapped samples around their mapped average
    pub precision: f64,
    /// Fraction of targets with collected data
    pub completeness: f64,
}

impl QualityMetrics {
    /// Evaluate a mapping against the data it was fitted from
    #[must_use]
    pub fn evaluate(summaries: &[PointSummary], mapping: &AffineTransform, total_points: usize) -> Self {
        if summaries.is_empty() {
            return Self::default();
        }
        let n = summaries.len() as f64;

        let accuracy = summaries
            .iter()
            .map(|s| distance(mapping.apply(s.eye_point()), s.target()))
            .sum::<f64>()
            / n;

        let precision = summaries
            .iter()
            .map(|s| {
                let center = mapping.apply(s.eye_point());
                let count = s.samples.len().max(1) as f64;
                let sq = s
                    .samples
                    .iter()
                    .map(|sample| distance(mapping.apply(sample.eye_point()), center).powi(2))
                    .sum::<f64>();
                (sq / count).sqrt()
            })
            .sum::<f64>()
            / n;

        Self {
            accuracy,
            precision,
            completeness: n / total_points.max(1) as f64,
        }
    }
}

/// Fit the eye-to-screen mapping from per-target averages.
///
/// # Errors
///
/// Returns `DegenerateFit` if the chosen points do not define an invertible
/// mapping, or `InvalidState` if the grid is not fully covered.
pub fn fit_mapping(
    summaries: &[PointSummary],
    grid: (usize, usize),
    method: FitMethod,
) -> std::result::Result<AffineTransform, CalibrationFailure> {
    let (cols, rows) = grid;
    if cols < 2 || rows < 2 {
        return Err(CalibrationFailure::InvalidState(format!(
            "grid {cols}x{rows} is too small to fit"
        )));
    }
    if summaries.len() != cols * rows {
        return Err(CalibrationFailure::InvalidState(format!(
            "expected {} calibrated points, got {}",
            cols * rows,
            summaries.len()
        )));
    }

    match method {
        FitMethod::Minimal => {
            let corners = [0, cols - 1, (rows - 1) * cols];
            let src = corners.map(|i| summaries[i].eye_point());
            let dst = corners.map(|i| summaries[i].target());
            AffineTransform::from_triple(&src, &dst)
        }
        FitMethod::LeastSquares => {
            let src: Vec<Point> = summaries.iter().map(PointSummary::eye_point).collect();
            let dst: Vec<Point> = summaries.iter().map(PointSummary::target).collect();
            AffineTransform::least_squares(&src, &dst)
        }
    }
}

/// Output of a completed calibration run
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    pub calibration_points: Vec<ScreenPoint>,
    pub grid_size: (usize, usize),
    pub summaries: Vec<PointSummary>,
    pub mapping: AffineTransform,
    pub quality: QualityMetrics,
}

impl CalibrationResult {
    /// Every sample in collection order
    pub fn per_point_samples(&self) -> impl Iterator<Item = &Sample> {
        self.summaries.iter().flat_map(|s| s.samples.iter())
    }

    /// Persistable form, stamped with `timestamp` (UNIX seconds)
    #[must_use]
    pub fn to_record(&self, timestamp: f64) -> CalibrationRecord {
        CalibrationRecord {
            timestamp,
            matrix: Some(self.mapping.matrix()),
            grid_size: self.grid_size,
            calibration_points: self.calibration_points.clone(),
            sample_count: self.summaries.len(),
            quality_metrics: self.quality,
        }
    }
}

/// Where a calibration session currently is
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationPhase {
    Idle,
    /// Instructions shown, waiting for the user to start
    AwaitingStart,
    /// Settling on a target; no samples taken
    CollectDelay { point: usize, since: Instant },
    /// Taking one sample per detected frame
    Collecting { point: usize, since: Instant },
    Fitting,
    Done,
    Failed(CalibrationFailure),
}

impl CalibrationPhase {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingStart => "awaiting_start",
            Self::CollectDelay { .. } => "collect_delay",
            Self::Collecting { .. } => "collecting",
            Self::Fitting => "fitting",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

/// Read-only progress view for a renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationProgress {
    pub phase: &'static str,
    /// Index of the current target
    pub point: Option<usize>,
    pub total_points: usize,
    /// Pixel position of the current target
    pub target: Option<ScreenPoint>,
    pub samples_collected: usize,
    /// Elapsed fraction of the current delay or collection window, in [0, 1]
    pub phase_fraction: f64,
}

/// One guided calibration run
#[derive(Debug)]
pub struct CalibrationSession {
    settings: CalibrationSettings,
    grid: (usize, usize),
    points: Vec<ScreenPoint>,
    phase: CalibrationPhase,
    started: Option<Instant>,
    current: Vec<Sample>,
    summaries: Vec<PointSummary>,
    result: Option<CalibrationResult>,
}

impl CalibrationSession {
    /// Session over the fixed 3×3 grid
    #[must_use]
    pub fn new(settings: CalibrationSettings, screen_width: u32, screen_height: u32) -> Self {
        Self::from_points(settings, CALIBRATION_GRID, generate_points(screen_width, screen_height))
    }

    /// Session over a custom grid
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `cols` or `rows` is below 2.
    pub fn with_grid(
        settings: CalibrationSettings,
        screen_width: u32,
        screen_height: u32,
        cols: usize,
        rows: usize,
    ) -> Result<Self> {
        let points = generate_grid(screen_width, screen_height, cols, rows)?;
        Ok(Self::from_points(settings, (cols, rows), points))
    }

    fn from_points(settings: CalibrationSettings, grid: (usize, usize), points: Vec<ScreenPoint>) -> Self {
        Self {
            settings,
            grid,
            points,
            phase: CalibrationPhase::Idle,
            started: None,
            current: Vec::new(),
            summaries: Vec::new(),
            result: None,
        }
    }

    pub const fn phase(&self) -> &CalibrationPhase {
        &self.phase
    }

    pub fn points(&self) -> &[ScreenPoint] {
        &self.points
    }

    pub const fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.phase, CalibrationPhase::Done | CalibrationPhase::Failed(_))
    }

    /// Fraction of targets already covered
    #[must_use]
    pub fn completeness(&self) -> f64 {
        self.summaries.len() as f64 / self.points.len().max(1) as f64
    }

    /// Show instructions and wait for the user
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the session is idle.
    pub fn begin(&mut self) -> std::result::Result<(), CalibrationFailure> {
        match self.phase {
            CalibrationPhase::Idle => {
                self.phase = CalibrationPhase::AwaitingStart;
                info!("Calibration ready: {} targets", self.points.len());
                Ok(())
            }
            ref other => Err(CalibrationFailure::InvalidState(format!(
                "cannot begin from {}",
                other.name()
            ))),
        }
    }

    /// Start collecting at the first target
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the session has already started.
    pub fn start(&mut self, now: Instant) -> std::result::Result<(), CalibrationFailure> {
        match self.phase {
            CalibrationPhase::Idle | CalibrationPhase::AwaitingStart => {
                self.started = Some(now);
                self.phase = CalibrationPhase::CollectDelay { point: 0, since: now };
                info!("Calibration started");
                Ok(())
            }
            ref other => Err(CalibrationFailure::InvalidState(format!(
                "cannot start from {}",
                other.name()
            ))),
        }
    }

    /// Abort the run. Collected data is discarded.
    pub fn cancel(&mut self) {
        if !self.is_finished() {
            info!("Calibration cancelled during {}", self.phase.name());
            self.abort(CalibrationFailure::Cancelled);
        }
    }

    /// Advance the session by one frame.
    ///
    /// `landmarks` is `None` when no face was detected this frame.
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the run, on the frame it happens and on
    /// every later call.
    pub fn update(
        &mut self,
        now: Instant,
        landmarks: Option<&LandmarkSet>,
    ) -> std::result::Result<(), CalibrationFailure> {
        match self.phase.clone() {
            CalibrationPhase::Idle | CalibrationPhase::AwaitingStart | CalibrationPhase::Done => Ok(()),
            CalibrationPhase::Failed(failure) => Err(failure),
            CalibrationPhase::CollectDelay { point, since } => {
                if now.saturating_duration_since(since) < self.settings.collect_delay {
                    return Ok(());
                }
                debug!("Collecting samples for point {}", point);
                self.phase = CalibrationPhase::Collecting { point, since: now };
                self.collect(now, point, now, landmarks)
            }
            CalibrationPhase::Collecting { point, since } => self.collect(now, point, since, landmarks),
            CalibrationPhase::Fitting => self.fit(),
        }
    }

    fn collect(
        &mut self,
        now: Instant,
        point: usize,
        since: Instant,
        landmarks: Option<&LandmarkSet>,
    ) -> std::result::Result<(), CalibrationFailure> {
        let required = self.settings.samples_per_point;
        if let Some(landmarks) = landmarks {
            if self.current.len() < required {
                let timestamp = self
                    .started
                    .map_or(0.0, |start| now.saturating_duration_since(start).as_secs_f64());
                self.current
                    .push(Sample::from_landmarks(timestamp, self.points[point], landmarks));
            }
        }

        if self.current.len() >= required {
            return self.finish_point(now, point);
        }

        if now.saturating_duration_since(since) >= self.settings.collect_duration {
            return Err(self.abort(CalibrationFailure::InsufficientSamples {
                point,
                collected: self.current.len(),
                required,
            }));
        }
        Ok(())
    }

    fn finish_point(&mut self, now: Instant, point: usize) -> std::result::Result<(), CalibrationFailure> {
        let samples = std::mem::take(&mut self.current);
        debug!("Collected {} samples for point {:?}", samples.len(), self.points[point]);
        self.summaries
            .push(PointSummary::from_samples(self.points[point], samples));

        if point + 1 < self.points.len() {
            self.phase = CalibrationPhase::CollectDelay {
                point: point + 1,
                since: now,
            };
            Ok(())
        } else {
            self.phase = CalibrationPhase::Fitting;
            self.fit()
        }
    }

    fn fit(&mut self) -> std::result::Result<(), CalibrationFailure> {
        let mapping = match fit_mapping(&self.summaries, self.grid, self.settings.fit_method) {
            Ok(mapping) => mapping,
            Err(failure) => return Err(self.abort(failure)),
        };
        let quality = QualityMetrics::evaluate(&self.summaries, &mapping, self.points.len());
        info!(
            "Calibration complete: accuracy {:.1}px, precision {:.1}px",
            quality.accuracy, quality.precision
        );
        self.result = Some(CalibrationResult {
            calibration_points: self.points.clone(),
            grid_size: self.grid,
            summaries: std::mem::take(&mut self.summaries),
            mapping,
            quality,
        });
        self.phase = CalibrationPhase::Done;
        Ok(())
    }

    fn abort(&mut self, failure: CalibrationFailure) -> CalibrationFailure {
        if failure != CalibrationFailure::Cancelled {
            error!("Calibration failed: {}", failure);
        }
        self.current.clear();
        self.summaries.clear();
        self.result = None;
        self.phase = CalibrationPhase::Failed(failure.clone());
        failure
    }

    pub const fn result(&self) -> Option<&CalibrationResult> {
        self.result.as_ref()
    }

    pub fn take_result(&mut self) -> Option<CalibrationResult> {
        self.result.take()
    }

    #[must_use]
    pub fn progress(&self, now: Instant) -> CalibrationProgress {
        let fraction = |since: Instant, window: Duration| {
            if window.is_zero() {
                1.0
            } else {
                (now.saturating_duration_since(since).as_secs_f64() / window.as_secs_f64()).min(1.0)
            }
        };
        let (point, phase_fraction) = match self.phase {
            CalibrationPhase::CollectDelay { point, since } => {
                (Some(point), fraction(since, self.settings.collect_delay))
            }
            CalibrationPhase::Collecting { point, since } => {
                (Some(point), fraction(since, self.settings.collect_duration))
            }
            CalibrationPhase::Done => (None, 1.0),
            _ => (None, 0.0),
        };
        CalibrationProgress {
            phase: self.phase.name(),
            point,
            total_points: self.points.len(),
            target: point.and_then(|i| self.points.get(i).copied()),
            samples_collected: self.current.len(),
            phase_fraction,
        }
    }
}

//! Main application module tying the per-frame pipeline together.
//!
//! `PointerApp` owns one instance of every component. Each frame goes through
//! `tick`: in control mode the landmarks feed the deviation extractor, the
//! cursor loop and the trigger detector; in calibration mode they feed the
//! calibration session instead. The two modes never run at the same time.

use crate::{
    calibration::{
        CalibrationPhase, CalibrationProgress, CalibrationRecord, CalibrationSession,
        CalibrationStore,
    },
    config::Config,
    constants::{
        DEFAULT_FIXATION_MIN_SAMPLES, DEFAULT_FIXATION_RADIUS, DEFAULT_LINEARITY_THRESHOLD,
        DEFAULT_TRIGGER_BUFFER_SIZE,
    },
    cursor_control::{ClickKind, CursorActuator, CursorController, CursorState, StepOutcome},
    deviation::DeviationExtractor,
    error::CalibrationFailure,
    geometry::Point,
    landmarks::LandmarkSet,
    monitor::{PerformanceMonitor, PerformanceStats, ResourceSampler},
    movement_detector::{FixationDetector, LinearMovementDetector},
    source::{Frame, LandmarkSource},
    trigger_detector::{TriggerDetector, TriggerEvent, TriggerSnapshot},
    utils::FpsLimiter,
    Error, Result,
};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Nothing is driven
    Idle,
    /// The cursor follows the head or gaze
    Control,
    /// A calibration session consumes the frames
    Calibrating,
}

/// A click issued because a trigger fired
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickReport {
    pub trigger: TriggerEvent,
    pub kind: ClickKind,
    /// Failure message if the platform click failed
    pub error: Option<String>,
}

/// Everything one frame did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// Mode after the tick
    pub mode: Mode,
    pub face_detected: bool,
    pub deviation: Option<Point>,
    pub cursor: Option<StepOutcome>,
    pub triggers: Vec<TriggerEvent>,
    pub click: Option<ClickReport>,
    pub linear_movement: bool,
    pub fixating: bool,
    /// Control was switched off for lack of a detected face
    pub idle_shutdown: bool,
    pub calibration: Option<CalibrationProgress>,
    /// Set on the frame a calibration run ends
    pub calibration_outcome: Option<std::result::Result<(), CalibrationFailure>>,
}

impl TickReport {
    fn new(mode: Mode, face_detected: bool) -> Self {
        Self {
            mode,
            face_detected,
            deviation: None,
            cursor: None,
            triggers: Vec::new(),
            click: None,
            linear_movement: false,
            fixating: false,
            idle_shutdown: false,
            calibration: None,
            calibration_outcome: None,
        }
    }
}

/// Read-only view of the application for display or status output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppSnapshot {
    pub mode: Mode,
    pub cursor: CursorState,
    pub calibrated: bool,
    pub baseline: Option<Point>,
    pub failed_moves: u64,
    pub triggers: TriggerSnapshot,
    pub calibration: Option<CalibrationProgress>,
    pub performance: PerformanceStats,
}

/// Totals for one `run`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub detections: u64,
    pub triggers: u64,
    pub clicks: u64,
    pub failed_clicks: u64,
    pub calibration_outcome: Option<std::result::Result<(), CalibrationFailure>>,
}

/// Hands-free pointer application
pub struct PointerApp<A> {
    config: Config,
    cursor: CursorController<A>,
    triggers: TriggerDetector,
    extractor: DeviationExtractor,
    linear: LinearMovementDetector,
    fixation: FixationDetector,
    monitor: PerformanceMonitor,
    sampler: Option<ResourceSampler>,
    store: CalibrationStore,
    record: Option<CalibrationRecord>,
    session: Option<CalibrationSession>,
    mode: Mode,
    capture_baseline: bool,
}

fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

impl<A: CursorActuator> PointerApp<A> {
    /// Build every component from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid, or an error if
    /// the resource sampler cannot be started.
    pub fn new(config: Config, actuator: A) -> Result<Self> {
        info!("Initializing head pointer application");
        config.validate()?;

        let cursor = CursorController::new(actuator, config.cursor_settings()?)?;
        let triggers = TriggerDetector::new(config.trigger_settings()?)?;
        let (w, h) = cursor.screen_size();
        let mut extractor = DeviationExtractor::new(w, h, config.mouse_control.sensitivity);

        let store = CalibrationStore::new(&config.calibration.file);
        let record = match store.load() {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring unreadable calibration: {}", e);
                None
            }
        };
        if let Some(transform) = record
            .as_ref()
            .filter(|r| r.is_calibrated())
            .and_then(CalibrationRecord::transform)
        {
            extractor.install_calibration(transform);
        }

        let mut monitor = PerformanceMonitor::new(config.monitor.window_size)?;
        let sampler = if config.monitor.enabled {
            let (sampler, samples) = ResourceSampler::spawn(config.monitor_interval()?)?;
            monitor.attach(samples);
            Some(sampler)
        } else {
            None
        };

        Ok(Self {
            cursor,
            triggers,
            extractor,
            linear: LinearMovementDetector::new(DEFAULT_TRIGGER_BUFFER_SIZE, DEFAULT_LINEARITY_THRESHOLD)?,
            fixation: FixationDetector::new(DEFAULT_FIXATION_RADIUS, DEFAULT_FIXATION_MIN_SAMPLES)?,
            monitor,
            sampler,
            store,
            record,
            session: None,
            mode: Mode::Idle,
            capture_baseline: false,
            config,
        })
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub const fn cursor(&self) -> &CursorController<A> {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut CursorController<A> {
        &mut self.cursor
    }

    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        self.extractor.is_calibrated()
    }

    /// Last stored or completed calibration record
    pub const fn calibration_record(&self) -> Option<&CalibrationRecord> {
        self.record.as_ref()
    }

    /// Start cursor control
    ///
    /// # Errors
    ///
    /// Returns a calibration error if a calibration run is in progress, or if
    /// the configuration requires a calibration and none is installed.
    pub fn activate(&mut self, now: Instant) -> Result<()> {
        if self.mode == Mode::Calibrating {
            return Err(Error::Calibration(CalibrationFailure::InvalidState(
                "cannot start control while calibrating".to_string(),
            )));
        }
        if self.config.activation.requires_calibration && !self.extractor.is_calibrated() {
            return Err(Error::Calibration(CalibrationFailure::InvalidState(
                "control requires a stored calibration".to_string(),
            )));
        }

        self.triggers.reset_buffers();
        self.linear.reset();
        self.fixation.reset();
        self.capture_baseline = self.config.activation.auto_center_on_start;
        if !self.capture_baseline {
            self.extractor.clear_baseline();
        }
        self.cursor.activate(now);
        self.mode = Mode::Control;
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.cursor.deactivate();
        if self.mode == Mode::Control {
            self.mode = Mode::Idle;
        }
    }

    /// Enter calibration mode, stopping control first
    pub fn start_calibration(&mut self) {
        if self.mode == Mode::Control {
            self.deactivate();
        }
        let settings = match self.config.calibration_settings() {
            Ok(settings) => settings,
            // Validated in `new`
            Err(e) => {
                error!("Invalid calibration settings: {}", e);
                return;
            }
        };
        let (w, h) = self.cursor.screen_size();
        let mut session = CalibrationSession::new(settings, w, h);
        if let Err(e) = session.begin() {
            error!("Could not begin calibration: {}", e);
            return;
        }
        self.session = Some(session);
        self.mode = Mode::Calibrating;
    }

    /// Leave the instructions screen and start collecting
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if no calibration is waiting to start.
    pub fn begin_collection(&mut self, now: Instant) -> Result<()> {
        let session = self.session.as_mut().ok_or_else(|| {
            CalibrationFailure::InvalidState("no calibration in progress".to_string())
        })?;
        session.start(now)?;
        Ok(())
    }

    /// Abort a running calibration; nothing is persisted
    pub fn cancel_calibration(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.cancel();
        }
        if self.mode == Mode::Calibrating {
            self.mode = Mode::Idle;
        }
    }

    /// User-initiated click
    ///
    /// Returns `Ok(false)` if control is not active.
    ///
    /// # Errors
    ///
    /// Returns `Actuation` if the platform click fails.
    pub fn click(&mut self, now: Instant, kind: ClickKind) -> Result<bool> {
        self.cursor.perform_click(now, kind)
    }

    /// Process one frame; `landmarks` is `None` when no face was detected
    pub fn tick(&mut self, now: Instant, landmarks: Option<&LandmarkSet>) -> TickReport {
        self.monitor.record_frame(now);
        self.monitor.drain();

        match self.mode {
            Mode::Idle => TickReport::new(Mode::Idle, landmarks.is_some()),
            Mode::Control => self.control_tick(now, landmarks),
            Mode::Calibrating => self.calibration_tick(now, landmarks),
        }
    }

    fn control_tick(&mut self, now: Instant, landmarks: Option<&LandmarkSet>) -> TickReport {
        let mut report = TickReport::new(Mode::Control, landmarks.is_some());

        if let Some(landmarks) = landmarks {
            self.cursor.note_activity(now);
            if self.capture_baseline {
                self.extractor.capture_baseline(landmarks);
                self.capture_baseline = false;
            }

            let deviation = self.extractor.extract(landmarks);
            report.deviation = Some(deviation);
            report.linear_movement = self.linear.add_point(deviation);
            report.fixating = self.fixation.add_point(deviation);
            report.cursor = Some(self.cursor.step(now, deviation));

            report.triggers = self.triggers.detect_triggers(now, Some(landmarks));
            if let Some(&trigger) = report.triggers.first() {
                let kind = self.config.action_for(trigger);
                let error = match self.cursor.perform_click(now, kind) {
                    Ok(_) => None,
                    Err(e) => {
                        warn!("{} click for {} failed: {}", kind, trigger, e);
                        Some(e.to_string())
                    }
                };
                report.click = Some(ClickReport { trigger, kind, error });
            }
        } else if self.cursor.return_pending() {
            // A due return to rest does not wait for the face to come back
            report.cursor = Some(self.cursor.step(now, (0.0, 0.0)));
        }

        if self.cursor.check_idle(now) {
            self.mode = Mode::Idle;
            report.idle_shutdown = true;
            report.mode = Mode::Idle;
        }
        report
    }

    fn calibration_tick(&mut self, now: Instant, landmarks: Option<&LandmarkSet>) -> TickReport {
        let mut report = TickReport::new(Mode::Calibrating, landmarks.is_some());
        let Some(session) = self.session.as_mut() else {
            self.mode = Mode::Idle;
            report.mode = Mode::Idle;
            return report;
        };

        let update = session.update(now, landmarks);
        report.calibration = Some(session.progress(now));
        let done = *session.phase() == CalibrationPhase::Done;

        let outcome = match update {
            Err(failure) => Some(Err(failure)),
            Ok(()) if done => Some(self.finish_calibration()),
            Ok(()) => None,
        };

        if outcome.is_some() {
            self.session = None;
            self.mode = Mode::Idle;
            report.mode = Mode::Idle;
        }
        report.calibration_outcome = outcome;
        report
    }

    fn finish_calibration(&mut self) -> std::result::Result<(), CalibrationFailure> {
        let Some(result) = self.session.as_mut().and_then(CalibrationSession::take_result) else {
            return Err(CalibrationFailure::InvalidState(
                "calibration finished without a result".to_string(),
            ));
        };

        let record = result.to_record(unix_time());
        if let Err(e) = self.store.save(&record) {
            error!("Failed to save calibration: {}", e);
            return Err(CalibrationFailure::Persistence(e.to_string()));
        }
        self.extractor.install_calibration(result.mapping);
        self.record = Some(record);
        Ok(())
    }

    /// Drive the application from `source` until the stream ends, `cancel`
    /// is set, or the app drops back to idle.
    ///
    /// Frames are paced to `camera.fps`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails.
    pub fn run<S: LandmarkSource>(&mut self, source: &mut S, cancel: &AtomicBool) -> Result<RunSummary> {
        info!("Starting main application loop in {:?} mode", self.mode);
        let mut limiter = FpsLimiter::new(self.config.camera.fps);
        let mut summary = RunSummary::default();

        while !cancel.load(Ordering::Relaxed) {
            let now = limiter.wait();
            let report = match source.next_frame()? {
                Frame::EndOfStream => {
                    info!("End of landmark stream reached");
                    break;
                }
                Frame::NoDetection => self.tick(now, None),
                Frame::Landmarks(landmarks) => self.tick(now, Some(&landmarks)),
            };

            summary.frames += 1;
            summary.detections += u64::from(report.face_detected);
            summary.triggers += report.triggers.len() as u64;
            if let Some(click) = &report.click {
                if click.error.is_some() {
                    summary.failed_clicks += 1;
                } else {
                    summary.clicks += 1;
                }
            }
            if report.calibration_outcome.is_some() {
                summary.calibration_outcome = report.calibration_outcome;
            }
            if self.mode == Mode::Idle {
                break;
            }
        }

        if cancel.load(Ordering::Relaxed) {
            info!("Cancellation requested");
            self.cancel_calibration();
            self.deactivate();
        }
        info!(
            "Application loop finished after {} frames ({} with a face)",
            summary.frames, summary.detections
        );
        Ok(summary)
    }

    #[must_use]
    pub fn snapshot(&self, now: Instant) -> AppSnapshot {
        AppSnapshot {
            mode: self.mode,
            cursor: self.cursor.state().clone(),
            calibrated: self.extractor.is_calibrated(),
            baseline: self.extractor.baseline(),
            failed_moves: self.cursor.failed_moves(),
            triggers: self.triggers.snapshot(now),
            calibration: self.session.as_ref().map(|s| s.progress(now)),
            performance: self.monitor.stats_summary(),
        }
    }

    /// Stop background work
    pub fn shutdown(&mut self) {
        self.deactivate();
        if let Some(mut sampler) = self.sampler.take() {
            sampler.stop();
        }
        info!("Application shutting down");
    }
}

//! Cursor control loop and platform actuation.
//!
//! `CursorController` turns a normalized deviation signal into bounded,
//! smoothed cursor positions and issues them to a `CursorActuator`. The X11
//! actuator warps the pointer directly and clicks through the XTEST
//! extension; `LoggingCursor` only records what would have happened.

use crate::{
    constants::{
        DEFAULT_AUTO_RETURN_DELAY, DEFAULT_AUTO_SHUTDOWN_DELAY, DEFAULT_DEAD_ZONE,
        DEFAULT_MOVE_DURATION, DEFAULT_REST_MOVE_DURATION, DEFAULT_SENSITIVITY,
        DEFAULT_SMOOTHING_FACTOR,
    },
    geometry::{apply_dead_zone, distance, gate_dead_zone, lerp, Point},
    utils::safe_cast::{f64_to_i32_clamp, i32_to_i16_clamp, max_pixel},
    Error, Result,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use x11rb::{
    connection::Connection,
    protocol::{
        xproto::{ConnectionExt as _, Screen, BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT},
        xtest::ConnectionExt as _,
    },
    rust_connection::RustConnection,
};

/// Kind of click to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickKind {
    Left,
    Right,
    #[default]
    Double,
}

impl std::fmt::Display for ClickKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Double => "double",
        })
    }
}

/// Platform capability to move the pointer and click
pub trait CursorActuator {
    /// Move the pointer to an absolute screen position
    ///
    /// # Errors
    ///
    /// Returns `Actuation` if the platform call fails.
    fn move_to(&mut self, x: i32, y: i32, duration: Duration) -> Result<()>;

    /// Click at the current pointer position
    ///
    /// # Errors
    ///
    /// Returns `Actuation` if the platform call fails.
    fn click(&mut self, kind: ClickKind) -> Result<()>;

    /// Current pointer position
    ///
    /// # Errors
    ///
    /// Returns `Actuation` if the position cannot be queried.
    fn position(&self) -> Result<(i32, i32)>;

    /// Screen size in pixels
    fn screen_size(&self) -> (u32, u32);
}

/// X11 pointer control
pub struct X11Cursor {
    connection: RustConnection,
    screen: Screen,
}

impl X11Cursor {
    /// Connect to the display named by `display`, or `$DISPLAY` when `None`
    ///
    /// # Errors
    ///
    /// Returns `X11` if the display cannot be opened.
    pub fn connect(display: Option<&str>) -> Result<Self> {
        info!("Initializing X11 cursor control");

        let (connection, screen_num) = RustConnection::connect(display)
            .map_err(|e| Error::X11(format!("Failed to connect to X11: {e}")))?;

        let screen = connection
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| Error::X11("Failed to get screen".to_string()))?
            .clone();

        info!(
            "Connected to X11 display, screen: {}x{}",
            screen.width_in_pixels, screen.height_in_pixels
        );

        Ok(Self { connection, screen })
    }

    fn fake_button(&self, button: u8) -> Result<()> {
        let root = self.screen.root;
        for event in [BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT] {
            self.connection
                .xtest_fake_input(event, button, x11rb::CURRENT_TIME, root, 0, 0, 0)
                .map_err(|e| Error::Actuation(format!("Failed to send fake input: {e}")))?;
        }
        self.connection
            .flush()
            .map_err(|e| Error::Actuation(format!("Failed to flush connection: {e}")))
    }
}

impl CursorActuator for X11Cursor {
    // Warps are instantaneous; `duration` is ignored
    fn move_to(&mut self, x: i32, y: i32, _duration: Duration) -> Result<()> {
        let (w, h) = self.screen_size();
        let x = i32_to_i16_clamp(x.clamp(0, max_pixel(w)));
        let y = i32_to_i16_clamp(y.clamp(0, max_pixel(h)));

        debug!("Setting cursor position to ({}, {})", x, y);

        self.connection
            .warp_pointer(x11rb::NONE, self.screen.root, 0, 0, 0, 0, x, y)
            .map_err(|e| Error::Actuation(format!("Failed to warp pointer: {e}")))?;

        self.connection
            .flush()
            .map_err(|e| Error::Actuation(format!("Failed to flush connection: {e}")))
    }

    fn click(&mut self, kind: ClickKind) -> Result<()> {
        match kind {
            ClickKind::Left => self.fake_button(1),
            ClickKind::Right => self.fake_button(3),
            ClickKind::Double => {
                self.fake_button(1)?;
                self.fake_button(1)
            }
        }
    }

    fn position(&self) -> Result<(i32, i32)> {
        let reply = self
            .connection
            .query_pointer(self.screen.root)
            .map_err(|e| Error::Actuation(format!("Failed to send query pointer: {e}")))?
            .reply()
            .map_err(|e| Error::Actuation(format!("Failed to query pointer: {e}")))?;

        Ok((i32::from(reply.root_x), i32::from(reply.root_y)))
    }

    fn screen_size(&self) -> (u32, u32) {
        (
            u32::from(self.screen.width_in_pixels),
            u32::from(self.screen.height_in_pixels),
        )
    }
}

/// Dry-run actuator: tracks the position in memory and logs every request
#[derive(Debug, Clone)]
pub struct LoggingCursor {
    screen: (u32, u32),
    position: (i32, i32),
    moves: usize,
    clicks: usize,
}

impl LoggingCursor {
    #[must_use]
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        let center = (
            i32::try_from(screen_width / 2).unwrap_or(i32::MAX),
            i32::try_from(screen_height / 2).unwrap_or(i32::MAX),
        );
        Self {
            screen: (screen_width, screen_height),
            position: center,
            moves: 0,
            clicks: 0,
        }
    }

    pub const fn moves(&self) -> usize {
        self.moves
    }

    pub const fn clicks(&self) -> usize {
        self.clicks
    }
}

impl CursorActuator for LoggingCursor {
    fn move_to(&mut self, x: i32, y: i32, duration: Duration) -> Result<()> {
        debug!("[dry-run] move to ({}, {}) over {:?}", x, y, duration);
        self.position = (x, y);
        self.moves += 1;
        Ok(())
    }

    fn click(&mut self, kind: ClickKind) -> Result<()> {
        info!("[dry-run] {} click at {:?}", kind, self.position);
        self.clicks += 1;
        Ok(())
    }

    fn position(&self) -> Result<(i32, i32)> {
        Ok(self.position)
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }
}

/// How the dead zone treats deviations outside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadZoneMode {
    /// Pass the deviation through unchanged
    #[default]
    Gate,
    /// Shrink the deviation by the dead-zone radius
    Rescale,
}

/// Control-loop parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CursorSettings {
    pub sensitivity: f64,
    pub dead_zone: f64,
    pub dead_zone_mode: DeadZoneMode,
    /// Fraction of the remaining distance covered per tick, in (0, 1]
    pub smoothing_factor: f64,
    /// Settle time after a click before returning to rest
    pub auto_return_delay: Duration,
    /// Deactivate after this long without a detected face
    pub auto_shutdown_delay: Duration,
    pub move_duration: Duration,
    pub rest_move_duration: Duration,
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            dead_zone: DEFAULT_DEAD_ZONE,
            dead_zone_mode: DeadZoneMode::default(),
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            auto_return_delay: Duration::from_secs_f64(DEFAULT_AUTO_RETURN_DELAY),
            auto_shutdown_delay: Duration::from_secs_f64(DEFAULT_AUTO_SHUTDOWN_DELAY),
            move_duration: Duration::from_secs_f64(DEFAULT_MOVE_DURATION),
            rest_move_duration: Duration::from_secs_f64(DEFAULT_REST_MOVE_DURATION),
        }
    }
}

impl CursorSettings {
    /// Check numeric ranges
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if !(self.sensitivity > 0.0 && self.sensitivity.is_finite()) {
            return Err(Error::ConfigError(format!(
                "Sensitivity must be positive, got {}",
                self.sensitivity
            )));
        }
        if !(0.0..=1.0).contains(&self.dead_zone) {
            return Err(Error::ConfigError(format!(
                "Dead zone must be in [0, 1], got {}",
                self.dead_zone
            )));
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(Error::ConfigError(format!(
                "Smoothing factor must be in (0, 1], got {}",
                self.smoothing_factor
            )));
        }
        Ok(())
    }
}

/// Mutable state of the control loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorState {
    pub rest_position: (i32, i32),
    pub last_target_position: (i32, i32),
    pub is_active: bool,
}

/// What one control tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "position", rename_all = "snake_case")]
pub enum StepOutcome {
    Inactive,
    /// Holding still after a click until the return to rest is due
    Settling,
    Returned((i32, i32)),
    Moved((i32, i32)),
    /// The move request failed; the position was not updated
    Failed,
}

/// Smoothed, bounded cursor control
pub struct CursorController<A> {
    actuator: A,
    settings: CursorSettings,
    screen: (u32, u32),
    state: CursorState,
    return_due: Option<Instant>,
    last_activity: Option<Instant>,
    failed_moves: u64,
}

impl<A: CursorActuator> CursorController<A> {
    /// Create an inactive controller with the rest position at screen centre
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the settings are out of range.
    pub fn new(actuator: A, settings: CursorSettings) -> Result<Self> {
        settings.validate()?;
        let screen = actuator.screen_size();
        let rest = (
            i32::try_from(screen.0 / 2).unwrap_or(i32::MAX),
            i32::try_from(screen.1 / 2).unwrap_or(i32::MAX),
        );
        info!("Cursor controller initialized - Screen: {}x{}", screen.0, screen.1);
        Ok(Self {
            actuator,
            settings,
            screen,
            state: CursorState {
                rest_position: rest,
                last_target_position: rest,
                is_active: false,
            },
            return_due: None,
            last_activity: None,
            failed_moves: 0,
        })
    }

    /// Start control and re-centre the cursor
    pub fn activate(&mut self, now: Instant) {
        self.state.is_active = true;
        self.last_activity = Some(now);
        if let Err(e) = self.return_to_rest() {
            warn!("Failed to centre cursor on activation: {}", e);
        }
        info!("Cursor control activated");
    }

    pub fn deactivate(&mut self) {
        if self.state.is_active {
            info!("Cursor control deactivated");
        }
        self.state.is_active = false;
        self.return_due = None;
    }

    pub const fn is_active(&self) -> bool {
        self.state.is_active
    }

    /// Record that a face was seen at `now`
    pub fn note_activity(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    /// Deactivate if nothing was seen for `auto_shutdown_delay`; true if it did
    pub fn check_idle(&mut self, now: Instant) -> bool {
        if !self.state.is_active {
            return false;
        }
        let idle = self
            .last_activity
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        if idle >= self.settings.auto_shutdown_delay {
            info!("No face for {:.1}s, shutting down control", idle.as_secs_f64());
            self.deactivate();
            return true;
        }
        false
    }

    /// One control tick with a normalized deviation
    pub fn step(&mut self, now: Instant, deviation: Point) -> StepOutcome {
        if !self.state.is_active {
            return StepOutcome::Inactive;
        }

        if let Some(due) = self.return_due {
            if now < due {
                return StepOutcome::Settling;
            }
            self.return_due = None;
            return match self.return_to_rest() {
                Ok(()) => StepOutcome::Returned(self.state.rest_position),
                Err(e) => {
                    warn!("Failed to return cursor to rest: {}", e);
                    self.failed_moves += 1;
                    StepOutcome::Failed
                }
            };
        }

        let (dx, dy) = match self.settings.dead_zone_mode {
            DeadZoneMode::Gate => gate_dead_zone(deviation.0, deviation.1, self.settings.dead_zone),
            DeadZoneMode::Rescale => apply_dead_zone(deviation.0, deviation.1, self.settings.dead_zone),
        };

        let target = self.target_for((dx, dy));
        let position = self.smooth_toward(target);

        match self.actuator.move_to(position.0, position.1, self.settings.move_duration) {
            Ok(()) => {
                self.state.last_target_position = position;
                StepOutcome::Moved(position)
            }
            Err(e) => {
                warn!("Failed to move cursor: {}", e);
                self.failed_moves += 1;
                StepOutcome::Failed
            }
        }
    }

    /// Unsmoothed target for a deviation: `rest + d * sensitivity * screen`
    #[must_use]
    pub fn target_for(&self, deviation: Point) -> Point {
        let (rx, ry) = self.state.rest_position;
        let scale = self.settings.sensitivity;
        (
            f64::from(rx) + deviation.0 * scale * f64::from(self.screen.0),
            f64::from(ry) + deviation.1 * scale * f64::from(self.screen.1),
        )
    }

    fn smooth_toward(&self, target: Point) -> (i32, i32) {
        let (lx, ly) = self.state.last_target_position;
        let alpha = self.settings.smoothing_factor;
        let x = lerp(f64::from(lx), target.0, alpha);
        let y = lerp(f64::from(ly), target.1, alpha);
        (
            f64_to_i32_clamp(x, 0, max_pixel(self.screen.0)),
            f64_to_i32_clamp(y, 0, max_pixel(self.screen.1)),
        )
    }

    /// Click, then schedule the return to rest.
    ///
    /// Returns `Ok(false)` without clicking while control is inactive.
    ///
    /// # Errors
    ///
    /// Returns `Actuation` if the platform click fails.
    pub fn perform_click(&mut self, now: Instant, kind: ClickKind) -> Result<bool> {
        if !self.state.is_active {
            debug!("Ignoring {} click while inactive", kind);
            return Ok(false);
        }
        self.actuator.click(kind)?;
        info!("{} click at {:?}", kind, self.state.last_target_position);
        self.return_due = Some(now + self.settings.auto_return_delay);
        Ok(true)
    }

    /// Move to the rest position immediately
    ///
    /// # Errors
    ///
    /// Returns `Actuation` if the move fails; the tracked position is kept.
    pub fn return_to_rest(&mut self) -> Result<()> {
        let (x, y) = self.state.rest_position;
        self.actuator.move_to(x, y, self.settings.rest_move_duration)?;
        self.state.last_target_position = self.state.rest_position;
        self.return_due = None;
        debug!("Cursor returned to rest position");
        Ok(())
    }

    /// Whether the pointer is within `tolerance` pixels of rest.
    ///
    /// Falls back to the last commanded position if the pointer cannot be
    /// queried.
    #[must_use]
    pub fn is_at_rest(&self, tolerance: i32) -> bool {
        let current = self.actuator.position().unwrap_or_else(|e| {
            warn!("Failed to get cursor position: {}", e);
            self.state.last_target_position
        });
        let to_point = |(x, y): (i32, i32)| (f64::from(x), f64::from(y));
        distance(to_point(current), to_point(self.state.rest_position)) <= f64::from(tolerance)
    }

    pub const fn state(&self) -> &CursorState {
        &self.state
    }

    pub const fn settings(&self) -> &CursorSettings {
        &self.settings
    }

    pub const fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    pub const fn failed_moves(&self) -> u64 {
        self.failed_moves
    }

    /// Whether a post-click return to rest is pending
    pub const fn return_pending(&self) -> bool {
        self.return_due.is_some()
    }

    pub const fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }
}

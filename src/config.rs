//! Configuration management for the head pointer application

use crate::{
    calibration::{store::CALIBRATION_FILENAME, CalibrationSettings, FitMethod},
    constants::{
        DEFAULT_AUTO_RETURN_DELAY, DEFAULT_AUTO_SHUTDOWN_DELAY, DEFAULT_BLINK_THRESHOLD,
        DEFAULT_COLLECT_DELAY, DEFAULT_COLLECT_DURATION, DEFAULT_DEAD_ZONE, DEFAULT_FPS,
        DEFAULT_HEAD_NOD_THRESHOLD, DEFAULT_MONITOR_INTERVAL, DEFAULT_MOVE_DURATION,
        DEFAULT_PERFORMANCE_WINDOW, DEFAULT_REST_MOVE_DURATION, DEFAULT_SAMPLES_PER_POINT,
        DEFAULT_SENSITIVITY, DEFAULT_SMOOTHING_FACTOR, DEFAULT_TRIGGER_BUFFER_SIZE,
        DEFAULT_TRIGGER_COOLDOWN, MIN_TRIGGER_BUFFER_SIZE,
    },
    cursor_control::{ClickKind, CursorSettings, DeadZoneMode},
    trigger_detector::{TriggerEvent, TriggerSettings},
    Error, Result,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration.
///
/// Every section falls back to its defaults, so a file only needs the keys
/// it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera parameters, passed through to the landmark source
    pub camera: CameraConfig,

    /// Cursor control loop
    pub mouse_control: MouseControlConfig,

    /// Blink and nod detection
    pub triggers: TriggerConfig,

    /// Calibration procedure and storage
    pub calibration: CalibrationConfig,

    /// Start-up behaviour
    pub activation: ActivationConfig,

    /// Performance monitoring
    pub monitor: MonitorConfig,
}

/// Camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device_id: u32,
    pub width: u32,
    pub height: u32,
    /// Frame rate the control loop is paced to
    pub fps: f64,
}

/// Cursor control parameters; all times in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseControlConfig {
    /// Deviation-to-pixels gain (> 0)
    pub sensitivity: f64,

    /// Deviation magnitude treated as zero, in [0, 1]
    pub dead_zone: f64,

    /// `gate` or `rescale`
    pub dead_zone_mode: DeadZoneMode,

    /// Smoothing alpha, in (0, 1]
    pub smoothing_factor: f64,

    /// Delay before returning to rest after a click
    pub auto_return_delay: f64,

    /// Deactivate after this long without a detected face
    pub auto_shutdown_delay: f64,

    pub move_duration: f64,

    pub rest_move_duration: f64,
}

/// Trigger detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub head_nod_threshold: f64,
    pub blink_threshold: f64,
    /// Seconds between accepted triggers (> 0)
    pub trigger_cooldown: f64,
    /// Signal history length (>= 3)
    pub buffer_size: usize,
    pub blink_action: ClickKind,
    pub nod_action: ClickKind,
}

/// Calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Settle time per target before sampling
    pub collect_delay: f64,
    /// Sampling window per target
    pub collect_duration: f64,
    pub samples_per_point: usize,
    pub fit_method: FitMethod,
    /// Where the calibration record is stored
    pub file: PathBuf,
}

/// Start-up behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// Capture the neutral head pose when control starts
    pub auto_center_on_start: bool,
    /// Refuse to start control without a stored calibration
    pub requires_calibration: bool,
}

/// Performance monitor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Run the background resource sampler
    pub enabled: bool,
    pub window_size: usize,
    /// Seconds between resource samples
    pub sample_interval: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: DEFAULT_FPS,
        }
    }
}

impl Default for MouseControlConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            dead_zone: DEFAULT_DEAD_ZONE,
            dead_zone_mode: DeadZoneMode::Gate,
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            auto_return_delay: DEFAULT_AUTO_RETURN_DELAY,
            auto_shutdown_delay: DEFAULT_AUTO_SHUTDOWN_DELAY,
            move_duration: DEFAULT_MOVE_DURATION,
            rest_move_duration: DEFAULT_REST_MOVE_DURATION,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            head_nod_threshold: DEFAULT_HEAD_NOD_THRESHOLD,
            blink_threshold: DEFAULT_BLINK_THRESHOLD,
            trigger_cooldown: DEFAULT_TRIGGER_COOLDOWN,
            buffer_size: DEFAULT_TRIGGER_BUFFER_SIZE,
            blink_action: ClickKind::Double,
            nod_action: ClickKind::Double,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            collect_delay: DEFAULT_COLLECT_DELAY,
            collect_duration: DEFAULT_COLLECT_DURATION,
            samples_per_point: DEFAULT_SAMPLES_PER_POINT,
            fit_method: FitMethod::Minimal,
            file: PathBuf::from(CALIBRATION_FILENAME),
        }
    }
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            auto_center_on_start: true,
            requires_calibration: false,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_size: DEFAULT_PERFORMANCE_WINDOW,
            sample_interval: DEFAULT_MONITOR_INTERVAL,
        }
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| Error::ConfigError(format!("{name} must be a non-negative number of seconds: {e}")))
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be non-negative, got {value}")))
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be greater than 0, got {value}")))
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the text is not a valid configuration.
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be encoded or written.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Load from `path` if it exists, otherwise use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            Self::from_file(path)
        } else {
            info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        // Camera
        if !(self.camera.fps.is_finite() && self.camera.fps >= 0.0) {
            return Err(Error::ConfigError(format!(
                "camera.fps must be non-negative, got {}",
                self.camera.fps
            )));
        }

        // Mouse control
        let mouse = &self.mouse_control;
        positive("mouse_control.sensitivity", mouse.sensitivity)?;
        if !(0.0..=1.0).contains(&mouse.dead_zone) {
            return Err(Error::ConfigError(format!(
                "mouse_control.dead_zone must be between 0.0 and 1.0, got {}",
                mouse.dead_zone
            )));
        }
        if !(mouse.smoothing_factor > 0.0 && mouse.smoothing_factor <= 1.0) {
            return Err(Error::ConfigError(format!(
                "mouse_control.smoothing_factor must be in (0.0, 1.0], got {}",
                mouse.smoothing_factor
            )));
        }
        non_negative("mouse_control.auto_return_delay", mouse.auto_return_delay)?;
        positive("mouse_control.auto_shutdown_delay", mouse.auto_shutdown_delay)?;
        non_negative("mouse_control.move_duration", mouse.move_duration)?;
        non_negative("mouse_control.rest_move_duration", mouse.rest_move_duration)?;

        // Triggers
        let triggers = &self.triggers;
        positive("triggers.trigger_cooldown", triggers.trigger_cooldown)?;
        if triggers.buffer_size < MIN_TRIGGER_BUFFER_SIZE {
            return Err(Error::ConfigError(format!(
                "triggers.buffer_size must be at least {MIN_TRIGGER_BUFFER_SIZE}, got {}",
                triggers.buffer_size
            )));
        }
        non_negative("triggers.head_nod_threshold", triggers.head_nod_threshold)?;
        non_negative("triggers.blink_threshold", triggers.blink_threshold)?;

        // Calibration
        let calibration = &self.calibration;
        non_negative("calibration.collect_delay", calibration.collect_delay)?;
        positive("calibration.collect_duration", calibration.collect_duration)?;
        if calibration.samples_per_point == 0 {
            return Err(Error::ConfigError(
                "calibration.samples_per_point must be greater than 0".to_string(),
            ));
        }

        // Monitor
        if self.monitor.window_size == 0 {
            return Err(Error::ConfigError(
                "monitor.window_size must be greater than 0".to_string(),
            ));
        }
        positive("monitor.sample_interval", self.monitor.sample_interval)?;

        Ok(())
    }

    /// Cursor loop settings with times converted to durations
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a time value is negative or not finite.
    pub fn cursor_settings(&self) -> Result<CursorSettings> {
        let mouse = &self.mouse_control;
        Ok(CursorSettings {
            sensitivity: mouse.sensitivity,
            dead_zone: mouse.dead_zone,
            dead_zone_mode: mouse.dead_zone_mode,
            smoothing_factor: mouse.smoothing_factor,
            auto_return_delay: seconds("mouse_control.auto_return_delay", mouse.auto_return_delay)?,
            auto_shutdown_delay: seconds("mouse_control.auto_shutdown_delay", mouse.auto_shutdown_delay)?,
            move_duration: seconds("mouse_control.move_duration", mouse.move_duration)?,
            rest_move_duration: seconds("mouse_control.rest_move_duration", mouse.rest_move_duration)?,
        })
    }

    /// Trigger detector settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the cooldown is negative or not finite.
    pub fn trigger_settings(&self) -> Result<TriggerSettings> {
        let triggers = &self.triggers;
        Ok(TriggerSettings {
            buffer_size: triggers.buffer_size,
            blink_threshold: triggers.blink_threshold,
            head_nod_threshold: triggers.head_nod_threshold,
            cooldown: seconds("triggers.trigger_cooldown", triggers.trigger_cooldown)?,
        })
    }

    /// Calibration session settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a time value is negative or not finite.
    pub fn calibration_settings(&self) -> Result<CalibrationSettings> {
        let calibration = &self.calibration;
        Ok(CalibrationSettings {
            collect_delay: seconds("calibration.collect_delay", calibration.collect_delay)?,
            collect_duration: seconds("calibration.collect_duration", calibration.collect_duration)?,
            samples_per_point: calibration.samples_per_point,
            fit_method: calibration.fit_method,
        })
    }

    /// Sampling interval of the resource monitor
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the interval is negative or not finite.
    pub fn monitor_interval(&self) -> Result<Duration> {
        seconds("monitor.sample_interval", self.monitor.sample_interval)
    }

    /// Click bound to a trigger
    #[must_use]
    pub const fn action_for(&self, event: TriggerEvent) -> ClickKind {
        match event {
            TriggerEvent::Blink => self.triggers.blink_action,
            TriggerEvent::Nod => self.triggers.nod_action,
        }
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head Pointer Configuration
# All times are in seconds.

# Camera parameters (used by the landmark source)
camera:
  device_id: 0
  width: 640
  height: 480
  fps: 30.0

# Cursor control loop
mouse_control:
  sensitivity: 2.0
  dead_zone: 0.02
  dead_zone_mode: gate        # gate | rescale
  smoothing_factor: 0.3
  auto_return_delay: 1.0
  auto_shutdown_delay: 10.0
  move_duration: 0.01
  rest_move_duration: 0.3

# Blink and nod triggers
triggers:
  head_nod_threshold: 0.03
  blink_threshold: 0.7
  trigger_cooldown: 1.0
  buffer_size: 10
  blink_action: double        # left | right | double
  nod_action: double

# Calibration
calibration:
  collect_delay: 1.0
  collect_duration: 3.0
  samples_per_point: 30
  fit_method: minimal         # minimal | least_squares
  file: "calibration.json"

# Start-up behaviour
activation:
  auto_center_on_start: true
  requires_calibration: false

# Performance monitoring
monitor:
  enabled: false
  window_size: 30
  sample_interval: 1.0
"#;

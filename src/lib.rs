//! Hands-free pointer control from facial landmarks.
//!
//! This library turns a stream of per-frame face-mesh landmarks into cursor
//! motion and click-equivalent triggers:
//! - A calibration procedure mapping eye position to screen position
//! - Blink and nod detection with a shared cooldown
//! - A dead-zone and smoothing cursor loop driving X11
//!
//! Camera capture and the face-mesh model are outside the crate; landmarks
//! arrive through the `source::LandmarkSource` trait.
//!
//! # Examples
//!
//! ## Cursor Control
//!
//! ```
//! use head_pointer::cursor_control::{
//!     CursorController, CursorSettings, LoggingCursor, StepOutcome,
//! };
//! use std::time::Instant;
//!
//! # fn main() -> head_pointer::Result<()> {
//! let mut cursor = CursorController::new(LoggingCursor::new(1000, 800), CursorSettings::default())?;
//! let now = Instant::now();
//! cursor.activate(now);
//!
//! // Head turned slightly right of neutral
//! let outcome = cursor.step(now, (0.05, 0.0));
//! assert_eq!(outcome, StepOutcome::Moved((530, 400)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Trigger Detection
//!
//! ```
//! use head_pointer::trigger_detector::{TriggerDetector, TriggerSettings};
//! use std::time::{Duration, Instant};
//!
//! # fn main() -> head_pointer::Result<()> {
//! let mut detector = TriggerDetector::new(TriggerSettings::default())?;
//! let start = Instant::now();
//!
//! let mut blinks = 0;
//! for (i, ear) in [0.8, 0.8, 0.3, 0.8].into_iter().enumerate() {
//!     let now = start + Duration::from_millis(33 * i as u64);
//!     if detector.push_ear(now, ear) {
//!         blinks += 1;
//!     }
//! }
//! assert_eq!(blinks, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Complete Pipeline
//!
//! ```no_run
//! use head_pointer::{
//!     app::PointerApp,
//!     config::Config,
//!     cursor_control::X11Cursor,
//!     source::ReplaySource,
//! };
//! use std::sync::atomic::AtomicBool;
//! use std::time::Instant;
//!
//! # fn main() -> head_pointer::Result<()> {
//! let config = Config::load_or_default("config.yaml")?;
//! let mut app = PointerApp::new(config, X11Cursor::connect(None)?)?;
//! let mut source = ReplaySource::open("landmarks.jsonl")?;
//!
//! app.activate(Instant::now())?;
//! let summary = app.run(&mut source, &AtomicBool::new(false))?;
//! println!("{} frames, {} clicks", summary.frames, summary.clicks);
//! # Ok(())
//! # }
//! ```

/// Fixed-capacity rolling history
pub mod buffer;

/// Geometry and filtering helpers
pub mod geometry;

/// Typed face-mesh landmark access
pub mod landmarks;

/// Landmark stream sources
pub mod source;

/// Guided eye-to-screen calibration
pub mod calibration;

/// Blink and nod triggers
pub mod trigger_detector;

/// Head-pose and gaze deviation signal
pub mod deviation;

/// Linear movement and fixation classifiers
pub mod movement_detector;

/// Cursor control loop and X11 actuation
pub mod cursor_control;

/// Frame-rate and resource monitoring
pub mod monitor;

/// Utility functions for coordinate conversion and pacing
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};

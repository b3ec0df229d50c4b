//! Blink and nod detection for click-equivalent triggers.
//!
//! Both gestures read rolling histories of per-frame signals and share one
//! cooldown clock: once any trigger fires, no other trigger of any kind is
//! accepted until the cooldown has elapsed.

use crate::{
    buffer::RollingBuffer,
    constants::{
        DEFAULT_BLINK_THRESHOLD, DEFAULT_HEAD_NOD_THRESHOLD, DEFAULT_TRIGGER_BUFFER_SIZE,
        DEFAULT_TRIGGER_COOLDOWN, MIN_TRIGGER_BUFFER_SIZE,
    },
    landmarks::LandmarkSet,
    Error, Result,
};
use log::{debug, info};
use serde::Serialize;
use std::time::{Duration, Instant};

/// A classified gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    Blink,
    Nod,
}

impl TriggerEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blink => "blink",
            Self::Nod => "nod",
        }
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detector thresholds and window sizes
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSettings {
    /// History length for both signals
    pub buffer_size: usize,
    /// EAR below this counts as a closed eye
    pub blink_threshold: f64,
    /// Minimum nose-tip travel, in normalized image units
    pub head_nod_threshold: f64,
    pub cooldown: Duration,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_TRIGGER_BUFFER_SIZE,
            blink_threshold: DEFAULT_BLINK_THRESHOLD,
            head_nod_threshold: DEFAULT_HEAD_NOD_THRESHOLD,
            cooldown: Duration::from_secs_f64(DEFAULT_TRIGGER_COOLDOWN),
        }
    }
}

/// Refractory clock shared by every gesture
#[derive(Debug, Clone, PartialEq)]
pub struct Cooldown {
    period: Duration,
    last_trigger: Option<Instant>,
}

impl Cooldown {
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            last_trigger: None,
        }
    }

    /// Whether a trigger at `now` would be accepted
    #[must_use]
    pub fn is_ready(&self, now: Instant) -> bool {
        self.last_trigger
            .map_or(true, |last| now.saturating_duration_since(last) > self.period)
    }

    /// Accept a trigger at `now` if the period has elapsed, restarting the clock
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if self.is_ready(now) {
            self.last_trigger = Some(now);
            true
        } else {
            false
        }
    }

    /// Time left before the next trigger can fire
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.last_trigger.map_or(Duration::ZERO, |last| {
            self.period.saturating_sub(now.saturating_duration_since(last))
        })
    }

    pub const fn period(&self) -> Duration {
        self.period
    }
}

/// Open-closed-open template over the last three EAR values
#[must_use]
pub fn is_blink_pattern(ears: &[f64], threshold: f64) -> bool {
    match ears {
        [.., before, during, after] => *before > threshold && *during < threshold && *after > threshold,
        _ => false,
    }
}

/// Down-then-up template over a full window of nose-tip heights.
///
/// The window is split in half. The nod spans from the lowest point of the
/// first half to the highest point of the second half and must exceed
/// `threshold`. The first-half minimum must also be reached by a descent of at
/// least half the threshold, which rejects an up-then-down motion of the same
/// size.
#[must_use]
pub fn is_nod_pattern(positions: &[f64], threshold: f64) -> bool {
    if positions.len() < 2 {
        return false;
    }
    let mid = positions.len() / 2;
    let (first, second) = positions.split_at(mid);

    let Some((min_idx, min)) = first
        .iter()
        .copied()
        .enumerate()
        .reduce(|best, cur| if cur.1 < best.1 { cur } else { best })
    else {
        return false;
    };
    let Some((max_off, max)) = second
        .iter()
        .copied()
        .enumerate()
        .reduce(|best, cur| if cur.1 > best.1 { cur } else { best })
    else {
        return false;
    };

    let range = max - min;
    let max_idx = mid + max_off;
    let descent = first[..=min_idx].iter().copied().fold(f64::NEG_INFINITY, f64::max) - min;

    range > threshold && min_idx < max_idx && descent > threshold / 2.0
}

/// Read-only view of detector state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerSnapshot {
    pub ear_history: Vec<f64>,
    pub nose_history: Vec<f64>,
    /// Seconds left in the cooldown
    pub cooldown_remaining: f64,
}

/// Per-frame blink and nod classifier
#[derive(Debug, Clone)]
pub struct TriggerDetector {
    settings: TriggerSettings,
    ear_buffer: RollingBuffer<f64>,
    nose_buffer: RollingBuffer<f64>,
    cooldown: Cooldown,
}

impl TriggerDetector {
    /// Create a detector
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the buffer is shorter than three samples or
    /// the cooldown is zero.
    pub fn new(settings: TriggerSettings) -> Result<Self> {
        if settings.buffer_size < MIN_TRIGGER_BUFFER_SIZE {
            return Err(Error::ConfigError(format!(
                "Trigger buffer size must be at least {MIN_TRIGGER_BUFFER_SIZE}, got {}",
                settings.buffer_size
            )));
        }
        if settings.cooldown.is_zero() {
            return Err(Error::ConfigError(
                "Trigger cooldown must be greater than 0".to_string(),
            ));
        }

        info!(
            "TriggerDetector initialized (buffer {}, cooldown {:?})",
            settings.buffer_size, settings.cooldown
        );
        Ok(Self {
            ear_buffer: RollingBuffer::new(settings.buffer_size)?,
            nose_buffer: RollingBuffer::new(settings.buffer_size)?,
            cooldown: Cooldown::new(settings.cooldown),
            settings,
        })
    }

    pub const fn settings(&self) -> &TriggerSettings {
        &self.settings
    }

    /// Classify one frame.
    ///
    /// A frame without landmarks leaves every buffer untouched and fires
    /// nothing. At most one event is returned because the first accepted
    /// trigger starts the shared cooldown.
    pub fn detect_triggers(&mut self, now: Instant, landmarks: Option<&LandmarkSet>) -> Vec<TriggerEvent> {
        match landmarks {
            Some(landmarks) => self.observe(now, landmarks.average_ear(), landmarks.nose_tip_y()),
            None => Vec::new(),
        }
    }

    /// Feed precomputed signals for one frame
    pub fn observe(&mut self, now: Instant, ear: f64, nose_y: f64) -> Vec<TriggerEvent> {
        let mut events = Vec::new();
        if self.push_ear(now, ear) {
            events.push(TriggerEvent::Blink);
        }
        if self.push_nose_y(now, nose_y) {
            events.push(TriggerEvent::Nod);
        }
        for event in &events {
            info!("{} trigger detected", event);
        }
        events
    }

    /// Push one EAR value; true if a blink fired
    pub fn push_ear(&mut self, now: Instant, ear: f64) -> bool {
        self.ear_buffer.push(ear);
        let Some(recent) = self.ear_buffer.last_n(3) else {
            return false;
        };
        is_blink_pattern(&recent, self.settings.blink_threshold) && self.accept(now, TriggerEvent::Blink)
    }

    /// Push one nose-tip height; true if a nod fired
    pub fn push_nose_y(&mut self, now: Instant, nose_y: f64) -> bool {
        self.nose_buffer.push(nose_y);
        if !self.nose_buffer.is_full() {
            return false;
        }
        let positions = self.nose_buffer.snapshot();
        is_nod_pattern(&positions, self.settings.head_nod_threshold) && self.accept(now, TriggerEvent::Nod)
    }

    fn accept(&mut self, now: Instant, event: TriggerEvent) -> bool {
        let fired = self.cooldown.try_fire(now);
        if !fired {
            debug!("{} suppressed by cooldown", event);
        }
        fired
    }

    /// Clear both signal histories. The cooldown clock keeps running.
    pub fn reset_buffers(&mut self) {
        self.ear_buffer.clear();
        self.nose_buffer.clear();
        debug!("Trigger detection buffers reset");
    }

    #[must_use]
    pub fn snapshot(&self, now: Instant) -> TriggerSnapshot {
        TriggerSnapshot {
            ear_history: self.ear_buffer.snapshot(),
            nose_history: self.nose_buffer.snapshot(),
            cooldown_remaining: self.cooldown.remaining(now).as_secs_f64(),
        }
    }
}

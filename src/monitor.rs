//! Frame-rate and process resource monitoring.
//!
//! `PerformanceMonitor` lives on the control thread. Resource usage is
//! sampled by a separate `ResourceSampler` thread that only ever sends
//! `ResourceSample`s over a channel; the control loop drains it with
//! `PerformanceMonitor::drain`.

use crate::{buffer::RollingBuffer, Error, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};

/// One resource measurement of this process
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceSample {
    /// CPU usage in percent of one core
    pub cpu_percent: f64,
    /// Resident memory in MiB
    pub memory_mb: f64,
}

/// Background thread sampling process CPU and memory
pub struct ResourceSampler {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ResourceSampler {
    /// Start sampling every `interval`, returning the sampler and the
    /// receiving end of its channel
    ///
    /// # Errors
    ///
    /// Returns an error if the current process id cannot be determined or the
    /// thread cannot be spawned.
    pub fn spawn(interval: Duration) -> Result<(Self, Receiver<ResourceSample>)> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| Error::InvalidInput(format!("Cannot determine process id: {e}")))?;
        let (sample_tx, sample_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("resource-sampler".to_string())
            .spawn(move || sample_loop(pid, interval, &sample_tx, &stop_rx))?;

        info!("Resource sampler started ({:?} interval)", interval);
        Ok((
            Self {
                stop: stop_tx,
                handle: Some(handle),
            },
            sample_rx,
        ))
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(&mut self) {
        // A send error means the thread already exited
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Resource sampler thread panicked");
            }
            debug!("Resource sampler stopped");
        }
    }
}

impl Drop for ResourceSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::cast_precision_loss)]
fn sample_loop(pid: Pid, interval: Duration, samples: &Sender<ResourceSample>, stop: &Receiver<()>) {
    let mut system = System::new();
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }

        if !system.refresh_process(pid) {
            warn!("Performance monitoring error: process {} not found", pid);
            continue;
        }
        let Some(process) = system.process(pid) else {
            continue;
        };
        let sample = ResourceSample {
            cpu_percent: f64::from(process.cpu_usage()),
            memory_mb: process.memory() as f64 / (1024.0 * 1024.0),
        };
        if samples.send(sample).is_err() {
            // Receiver dropped, nobody is listening
            return;
        }
    }
}

/// Summary of one metric over the window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricSummary {
    pub current: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricSummary {
    fn from_buffer(buffer: &RollingBuffer<f64>) -> Self {
        Self {
            current: buffer.latest().copied().unwrap_or(0.0),
            average: buffer.mean().unwrap_or(0.0),
            min: buffer.min().unwrap_or(0.0),
            max: buffer.max().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub fps: MetricSummary,
    pub cpu: MetricSummary,
    pub memory_mb: MetricSummary,
    pub frames_processed: u64,
}

/// Rolling FPS, CPU and memory statistics
#[derive(Debug)]
pub struct PerformanceMonitor {
    fps: RollingBuffer<f64>,
    cpu: RollingBuffer<f64>,
    memory: RollingBuffer<f64>,
    last_frame: Option<Instant>,
    frames: u64,
    samples: Option<Receiver<ResourceSample>>,
}

impl PerformanceMonitor {
    /// Create a monitor averaging over `window_size` values
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `window_size` is zero.
    pub fn new(window_size: usize) -> Result<Self> {
        Ok(Self {
            fps: RollingBuffer::new(window_size)?,
            cpu: RollingBuffer::new(window_size)?,
            memory: RollingBuffer::new(window_size)?,
            last_frame: None,
            frames: 0,
            samples: None,
        })
    }

    /// Receive resource samples from a `ResourceSampler`
    pub fn attach(&mut self, samples: Receiver<ResourceSample>) {
        self.samples = Some(samples);
    }

    /// Count a processed frame at `now`
    pub fn record_frame(&mut self, now: Instant) {
        if let Some(last) = self.last_frame {
            let dt = now.saturating_duration_since(last).as_secs_f64();
            if dt > 0.0 {
                self.fps.push(1.0 / dt);
            }
        }
        self.last_frame = Some(now);
        self.frames += 1;
    }

    pub fn record_resources(&mut self, sample: ResourceSample) {
        self.cpu.push(sample.cpu_percent);
        self.memory.push(sample.memory_mb);
    }

    /// Pull every pending resource sample without blocking
    pub fn drain(&mut self) -> usize {
        let Some(rx) = &self.samples else {
            return 0;
        };
        let pending: Vec<ResourceSample> = rx.try_iter().collect();
        let count = pending.len();
        for sample in pending {
            self.record_resources(sample);
        }
        count
    }

    #[must_use]
    pub fn average_fps(&self) -> f64 {
        self.fps.mean().unwrap_or(0.0)
    }

    pub const fn frames_processed(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn stats_summary(&self) -> PerformanceStats {
        PerformanceStats {
            fps: MetricSummary::from_buffer(&self.fps),
            cpu: MetricSummary::from_buffer(&self.cpu),
            memory_mb: MetricSummary::from_buffer(&self.memory),
            frames_processed: self.frames,
        }
    }
}

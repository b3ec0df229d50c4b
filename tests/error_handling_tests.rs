//! Tests for error propagation and input validation

mod test_helpers;

use head_pointer::{
    app::PointerApp,
    buffer::RollingBuffer,
    calibration::generate_grid,
    config::Config,
    landmarks::LandmarkSet,
    movement_detector::{FixationDetector, LinearMovementDetector},
    monitor::PerformanceMonitor,
    source::{Frame, LandmarkSource, ReplaySource},
    trigger_detector::{TriggerDetector, TriggerSettings},
    Error,
};
use std::io::Cursor;
use std::time::Duration;
use test_helpers::RecordingCursor;

#[test]
fn test_config_parse_errors() {
    let result = Config::from_yaml("mouse_control:\n  sensitivity: fast\n");
    assert!(matches!(result, Err(Error::ConfigError(_))));

    let result = Config::from_yaml("triggers: 5\n");
    assert!(matches!(result, Err(Error::ConfigError(_))));

    let result = Config::from_yaml("mouse_control:\n  dead_zone_mode: sideways\n");
    assert!(matches!(result, Err(Error::ConfigError(_))));
}

#[test]
fn test_config_validation_messages() {
    let cases: [(fn(&mut Config), &str); 8] = [
        (|c| c.mouse_control.sensitivity = 0.0, "sensitivity"),
        (|c| c.mouse_control.smoothing_factor = 1.5, "smoothing_factor"),
        (|c| c.mouse_control.auto_return_delay = -1.0, "auto_return_delay"),
        (|c| c.triggers.buffer_size = 1, "buffer_size"),
        (|c| c.calibration.samples_per_point = 0, "samples_per_point"),
        (|c| c.calibration.collect_duration = 0.0, "collect_duration"),
        (|c| c.monitor.window_size = 0, "window_size"),
        (|c| c.camera.fps = f64::NAN, "fps"),
    ];

    for (mutate, field) in cases {
        let mut config = Config::default();
        mutate(&mut config);
        match config.validate() {
            Err(Error::ConfigError(message)) => {
                assert!(message.contains(field), "'{message}' does not name {field}");
            }
            other => panic!("expected a config error for {field}, got {other:?}"),
        }
    }
}

#[test]
fn test_app_rejects_invalid_config() {
    let mut config = Config::default();
    config.triggers.trigger_cooldown = 0.0;
    let result = PointerApp::new(config, RecordingCursor::new(1000, 800));
    assert!(matches!(result, Err(Error::ConfigError(_))));
}

#[test]
fn test_replay_reports_line_number() {
    let data = "null\n{\"bad\": true}\n";
    let mut source = ReplaySource::new(Cursor::new(data));

    assert!(matches!(source.next_frame().unwrap(), Frame::NoDetection));
    match source.next_frame() {
        Err(Error::Serialization(message)) => assert!(message.contains("line 2")),
        other => panic!("expected a serialization error, got {other:?}"),
    }
}

#[test]
fn test_replay_missing_file() {
    let result = ReplaySource::open("/nonexistent/landmarks.jsonl");
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_landmark_validation() {
    assert!(matches!(LandmarkSet::new(Vec::new()), Err(Error::InvalidInput(_))));

    let mut points = vec![(0.5, 0.5); 468];
    points[200] = (0.5, f32::INFINITY);
    assert!(matches!(LandmarkSet::new(points), Err(Error::InvalidInput(_))));
}

#[test]
fn test_component_construction_errors() {
    assert!(RollingBuffer::<f64>::new(0).is_err());
    assert!(LinearMovementDetector::new(0, 0.15).is_err());
    assert!(FixationDetector::new(0.02, 0).is_err());
    assert!(PerformanceMonitor::new(0).is_err());
    assert!(generate_grid(1000, 800, 1, 1).is_err());

    let settings = TriggerSettings {
        cooldown: Duration::ZERO,
        ..TriggerSettings::default()
    };
    assert!(matches!(TriggerDetector::new(settings), Err(Error::ConfigError(_))));
}

#[test]
fn test_error_display() {
    let err = Error::ConfigError("bad value".to_string());
    assert_eq!(err.to_string(), "Configuration error: bad value");

    let err = Error::from(head_pointer::error::CalibrationFailure::Cancelled);
    assert_eq!(err.to_string(), "Calibration failed: calibration cancelled");

    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    assert!(matches!(Error::from(io), Error::Io(_)));
}

//! Tests for calibration and configuration files on disk

use head_pointer::{
    calibration::{CalibrationRecord, CalibrationStore, QualityMetrics},
    config::{Config, EXAMPLE_CONFIG},
    Error,
};
use tempfile::TempDir;

fn sample_record() -> CalibrationRecord {
    CalibrationRecord {
        timestamp: 1_700_000_000.5,
        matrix: Some([[2000.0, 0.0, -500.0], [0.0, 1600.0, -240.0]]),
        grid_size: (3, 3),
        calibration_points: vec![(100, 80), (500, 80), (900, 80)],
        sample_count: 9,
        quality_metrics: QualityMetrics {
            accuracy: 12.5,
            precision: 3.25,
            completeness: 1.0,
        },
    }
}

#[test]
fn test_missing_file_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let store = CalibrationStore::new(dir.path().join("calibration.json"));
    assert!(store.load().unwrap().is_none());
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("profiles").join("default").join("calibration.json");
    let store = CalibrationStore::new(&path);

    store.save(&sample_record()).unwrap();
    assert!(path.exists());

    let loaded = store.load().unwrap().unwrap();
    assert!(loaded.is_calibrated());
    assert_eq!(loaded.sample_count, 9);
    assert_eq!(loaded.matrix, sample_record().matrix);
    assert_eq!(loaded.calibration_points, sample_record().calibration_points);
}

#[test]
fn test_document_field_names() {
    let dir = TempDir::new().unwrap();
    let store = CalibrationStore::new(dir.path().join("calibration.json"));
    store.save(&sample_record()).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    for key in [
        "timestamp",
        "matrix",
        "grid_size",
        "calibration_points",
        "sample_count",
        "quality_metrics",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["quality_metrics"]["completeness"], 1.0);
    assert_eq!(json["grid_size"], serde_json::json!([3, 3]));
}

#[test]
fn test_corrupted_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("calibration.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let result = CalibrationStore::new(&path).load();
    assert!(matches!(result, Err(Error::Serialization(_))));
}

#[test]
fn test_clear_removes_record() {
    let dir = TempDir::new().unwrap();
    let store = CalibrationStore::new(dir.path().join("calibration.json"));
    store.save(&sample_record()).unwrap();

    store.clear().unwrap();
    assert!(store.load().unwrap().is_none());
    // Clearing twice is fine
    store.clear().unwrap();
}

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");

    let mut config = Config::default();
    config.mouse_control.sensitivity = 3.5;
    config.calibration.file = dir.path().join("cal.json");
    config.to_file(&path).unwrap();

    assert_eq!(Config::from_file(&path).unwrap(), config);
}

#[test]
fn test_load_or_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());

    std::fs::write(&path, EXAMPLE_CONFIG).unwrap();
    let config = Config::load_or_default(&path).unwrap();
    assert!(config.validate().is_ok());
}

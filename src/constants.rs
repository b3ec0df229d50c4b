//! Constants used throughout the application

/// Number of points in a face mesh (without refined iris points)
pub const NUM_FACE_MESH_LANDMARKS: usize = 468;

/// Calibration grid (columns, rows)
pub const CALIBRATION_GRID: (usize, usize) = (3, 3);

/// Fraction of the screen left as margin on each side of the calibration grid
pub const CALIBRATION_MARGIN: f64 = 0.1;

/// Smallest determinant accepted for an affine fit, relative to the squared
/// scale of the data it was computed from
pub const DEGENERACY_EPSILON: f64 = 1e-6;

/// Default calibration timing
pub const DEFAULT_COLLECT_DELAY: f64 = 1.0;
pub const DEFAULT_COLLECT_DURATION: f64 = 3.0;
pub const DEFAULT_SAMPLES_PER_POINT: usize = 30;

/// Default trigger parameters
pub const DEFAULT_TRIGGER_BUFFER_SIZE: usize = 10;
pub const MIN_TRIGGER_BUFFER_SIZE: usize = 3;
pub const DEFAULT_BLINK_THRESHOLD: f64 = 0.7;
pub const DEFAULT_HEAD_NOD_THRESHOLD: f64 = 0.03;
pub const DEFAULT_TRIGGER_COOLDOWN: f64 = 1.0;

/// Default cursor control parameters
pub const DEFAULT_SENSITIVITY: f64 = 2.0;
pub const DEFAULT_DEAD_ZONE: f64 = 0.02;
pub const DEFAULT_SMOOTHING_FACTOR: f64 = 0.3;
pub const DEFAULT_AUTO_RETURN_DELAY: f64 = 1.0;
pub const DEFAULT_AUTO_SHUTDOWN_DELAY: f64 = 10.0;
pub const DEFAULT_MOVE_DURATION: f64 = 0.01;
pub const DEFAULT_REST_MOVE_DURATION: f64 = 0.3;

/// Pixel tolerance for "cursor is at rest"
pub const REST_TOLERANCE_PX: i32 = 10;

/// Movement classifier defaults
pub const MIN_SEGMENT_LENGTH: f64 = 1e-3;
pub const DEFAULT_LINEARITY_THRESHOLD: f64 = 0.15;
pub const DEFAULT_FIXATION_RADIUS: f64 = 0.02;
pub const DEFAULT_FIXATION_MIN_SAMPLES: usize = 5;

/// Performance monitor defaults
pub const DEFAULT_PERFORMANCE_WINDOW: usize = 30;
pub const DEFAULT_MONITOR_INTERVAL: f64 = 1.0;

/// Default frames per second assumption
pub const DEFAULT_FPS: f64 = 30.0;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;

//! Tests for the cursor control loop

mod test_helpers;

use head_pointer::{
    constants::REST_TOLERANCE_PX,
    cursor_control::{ClickKind, CursorController, CursorSettings, DeadZoneMode, StepOutcome},
    Error,
};
use std::time::{Duration, Instant};
use test_helpers::RecordingCursor;

fn controller_with(settings: CursorSettings) -> CursorController<RecordingCursor> {
    CursorController::new(RecordingCursor::new(1000, 800), settings).unwrap()
}

fn active_controller(now: Instant) -> CursorController<RecordingCursor> {
    let mut controller = controller_with(CursorSettings::default());
    controller.activate(now);
    controller
}

#[test]
fn test_activation_centres_cursor() {
    let now = Instant::now();
    let controller = active_controller(now);

    assert!(controller.is_active());
    assert_eq!(controller.state().rest_position, (500, 400));
    assert_eq!(controller.actuator().moves, vec![(500, 400)]);
    assert!(controller.is_at_rest(REST_TOLERANCE_PX));
}

#[test]
fn test_single_tick_moves_toward_target() {
    let now = Instant::now();
    let mut controller = active_controller(now);

    assert_eq!(controller.step(now, (0.05, 0.0)), StepOutcome::Moved((530, 400)));
    assert_eq!(controller.state().last_target_position, (530, 400));
    assert_eq!(controller.actuator().position, (530, 400));
}

#[test]
fn test_repeated_ticks_converge() {
    let now = Instant::now();
    let mut controller = active_controller(now);

    let mut last = StepOutcome::Inactive;
    for _ in 0..50 {
        last = controller.step(now, (0.05, -0.05));
    }
    // Target is (600, 320); per-tick rounding stops within a pixel of it
    let StepOutcome::Moved((x, y)) = last else {
        panic!("unexpected outcome {last:?}");
    };
    assert!((x - 600).abs() <= 1, "x = {x}");
    assert!((y - 320).abs() <= 1, "y = {y}");
}

#[test]
fn test_position_clamped_to_screen() {
    let now = Instant::now();
    let mut controller = active_controller(now);

    assert_eq!(controller.step(now, (1.0, 1.0)), StepOutcome::Moved((999, 799)));
    for _ in 0..10 {
        controller.step(now, (-1.0, -1.0));
    }
    assert_eq!(controller.state().last_target_position, (0, 0));
}

#[test]
fn test_dead_zone_gate() {
    let now = Instant::now();
    let mut controller = active_controller(now);

    // Below the dead zone the cursor holds at rest
    assert_eq!(controller.step(now, (0.01, 0.01)), StepOutcome::Moved((500, 400)));
    // Above it the deviation passes through unchanged
    assert_eq!(controller.step(now, (0.05, 0.0)), StepOutcome::Moved((530, 400)));
}

#[test]
fn test_dead_zone_rescale() {
    let now = Instant::now();
    let mut controller = controller_with(CursorSettings {
        dead_zone_mode: DeadZoneMode::Rescale,
        ..CursorSettings::default()
    });
    controller.activate(now);

    // Magnitude 0.05 shrinks to 0.03: target 560, smoothed to 518
    assert_eq!(controller.step(now, (0.05, 0.0)), StepOutcome::Moved((518, 400)));
}

#[test]
fn test_failed_move_keeps_last_target() {
    let now = Instant::now();
    let mut controller = active_controller(now);
    controller.actuator_mut().fail_moves = true;

    assert_eq!(controller.step(now, (0.05, 0.0)), StepOutcome::Failed);
    assert_eq!(controller.state().last_target_position, (500, 400));
    assert_eq!(controller.failed_moves(), 1);
    assert!(controller.is_active());

    controller.actuator_mut().fail_moves = false;
    assert_eq!(controller.step(now, (0.05, 0.0)), StepOutcome::Moved((530, 400)));
    assert_eq!(controller.failed_moves(), 1);
}

#[test]
fn test_click_then_return_to_rest() {
    let t0 = Instant::now();
    let mut controller = active_controller(t0);
    controller.step(t0, (0.05, 0.0));

    assert!(controller.perform_click(t0, ClickKind::Left).unwrap());
    assert_eq!(controller.actuator().clicks, vec![ClickKind::Left]);
    assert!(controller.return_pending());

    assert_eq!(
        controller.step(t0 + Duration::from_millis(500), (0.2, 0.0)),
        StepOutcome::Settling
    );
    assert_eq!(controller.state().last_target_position, (530, 400));

    assert_eq!(
        controller.step(t0 + Duration::from_millis(1100), (0.2, 0.0)),
        StepOutcome::Returned((500, 400))
    );
    assert!(!controller.return_pending());
    assert!(controller.is_at_rest(REST_TOLERANCE_PX));
}

#[test]
fn test_click_while_inactive() {
    let mut controller = controller_with(CursorSettings::default());
    assert!(!controller.perform_click(Instant::now(), ClickKind::Double).unwrap());
    assert!(controller.actuator().clicks.is_empty());
    assert_eq!(controller.step(Instant::now(), (0.1, 0.1)), StepOutcome::Inactive);
}

#[test]
fn test_click_failure_surfaces() {
    let now = Instant::now();
    let mut controller = active_controller(now);
    controller.actuator_mut().fail_clicks = true;

    let result = controller.perform_click(now, ClickKind::Right);
    assert!(matches!(result, Err(Error::Actuation(_))));
    assert!(!controller.return_pending());
}

#[test]
fn test_idle_shutdown() {
    let t0 = Instant::now();
    let mut controller = active_controller(t0);

    assert!(!controller.check_idle(t0 + Duration::from_secs(5)));
    controller.note_activity(t0 + Duration::from_secs(5));
    assert!(!controller.check_idle(t0 + Duration::from_secs(12)));
    assert!(controller.check_idle(t0 + Duration::from_secs(15)));
    assert!(!controller.is_active());
    // Already inactive: nothing more to shut down
    assert!(!controller.check_idle(t0 + Duration::from_secs(30)));
}

#[test]
fn test_deactivate_cancels_pending_return() {
    let t0 = Instant::now();
    let mut controller = active_controller(t0);
    controller.perform_click(t0, ClickKind::Double).unwrap();

    controller.deactivate();
    assert!(!controller.return_pending());
    assert!(!controller.is_active());
}

#[test]
fn test_is_at_rest_falls_back_to_last_target() {
    let now = Instant::now();
    let mut controller = active_controller(now);
    controller.step(now, (0.05, 0.0));

    controller.actuator_mut().fail_position = true;
    // Last target (530, 400) is 30px from rest
    assert!(!controller.is_at_rest(REST_TOLERANCE_PX));
    assert!(controller.is_at_rest(30));

    controller.return_to_rest().unwrap();
    assert!(controller.is_at_rest(REST_TOLERANCE_PX));
}

#[test]
fn test_invalid_settings_rejected() {
    let settings = CursorSettings {
        smoothing_factor: 0.0,
        ..CursorSettings::default()
    };
    assert!(matches!(
        CursorController::new(RecordingCursor::new(1000, 800), settings),
        Err(Error::ConfigError(_))
    ));
}

#[test]
fn test_step_outcome_serialization() {
    let json = serde_json::to_value(StepOutcome::Moved((530, 400))).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "moved", "position": [530, 400]}));
    let json = serde_json::to_value(StepOutcome::Settling).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "settling"}));
}

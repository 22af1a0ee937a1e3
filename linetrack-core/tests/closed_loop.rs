//! Pipeline and tracker driven together against a synthetic track.

use std::cell::Cell;
use std::rc::Rc;

use linetrack_core::config::{INITIAL_EXPOSURE, LINE_LOST_THRESHOLD, MIN_EXPOSURE, MIN_SPEED};
use linetrack_core::diagnostics::Report;
use linetrack_core::{
    Config, LineSensor, Pipeline, RawScanLine, TrackCommand, TrackingController, Wheel, WheelDrive,
};

/// Renders a 10 pixel dark band centered on `center`, or nothing when `None`.
struct Track {
    center: Rc<Cell<Option<usize>>>,
}

impl LineSensor for Track {
    fn acquire(&mut self, _exposure_time: u8) -> RawScanLine {
        let mut line = RawScanLine::filled(160);
        if let Some(c) = self.center.get() {
            for v in &mut line[c - 5..c + 5] {
                *v = 40;
            }
        }
        line
    }
}

#[derive(Default)]
struct Wheels {
    speeds: [i16; 4],
    braked: bool,
}

impl WheelDrive for Wheels {
    fn set_wheel_speed(&mut self, wheel: Wheel, speed: i16) {
        self.speeds[wheel as usize] = speed;
        self.braked = false;
    }

    fn brake(&mut self) {
        self.braked = true;
    }
}

fn rig(center: Option<usize>) -> (Rc<Cell<Option<usize>>>, Pipeline<Track>, TrackingController) {
    let config = Config::default();
    config.validate().expect("default config is valid");

    let cell = Rc::new(Cell::new(center));
    let pipeline = Pipeline::new(Track { center: cell.clone() }, &config);
    let mut tracker = TrackingController::new(config.drive);
    tracker.start();
    (cell, pipeline, tracker)
}

#[test]
fn centered_line_runs_straight() {
    let (_, mut pipeline, mut tracker) = rig(Some(64));
    let mut wheels = Wheels::default();

    let cmd = tracker.update(&mut pipeline, &mut wheels);
    let TrackCommand::Steer { left, right, turn } = cmd else {
        panic!("expected steering, got {cmd:?}");
    };
    assert_eq!(turn, 0);
    assert_eq!(left, right);
    assert_eq!(wheels.speeds, [left; 4]);
}

#[test]
fn steering_pulls_an_offset_line_back_to_center() {
    let (center, mut pipeline, mut tracker) = rig(Some(80));
    let mut wheels = Wheels::default();

    for _ in 0..30 {
        let cmd = tracker.update(&mut pipeline, &mut wheels);
        let TrackCommand::Steer { left, right, .. } = cmd else {
            panic!("line should stay in view, got {cmd:?}");
        };
        // Turning toward the faster right side moves the line back toward the middle.
        let shift = (i32::from(right) - i32::from(left)) / 100;
        let c = center.get().unwrap() as i32 - shift;
        center.set(Some(c as usize));
    }

    let c = center.get().unwrap();
    assert!(c.abs_diff(64) <= 4, "settled at {c}");
}

#[test]
fn losing_the_line_eventually_pivots() {
    let (center, mut pipeline, mut tracker) = rig(Some(76));
    let mut wheels = Wheels::default();

    assert!(matches!(
        tracker.update(&mut pipeline, &mut wheels),
        TrackCommand::Steer { turn, .. } if turn > 0
    ));

    center.set(None);
    for _ in 0..LINE_LOST_THRESHOLD {
        assert!(matches!(
            tracker.update(&mut pipeline, &mut wheels),
            TrackCommand::Steer { .. }
        ));
    }
    assert_eq!(
        tracker.update(&mut pipeline, &mut wheels),
        TrackCommand::Search { speed: MIN_SPEED }
    );
    assert_eq!(wheels.speeds, [MIN_SPEED, MIN_SPEED, -MIN_SPEED, -MIN_SPEED]);

    // Reacquiring drops straight back into steering.
    center.set(Some(64));
    assert!(matches!(
        tracker.update(&mut pipeline, &mut wheels),
        TrackCommand::Steer { .. }
    ));
    assert_eq!(tracker.state().lost_line_count, 0);
}

#[test]
fn stop_brakes_and_idles() {
    let (_, mut pipeline, mut tracker) = rig(Some(70));
    let mut wheels = Wheels::default();
    tracker.update(&mut pipeline, &mut wheels);

    tracker.stop(&mut wheels);
    assert_eq!(wheels.speeds, [0; 4]);
    assert!(wheels.braked);

    assert_eq!(tracker.update(&mut pipeline, &mut wheels), TrackCommand::Idle);
    assert_eq!(wheels.speeds, [0; 4]);
}

#[test]
fn bright_track_walks_exposure_down() {
    let (_, mut pipeline, mut tracker) = rig(Some(64));
    let mut wheels = Wheels::default();

    tracker.update(&mut pipeline, &mut wheels);
    assert_eq!(pipeline.exposure().exposure_time, INITIAL_EXPOSURE - 1);

    for _ in 0..100 {
        tracker.update(&mut pipeline, &mut wheels);
    }
    assert_eq!(pipeline.exposure().exposure_time, MIN_EXPOSURE);
    assert_eq!(pipeline.exposure().stable_count, 0);
}

#[test]
fn report_reflects_the_last_pass() {
    let (_, mut pipeline, mut tracker) = rig(Some(64));
    let mut wheels = Wheels::default();
    tracker.update(&mut pipeline, &mut wheels);

    let location = pipeline.location();
    let exposure = pipeline.exposure();
    let text = Report { line: pipeline.line(), location: &location, exposure: &exposure }.to_string();
    assert!(text.contains("Median: 64  Width: 12"));
    assert!(text.contains("Exposure: 9  Stable: 0"));
}

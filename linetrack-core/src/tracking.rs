//! Line tracking control law.
//!
//! Turns a [`LineLocation`] into four wheel commands. The forward speed is
//! de-rated as the line drifts off center, a proportional turn component is
//! added to one side and removed from the other, and after too many frames
//! without a line the robot pivots on the spot toward where it last turned.

use crate::acquisition::LineSensor;
use crate::config::DriveConfig;
use crate::locator::LineLocation;
use crate::pipeline::Pipeline;
use crate::scan::SCAN_CENTER;

/// Wheel identifier. Front and rear wheels on a side always get the same command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wheel {
    FrontLeft,
    RearLeft,
    FrontRight,
    RearRight,
}

/// Motor collaborator.
pub trait WheelDrive {
    /// Signed speed, within `-MAX_SPEED..=MAX_SPEED`.
    fn set_wheel_speed(&mut self, wheel: Wheel, speed: i16);

    /// Actively stop every wheel.
    fn brake(&mut self);

    /// Drive a differential pair over the four wheels.
    fn set_sides(&mut self, left: i16, right: i16) {
        self.set_wheel_speed(Wheel::FrontLeft, left);
        self.set_wheel_speed(Wheel::RearLeft, left);
        self.set_wheel_speed(Wheel::FrontRight, right);
        self.set_wheel_speed(Wheel::RearRight, right);
    }
}

/// Controller state that survives across ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackState {
    pub base_speed: i16,
    /// Forward speed after de-rating, from the last steering tick.
    pub current_speed: i16,
    pub lost_line_count: u8,
    /// Side of the last turn: `1`, `-1`, or `0` before the first one.
    pub last_direction: i8,
    pub running: bool,
}

/// What one tick commanded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackCommand {
    /// Not running, nothing was sent.
    Idle,
    /// Normal steering output.
    Steer { left: i16, right: i16, turn: i16 },
    /// Line lost for too long, pivoting in place.
    Search { speed: i16 },
}

/// Steering state machine between a located line and the wheels.
///
/// Starts stopped. While stopped every call returns [`TrackCommand::Idle`]
/// and nothing is sent to the drive.
pub struct TrackingController {
    config: DriveConfig,
    state: TrackState,
}

/// Like `clamp`, but never panics on a misordered range.
fn limit(value: i16, min: i16, max: i16) -> i16 {
    value.max(min).min(max)
}

impl TrackingController {
    /// Create a stopped controller.
    ///
    /// # Arguments
    /// * `config` - speed limits and de-rating; see [`Config::validate`](crate::Config::validate)
    pub fn new(config: DriveConfig) -> Self {
        Self {
            config,
            state: Self::initial_state(&config),
        }
    }

    fn initial_state(config: &DriveConfig) -> TrackState {
        TrackState {
            base_speed: config.base_speed,
            current_speed: 0,
            lost_line_count: 0,
            last_direction: 0,
            running: false,
        }
    }

    /// Snapshot of the counters and speeds.
    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Begin tracking with fresh counters.
    pub fn start(&mut self) {
        self.state = Self::initial_state(&self.config);
        self.state.running = true;
    }

    /// Stop tracking and brake all four wheels.
    pub fn stop<D: WheelDrive>(&mut self, drive: &mut D) {
        self.state.running = false;
        self.state.current_speed = 0;
        drive.set_sides(0, 0);
        drive.brake();
    }

    /// Back to power-up defaults, stopped.
    ///
    /// Unlike a restart this does not resume tracking; call
    /// [`start`](Self::start) afterwards to run again.
    pub fn reset(&mut self) {
        self.state = Self::initial_state(&self.config);
    }

    /// Run one pipeline pass and act on it.
    pub fn update<S, D>(&mut self, pipeline: &mut Pipeline<S>, drive: &mut D) -> TrackCommand
    where
        S: LineSensor,
        D: WheelDrive,
    {
        if !self.state.running {
            return TrackCommand::Idle;
        }
        let location = pipeline.process();
        self.step(&location, drive)
    }

    /// Act on an already located frame.
    pub fn step<D: WheelDrive>(&mut self, location: &LineLocation, drive: &mut D) -> TrackCommand {
        if !self.state.running {
            return TrackCommand::Idle;
        }
        let cfg = self.config;

        if location.is_lost() {
            self.state.lost_line_count = self.state.lost_line_count.saturating_add(1);
            if self.state.lost_line_count > cfg.line_lost_threshold {
                let speed = cfg.min_speed * i16::from(self.state.last_direction);
                drive.set_sides(speed, speed.saturating_neg());
                return TrackCommand::Search { speed };
            }
        } else {
            self.state.lost_line_count = 0;
        }

        // Positive error: the line sits toward the high pixel indices.
        let error = i16::from(location.median) - i16::from(SCAN_CENTER);
        let adjusted = self.adjust_speed(error);
        self.state.current_speed = adjusted;

        let turn_ratio = f32::from(error) / f32::from(SCAN_CENTER);
        let turn = (f32::from(adjusted) * turn_ratio) as i16;
        let turn = limit(turn, -cfg.max_speed_diff, cfg.max_speed_diff);

        let left = limit(adjusted.saturating_sub(turn), cfg.min_speed, cfg.max_speed);
        let right = limit(adjusted.saturating_add(turn), cfg.min_speed, cfg.max_speed);

        self.state.last_direction = if turn > 0 { 1 } else { -1 };

        drive.set_sides(left, right);
        TrackCommand::Steer { left, right, turn }
    }

    /// Slow down as the line drifts away from the center.
    fn adjust_speed(&self, error: i16) -> i16 {
        let cfg = &self.config;
        let base = self.state.base_speed;
        let error_ratio = f32::from(error.unsigned_abs()) / f32::from(SCAN_CENTER);

        let mut speed_ratio = 1.0f32;
        if error_ratio > cfg.derate_deadband {
            speed_ratio = (1.0 - error_ratio * (1.0 - cfg.derate_floor))
                .max(cfg.derate_floor)
                .min(1.0);
        }

        let adjusted = (f32::from(base) * speed_ratio) as i16;
        limit(adjusted, cfg.min_speed.min(base), base)
    }
}

impl Default for TrackingController {
    fn default() -> Self {
        Self::new(DriveConfig::default())
    }
}

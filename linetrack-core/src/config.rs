//! Tuning constants and configuration bundles.
//!
//! The constants are the values the robot was tuned with. Each component
//! takes its own config struct so tests can tighten or loosen one knob
//! without touching the others.

use core::fmt;

/// Shortest exposure setting (no dwell between clock edges).
pub const MIN_EXPOSURE: u8 = 1;
/// Longest exposure setting.
pub const MAX_EXPOSURE: u8 = 50;
/// Exposure used after power-up.
pub const INITIAL_EXPOSURE: u8 = 10;
/// Brightest acceptable cluster mean before exposure is shortened.
pub const TARGET_MAX: u16 = 140;
/// Dimmest acceptable cluster mean before exposure is lengthened.
pub const TARGET_MIN: u16 = 40;

/// Minimum derivative magnitude for a confirmed edge.
pub const EDGE_GRADIENT: i16 = 20;
/// Runs must be strictly wider than this.
pub const MIN_RUN_WIDTH: u8 = 3;
/// Runs must be strictly narrower than this.
pub const MAX_RUN_WIDTH: u8 = 40;
/// Runs with this much intra-run variance or more are rejected.
pub const MAX_RUN_VARIANCE: u32 = 1000;
/// High cluster mean above which the scene is considered bright.
pub const BRIGHT_LEVEL: u16 = 800;
/// High cluster mean below which the scene is considered dim.
pub const DIM_LEVEL: u16 = 400;

/// Cruise speed on a straight line.
pub const BASE_SPEED: i16 = 800;
/// Upper bound of any wheel command.
pub const MAX_SPEED: i16 = 1000;
/// Lower bound of a steering command, and the pivot-search speed.
pub const MIN_SPEED: i16 = 300;
/// Largest turn component added to or removed from the forward speed.
pub const MAX_SPEED_DIFF: i16 = 200;
/// Consecutive lost frames tolerated before pivot search starts.
pub const LINE_LOST_THRESHOLD: u8 = 20;

/// Exposure controller bounds and target band.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExposureConfig {
    pub min_exposure: u8,
    pub max_exposure: u8,
    pub initial_exposure: u8,
    pub target_min: u16,
    pub target_max: u16,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            min_exposure: MIN_EXPOSURE,
            max_exposure: MAX_EXPOSURE,
            initial_exposure: INITIAL_EXPOSURE,
            target_min: TARGET_MIN,
            target_max: TARGET_MAX,
        }
    }
}

/// Line locator thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocatorConfig {
    pub edge_gradient: i16,
    pub min_run_width: u8,
    pub max_run_width: u8,
    pub max_run_variance: u32,
    pub bright_level: u16,
    pub dim_level: u16,
    /// Threshold mixing ratio used when the scene is bright.
    pub bright_ratio: f32,
    /// Threshold mixing ratio used when the scene is dim.
    pub dim_ratio: f32,
    /// Threshold mixing ratio for everything in between.
    pub normal_ratio: f32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            edge_gradient: EDGE_GRADIENT,
            min_run_width: MIN_RUN_WIDTH,
            max_run_width: MAX_RUN_WIDTH,
            max_run_variance: MAX_RUN_VARIANCE,
            bright_level: BRIGHT_LEVEL,
            dim_level: DIM_LEVEL,
            bright_ratio: 0.3,
            dim_ratio: 0.7,
            normal_ratio: 0.5,
        }
    }
}

/// Speed and steering limits for the tracking controller.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveConfig {
    pub base_speed: i16,
    pub max_speed: i16,
    pub min_speed: i16,
    pub max_speed_diff: i16,
    pub line_lost_threshold: u8,
    /// Normalized error below which the forward speed is not de-rated.
    pub derate_deadband: f32,
    /// Fraction of base speed the de-rating never goes below.
    pub derate_floor: f32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_speed: BASE_SPEED,
            max_speed: MAX_SPEED,
            min_speed: MIN_SPEED,
            max_speed_diff: MAX_SPEED_DIFF,
            line_lost_threshold: LINE_LOST_THRESHOLD,
            derate_deadband: 0.1,
            derate_floor: 0.2,
        }
    }
}

/// Complete robot configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub exposure: ExposureConfig,
    pub locator: LocatorConfig,
    pub drive: DriveConfig,
}

/// A configuration value that would break a controller invariant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `min_exposure` is above `max_exposure`, or the initial value is outside them.
    ExposureBounds,
    /// `target_min` is above `target_max`.
    TargetBand,
    /// The run width window is empty.
    RunWidth,
    /// A threshold ratio is outside `0.0..=1.0`.
    ThresholdRatio,
    /// Speeds are not ordered `0 <= min <= base <= max`, or the turn limit is negative.
    SpeedOrder,
    /// A de-rating fraction is outside `0.0..=1.0`.
    Derate,
    /// `max_speed + max_speed_diff` does not fit a wheel command.
    SpeedRange,
    /// `line_lost_threshold` leaves no room for the lost counter to pass it.
    LostThreshold,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ExposureBounds => write!(f, "exposure bounds are inverted or exclude the initial value"),
            ConfigError::TargetBand => write!(f, "exposure target band is inverted"),
            ConfigError::RunWidth => write!(f, "run width window is empty"),
            ConfigError::ThresholdRatio => write!(f, "threshold ratio outside 0..=1"),
            ConfigError::SpeedOrder => write!(f, "speeds must satisfy 0 <= min <= base <= max"),
            ConfigError::Derate => write!(f, "de-rating fraction outside 0..=1"),
            ConfigError::SpeedRange => write!(f, "max speed plus turn limit overflows a wheel command"),
            ConfigError::LostThreshold => write!(f, "line lost threshold must be below 255"),
        }
    }
}

impl core::error::Error for ConfigError {}

fn unit_interval(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

impl Config {
    /// Check the invariants the controllers rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.exposure;
        if e.min_exposure > e.max_exposure
            || !(e.min_exposure..=e.max_exposure).contains(&e.initial_exposure)
        {
            return Err(ConfigError::ExposureBounds);
        }
        if e.target_min > e.target_max {
            return Err(ConfigError::TargetBand);
        }

        let l = &self.locator;
        if l.min_run_width.saturating_add(1) >= l.max_run_width {
            return Err(ConfigError::RunWidth);
        }
        if ![l.bright_ratio, l.dim_ratio, l.normal_ratio]
            .into_iter()
            .all(unit_interval)
        {
            return Err(ConfigError::ThresholdRatio);
        }

        let d = &self.drive;
        if d.min_speed < 0
            || d.min_speed > d.base_speed
            || d.base_speed > d.max_speed
            || d.max_speed_diff < 0
        {
            return Err(ConfigError::SpeedOrder);
        }
        if i32::from(d.max_speed) + i32::from(d.max_speed_diff) > i32::from(i16::MAX) {
            return Err(ConfigError::SpeedRange);
        }
        if d.line_lost_threshold == u8::MAX {
            return Err(ConfigError::LostThreshold);
        }
        if !unit_interval(d.derate_deadband) || !unit_interval(d.derate_floor) {
            return Err(ConfigError::Derate);
        }

        Ok(())
    }
}

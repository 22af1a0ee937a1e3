//! linetrack-core - hardware-agnostic line following for a linear CCD robot.
//!
//! Everything that turns a 128-pixel scan line into wheel commands lives
//! here. The firmware crate only provides the pins, the ADC and the PWM
//! channels behind the traits defined in [`acquisition`] and [`tracking`],
//! so the whole pipeline runs on the host against synthetic scan lines.
//!
//! # Modules
//!
//! - [`config`]: tuning constants and the [`Config`] bundle
//! - [`scan`]: fixed-size scan line buffers
//! - [`acquisition`]: TSL1401-style start/clock sequencing behind [`LineSensor`]
//! - [`conditioner`]: 5-tap weighted smoothing
//! - [`exposure`]: bang-bang integration time control
//! - [`locator`]: adaptive threshold and dark-run scoring
//! - [`tracking`]: speed and steering law, lost-line pivot search
//! - [`pipeline`]: one owned context for acquire, smooth, locate, expose
//! - [`diagnostics`]: display image, text waveform and report

#![cfg_attr(not(test), no_std)]

pub mod acquisition;
pub mod conditioner;
pub mod config;
pub mod diagnostics;
pub mod exposure;
pub mod locator;
pub mod pipeline;
pub mod scan;
pub mod tracking;

pub use acquisition::{LineSensor, SampleSource, Tsl1401};
pub use config::{Config, ConfigError, DriveConfig, ExposureConfig, LocatorConfig};
pub use exposure::{ExposureController, ExposureState};
pub use locator::{LineLocation, LineLocator};
pub use pipeline::Pipeline;
pub use scan::{ConditionedScanLine, RawScanLine, SCAN_LEN};
pub use tracking::{TrackCommand, TrackState, TrackingController, Wheel, WheelDrive};

//! The per-tick signal chain: acquire, smooth, locate, adjust exposure.
//!
//! [`Pipeline`] is the one owner of the scan buffers and the exposure loop.
//! The control-loop driver holds it next to the [`TrackingController`] and
//! passes it by `&mut`, so every piece of state has exactly one writer.
//!
//! [`TrackingController`]: crate::tracking::TrackingController

use crate::acquisition::LineSensor;
use crate::conditioner;
use crate::config::Config;
use crate::exposure::{ExposureController, ExposureState};
use crate::locator::{LineLocation, LineLocator};
use crate::scan::ConditionedScanLine;

pub struct Pipeline<S> {
    sensor: S,
    line: ConditionedScanLine,
    exposure: ExposureController,
    locator: LineLocator,
}

impl<S: LineSensor> Pipeline<S> {
    pub fn new(sensor: S, config: &Config) -> Self {
        Self {
            sensor,
            line: ConditionedScanLine::default(),
            exposure: ExposureController::new(config.exposure),
            locator: LineLocator::new(config.locator),
        }
    }

    /// One full pass. The exposure for the next acquisition is updated from
    /// the bright cluster of the most recent frame that found a line.
    pub fn process(&mut self) -> LineLocation {
        let raw = self.sensor.acquire(self.exposure.exposure_time());
        conditioner::smooth_into(&raw, &mut self.line);

        let location = self.locator.locate(&self.line);
        self.exposure.update(location.max_value);
        location
    }

    /// The smoothed line from the last pass.
    pub fn line(&self) -> &ConditionedScanLine {
        &self.line
    }

    pub fn location(&self) -> LineLocation {
        self.locator.last()
    }

    pub fn exposure(&self) -> ExposureState {
        self.exposure.state()
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

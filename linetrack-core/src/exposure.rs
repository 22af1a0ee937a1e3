//! Bang-bang exposure control.
//!
//! One fixed step per frame toward the target brightness band. The step is
//! deliberately small so the loop never oscillates against the locator.

use crate::config::ExposureConfig;

/// Current integration setting and how long it has been left alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExposureState {
    pub exposure_time: u8,
    /// Frames in a row the brightness stayed inside the target band.
    pub stable_count: u8,
}

pub struct ExposureController {
    config: ExposureConfig,
    state: ExposureState,
}

impl ExposureController {
    pub fn new(config: ExposureConfig) -> Self {
        let state = ExposureState {
            // Never panics on inverted bounds.
            exposure_time: config
                .initial_exposure
                .max(config.min_exposure)
                .min(config.max_exposure),
            stable_count: 0,
        };
        Self { config, state }
    }

    pub fn state(&self) -> ExposureState {
        self.state
    }

    pub fn exposure_time(&self) -> u8 {
        self.state.exposure_time
    }

    /// Feed the brightest cluster mean of the last frame.
    pub fn update(&mut self, max_observed: u16) -> ExposureState {
        let cfg = &self.config;
        let state = &mut self.state;

        if max_observed > cfg.target_max {
            state.exposure_time = state.exposure_time.saturating_sub(1).max(cfg.min_exposure);
            state.stable_count = 0;
        } else if max_observed < cfg.target_min {
            state.exposure_time = state.exposure_time.saturating_add(1).min(cfg.max_exposure);
            state.stable_count = 0;
        } else {
            state.stable_count = state.stable_count.saturating_add(1);
        }

        *state
    }
}

impl Default for ExposureController {
    fn default() -> Self {
        Self::new(ExposureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{INITIAL_EXPOSURE, MAX_EXPOSURE, MIN_EXPOSURE, TARGET_MAX, TARGET_MIN};

    #[test]
    fn bright_frame_shortens_exposure() {
        let mut ctl = ExposureController::default();
        let state = ctl.update(TARGET_MAX + 1);
        assert_eq!(state.exposure_time, INITIAL_EXPOSURE - 1);
        assert_eq!(state.stable_count, 0);
    }

    #[test]
    fn dark_frame_lengthens_exposure() {
        let mut ctl = ExposureController::default();
        let state = ctl.update(TARGET_MIN - 1);
        assert_eq!(state.exposure_time, INITIAL_EXPOSURE + 1);
    }

    #[test]
    fn band_edges_count_as_stable() {
        let mut ctl = ExposureController::default();
        ctl.update(TARGET_MIN);
        let state = ctl.update(TARGET_MAX);
        assert_eq!(state.exposure_time, INITIAL_EXPOSURE);
        assert_eq!(state.stable_count, 2);
    }

    #[test]
    fn adjusting_step_resets_stable_count() {
        let mut ctl = ExposureController::default();
        for _ in 0..5 {
            ctl.update(100);
        }
        assert_eq!(ctl.state().stable_count, 5);
        assert_eq!(ctl.update(1000).stable_count, 0);
    }

    #[test]
    fn clamped_step_still_resets_stable_count() {
        let mut ctl = ExposureController::default();
        for _ in 0..100 {
            ctl.update(1000);
        }
        assert_eq!(ctl.exposure_time(), MIN_EXPOSURE);
        ctl.update(100);
        assert_eq!(ctl.update(1000).stable_count, 0);
    }

    #[test]
    fn inverted_bounds_do_not_panic() {
        let config = ExposureConfig {
            min_exposure: 40,
            max_exposure: 20,
            ..ExposureConfig::default()
        };
        let mut ctl = ExposureController::new(config);
        assert_eq!(ctl.exposure_time(), 20);
        ctl.update(0);
        ctl.update(u16::MAX);
    }

    #[test]
    fn stable_count_saturates() {
        let mut ctl = ExposureController::default();
        for _ in 0..300 {
            ctl.update(100);
        }
        assert_eq!(ctl.state().stable_count, u8::MAX);
    }

    #[test]
    fn exposure_stays_in_bounds_for_any_sequence() {
        let mut ctl = ExposureController::default();
        // xorshift keeps the sequence deterministic without extra crates
        let mut seed = 0x2545_f491u32;
        let mut last_stable = 0u8;
        for _ in 0..10_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let brightness = (seed % 300) as u16;

            let state = ctl.update(brightness);
            assert!((MIN_EXPOSURE..=MAX_EXPOSURE).contains(&state.exposure_time));
            if brightness > TARGET_MAX || brightness < TARGET_MIN {
                assert_eq!(state.stable_count, 0);
            } else {
                assert!(state.stable_count > last_stable || state.stable_count == u8::MAX);
            }
            last_stable = state.stable_count;
        }
    }
}

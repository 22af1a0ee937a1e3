//! Scan line acquisition.
//!
//! The TSL1401 family is read by raising SI for one clock to start a frame,
//! then clocking out 128 pixels and sampling the analog output while CLK is
//! low. The time spent between clock edges is the integration time for the
//! next frame, so the dwell is what the exposure controller actually steers.
//!
//! [`Tsl1401`] owns that sequence over embedded-hal pins. The pipeline only
//! sees [`LineSensor`], which tests implement directly with synthetic lines.

use core::convert::Infallible;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;

use crate::scan::RawScanLine;

/// Microseconds of dwell per exposure step.
pub const DWELL_US_PER_STEP: u32 = 1;

/// Capability to produce one raw scan line at a given exposure setting.
pub trait LineSensor {
    /// Block until a full line has been read.
    fn acquire(&mut self, exposure_time: u8) -> RawScanLine;
}

/// Blocking single-channel analog read of the sensor output.
pub trait SampleSource {
    fn read_sample(&mut self) -> u16;
}

impl<F> SampleSource for F
where
    F: FnMut() -> u16,
{
    fn read_sample(&mut self) -> u16 {
        self()
    }
}

/// Start/clock sequencer for a TSL1401-style linear CCD.
pub struct Tsl1401<SI, CLK, ADC, D> {
    si: SI,
    clk: CLK,
    adc: ADC,
    delay: D,
}

fn drive<P: OutputPin<Error = Infallible>>(pin: &mut P, high: bool) {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.unwrap_or_else(|never| match never {})
}

impl<SI, CLK, ADC, D> Tsl1401<SI, CLK, ADC, D>
where
    SI: OutputPin<Error = Infallible>,
    CLK: OutputPin<Error = Infallible>,
    ADC: SampleSource,
    D: DelayUs<u32>,
{
    pub fn new(si: SI, clk: CLK, adc: ADC, delay: D) -> Self {
        Self { si, clk, adc, delay }
    }

    fn dwell(&mut self, exposure_time: u8) {
        if exposure_time <= 1 {
            return;
        }
        let us = u32::from(exposure_time - 1) * DWELL_US_PER_STEP;
        self.delay.delay_us(us);
    }

    fn start_pulse(&mut self, exposure_time: u8) {
        drive(&mut self.clk, true);
        drive(&mut self.si, false);
        self.dwell(exposure_time);

        drive(&mut self.si, true);
        drive(&mut self.clk, false);
        self.dwell(exposure_time);

        drive(&mut self.clk, true);
        drive(&mut self.si, false);
        self.dwell(exposure_time);
    }
}

impl<SI, CLK, ADC, D> LineSensor for Tsl1401<SI, CLK, ADC, D>
where
    SI: OutputPin<Error = Infallible>,
    CLK: OutputPin<Error = Infallible>,
    ADC: SampleSource,
    D: DelayUs<u32>,
{
    fn acquire(&mut self, exposure_time: u8) -> RawScanLine {
        let mut line = RawScanLine::default();
        self.start_pulse(exposure_time);

        for pixel in line.iter_mut() {
            drive(&mut self.clk, false);
            self.dwell(exposure_time);
            self.dwell(exposure_time);

            *pixel = self.adc.read_sample();

            drive(&mut self.clk, true);
            self.dwell(exposure_time);
        }

        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::SCAN_LEN;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Event {
        Si(bool),
        Clk(bool),
        Sample,
        Delay(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct Pin {
        log: Log,
        clock: bool,
    }

    impl OutputPin for Pin {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            let event = if self.clock { Event::Clk(false) } else { Event::Si(false) };
            self.log.borrow_mut().push(event);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            let event = if self.clock { Event::Clk(true) } else { Event::Si(true) };
            self.log.borrow_mut().push(event);
            Ok(())
        }
    }

    struct Delay(Log);

    impl DelayUs<u32> for Delay {
        fn delay_us(&mut self, us: u32) {
            self.0.borrow_mut().push(Event::Delay(us));
        }
    }

    fn sensor(log: &Log) -> Tsl1401<Pin, Pin, impl FnMut() -> u16, Delay> {
        let mut next = 0u16;
        let adc_log = log.clone();
        Tsl1401::new(
            Pin { log: log.clone(), clock: false },
            Pin { log: log.clone(), clock: true },
            move || {
                adc_log.borrow_mut().push(Event::Sample);
                next += 1;
                next
            },
            Delay(log.clone()),
        )
    }

    #[test]
    fn reads_every_pixel_in_order() {
        let log = Log::default();
        let line = sensor(&log).acquire(1);

        for (i, &value) in line.iter().enumerate() {
            assert_eq!(value as usize, i + 1);
        }
        let samples = log.borrow().iter().filter(|e| **e == Event::Sample).count();
        assert_eq!(samples, SCAN_LEN);
    }

    #[test]
    fn start_pulse_precedes_first_sample() {
        let log = Log::default();
        sensor(&log).acquire(1);

        let events = log.borrow();
        let si_high = events.iter().position(|e| *e == Event::Si(true)).unwrap();
        let first_sample = events.iter().position(|e| *e == Event::Sample).unwrap();
        assert!(si_high < first_sample);
        assert_eq!(events.iter().filter(|e| **e == Event::Si(true)).count(), 1);
    }

    #[test]
    fn samples_are_taken_with_clock_low() {
        let log = Log::default();
        sensor(&log).acquire(1);

        let mut clock_high = true;
        for event in log.borrow().iter() {
            match event {
                Event::Clk(level) => clock_high = *level,
                Event::Sample => assert!(!clock_high),
                _ => {}
            }
        }
    }

    #[test]
    fn minimum_exposure_skips_dwell() {
        let log = Log::default();
        sensor(&log).acquire(1);
        assert!(!log.borrow().iter().any(|e| matches!(e, Event::Delay(_))));
    }

    #[test]
    fn dwell_scales_with_exposure() {
        let log = Log::default();
        sensor(&log).acquire(11);

        let delays: Vec<u32> = log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Delay(us) => Some(*us),
                _ => None,
            })
            .collect();
        // Three for the start pulse, three per pixel.
        assert_eq!(delays.len(), 3 + 3 * SCAN_LEN);
        assert!(delays.iter().all(|&us| us == 10 * DWELL_US_PER_STEP));
    }
}

//! TSL1401 linear CCD wiring for the line tracker.
//!
//! The sensor's analog output is read through ADC1 and scaled from the
//! 12-bit conversion down to the 8-bit range the locator and exposure
//! targets were tuned on.
//!
//! Pin Mapping:
//! - AO:  PA0 (ADC1_IN0)
//! - SI:  PA4
//! - CLK: PA1

use embassy_stm32::adc::Adc;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::peripherals::{ADC1, PA0, PA1, PA4};
use embassy_time::Delay;

use linetrack_core::{SampleSource, Tsl1401};

/// Bits dropped from each 12-bit conversion.
const SAMPLE_SHIFT: u32 = 4;

/// The CCD as seen by the pipeline.
pub type Ccd<'d> = Tsl1401<Output<'d>, Output<'d>, CcdAdc<'d>, Delay>;

/// Blocking ADC read of the CCD analog output.
pub struct CcdAdc<'d> {
    adc: Adc<'d, ADC1>,
    pin: PA0,
}

impl SampleSource for CcdAdc<'_> {
    fn read_sample(&mut self) -> u16 {
        self.adc.blocking_read(&mut self.pin) >> SAMPLE_SHIFT
    }
}

/// Wire up the CCD with both control lines idle low.
pub fn ccd<'d>(adc: Adc<'d, ADC1>, ao: PA0, si: PA4, clk: PA1) -> Ccd<'d> {
    let si = Output::new(si, Level::Low, Speed::VeryHigh);
    let clk = Output::new(clk, Level::Low, Speed::VeryHigh);
    Tsl1401::new(si, clk, CcdAdc { adc, pin: ao }, Delay)
}

//! Four-wheel motor drive for the line tracker.
//!
//! Each wheel has its own H-bridge input pair, driven by two PWM channels:
//! one for forward, one for reverse. The left pair sits on TIM1 and the
//! right pair on TIM3, so a side can be retimed without touching the other.

use embassy_stm32::gpio::OutputType;
use embassy_stm32::peripherals::{PA6, PA7, PA8, PA9, PA10, PA11, PB0, PB1, TIM1, TIM3};
use embassy_stm32::time::hz;
use embassy_stm32::timer::Channel;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embedded_hal::Pwm;

use linetrack_core::config::MAX_SPEED;
use linetrack_core::{Wheel, WheelDrive};

/// PWM frequency for motor control (20kHz - inaudible)
const PWM_FREQUENCY: u32 = 20_000;

/// Motor direction
#[derive(Clone, Copy, Debug, PartialEq)]
enum Direction {
    Forward,
    Reverse,
    Coast,
}

/// Forward and reverse channels of one wheel within its timer.
fn channels(wheel: Wheel) -> (Channel, Channel) {
    match wheel {
        Wheel::FrontLeft | Wheel::FrontRight => (Channel::Ch1, Channel::Ch2),
        Wheel::RearLeft | Wheel::RearRight => (Channel::Ch3, Channel::Ch4),
    }
}

fn enable_all<P>(pwm: &mut P)
where
    P: Pwm<Channel = Channel, Duty = u32>,
{
    for ch in [Channel::Ch1, Channel::Ch2, Channel::Ch3, Channel::Ch4] {
        pwm.enable(ch);
        pwm.set_duty(ch, 0);
    }
}

fn apply<P>(pwm: &mut P, fwd_ch: Channel, rev_ch: Channel, direction: Direction, duty: u32)
where
    P: Pwm<Channel = Channel, Duty = u32>,
{
    match direction {
        Direction::Forward => {
            pwm.set_duty(rev_ch, 0);
            pwm.set_duty(fwd_ch, duty);
        }
        Direction::Reverse => {
            pwm.set_duty(fwd_ch, 0);
            pwm.set_duty(rev_ch, duty);
        }
        Direction::Coast => {
            pwm.set_duty(fwd_ch, 0);
            pwm.set_duty(rev_ch, 0);
        }
    }
}

/// Four DC motors through two dual H-bridges.
///
/// Uses TIM1 for the left side:
/// - CH1 (PA8) / CH2 (PA9): front left forward / reverse
/// - CH3 (PA10) / CH4 (PA11): rear left forward / reverse
///
/// and TIM3 for the right side:
/// - CH1 (PA6) / CH2 (PA7): front right forward / reverse
/// - CH3 (PB0) / CH4 (PB1): rear right forward / reverse
pub struct FourWheelDrive<'d> {
    left: SimplePwm<'d, TIM1>,
    right: SimplePwm<'d, TIM3>,
    left_max_duty: u32,
    right_max_duty: u32,
}

impl<'d> FourWheelDrive<'d> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tim1: TIM1,
        pa8: PA8,
        pa9: PA9,
        pa10: PA10,
        pa11: PA11,
        tim3: TIM3,
        pa6: PA6,
        pa7: PA7,
        pb0: PB0,
        pb1: PB1,
    ) -> Self {
        let mut left = SimplePwm::new(
            tim1,
            Some(PwmPin::new_ch1(pa8, OutputType::PushPull)),
            Some(PwmPin::new_ch2(pa9, OutputType::PushPull)),
            Some(PwmPin::new_ch3(pa10, OutputType::PushPull)),
            Some(PwmPin::new_ch4(pa11, OutputType::PushPull)),
            hz(PWM_FREQUENCY),
            CountingMode::EdgeAlignedUp,
        );
        let mut right = SimplePwm::new(
            tim3,
            Some(PwmPin::new_ch1(pa6, OutputType::PushPull)),
            Some(PwmPin::new_ch2(pa7, OutputType::PushPull)),
            Some(PwmPin::new_ch3(pb0, OutputType::PushPull)),
            Some(PwmPin::new_ch4(pb1, OutputType::PushPull)),
            hz(PWM_FREQUENCY),
            CountingMode::EdgeAlignedUp,
        );

        let left_max_duty = left.get_max_duty();
        let right_max_duty = right.get_max_duty();

        // Start with motors stopped
        enable_all(&mut left);
        enable_all(&mut right);

        Self {
            left,
            right,
            left_max_duty,
            right_max_duty,
        }
    }

    /// Set one wheel's direction and duty.
    fn set_motor(&mut self, wheel: Wheel, direction: Direction, duty_permille: u32) {
        let (fwd_ch, rev_ch) = channels(wheel);
        match wheel {
            Wheel::FrontLeft | Wheel::RearLeft => {
                let duty = self.left_max_duty * duty_permille.min(1000) / 1000;
                apply(&mut self.left, fwd_ch, rev_ch, direction, duty);
            }
            Wheel::FrontRight | Wheel::RearRight => {
                let duty = self.right_max_duty * duty_permille.min(1000) / 1000;
                apply(&mut self.right, fwd_ch, rev_ch, direction, duty);
            }
        }
    }

    /// Convert a signed wheel command to direction and duty in permille.
    fn speed_to_dir(speed: i16) -> (Direction, u32) {
        let permille = u32::from(speed.unsigned_abs()) * 1000 / MAX_SPEED as u32;
        if speed > 0 {
            (Direction::Forward, permille)
        } else if speed < 0 {
            (Direction::Reverse, permille)
        } else {
            (Direction::Coast, 0)
        }
    }
}

impl WheelDrive for FourWheelDrive<'_> {
    fn set_wheel_speed(&mut self, wheel: Wheel, speed: i16) {
        let (direction, permille) = Self::speed_to_dir(speed);
        self.set_motor(wheel, direction, permille);
    }

    /// Short both bridge legs of every wheel.
    fn brake(&mut self) {
        for ch in [Channel::Ch1, Channel::Ch2, Channel::Ch3, Channel::Ch4] {
            self.left.set_duty(ch, self.left_max_duty);
            self.right.set_duty(ch, self.right_max_duty);
        }
    }
}

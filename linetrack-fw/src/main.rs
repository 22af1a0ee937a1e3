#![no_std]
#![no_main]

mod console;
mod motors;
mod sensors;

use defmt::{debug, info, warn};
use embassy_executor::Spawner;
use embassy_stm32::adc::Adc;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::usart::{Config as UartConfig, UartTx};
use embassy_stm32::Config;
use embassy_time::{Duration, Instant, Timer};
use {defmt_rtt as _, panic_probe as _};

use linetrack_core::diagnostics::{column_image, Report};
use linetrack_core::{Config as TrackConfig, Pipeline, TrackCommand, TrackingController, WheelDrive};

use console::Console;
use motors::FourWheelDrive;

defmt::timestamp!("{=u64}", { embassy_time::Instant::now().as_millis() });

#[embassy_executor::task]
async fn blink_task(mut led: Output<'static>) {
    loop {
        led.toggle();
        Timer::after_millis(500).await;
    }
}

#[derive(Clone, Copy, PartialEq, defmt::Format)]
enum RunMode {
    Stop,
    Tracking,
    Display,
}

/// Ignore further edges for this long after a press.
const DEBOUNCE: Duration = Duration::from_millis(50);

/// Active-low push button, reports each press once.
struct Button<'d> {
    pin: Input<'d>,
    was_down: bool,
    last_press: Option<Instant>,
}

impl<'d> Button<'d> {
    fn new(pin: Input<'d>) -> Self {
        Self {
            pin,
            was_down: false,
            last_press: None,
        }
    }

    fn pressed(&mut self) -> bool {
        let now = Instant::now();
        if self.last_press.is_some_and(|t| now - t < DEBOUNCE) {
            return false;
        }
        let down = self.pin.is_low();
        let edge = down && !self.was_down;
        self.was_down = down;
        if edge {
            self.last_press = Some(now);
        }
        edge
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_stm32::init(Config::default());

    info!("=== Linear CCD Line Tracker ===");

    let config = TrackConfig::default();
    defmt::unwrap!(config.validate());

    // LED blink task
    let led = Output::new(p.PA5, Level::Low, Speed::Low);
    spawner.spawn(blink_task(led)).unwrap();

    // TIM1: PA8..PA11 left wheels, TIM3: PA6, PA7, PB0, PB1 right wheels
    let mut motors = FourWheelDrive::new(
        p.TIM1, p.PA8, p.PA9, p.PA10, p.PA11, p.TIM3, p.PA6, p.PA7, p.PB0, p.PB1,
    );
    info!("Motors initialized");

    // CCD: AO=PA0, SI=PA4, CLK=PA1
    let ccd = sensors::ccd(Adc::new(p.ADC1), p.PA0, p.PA4, p.PA1);
    let mut pipeline = Pipeline::new(ccd, &config);
    info!("CCD initialized, exposure {}", pipeline.exposure().exposure_time);

    // Console (USART6 TX on PC6)
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = 115_200;
    let tx = UartTx::new(p.USART6, p.PC6, p.DMA2_CH6, uart_config).unwrap();
    let mut console = Console::new(tx);
    info!("Console initialized (115200 baud)");

    // Key1 = PC13 (user button), Key2 = PB5
    let mut key1 = Button::new(Input::new(p.PC13, Pull::Up));
    let mut key2 = Button::new(Input::new(p.PB5, Pull::Up));

    let mut tracker = TrackingController::new(config.drive);
    let mut mode = RunMode::Stop;
    let mut searching = false;

    let _ = console.write_line("System Ready! Key1: Track  Key2: Display").await;
    info!("Ready! Key1 = track/stop, Key2 = display/stop");

    loop {
        if key1.pressed() {
            if mode != RunMode::Tracking {
                mode = RunMode::Tracking;
                tracker.reset();
                tracker.start();
                searching = false;
                let _ = console.write_line("Entering Tracking Mode").await;
            } else {
                mode = RunMode::Stop;
                tracker.stop(&mut motors);
                let _ = console.write_line("Stopped").await;
            }
            info!("Mode: {}", mode);
        }

        if key2.pressed() {
            if mode != RunMode::Display {
                mode = RunMode::Display;
                tracker.stop(&mut motors);
                let _ = console.write_line("Entering Display Mode").await;
            } else {
                mode = RunMode::Stop;
                let _ = console.write_line("Stopped").await;
            }
            info!("Mode: {}", mode);
        }

        match mode {
            RunMode::Tracking => {
                let cmd = tracker.update(&mut pipeline, &mut motors);
                match cmd {
                    TrackCommand::Search { speed } if !searching => {
                        searching = true;
                        warn!("Line lost, pivot search at {}", speed);
                    }
                    TrackCommand::Steer { .. } if searching => {
                        searching = false;
                        info!("Line reacquired at {}", pipeline.location().median);
                    }
                    _ => {}
                }
                debug!("{} {}", cmd, pipeline.location());
            }
            RunMode::Display => {
                pipeline.process();
                let location = pipeline.location();
                let exposure = pipeline.exposure();
                let report = Report {
                    line: pipeline.line(),
                    location: &location,
                    exposure: &exposure,
                };
                if let Err(e) = console.write_report(&report).await {
                    warn!("Console write failed: {}", defmt::Debug2Format(&e));
                }
                let image = column_image(pipeline.line());
                debug!("Image: {=[u8]}", &image[..]);
            }
            RunMode::Stop => {
                // Keep the wheels held while idle
                motors.brake();
            }
        }

        Timer::after_millis(1).await;
    }
}

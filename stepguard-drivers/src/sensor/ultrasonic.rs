//! HC-SR04 4-pin ultrasonic ranger
//!
//! Separate trigger and echo lines. A 10 µs trigger pulse starts a burst;
//! the echo line then stays high for the round-trip time of the sound.

use embedded_hal::delay::DelayNs;
use stepguard_core::config::{SensorConfig, SensorType};
use stepguard_core::log::Logger;
use stepguard_hal::{OutputPin, PulseInput};

use super::ranging::{
    Ranger, RangingSensor, ECHO_TIMEOUT_US, TRIGGER_PULSE_US, TRIGGER_SETTLE_US,
};

/// Trigger/echo pin pair of an HC-SR04
pub struct Hcsr04<T, E, D> {
    trigger: T,
    echo: E,
    delay: D,
}

impl<T, E, D> Hcsr04<T, E, D> {
    pub fn new(trigger: T, echo: E, delay: D) -> Self {
        Self {
            trigger,
            echo,
            delay,
        }
    }
}

impl<T: OutputPin, E: PulseInput, D: DelayNs> Ranger for Hcsr04<T, E, D> {
    const SENSOR_TYPE: SensorType = SensorType::Ultrasonic;

    fn init(&mut self) {
        self.trigger.set_low();
    }

    fn ping(&mut self) -> Option<u32> {
        self.trigger.set_low();
        self.delay.delay_us(TRIGGER_SETTLE_US);
        self.trigger.set_high();
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low();

        self.echo.pulse_high_us(ECHO_TIMEOUT_US).filter(|&us| us > 0)
    }

    /// Speed of sound 343 m/s, halved for the round trip
    fn echo_to_mm(echo_us: u32) -> u32 {
        echo_us * 343 / 2000
    }
}

/// HC-SR04 motion sensor
pub type UltrasonicSensor<T, E, D> = RangingSensor<Hcsr04<T, E, D>>;

impl<T: OutputPin, E: PulseInput, D: DelayNs> RangingSensor<Hcsr04<T, E, D>> {
    /// Build an HC-SR04 sensor from its trigger and echo pins
    pub fn hcsr04(
        trigger: T,
        echo: E,
        delay: D,
        config: SensorConfig,
        logger: &'static dyn Logger,
    ) -> Self {
        RangingSensor::new(Hcsr04::new(trigger, echo, delay), config, logger)
    }
}

//! Grove 3-pin ultrasonic ranger
//!
//! Trigger and echo share the SIG line: the pin is driven as an output for
//! the trigger pulse, then switched to input to time the echo.

use embedded_hal::delay::DelayNs;
use stepguard_core::config::{SensorConfig, SensorType};
use stepguard_core::log::Logger;
use stepguard_hal::{FlexPin, PinMode};

use super::ranging::{
    Ranger, RangingSensor, ECHO_TIMEOUT_US, TRIGGER_PULSE_US, TRIGGER_SETTLE_US,
};

/// Single SIG line of a Grove ranger
pub struct GroveRanger<P, D> {
    sig: P,
    delay: D,
}

impl<P, D> GroveRanger<P, D> {
    pub fn new(sig: P, delay: D) -> Self {
        Self { sig, delay }
    }
}

impl<P: FlexPin, D: DelayNs> Ranger for GroveRanger<P, D> {
    const SENSOR_TYPE: SensorType = SensorType::UltrasonicGrove;

    fn init(&mut self) {
        self.sig.set_mode(PinMode::Output);
        self.sig.set_low();
    }

    fn ping(&mut self) -> Option<u32> {
        self.sig.set_mode(PinMode::Output);
        self.sig.set_low();
        self.delay.delay_us(TRIGGER_SETTLE_US);
        self.sig.set_high();
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.sig.set_low();

        self.sig.set_mode(PinMode::Input);
        self.sig.pulse_high_us(ECHO_TIMEOUT_US).filter(|&us| us > 0)
    }

    /// Module datasheet: 5.82 µs of echo per mm
    fn echo_to_mm(echo_us: u32) -> u32 {
        echo_us * 100 / 582
    }
}

/// Grove ultrasonic motion sensor
pub type GroveSensor<P, D> = RangingSensor<GroveRanger<P, D>>;

impl<P: FlexPin, D: DelayNs> RangingSensor<GroveRanger<P, D>> {
    /// Build a Grove sensor from its SIG pin
    pub fn grove(sig: P, delay: D, config: SensorConfig, logger: &'static dyn Logger) -> Self {
        RangingSensor::new(GroveRanger::new(sig, delay), config, logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use heapless::Vec;
    use stepguard_core::log::NOOP_LOGGER;
    use stepguard_core::traits::MotionSensor;
    use stepguard_hal::{OutputPin, PulseInput};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Mode(PinMode),
        Drive(bool),
        Listen,
    }

    struct MockSig<'a> {
        width_us: &'a Cell<Option<u32>>,
        mode: PinMode,
        high: bool,
        ops: Vec<Op, 16>,
    }

    impl<'a> MockSig<'a> {
        fn new(width_us: &'a Cell<Option<u32>>) -> Self {
            Self {
                width_us,
                mode: PinMode::Input,
                high: false,
                ops: Vec::new(),
            }
        }
    }

    impl OutputPin for MockSig<'_> {
        fn set_high(&mut self) {
            self.high = true;
            let _ = self.ops.push(Op::Drive(true));
        }

        fn set_low(&mut self) {
            self.high = false;
            let _ = self.ops.push(Op::Drive(false));
        }

        fn is_set_high(&self) -> bool {
            self.high
        }
    }

    impl PulseInput for MockSig<'_> {
        fn pulse_high_us(&mut self, _timeout_us: u32) -> Option<u32> {
            assert_eq!(self.mode, PinMode::Input, "echo timed on an output");
            let _ = self.ops.push(Op::Listen);
            self.width_us.get()
        }
    }

    impl FlexPin for MockSig<'_> {
        fn set_mode(&mut self, mode: PinMode) {
            self.mode = mode;
            let _ = self.ops.push(Op::Mode(mode));
        }

        fn mode(&self) -> PinMode {
            self.mode
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn test_pin_switches_for_echo() {
        let width = Cell::new(Some(5820));
        let mut ranger = GroveRanger::new(MockSig::new(&width), NoDelay);
        assert_eq!(ranger.ping(), Some(5820));
        assert_eq!(
            ranger.sig.ops.as_slice(),
            &[
                Op::Mode(PinMode::Output),
                Op::Drive(false),
                Op::Drive(true),
                Op::Drive(false),
                Op::Mode(PinMode::Input),
                Op::Listen,
            ]
        );
    }

    #[test]
    fn test_echo_conversion() {
        type R = GroveRanger<MockSig<'static>, NoDelay>;
        assert_eq!(R::echo_to_mm(5820), 1000);
        assert_eq!(R::echo_to_mm(582), 100);
    }

    #[test]
    fn test_grove_defaults() {
        let width = Cell::new(Some(5820));
        let mut sensor =
            GroveSensor::grove(MockSig::new(&width), NoDelay, SensorConfig::grove(4), &NOOP_LOGGER);
        assert_eq!(sensor.detection_threshold_mm(), Some(1200));
        assert_eq!(sensor.sensor_type(), SensorType::UltrasonicGrove);
        assert!(sensor.begin(0));
        sensor.update(0);
        assert_eq!(sensor.distance_mm(), Some(1000));

        // Below the 30 mm floor
        width.set(Some(100));
        sensor.update(75);
        assert_eq!(sensor.distance_mm(), Some(1000));
    }
}

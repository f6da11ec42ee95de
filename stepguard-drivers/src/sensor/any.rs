//! Enum dispatch over the board's sensor variants

use heapless::Vec;
use stepguard_core::config::SensorType;
use stepguard_core::traits::{MotionDirection, MotionEvent, MotionSensor, SensorError, WakeSource};

use super::factory::PinBank;
use super::grove::GroveSensor;
use super::pir::PirSensor;
use super::ultrasonic::UltrasonicSensor;

/// Any sensor a [`BoardSensorFactory`](super::factory::BoardSensorFactory) can build
pub enum AnySensor<B: PinBank> {
    Pir(PirSensor<B::Input, B::Output>),
    Ultrasonic(UltrasonicSensor<B::Output, B::Echo, B::Delay>),
    Grove(GroveSensor<B::Flex, B::Delay>),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            AnySensor::Pir($s) => $body,
            AnySensor::Ultrasonic($s) => $body,
            AnySensor::Grove($s) => $body,
        }
    };
}

impl<B: PinBank> AnySensor<B> {
    pub fn as_pir(&self) -> Option<&PirSensor<B::Input, B::Output>> {
        match self {
            AnySensor::Pir(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pir_mut(&mut self) -> Option<&mut PirSensor<B::Input, B::Output>> {
        match self {
            AnySensor::Pir(s) => Some(s),
            _ => None,
        }
    }

    /// Echo failure rate of ultrasonic variants
    pub fn error_rate_percent(&self) -> Option<u8> {
        match self {
            AnySensor::Pir(_) => None,
            AnySensor::Ultrasonic(s) => s.error_rate_percent(),
            AnySensor::Grove(s) => s.error_rate_percent(),
        }
    }

    /// Pins this sensor holds handles for
    pub fn claimed_pins(&self) -> Vec<u8, 3> {
        let mut pins = Vec::new();
        match self {
            AnySensor::Pir(s) => {
                let _ = pins.push(s.config().primary_pin);
                if s.owns_power_pin() {
                    if let Some(p) = s.config().power_pin {
                        let _ = pins.push(p);
                    }
                }
            }
            AnySensor::Ultrasonic(s) => {
                let _ = pins.push(s.config().primary_pin);
                if let Some(p) = s.config().secondary_pin {
                    let _ = pins.push(p);
                }
            }
            AnySensor::Grove(s) => {
                let _ = pins.push(s.config().primary_pin);
            }
        }
        pins
    }
}

impl<B: PinBank> MotionSensor for AnySensor<B> {
    fn begin(&mut self, now_ms: u32) -> bool {
        dispatch!(self, s => s.begin(now_ms))
    }

    fn update(&mut self, now_ms: u32) {
        dispatch!(self, s => s.update(now_ms))
    }

    fn motion_detected(&self) -> bool {
        dispatch!(self, s => s.motion_detected())
    }

    fn is_ready(&self) -> bool {
        dispatch!(self, s => s.is_ready())
    }

    fn sensor_type(&self) -> SensorType {
        dispatch!(self, s => s.sensor_type())
    }

    fn event_count(&self) -> u32 {
        dispatch!(self, s => s.event_count())
    }

    fn reset_event_count(&mut self) {
        dispatch!(self, s => s.reset_event_count())
    }

    fn last_event(&self) -> MotionEvent {
        dispatch!(self, s => s.last_event())
    }

    fn last_event_time_ms(&self) -> u32 {
        dispatch!(self, s => s.last_event_time_ms())
    }

    fn distance_mm(&self) -> Option<u32> {
        dispatch!(self, s => s.distance_mm())
    }

    fn direction(&self) -> Option<MotionDirection> {
        dispatch!(self, s => s.direction())
    }

    fn detection_threshold_mm(&self) -> Option<u32> {
        dispatch!(self, s => s.detection_threshold_mm())
    }

    fn set_detection_threshold(&mut self, threshold_mm: u32) -> Result<(), SensorError> {
        dispatch!(self, s => s.set_detection_threshold(threshold_mm))
    }

    fn sample_window_size(&self) -> Option<u8> {
        dispatch!(self, s => s.sample_window_size())
    }

    fn set_sample_window_size(&mut self, size: u8) -> Result<(), SensorError> {
        dispatch!(self, s => s.set_sample_window_size(size))
    }

    fn set_direction_detection(&mut self, enabled: bool) -> Result<(), SensorError> {
        dispatch!(self, s => s.set_direction_detection(enabled))
    }

    fn warmup_remaining_ms(&self, now_ms: u32) -> Option<u32> {
        dispatch!(self, s => s.warmup_remaining_ms(now_ms))
    }

    fn recalibrate(&mut self, now_ms: u32) -> Result<(), SensorError> {
        dispatch!(self, s => s.recalibrate(now_ms))
    }

    fn is_recalibrating(&self) -> bool {
        dispatch!(self, s => s.is_recalibrating())
    }

    fn wake_source(&self) -> Option<WakeSource> {
        dispatch!(self, s => s.wake_source())
    }

    #[cfg(any(test, feature = "mock"))]
    fn mock_set_motion(&mut self, motion: bool) {
        dispatch!(self, s => s.mock_set_motion(motion))
    }

    #[cfg(any(test, feature = "mock"))]
    fn mock_set_distance(&mut self, distance_mm: u32, now_ms: u32) {
        dispatch!(self, s => s.mock_set_distance(distance_mm, now_ms))
    }

    #[cfg(any(test, feature = "mock"))]
    fn mock_set_ready(&mut self, ready: bool) {
        dispatch!(self, s => s.mock_set_ready(ready))
    }
}

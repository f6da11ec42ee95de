//! Motion sensor trait and shared sensor types

use crate::capabilities::SensorCapabilities;
use crate::config::SensorType;

/// Errors returned by sensor operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Operation not available for this sensor type
    Unsupported,
    /// Recalibration requested without a power pin
    NoPowerPin,
    /// `begin()` has not succeeded yet
    NotInitialized,
    /// Rejected range (e.g. min >= max)
    InvalidRange,
}

impl SensorError {
    pub const fn message(self) -> &'static str {
        match self {
            SensorError::Unsupported => "Operation not supported by this sensor",
            SensorError::NoPowerPin => "No power pin configured",
            SensorError::NotInitialized => "Sensor not initialized",
            SensorError::InvalidRange => "Invalid distance range",
        }
    }
}

/// Motion events reported by sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionEvent {
    #[default]
    None,
    /// Motion started (rising edge)
    Detected,
    /// Motion ended (falling edge)
    Cleared,
    /// Distance fell inside the detection threshold
    ThresholdCrossed,
    /// Confirmed direction changed to approaching while detected
    Approaching,
    /// Confirmed direction changed to receding while detected
    Receding,
}

/// Direction of a tracked object relative to the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionDirection {
    #[default]
    Unknown,
    Stationary,
    Approaching,
    Receding,
}

impl MotionDirection {
    pub const fn name(self) -> &'static str {
        match self {
            MotionDirection::Unknown => "unknown",
            MotionDirection::Stationary => "stationary",
            MotionDirection::Approaching => "approaching",
            MotionDirection::Receding => "receding",
        }
    }
}

/// Runtime snapshot of one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorStatus {
    pub ready: bool,
    pub motion: bool,
    /// Timestamp of last event (ms)
    pub last_event_time_ms: u32,
    /// Events since last reset
    pub event_count: u32,
    /// Current distance (mm), distance-capable sensors only
    pub distance_mm: Option<u32>,
    /// Confirmed direction, direction-capable sensors only
    pub direction: Option<MotionDirection>,
    pub last_event: MotionEvent,
}

/// GPIO pins a sensor contributes to the deep-sleep wake list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeSource {
    /// Detection output pin
    pub pin: u8,
    /// Power rail that must stay on during sleep
    pub power_pin: Option<u8>,
}

/// Trait for motion sensors
///
/// `update()` must be called every tick with the current monotonic time.
/// Implementations must not block longer than one echo timeout.
///
/// Capability-gated readings return `None` and capability-gated setters
/// return [`SensorError::Unsupported`] when the sensor type lacks the
/// matching flag in [`SensorCapabilities`].
pub trait MotionSensor {
    /// Configure pins and start warm-up
    fn begin(&mut self, now_ms: u32) -> bool;

    /// Run one read/filter/classify cycle
    fn update(&mut self, now_ms: u32);

    /// Current (trusted) motion state
    fn motion_detected(&self) -> bool;

    /// Sensor finished warm-up and is not recalibrating
    fn is_ready(&self) -> bool;

    fn sensor_type(&self) -> SensorType;

    fn capabilities(&self) -> &'static SensorCapabilities {
        self.sensor_type().capabilities()
    }

    fn event_count(&self) -> u32;

    fn reset_event_count(&mut self);

    fn last_event(&self) -> MotionEvent;

    fn last_event_time_ms(&self) -> u32;

    /// Current distance (mm)
    fn distance_mm(&self) -> Option<u32> {
        None
    }

    /// Confirmed movement direction
    fn direction(&self) -> Option<MotionDirection> {
        None
    }

    /// Distance threshold (mm)
    fn detection_threshold_mm(&self) -> Option<u32> {
        None
    }

    fn set_detection_threshold(&mut self, _threshold_mm: u32) -> Result<(), SensorError> {
        Err(SensorError::Unsupported)
    }

    /// Rolling window size
    fn sample_window_size(&self) -> Option<u8> {
        None
    }

    fn set_sample_window_size(&mut self, _size: u8) -> Result<(), SensorError> {
        Err(SensorError::Unsupported)
    }

    fn set_direction_detection(&mut self, _enabled: bool) -> Result<(), SensorError> {
        Err(SensorError::Unsupported)
    }

    /// Warm-up time left, for sensors that warm up
    fn warmup_remaining_ms(&self, _now_ms: u32) -> Option<u32> {
        None
    }

    /// Start a power-cycle recalibration
    fn recalibrate(&mut self, _now_ms: u32) -> Result<(), SensorError> {
        Err(SensorError::Unsupported)
    }

    fn is_recalibrating(&self) -> bool {
        false
    }

    /// Pins to register as deep-sleep wake sources
    fn wake_source(&self) -> Option<WakeSource> {
        None
    }

    fn status(&self) -> SensorStatus {
        SensorStatus {
            ready: self.is_ready(),
            motion: self.motion_detected(),
            last_event_time_ms: self.last_event_time_ms(),
            event_count: self.event_count(),
            distance_mm: self.distance_mm(),
            direction: self.direction(),
            last_event: self.last_event(),
        }
    }

    fn supports_distance(&self) -> bool {
        self.capabilities().distance_measurement
    }

    fn supports_direction(&self) -> bool {
        self.capabilities().direction_detection
    }

    fn supports_deep_sleep_wake(&self) -> bool {
        self.capabilities().deep_sleep_wake
    }

    fn requires_warmup(&self) -> bool {
        self.capabilities().requires_warmup
    }

    /// Force the motion state (tests and simulators only)
    #[cfg(any(test, feature = "mock"))]
    fn mock_set_motion(&mut self, _motion: bool) {}

    /// Feed a synthetic distance reading (tests and simulators only)
    #[cfg(any(test, feature = "mock"))]
    fn mock_set_distance(&mut self, _distance_mm: u32, _now_ms: u32) {}

    /// Force warm-up complete or pending (tests and simulators only)
    #[cfg(any(test, feature = "mock"))]
    fn mock_set_ready(&mut self, _ready: bool) {}
}

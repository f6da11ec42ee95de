//! Sensor slots and aggregate status

use heapless::String;

use crate::config::{SensorConfig, MAX_LABEL_LEN};
use crate::traits::MotionDirection;

/// One occupied manager slot
///
/// The slot owns its sensor outright; sensors are never shared between
/// slots.
#[derive(Debug)]
pub struct SensorSlot<S> {
    pub(super) sensor: S,
    pub(super) config: SensorConfig,
    pub(super) enabled: bool,
    pub(super) primary: bool,
    pub(super) label: String<MAX_LABEL_LEN>,
}

impl<S> SensorSlot<S> {
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Config the sensor was built from
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    pub(super) fn into_sensor(self) -> S {
        self.sensor
    }
}

/// Combined view over all enabled sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CombinedStatus {
    /// At least one enabled sensor detects motion
    pub any_motion: bool,
    /// Every enabled sensor detects motion (false with no sensors)
    pub all_motion: bool,
    /// Enabled sensors
    pub active_count: u8,
    /// Enabled sensors currently detecting
    pub detecting_count: u8,
    /// Nearest distance across distance-capable sensors (mm), 0 if none
    pub nearest_distance_mm: u32,
    /// Direction reported by the primary sensor
    pub primary_direction: MotionDirection,
    /// Sum of all per-sensor event counters
    pub combined_event_count: u32,
}

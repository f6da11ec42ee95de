//! Per-type sensor capability tables
//!
//! Capabilities are fixed per hardware type and never change at runtime.
//! Managers and status pages use them to decide which optional readings
//! (distance, direction) are meaningful for a sensor.

use crate::config::SensorType;

/// What a sensor type can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorCapabilities {
    /// Simple motion yes/no
    pub binary_detection: bool,
    /// Reports distance in mm
    pub distance_measurement: bool,
    /// Reports approaching/receding
    pub direction_detection: bool,
    /// Readings unreliable until warm-up completes
    pub requires_warmup: bool,
    /// Output can wake the MCU from deep sleep
    pub deep_sleep_wake: bool,
    /// Minimum detection range (mm), 0 if N/A
    pub min_distance_mm: u32,
    /// Maximum detection range (mm)
    pub max_distance_mm: u32,
    /// Field of view (degrees)
    pub detection_angle_deg: u16,
    /// Typical warm-up (ms), 0 if none
    pub typical_warmup_ms: u32,
    /// Typical supply current (mA)
    pub typical_current_ma: u16,
    /// Human-readable type name
    pub name: &'static str,
}

pub const PIR_CAPABILITIES: SensorCapabilities = SensorCapabilities {
    binary_detection: true,
    distance_measurement: false,
    direction_detection: false,
    requires_warmup: true,
    deep_sleep_wake: true,
    min_distance_mm: 0,
    max_distance_mm: 7000,
    detection_angle_deg: 120,
    typical_warmup_ms: 60_000,
    typical_current_ma: 1, // ~65uA, rounded up
    name: "PIR Motion Sensor",
};

pub const IR_CAPABILITIES: SensorCapabilities = SensorCapabilities {
    binary_detection: true,
    distance_measurement: false,
    direction_detection: false,
    requires_warmup: false,
    deep_sleep_wake: true,
    min_distance_mm: 0,
    max_distance_mm: 500,
    detection_angle_deg: 35,
    typical_warmup_ms: 0,
    typical_current_ma: 5,
    name: "IR Beam Sensor",
};

pub const ULTRASONIC_CAPABILITIES: SensorCapabilities = SensorCapabilities {
    binary_detection: true,
    distance_measurement: true,
    direction_detection: true,
    requires_warmup: false,
    deep_sleep_wake: false, // needs active pinging
    min_distance_mm: 20,
    max_distance_mm: 4000,
    detection_angle_deg: 15,
    typical_warmup_ms: 0,
    typical_current_ma: 15,
    name: "Ultrasonic Distance Sensor (HC-SR04)",
};

pub const GROVE_CAPABILITIES: SensorCapabilities = SensorCapabilities {
    binary_detection: true,
    distance_measurement: true,
    direction_detection: true,
    requires_warmup: false,
    deep_sleep_wake: false,
    min_distance_mm: 30,
    max_distance_mm: 3500,
    detection_angle_deg: 15,
    typical_warmup_ms: 0,
    typical_current_ma: 8,
    name: "Grove Ultrasonic Ranger",
};

impl SensorType {
    /// Static capability table for this type
    pub const fn capabilities(self) -> &'static SensorCapabilities {
        match self {
            SensorType::Pir => &PIR_CAPABILITIES,
            SensorType::Ir => &IR_CAPABILITIES,
            SensorType::Ultrasonic => &ULTRASONIC_CAPABILITIES,
            SensorType::UltrasonicGrove => &GROVE_CAPABILITIES,
        }
    }
}

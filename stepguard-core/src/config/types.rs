//! Sensor configuration type definitions
//!
//! These records are produced by the configuration loader and consumed once
//! when sensors are constructed. The sensor subsystem never writes them back.

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum label length
pub const MAX_LABEL_LEN: usize = 16;

/// Maximum sensors managed at once
pub const MAX_SENSORS: usize = 4;

/// Default PIR warm-up (ms)
pub const PIR_WARMUP_TIME_MS: u32 = 60_000;

/// Default ultrasonic detection threshold (mm)
pub const ULTRASONIC_THRESHOLD_MM: u32 = 500;

/// Default Grove detection threshold (mm), matching the module's factory tune
pub const GROVE_THRESHOLD_MM: u32 = 1200;

/// Default ultrasonic sample interval (ms)
pub const ULTRASONIC_SAMPLE_INTERVAL_MS: u32 = 75;

/// Default rolling window size for distance sensors
pub const DEFAULT_WINDOW_SIZE: u8 = 3;

/// Supported sensor hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorType {
    /// Passive infrared motion sensor (AM312 style)
    #[default]
    Pir,
    /// Infrared beam-break (declared, no driver yet)
    Ir,
    /// 4-pin ultrasonic ranger (HC-SR04: trigger + echo)
    Ultrasonic,
    /// 3-pin ultrasonic ranger (Grove: shared signal pin)
    UltrasonicGrove,
}

impl SensorType {
    /// Short name for logs and status pages
    pub const fn name(self) -> &'static str {
        match self {
            SensorType::Pir => "PIR",
            SensorType::Ir => "IR",
            SensorType::Ultrasonic => "Ultrasonic",
            SensorType::UltrasonicGrove => "Ultrasonic (Grove)",
        }
    }

    /// Whether this type measures distance (and so owns a distance engine)
    pub const fn is_distance(self) -> bool {
        matches!(self, SensorType::Ultrasonic | SensorType::UltrasonicGrove)
    }
}

/// Which direction of travel may raise a distance trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TriggerMode {
    /// Only objects moving toward the sensor
    #[default]
    Approaching,
    /// Only objects moving away
    Receding,
    /// Any confirmed movement
    Both,
}

/// How multiple sensors combine into one motion decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FusionMode {
    /// Motion if any enabled sensor detects
    #[default]
    Any,
    /// Motion only if every enabled sensor detects
    All,
    /// Primary sensor decides; others supply distance/direction
    TriggerMeasure,
    /// Same read path as TriggerMeasure, no cross-sensor gating
    Independent,
}

impl FusionMode {
    pub const fn name(self) -> &'static str {
        match self {
            FusionMode::Any => "ANY",
            FusionMode::All => "ALL",
            FusionMode::TriggerMeasure => "TRIGGER_MEASURE",
            FusionMode::Independent => "INDEPENDENT",
        }
    }
}

/// Per-sensor construction parameters
///
/// Zero in a numeric field means "use the type default".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorConfig {
    pub sensor_type: SensorType,
    /// Signal pin (PIR output, ultrasonic trigger, Grove SIG)
    pub primary_pin: u8,
    /// Echo pin for 4-pin ultrasonic modules
    pub secondary_pin: Option<u8>,
    /// PIR power rail, used for power-cycle recalibration
    pub power_pin: Option<u8>,
    /// Distance threshold (mm)
    pub detection_threshold_mm: u32,
    /// Distance sample interval (ms), 0 for the engine default; PIR ignores it
    pub sample_interval_ms: u32,
    /// Warm-up override (ms)
    pub warmup_ms: u32,
    pub direction_enabled: bool,
    pub trigger_mode: TriggerMode,
    /// Minimum median change (mm) counted as movement; 0 = auto
    pub direction_sensitivity_mm: u32,
    /// Rolling window size (3-20)
    pub sample_window_size: u8,
    /// Active-low detection output
    pub invert_logic: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::default_for(SensorType::Pir)
    }
}

impl SensorConfig {
    /// Factory defaults for a sensor type
    pub const fn default_for(sensor_type: SensorType) -> Self {
        let base = Self {
            sensor_type,
            primary_pin: 1,
            secondary_pin: None,
            power_pin: None,
            detection_threshold_mm: 0,
            sample_interval_ms: 0,
            warmup_ms: 0,
            direction_enabled: false,
            trigger_mode: TriggerMode::Approaching,
            direction_sensitivity_mm: 0,
            sample_window_size: 0,
            invert_logic: false,
        };

        match sensor_type {
            SensorType::Pir => Self {
                warmup_ms: PIR_WARMUP_TIME_MS,
                ..base
            },
            SensorType::Ir => base,
            SensorType::Ultrasonic => Self {
                primary_pin: 8,
                secondary_pin: Some(9),
                detection_threshold_mm: ULTRASONIC_THRESHOLD_MM,
                sample_interval_ms: ULTRASONIC_SAMPLE_INTERVAL_MS,
                direction_enabled: true,
                sample_window_size: DEFAULT_WINDOW_SIZE,
                ..base
            },
            SensorType::UltrasonicGrove => Self {
                primary_pin: 8,
                detection_threshold_mm: GROVE_THRESHOLD_MM,
                sample_interval_ms: ULTRASONIC_SAMPLE_INTERVAL_MS,
                direction_enabled: true,
                sample_window_size: DEFAULT_WINDOW_SIZE,
                ..base
            },
        }
    }

    /// PIR on a signal pin
    pub const fn pir(pin: u8) -> Self {
        Self {
            primary_pin: pin,
            ..Self::default_for(SensorType::Pir)
        }
    }

    /// PIR with a switchable power rail
    pub const fn pir_with_power(pin: u8, power_pin: u8) -> Self {
        Self {
            power_pin: Some(power_pin),
            ..Self::pir(pin)
        }
    }

    /// 4-pin ultrasonic ranger
    pub const fn ultrasonic(trigger_pin: u8, echo_pin: u8) -> Self {
        Self {
            primary_pin: trigger_pin,
            secondary_pin: Some(echo_pin),
            ..Self::default_for(SensorType::Ultrasonic)
        }
    }

    /// 3-pin Grove ultrasonic ranger
    pub const fn grove(sig_pin: u8) -> Self {
        Self {
            primary_pin: sig_pin,
            ..Self::default_for(SensorType::UltrasonicGrove)
        }
    }
}

/// One manager slot as stored in configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorSlotConfig {
    /// Slot index (0..MAX_SENSORS)
    pub slot: u8,
    pub config: SensorConfig,
    pub enabled: bool,
    pub primary: bool,
    /// User label; empty means "Sensor N"
    pub label: String<MAX_LABEL_LEN>,
}

impl SensorSlotConfig {
    pub fn new(slot: u8, config: SensorConfig) -> Self {
        Self {
            slot,
            config,
            enabled: true,
            primary: false,
            label: String::new(),
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// Dual-PIR direction detector wiring and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DirectionDetectorConfig {
    /// Slot holding the far-zone sensor
    pub far_slot: u8,
    /// Slot holding the near-zone sensor
    pub near_slot: u8,
    /// Max far→near delay counted as an approach (ms)
    pub confirmation_window_ms: u32,
    /// Max far/near gap treated as simultaneous (ms)
    pub simultaneous_threshold_ms: u32,
    /// Time after which an incomplete pattern is abandoned (ms)
    pub pattern_timeout_ms: u32,
}

impl Default for DirectionDetectorConfig {
    fn default() -> Self {
        Self {
            far_slot: 1,
            near_slot: 0,
            confirmation_window_ms: 5000,
            simultaneous_threshold_ms: 500,
            pattern_timeout_ms: 10_000,
        }
    }
}

/// Complete sensor section of the device configuration
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorSetup {
    pub slots: Vec<SensorSlotConfig, MAX_SENSORS>,
    pub fusion_mode: FusionMode,
    pub direction: Option<DirectionDetectorConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pir_defaults() {
        let cfg = SensorConfig::default_for(SensorType::Pir);
        assert_eq!(cfg.warmup_ms, PIR_WARMUP_TIME_MS);
        assert_eq!(cfg.detection_threshold_mm, 0);
        assert_eq!(cfg.sample_interval_ms, 0);
        assert!(!cfg.direction_enabled);
    }

    #[test]
    fn test_ultrasonic_defaults() {
        let cfg = SensorConfig::default_for(SensorType::Ultrasonic);
        assert_eq!(cfg.detection_threshold_mm, ULTRASONIC_THRESHOLD_MM);
        assert_eq!(cfg.secondary_pin, Some(9));
        assert!(cfg.direction_enabled);

        let grove = SensorConfig::grove(4);
        assert_eq!(grove.primary_pin, 4);
        assert_eq!(grove.secondary_pin, None);
        assert_eq!(grove.detection_threshold_mm, GROVE_THRESHOLD_MM);
    }

    #[test]
    fn test_pir_with_power() {
        let cfg = SensorConfig::pir_with_power(11, 12);
        assert_eq!(cfg.primary_pin, 11);
        assert_eq!(cfg.power_pin, Some(12));
        assert_eq!(cfg.sensor_type, SensorType::Pir);
    }
}

//! Sensor construction trait
//!
//! The manager never names a concrete driver. Board crates implement
//! [`SensorFactory`] to turn a [`SensorConfig`] into an owned sensor.

use crate::config::{SensorConfig, SensorType};

use super::sensor::MotionSensor;

/// Errors that can occur when constructing a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FactoryError {
    /// No driver exists for this sensor type
    UnsupportedType(SensorType),
    /// Pin is out of range, reserved or already handed out
    PinUnavailable(u8),
    /// Config is missing a pin the type needs
    MissingPin,
}

impl FactoryError {
    pub const fn message(self) -> &'static str {
        match self {
            FactoryError::UnsupportedType(_) => "Unsupported sensor type",
            FactoryError::PinUnavailable(_) => "Sensor pin unavailable",
            FactoryError::MissingPin => "Sensor config missing required pin",
        }
    }
}

/// Builds sensors from configuration records
pub trait SensorFactory {
    type Sensor: MotionSensor;

    /// Construct a sensor and apply the config's tuning
    ///
    /// The returned sensor has not had `begin()` called yet.
    fn create(&mut self, config: &SensorConfig) -> Result<Self::Sensor, FactoryError>;

    /// Return the pins a removed sensor held
    ///
    /// Factories that track pin ownership should make them available again.
    fn release(&mut self, _sensor: Self::Sensor) {}

    /// Offer a remaining sensor anything a `release` left without a holder
    ///
    /// Called for every remaining sensor after a release, e.g. so a PIR
    /// following a shared power rail can take over the rail switch.
    fn reclaim_shared(&mut self, _sensor: &mut Self::Sensor) {}

    /// Whether a driver exists for this type
    fn is_supported(&self, sensor_type: SensorType) -> bool;
}

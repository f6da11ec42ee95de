//! Board sensor factory
//!
//! Turns a [`SensorConfig`] into a concrete driver, claiming its pins from
//! a [`PinBank`]. The bank is the only place that knows how pin numbers map
//! to chip peripherals.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use stepguard_core::config::{SensorConfig, SensorType, MAX_SENSORS};
use stepguard_core::log::{Category, Logger};
use stepguard_core::traits::{FactoryError, SensorFactory};
use stepguard_core::{sg_debug, sg_warn};
use stepguard_hal::{FlexPin, InputPin, OutputPin, PulseInput};

use super::any::AnySensor;
use super::grove::GroveSensor;
use super::pir::PirSensor;
use super::ultrasonic::UltrasonicSensor;

/// Sensor types this factory can build
pub const SUPPORTED_TYPES: [SensorType; 3] = [
    SensorType::Pir,
    SensorType::Ultrasonic,
    SensorType::UltrasonicGrove,
];

/// Source of pin handles, implemented per board
///
/// Each `take_*` call hands out a pin at most once until it is released.
pub trait PinBank {
    type Input: InputPin;
    type Output: OutputPin;
    type Echo: PulseInput;
    type Flex: FlexPin;
    type Delay: DelayNs;

    fn take_input(&mut self, pin: u8) -> Option<Self::Input>;

    fn take_output(&mut self, pin: u8) -> Option<Self::Output>;

    fn take_echo(&mut self, pin: u8) -> Option<Self::Echo>;

    fn take_flex(&mut self, pin: u8) -> Option<Self::Flex>;

    /// Microsecond delay for trigger pulses
    fn delay(&mut self) -> Self::Delay;

    /// Give a pin back after its sensor was dropped
    fn release(&mut self, pin: u8);
}

/// Builds [`AnySensor`]s from pins of a [`PinBank`]
pub struct BoardSensorFactory<B> {
    bank: B,
    /// Power rails already switched by a PIR
    rails: Vec<u8, MAX_SENSORS>,
    logger: &'static dyn Logger,
}

impl<B: PinBank> BoardSensorFactory<B> {
    pub fn new(bank: B, logger: &'static dyn Logger) -> Self {
        Self {
            bank,
            rails: Vec::new(),
            logger,
        }
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    fn create_pir(&mut self, config: &SensorConfig) -> Result<AnySensor<B>, FactoryError> {
        let pin = config.primary_pin;
        let input = self
            .bank
            .take_input(pin)
            .ok_or(FactoryError::PinUnavailable(pin))?;

        let power = match config.power_pin {
            // Rail already switched by a sibling PIR: follow its timeline
            Some(rail) if self.rails.contains(&rail) => {
                sg_debug!(
                    self.logger,
                    Category::Sensor,
                    "PIR {} shares power rail {}",
                    pin,
                    rail
                );
                None
            }
            Some(rail) => match self.bank.take_output(rail) {
                Some(out) => {
                    // Capacity equals slot count
                    let _ = self.rails.push(rail);
                    Some(out)
                }
                None => {
                    self.bank.release(pin);
                    return Err(FactoryError::PinUnavailable(rail));
                }
            },
            None => None,
        };

        Ok(AnySensor::Pir(PirSensor::new(
            input,
            power,
            *config,
            self.logger,
        )))
    }

    fn create_ultrasonic(&mut self, config: &SensorConfig) -> Result<AnySensor<B>, FactoryError> {
        let echo_pin = config.secondary_pin.ok_or(FactoryError::MissingPin)?;
        let trigger_pin = config.primary_pin;

        let trigger = self
            .bank
            .take_output(trigger_pin)
            .ok_or(FactoryError::PinUnavailable(trigger_pin))?;
        let Some(echo) = self.bank.take_echo(echo_pin) else {
            self.bank.release(trigger_pin);
            return Err(FactoryError::PinUnavailable(echo_pin));
        };
        let delay = self.bank.delay();

        Ok(AnySensor::Ultrasonic(UltrasonicSensor::hcsr04(
            trigger,
            echo,
            delay,
            *config,
            self.logger,
        )))
    }

    fn create_grove(&mut self, config: &SensorConfig) -> Result<AnySensor<B>, FactoryError> {
        let pin = config.primary_pin;
        let sig = self
            .bank
            .take_flex(pin)
            .ok_or(FactoryError::PinUnavailable(pin))?;
        let delay = self.bank.delay();

        Ok(AnySensor::Grove(GroveSensor::grove(
            sig,
            delay,
            *config,
            self.logger,
        )))
    }
}

impl<B: PinBank> SensorFactory for BoardSensorFactory<B> {
    type Sensor = AnySensor<B>;

    fn create(&mut self, config: &SensorConfig) -> Result<AnySensor<B>, FactoryError> {
        let result = match config.sensor_type {
            SensorType::Pir => self.create_pir(config),
            SensorType::Ultrasonic => self.create_ultrasonic(config),
            SensorType::UltrasonicGrove => self.create_grove(config),
            other => Err(FactoryError::UnsupportedType(other)),
        };

        if let Err(e) = &result {
            sg_warn!(
                self.logger,
                Category::Sensor,
                "Cannot create {} sensor: {}",
                config.sensor_type.name(),
                e.message()
            );
        }
        result
    }

    fn release(&mut self, sensor: AnySensor<B>) {
        let pins = sensor.claimed_pins();
        for pin in pins {
            self.rails.retain(|&rail| rail != pin);
            self.bank.release(pin);
        }
    }

    /// Hand a rail switch freed by a removed owner to a PIR following it
    fn reclaim_shared(&mut self, sensor: &mut AnySensor<B>) {
        let Some(pir) = sensor.as_pir_mut() else {
            return;
        };
        let Some(rail) = pir.config().power_pin else {
            return;
        };
        if pir.owns_power_pin() || self.rails.contains(&rail) {
            return;
        }

        match self.bank.take_output(rail) {
            Some(out) => {
                // Capacity equals slot count
                let _ = self.rails.push(rail);
                pir.attach_power(out);
                sg_debug!(
                    self.logger,
                    Category::Sensor,
                    "PIR {} took over power rail {}",
                    pir.config().primary_pin,
                    rail
                );
            }
            None => {
                pir.detach_rail();
                sg_warn!(
                    self.logger,
                    Category::Sensor,
                    "PIR {}: power rail {} unavailable, recalibration disabled",
                    pir.config().primary_pin,
                    rail
                );
            }
        }
    }

    fn is_supported(&self, sensor_type: SensorType) -> bool {
        SUPPORTED_TYPES.contains(&sensor_type)
    }
}

//! Motion sensor drivers
//!
//! - [`pir`] - passive infrared with warm-up and power-cycle recalibration
//! - [`ultrasonic`] - HC-SR04 4-pin ranger
//! - [`grove`] - Grove 3-pin ranger
//! - [`ranging`] - shared ping/engine plumbing for the rangers
//! - [`factory`] - config-driven construction over a board pin bank

pub mod any;
pub mod factory;
pub mod grove;
pub mod pir;
pub mod ranging;
pub mod ultrasonic;

pub use any::AnySensor;
pub use factory::{BoardSensorFactory, PinBank, SUPPORTED_TYPES};
pub use grove::GroveSensor;
pub use pir::PirSensor;
pub use ranging::RangingSensor;
pub use ultrasonic::UltrasonicSensor;

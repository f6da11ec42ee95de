//! Sensor abstraction traits
//!
//! These traits define the interface between the fusion logic and the
//! hardware-specific sensor drivers.

pub mod factory;
pub mod sensor;

pub use factory::{FactoryError, SensorFactory};
pub use sensor::{
    MotionDirection, MotionEvent, MotionSensor, SensorError, SensorStatus, WakeSource,
};

//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the sensor traits
//! defined in stepguard-core, written against the pin traits of
//! stepguard-hal:
//!
//! - PIR motion sensors (optionally with a switchable power rail)
//! - HC-SR04 and Grove ultrasonic rangers
//! - A board sensor factory producing enum-dispatched sensors

#![no_std]
#![deny(unsafe_code)]

pub mod sensor;

pub use sensor::{AnySensor, BoardSensorFactory, PinBank};

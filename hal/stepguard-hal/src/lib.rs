//! StepGuard Hardware Abstraction Layer
//!
//! This crate defines the pin-level traits the sensor drivers are written
//! against. Chip-specific HALs implement them; the drivers never touch
//! registers directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  stepguard-core (manager, fusion, ...)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  stepguard-drivers (PIR, ultrasonic)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  stepguard-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             chip-specific HAL
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O
//! - [`pulse::PulseInput`] - Echo pulse width capture
//! - [`pulse::FlexPin`] - Direction-switching single-wire pin

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod pulse;

// Re-export key traits at crate root for convenience
pub use gpio::{InputPin, Level, OutputPin};
pub use pulse::{FlexPin, PinMode, PulseInput};

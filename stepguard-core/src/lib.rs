//! Board-agnostic motion sensing core for the StepGuard hazard warning light
//!
//! This crate contains all sensing logic that does not depend on specific
//! hardware implementations:
//!
//! - Motion sensor and factory traits
//! - Sensor capability descriptors
//! - Distance filtering, direction and approach gating
//! - Dual-PIR direction detection
//! - Multi-sensor manager with fusion modes
//! - Nightly recalibration scheduling
//! - Configuration type definitions
//! - Injectable logging
//!
//! Time is always passed in as a monotonic millisecond counter; nothing in
//! this crate reads a clock.

#![no_std]
#![deny(unsafe_code)]

pub mod log;

pub mod capabilities;
pub mod config;
pub mod direction;
pub mod distance;
pub mod manager;
pub mod recal;
pub mod traits;

pub use capabilities::SensorCapabilities;
pub use direction::{DirectionDetector, DirectionState};
pub use distance::DistanceEngine;
pub use manager::{CombinedStatus, ManagerError, SensorManager};
pub use recal::RecalScheduler;

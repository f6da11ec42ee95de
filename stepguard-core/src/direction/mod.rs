//! Dual-PIR direction detection
//!
//! Independent of the distance engine: reasons only over binary trigger
//! ordering and timing of a near/far sensor pair.

pub mod detector;
pub mod state;

pub use detector::DirectionDetector;
pub use state::DirectionState;

//! Configuration types
//!
//! Board-agnostic records describing which sensors exist and how they are
//! tuned. Loading and persisting them is the configuration service's job.

pub mod types;

pub use types::*;

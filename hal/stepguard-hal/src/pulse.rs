//! Echo pulse timing
//!
//! Ultrasonic rangers report distance as the width of a high pulse on the
//! echo line. Chip HALs implement [`PulseInput`] with a timer capture or a
//! busy-wait loop; drivers only see the measured width.
//!
//! Single-wire rangers (Grove style) share trigger and echo on one pin and
//! need the pin to switch direction between the two phases, which is what
//! [`FlexPin`] describes.

use crate::gpio::OutputPin;

/// Pin that can time the width of an incoming high pulse
pub trait PulseInput {
    /// Wait for the next high pulse and return its width in microseconds
    ///
    /// Returns `None` if no complete pulse was seen within `timeout_us`
    /// (measured from the call, covering both the wait for the rising edge
    /// and the pulse itself).
    fn pulse_high_us(&mut self, timeout_us: u32) -> Option<u32>;
}

/// Direction of a [`FlexPin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Input,
    Output,
}

/// Bidirectional pin used by single-wire ultrasonic modules
pub trait FlexPin: OutputPin + PulseInput {
    /// Switch the pin direction
    fn set_mode(&mut self, mode: PinMode);

    /// Current pin direction
    fn mode(&self) -> PinMode;
}

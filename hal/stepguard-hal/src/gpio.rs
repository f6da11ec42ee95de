//! Digital pin abstractions
//!
//! Sensor drivers only ever need three things from a pin: read a level,
//! drive a level, and (for PIR power rails) remember what they drove.

/// Logic level of a digital pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Level after applying an active-low inversion
    pub const fn inverted(self, invert: bool) -> Self {
        match (self, invert) {
            (Level::High, false) | (Level::Low, true) => Level::High,
            _ => Level::Low,
        }
    }

    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Digital output pin
///
/// Used for ultrasonic trigger lines and PIR power rails.
pub trait OutputPin {
    /// Drive the pin high (logic 1)
    fn set_high(&mut self);

    /// Drive the pin low (logic 0)
    fn set_low(&mut self);

    /// Drive the pin to a specific level
    fn set_level(&mut self, level: Level) {
        match level {
            Level::High => self.set_high(),
            Level::Low => self.set_low(),
        }
    }

    /// Check if the pin is currently driven high
    fn is_set_high(&self) -> bool;
}

/// Digital input pin
///
/// PIR modules expose their detection output on one of these.
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }

    /// Read the pin as a [`Level`]
    fn level(&self) -> Level {
        Level::from(self.is_high())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_level() {
        assert_eq!(Level::High.inverted(false), Level::High);
        assert_eq!(Level::High.inverted(true), Level::Low);
        assert_eq!(Level::Low.inverted(true), Level::High);
        assert_eq!(Level::Low.inverted(false), Level::Low);
    }

    struct FakeOut(bool);

    impl OutputPin for FakeOut {
        fn set_high(&mut self) {
            self.0 = true;
        }
        fn set_low(&mut self) {
            self.0 = false;
        }
        fn is_set_high(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_set_level_dispatch() {
        let mut pin = FakeOut(false);
        pin.set_level(Level::High);
        assert!(pin.is_set_high());
        pin.set_level(Level::Low);
        assert!(!pin.is_set_high());
    }
}

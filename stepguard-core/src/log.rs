//! Injected diagnostic logging
//!
//! Components never reach for a global logger. Each one is handed a
//! `&'static dyn Logger` at construction and writes through the `sg_*!`
//! macros. Nothing a logger does may feed back into detection, so
//! [`NoopLogger`] is always a valid choice (and is what tests use).
//!
//! # Usage
//!
//! ```ignore
//! use stepguard_core::log::{Category, NOOP_LOGGER};
//! use stepguard_core::sg_warn;
//!
//! sg_warn!(&NOOP_LOGGER, Category::Config, "window size {} clamped", 25);
//! ```

use core::fmt;

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Subsystem a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Category {
    /// Sensor reads, events, recalibration
    Sensor,
    /// Configuration clamping and validation
    Config,
    /// Direction detector transitions
    State,
    /// Manager lifecycle and status dumps
    System,
}

impl Category {
    pub const fn name(self) -> &'static str {
        match self {
            Category::Sensor => "SENSOR",
            Category::Config => "CONFIG",
            Category::State => "STATE",
            Category::System => "SYSTEM",
        }
    }
}

/// Sink for diagnostic messages
pub trait Logger: Sync {
    /// Record one message
    fn log(&self, level: Level, category: Category, args: fmt::Arguments<'_>);

    /// Whether messages at `level` are kept
    ///
    /// Callers may skip formatting work when this returns false.
    fn enabled(&self, _level: Level) -> bool {
        true
    }
}

/// Logger that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: Level, _category: Category, _args: fmt::Arguments<'_>) {}

    fn enabled(&self, _level: Level) -> bool {
        false
    }
}

/// Shared no-op instance, the default for every component
pub static NOOP_LOGGER: NoopLogger = NoopLogger;

/// Logger that forwards to defmt (RTT on target)
#[cfg(feature = "defmt")]
#[derive(Debug, Clone, Copy)]
pub struct DefmtLogger {
    /// Messages below this level are dropped
    pub min_level: Level,
}

#[cfg(feature = "defmt")]
impl Default for DefmtLogger {
    fn default() -> Self {
        Self {
            min_level: Level::Info,
        }
    }
}

#[cfg(feature = "defmt")]
impl Logger for DefmtLogger {
    fn log(&self, level: Level, category: Category, args: fmt::Arguments<'_>) {
        if level < self.min_level {
            return;
        }
        let msg = defmt::Display2Format(&args);
        match level {
            Level::Debug => defmt::debug!("[{}] {}", category.name(), msg),
            Level::Info => defmt::info!("[{}] {}", category.name(), msg),
            Level::Warn => defmt::warn!("[{}] {}", category.name(), msg),
            Level::Error => defmt::error!("[{}] {}", category.name(), msg),
        }
    }

    fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }
}

#[macro_export]
macro_rules! sg_log {
    ($logger:expr, $level:expr, $cat:expr, $($arg:tt)+) => {{
        let logger: &dyn $crate::log::Logger = $logger;
        if logger.enabled($level) {
            logger.log($level, $cat, format_args!($($arg)+));
        }
    }};
}

#[macro_export]
macro_rules! sg_debug {
    ($logger:expr, $cat:expr, $($arg:tt)+) => {
        $crate::sg_log!($logger, $crate::log::Level::Debug, $cat, $($arg)+)
    };
}

#[macro_export]
macro_rules! sg_info {
    ($logger:expr, $cat:expr, $($arg:tt)+) => {
        $crate::sg_log!($logger, $crate::log::Level::Info, $cat, $($arg)+)
    };
}

#[macro_export]
macro_rules! sg_warn {
    ($logger:expr, $cat:expr, $($arg:tt)+) => {
        $crate::sg_log!($logger, $crate::log::Level::Warn, $cat, $($arg)+)
    };
}

#[macro_export]
macro_rules! sg_error {
    ($logger:expr, $cat:expr, $($arg:tt)+) => {
        $crate::sg_log!($logger, $crate::log::Level::Error, $cat, $($arg)+)
    };
}

#[cfg(test)]
pub(crate) mod testing {
    //! Logger that counts messages per level, for asserting that clamping
    //! and validation paths report what they correct.

    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    pub struct CountingLogger {
        pub warns: AtomicU32,
        pub total: AtomicU32,
    }

    impl CountingLogger {
        pub const fn new() -> Self {
            Self {
                warns: AtomicU32::new(0),
                total: AtomicU32::new(0),
            }
        }

        pub fn warns(&self) -> u32 {
            self.warns.load(Ordering::Relaxed)
        }
    }

    impl Logger for CountingLogger {
        fn log(&self, level: Level, _category: Category, _args: fmt::Arguments<'_>) {
            self.total.fetch_add(1, Ordering::Relaxed);
            if level == Level::Warn {
                self.warns.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CountingLogger;
    use super::*;

    #[test]
    fn test_noop_logger_disabled() {
        assert!(!NOOP_LOGGER.enabled(Level::Error));
        sg_error!(&NOOP_LOGGER, Category::System, "ignored {}", 1);
    }

    #[test]
    fn test_macros_route_level() {
        static LOG: CountingLogger = CountingLogger::new();
        sg_warn!(&LOG, Category::Config, "clamped {}", 3);
        sg_info!(&LOG, Category::Sensor, "ok");
        assert_eq!(LOG.warns(), 1);
        assert_eq!(LOG.total.load(core::sync::atomic::Ordering::Relaxed), 2);
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warn < Level::Error);
    }
}

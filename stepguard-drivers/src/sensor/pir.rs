//! Passive infrared motion sensor
//!
//! HC-SR501 / AM312 style modules with a single digital output. The module
//! needs a settling period after power-up during which its output is
//! unreliable, so motion is only reported once warm-up has elapsed.
//!
//! # Recalibration
//!
//! PIR modules drift with ambient temperature. With a switchable power rail
//! the sensor can be power-cycled to re-learn the background:
//!
//! ```text
//!   Idle ──recalibrate()──▶ PowerOff ──3 s──▶ Idle (warm-up restarted)
//! ```
//!
//! Two modules wired to one rail are both reset by a single power cycle.
//! The module that does not own the rail handle follows the same timeline
//! without touching the pin, and takes the handle over if the owner is
//! removed.

use stepguard_core::config::{SensorConfig, SensorType, PIR_WARMUP_TIME_MS};
use stepguard_core::log::{Category, Logger};
use stepguard_core::traits::{MotionEvent, MotionSensor, SensorError, WakeSource};
use stepguard_core::{sg_debug, sg_info, sg_warn};
use stepguard_hal::{InputPin, Level, OutputPin};

/// How long the power rail stays off during recalibration (ms)
pub const RECAL_POWER_OFF_MS: u32 = 3000;

/// Recalibration progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecalPhase {
    Idle,
    /// Rail cut at `since_ms`
    PowerOff { since_ms: u32 },
}

/// PIR motion sensor
///
/// `I` is the detection output, `P` the optional power rail switch.
pub struct PirSensor<I, P> {
    pin: I,
    power: Option<P>,
    /// Follower whose rail no longer has a switch
    rail_lost: bool,
    config: SensorConfig,
    logger: &'static dyn Logger,

    initialized: bool,
    warmup_ms: u32,
    warmup_start_ms: u32,
    ready: bool,
    recal: RecalPhase,

    /// Output level after inversion
    raw: bool,
    event_count: u32,
    last_event: MotionEvent,
    last_event_time_ms: u32,
}

impl<I: InputPin, P: OutputPin> PirSensor<I, P> {
    /// Create a PIR sensor
    ///
    /// # Arguments
    /// - `pin`: detection output
    /// - `power`: rail switch, `None` if not switchable or owned by a
    ///   sibling sensor on the same rail
    /// - `config`: PIR configuration (`warmup_ms` 0 = default)
    /// - `logger`: diagnostics sink
    pub fn new(pin: I, power: Option<P>, config: SensorConfig, logger: &'static dyn Logger) -> Self {
        let warmup_ms = if config.warmup_ms > 0 {
            config.warmup_ms
        } else {
            PIR_WARMUP_TIME_MS
        };

        Self {
            pin,
            power,
            rail_lost: false,
            config,
            logger,
            initialized: false,
            warmup_ms,
            warmup_start_ms: 0,
            ready: false,
            recal: RecalPhase::Idle,
            raw: false,
            event_count: 0,
            last_event: MotionEvent::None,
            last_event_time_ms: 0,
        }
    }

    fn read_level(&self) -> bool {
        self.pin
            .level()
            .inverted(self.config.invert_logic)
            .is_high()
    }

    fn restart_warmup(&mut self, now_ms: u32) {
        self.warmup_start_ms = now_ms;
        self.ready = false;
    }

    fn finish_power_off(&mut self, now_ms: u32) {
        if let Some(power) = self.power.as_mut() {
            power.set_level(Level::High);
        }
        self.recal = RecalPhase::Idle;
        self.restart_warmup(now_ms);
        // Output is undefined right after power-up
        self.raw = self.read_level();
        sg_info!(
            self.logger,
            Category::Sensor,
            "PIR {}: power restored, warming up {} ms",
            self.config.primary_pin,
            self.warmup_ms
        );
    }

    /// Output level regardless of warm-up
    pub fn raw_motion(&self) -> bool {
        self.raw
    }

    pub fn warmup_ms(&self) -> u32 {
        self.warmup_ms
    }

    pub fn recal_phase(&self) -> RecalPhase {
        self.recal
    }

    /// Holds the rail switch (false for a sensor following a shared rail)
    pub fn owns_power_pin(&self) -> bool {
        self.power.is_some()
    }

    /// Follows a shared rail nobody switches any more
    pub fn rail_lost(&self) -> bool {
        self.rail_lost
    }

    /// Take over the rail switch from a removed sibling
    ///
    /// The pin is driven to match the current phase, so an in-progress
    /// power-off keeps the rail cut.
    pub fn attach_power(&mut self, mut power: P) {
        if self.initialized {
            let level = match self.recal {
                RecalPhase::Idle => Level::High,
                RecalPhase::PowerOff { .. } => Level::Low,
            };
            power.set_level(level);
        }
        self.power = Some(power);
        self.rail_lost = false;
        sg_debug!(
            self.logger,
            Category::Sensor,
            "PIR {}: now switching power rail",
            self.config.primary_pin
        );
    }

    /// Record that the shared rail lost its switch
    pub fn detach_rail(&mut self) {
        if self.power.is_none() && self.config.power_pin.is_some() {
            self.rail_lost = true;
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }
}

impl<I: InputPin, P: OutputPin> MotionSensor for PirSensor<I, P> {
    fn begin(&mut self, now_ms: u32) -> bool {
        if self.initialized {
            return true;
        }

        if let Some(power) = self.power.as_mut() {
            power.set_level(Level::High);
        }
        self.restart_warmup(now_ms);
        self.raw = self.read_level();
        self.initialized = true;

        sg_info!(
            self.logger,
            Category::Sensor,
            "PIR on pin {} ready in {} ms{}",
            self.config.primary_pin,
            self.warmup_ms,
            if self.config.invert_logic { " (inverted)" } else { "" }
        );
        true
    }

    fn update(&mut self, now_ms: u32) {
        if !self.initialized {
            return;
        }

        if let RecalPhase::PowerOff { since_ms } = self.recal {
            if now_ms.wrapping_sub(since_ms) >= RECAL_POWER_OFF_MS {
                self.finish_power_off(now_ms);
            }
            return;
        }

        if !self.ready && now_ms.wrapping_sub(self.warmup_start_ms) >= self.warmup_ms {
            self.ready = true;
            sg_info!(
                self.logger,
                Category::Sensor,
                "PIR {}: warm-up complete",
                self.config.primary_pin
            );
        }

        let level = self.read_level();
        if level && !self.raw {
            self.event_count = self.event_count.wrapping_add(1);
            self.last_event = MotionEvent::Detected;
            self.last_event_time_ms = now_ms;
            sg_debug!(
                self.logger,
                Category::Sensor,
                "PIR {}: motion (event {}){}",
                self.config.primary_pin,
                self.event_count,
                if self.ready { "" } else { " during warm-up" }
            );
        } else if !level && self.raw {
            self.last_event = MotionEvent::Cleared;
            sg_debug!(
                self.logger,
                Category::Sensor,
                "PIR {}: motion cleared",
                self.config.primary_pin
            );
        }
        self.raw = level;
    }

    fn motion_detected(&self) -> bool {
        self.ready && self.recal == RecalPhase::Idle && self.raw
    }

    fn is_ready(&self) -> bool {
        self.ready && self.recal == RecalPhase::Idle
    }

    fn sensor_type(&self) -> SensorType {
        SensorType::Pir
    }

    fn event_count(&self) -> u32 {
        self.event_count
    }

    fn reset_event_count(&mut self) {
        self.event_count = 0;
    }

    fn last_event(&self) -> MotionEvent {
        self.last_event
    }

    fn last_event_time_ms(&self) -> u32 {
        self.last_event_time_ms
    }

    fn warmup_remaining_ms(&self, now_ms: u32) -> Option<u32> {
        if self.ready {
            return Some(0);
        }
        match self.recal {
            // Power-off time left plus a full warm-up
            RecalPhase::PowerOff { since_ms } => Some(
                RECAL_POWER_OFF_MS
                    .saturating_sub(now_ms.wrapping_sub(since_ms))
                    .saturating_add(self.warmup_ms),
            ),
            RecalPhase::Idle => Some(
                self.warmup_ms
                    .saturating_sub(now_ms.wrapping_sub(self.warmup_start_ms)),
            ),
        }
    }

    fn recalibrate(&mut self, now_ms: u32) -> Result<(), SensorError> {
        if self.config.power_pin.is_none() || self.rail_lost {
            sg_warn!(
                self.logger,
                Category::Sensor,
                "PIR {}: recalibration needs a power pin",
                self.config.primary_pin
            );
            return Err(SensorError::NoPowerPin);
        }
        if !self.initialized {
            return Err(SensorError::NotInitialized);
        }
        if self.recal != RecalPhase::Idle {
            return Ok(());
        }

        if let Some(power) = self.power.as_mut() {
            power.set_level(Level::Low);
        }
        self.recal = RecalPhase::PowerOff { since_ms: now_ms };
        self.ready = false;
        self.raw = false;

        sg_info!(
            self.logger,
            Category::Sensor,
            "PIR {}: recalibrating, power off {} ms{}",
            self.config.primary_pin,
            RECAL_POWER_OFF_MS,
            if self.power.is_some() { "" } else { " (shared rail)" }
        );
        Ok(())
    }

    fn is_recalibrating(&self) -> bool {
        self.recal != RecalPhase::Idle
    }

    fn wake_source(&self) -> Option<WakeSource> {
        Some(WakeSource {
            pin: self.config.primary_pin,
            power_pin: self.config.power_pin,
        })
    }

    /// Applies until the next `update()` reads the pin
    #[cfg(any(test, feature = "mock"))]
    fn mock_set_motion(&mut self, motion: bool) {
        if motion && !self.raw {
            self.event_count = self.event_count.wrapping_add(1);
            self.last_event = MotionEvent::Detected;
        } else if !motion && self.raw {
            self.last_event = MotionEvent::Cleared;
        }
        self.raw = motion;
    }

    #[cfg(any(test, feature = "mock"))]
    fn mock_set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}

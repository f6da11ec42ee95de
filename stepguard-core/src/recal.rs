//! Nightly PIR recalibration scheduler
//!
//! PIR sensors drift with ambient temperature. Once per night, when the
//! hallway has been quiet for a while, the sensor is power-cycled so it
//! re-learns the background.

use crate::log::{Category, Logger, NOOP_LOGGER};
use crate::sg_info;
use crate::traits::MotionSensor;

/// Default start of the recalibration window (local hour, inclusive)
pub const DEFAULT_WINDOW_START_HOUR: u8 = 2;

/// Default end of the recalibration window (local hour, exclusive)
pub const DEFAULT_WINDOW_END_HOUR: u8 = 4;

/// Default quiet period required before recalibrating (1 hour)
pub const DEFAULT_QUIESCENCE_MS: u32 = 3_600_000;

/// Default minimum time between recalibrations (2 hours)
pub const DEFAULT_COOLDOWN_MS: u32 = 7_200_000;

/// Decides when to trigger an automatic recalibration
pub struct RecalScheduler {
    logger: &'static dyn Logger,
    window_start_hour: u8,
    window_end_hour: u8,
    quiescence_ms: u32,
    cooldown_ms: u32,
    last_recal_ms: Option<u32>,
    triggered: bool,
}

impl Default for RecalScheduler {
    fn default() -> Self {
        Self::new(&NOOP_LOGGER)
    }
}

impl RecalScheduler {
    pub fn new(logger: &'static dyn Logger) -> Self {
        Self {
            logger,
            window_start_hour: DEFAULT_WINDOW_START_HOUR,
            window_end_hour: DEFAULT_WINDOW_END_HOUR,
            quiescence_ms: DEFAULT_QUIESCENCE_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            last_recal_ms: None,
            triggered: false,
        }
    }

    /// Check trigger conditions and recalibrate the sensor if they hold
    ///
    /// `local_hour` is `None` until wall-clock time is known.
    /// `last_motion_ms` is `None` if no motion was seen since boot.
    /// Returns true if a recalibration was started this call.
    pub fn update<S: MotionSensor + ?Sized>(
        &mut self,
        now_ms: u32,
        local_hour: Option<u8>,
        last_motion_ms: Option<u32>,
        sensor: &mut S,
    ) -> bool {
        self.triggered = false;

        let Some(hour) = local_hour else {
            return false;
        };
        if sensor.is_recalibrating() || !self.in_window(hour) {
            return false;
        }
        if let Some(t) = last_motion_ms {
            if now_ms.wrapping_sub(t) < self.quiescence_ms {
                return false;
            }
        }
        if let Some(t) = self.last_recal_ms {
            if now_ms.wrapping_sub(t) < self.cooldown_ms {
                return false;
            }
        }

        if sensor.recalibrate(now_ms).is_ok() {
            self.last_recal_ms = Some(now_ms);
            self.triggered = true;
            sg_info!(
                self.logger,
                Category::Sensor,
                "Automatic recalibration triggered at hour {:02}",
                hour
            );
        }
        self.triggered
    }

    fn in_window(&self, hour: u8) -> bool {
        hour >= self.window_start_hour && hour < self.window_end_hour
    }

    /// Recalibration started on the most recent `update()`
    pub fn was_triggered(&self) -> bool {
        self.triggered
    }

    pub fn last_recal_ms(&self) -> Option<u32> {
        self.last_recal_ms
    }

    /// Set the local-hour window `[start, end)`
    pub fn set_window(&mut self, start_hour: u8, end_hour: u8) {
        self.window_start_hour = start_hour;
        self.window_end_hour = end_hour;
    }

    pub fn window(&self) -> (u8, u8) {
        (self.window_start_hour, self.window_end_hour)
    }

    pub fn set_quiescence_ms(&mut self, quiescence_ms: u32) {
        self.quiescence_ms = quiescence_ms;
    }

    pub fn set_cooldown_ms(&mut self, cooldown_ms: u32) {
        self.cooldown_ms = cooldown_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorType;
    use crate::traits::{MotionEvent, SensorError};

    #[derive(Default)]
    struct MockPir {
        recalibrating: bool,
        has_power_pin: bool,
        recal_calls: u32,
    }

    impl MotionSensor for MockPir {
        fn begin(&mut self, _now_ms: u32) -> bool {
            true
        }
        fn update(&mut self, _now_ms: u32) {}
        fn motion_detected(&self) -> bool {
            false
        }
        fn is_ready(&self) -> bool {
            !self.recalibrating
        }
        fn sensor_type(&self) -> SensorType {
            SensorType::Pir
        }
        fn event_count(&self) -> u32 {
            0
        }
        fn reset_event_count(&mut self) {}
        fn last_event(&self) -> MotionEvent {
            MotionEvent::None
        }
        fn last_event_time_ms(&self) -> u32 {
            0
        }
        fn recalibrate(&mut self, _now_ms: u32) -> Result<(), SensorError> {
            if !self.has_power_pin {
                return Err(SensorError::NoPowerPin);
            }
            self.recal_calls += 1;
            self.recalibrating = true;
            Ok(())
        }
        fn is_recalibrating(&self) -> bool {
            self.recalibrating
        }
    }

    fn pir() -> MockPir {
        MockPir {
            has_power_pin: true,
            ..MockPir::default()
        }
    }

    const QUIET: u32 = 10 * DEFAULT_QUIESCENCE_MS;

    #[test]
    fn test_triggers_in_window_when_quiet() {
        let mut s = RecalScheduler::default();
        let mut p = pir();
        assert!(s.update(QUIET, Some(2), None, &mut p));
        assert!(s.was_triggered());
        assert_eq!(p.recal_calls, 1);
        assert_eq!(s.last_recal_ms(), Some(QUIET));
    }

    #[test]
    fn test_no_time_no_trigger() {
        let mut s = RecalScheduler::default();
        let mut p = pir();
        assert!(!s.update(QUIET, None, None, &mut p));
        assert_eq!(p.recal_calls, 0);
    }

    #[test]
    fn test_outside_window() {
        let mut s = RecalScheduler::default();
        let mut p = pir();
        assert!(!s.update(QUIET, Some(1), None, &mut p));
        assert!(!s.update(QUIET, Some(4), None, &mut p));
        assert!(s.update(QUIET, Some(3), None, &mut p));
    }

    #[test]
    fn test_recent_motion_blocks() {
        let mut s = RecalScheduler::default();
        let mut p = pir();
        let now = QUIET;
        assert!(!s.update(now, Some(2), Some(now - 1000), &mut p));
        assert!(s.update(now, Some(2), Some(now - DEFAULT_QUIESCENCE_MS), &mut p));
    }

    #[test]
    fn test_cooldown_and_one_shot_flag() {
        let mut s = RecalScheduler::default();
        let mut p = pir();
        assert!(s.update(QUIET, Some(2), None, &mut p));

        // Sensor still recalibrating
        assert!(!s.update(QUIET + 100, Some(2), None, &mut p));
        assert!(!s.was_triggered());

        p.recalibrating = false;
        assert!(!s.update(QUIET + DEFAULT_COOLDOWN_MS - 1, Some(3), None, &mut p));
        assert!(s.update(QUIET + DEFAULT_COOLDOWN_MS, Some(3), None, &mut p));
        assert_eq!(p.recal_calls, 2);
    }

    #[test]
    fn test_failed_recalibrate_not_recorded() {
        let mut s = RecalScheduler::default();
        let mut p = MockPir::default();
        assert!(!s.update(QUIET, Some(2), None, &mut p));
        assert!(!s.was_triggered());
        assert_eq!(s.last_recal_ms(), None);
    }

    #[test]
    fn test_custom_window() {
        let mut s = RecalScheduler::default();
        s.set_window(22, 23);
        s.set_quiescence_ms(0);
        s.set_cooldown_ms(0);
        assert_eq!(s.window(), (22, 23));
        let mut p = pir();
        assert!(!s.update(0, Some(2), None, &mut p));
        assert!(s.update(0, Some(22), Some(0), &mut p));
    }
}

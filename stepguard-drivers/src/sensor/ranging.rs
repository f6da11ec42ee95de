//! Shared plumbing for echo-ranging sensors
//!
//! A [`RangingSensor`] pairs a [`Ranger`] (the part that fires a ping and
//! times the echo) with a [`DistanceEngine`] that does all of the
//! filtering and motion classification. The two ultrasonic variants differ
//! only in their ranger.

use stepguard_core::config::{SensorConfig, SensorType, DEFAULT_WINDOW_SIZE};
use stepguard_core::distance::DistanceEngine;
use stepguard_core::log::{Category, Logger};
use stepguard_core::traits::{MotionDirection, MotionEvent, MotionSensor, SensorError};
use stepguard_core::{sg_debug, sg_info, sg_warn};

/// Echo wait limit (µs), roughly 5 m of round trip
pub const ECHO_TIMEOUT_US: u32 = 30_000;

/// Trigger line held low before the pulse (µs)
pub const TRIGGER_SETTLE_US: u32 = 2;

/// Trigger pulse width (µs)
pub const TRIGGER_PULSE_US: u32 = 10;

/// Samples before the error rate is reported
pub const ERROR_RATE_WINDOW: u8 = 100;

/// Minimum spacing of echo timeout warnings (ms)
pub const TIMEOUT_WARN_INTERVAL_MS: u32 = 5000;

/// Hardware side of a ranging sensor
pub trait Ranger {
    /// Sensor type this ranger implements
    const SENSOR_TYPE: SensorType;

    /// Put pins into their idle state
    fn init(&mut self);

    /// Fire one ping and return the echo width in µs (`None` on timeout)
    fn ping(&mut self) -> Option<u32>;

    /// Convert an echo width to a one-way distance in mm
    fn echo_to_mm(echo_us: u32) -> u32;
}

/// Rolling I/O success counter
///
/// Diagnostic only; never feeds detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EchoStats {
    successes: u8,
    samples: u8,
}

impl EchoStats {
    pub fn record(&mut self, ok: bool) {
        self.successes = if ok {
            (self.successes + 1).min(ERROR_RATE_WINDOW)
        } else {
            self.successes.saturating_sub(1)
        };
        self.samples = (self.samples + 1).min(ERROR_RATE_WINDOW);
    }

    /// Failure percentage, once a full window has been sampled
    pub fn error_rate_percent(&self) -> Option<u8> {
        (self.samples >= ERROR_RATE_WINDOW).then(|| ERROR_RATE_WINDOW - self.successes)
    }
}

/// Ultrasonic sensor built from a ranger and the distance engine
pub struct RangingSensor<R> {
    ranger: R,
    engine: DistanceEngine,
    config: SensorConfig,
    logger: &'static dyn Logger,
    initialized: bool,
    last_sample_ms: Option<u32>,
    last_timeout_warn_ms: Option<u32>,
    stats: EchoStats,
}

impl<R: Ranger> RangingSensor<R> {
    pub fn new(ranger: R, config: SensorConfig, logger: &'static dyn Logger) -> Self {
        let caps = R::SENSOR_TYPE.capabilities();
        let mut engine = DistanceEngine::new(
            caps.min_distance_mm,
            caps.max_distance_mm,
            if config.sample_window_size > 0 {
                config.sample_window_size
            } else {
                DEFAULT_WINDOW_SIZE
            },
            logger,
        );
        engine.configure(&config);

        Self {
            ranger,
            engine,
            config,
            logger,
            initialized: false,
            last_sample_ms: None,
            last_timeout_warn_ms: None,
            stats: EchoStats::default(),
        }
    }

    /// One ping converted to mm, 0 on timeout or out of range
    fn measure_mm(&mut self, now_ms: u32) -> u32 {
        let Some(echo_us) = self.ranger.ping() else {
            self.stats.record(false);
            let due = self
                .last_timeout_warn_ms
                .map_or(true, |t| now_ms.wrapping_sub(t) > TIMEOUT_WARN_INTERVAL_MS);
            if due {
                self.last_timeout_warn_ms = Some(now_ms);
                sg_warn!(
                    self.logger,
                    Category::Sensor,
                    "{} on pin {}: echo timeout",
                    R::SENSOR_TYPE.name(),
                    self.config.primary_pin
                );
            }
            return 0;
        };
        self.stats.record(true);

        let mm = R::echo_to_mm(echo_us);
        if mm < self.engine.min_distance_mm() || mm > self.engine.max_distance_mm() {
            return 0;
        }
        mm
    }

    pub fn engine(&self) -> &DistanceEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut DistanceEngine {
        &mut self.engine
    }

    pub fn ranger(&self) -> &R {
        &self.ranger
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Rolling echo failure rate (%), `None` until 100 samples
    pub fn error_rate_percent(&self) -> Option<u8> {
        self.stats.error_rate_percent()
    }

    /// Spacing between pings, floor 60 ms
    pub fn set_sample_interval(&mut self, interval_ms: u32) {
        self.engine.set_sample_interval(interval_ms);
    }
}

impl<R: Ranger> MotionSensor for RangingSensor<R> {
    fn begin(&mut self, _now_ms: u32) -> bool {
        if self.initialized {
            return true;
        }
        self.ranger.init();
        self.initialized = true;

        sg_info!(
            self.logger,
            Category::Sensor,
            "{} on pin {}: threshold {} mm, window {}, every {} ms",
            R::SENSOR_TYPE.name(),
            self.config.primary_pin,
            self.engine.detection_threshold_mm(),
            self.engine.window_size(),
            self.engine.sample_interval_ms()
        );
        true
    }

    fn update(&mut self, now_ms: u32) {
        if !self.initialized {
            return;
        }
        if let Some(t) = self.last_sample_ms {
            if now_ms.wrapping_sub(t) < self.engine.sample_interval_ms() {
                return;
            }
        }
        self.last_sample_ms = Some(now_ms);

        let raw_mm = self.measure_mm(now_ms);
        let was_detected = self.engine.is_motion_detected();
        self.engine.update(raw_mm, now_ms);

        if self.engine.is_motion_detected() != was_detected {
            sg_debug!(
                self.logger,
                Category::Sensor,
                "{}: {} at {:?} mm ({})",
                R::SENSOR_TYPE.name(),
                if was_detected { "clear" } else { "motion" },
                self.engine.distance_mm(),
                self.engine.direction().name()
            );
        }
    }

    fn motion_detected(&self) -> bool {
        self.engine.is_motion_detected()
    }

    fn is_ready(&self) -> bool {
        self.initialized
    }

    fn sensor_type(&self) -> SensorType {
        R::SENSOR_TYPE
    }

    fn event_count(&self) -> u32 {
        self.engine.event_count()
    }

    fn reset_event_count(&mut self) {
        self.engine.reset_event_count();
    }

    fn last_event(&self) -> MotionEvent {
        self.engine.last_event()
    }

    fn last_event_time_ms(&self) -> u32 {
        self.engine.last_event_time_ms()
    }

    fn distance_mm(&self) -> Option<u32> {
        self.engine.distance_mm()
    }

    fn direction(&self) -> Option<MotionDirection> {
        Some(self.engine.direction())
    }

    fn detection_threshold_mm(&self) -> Option<u32> {
        Some(self.engine.detection_threshold_mm())
    }

    fn set_detection_threshold(&mut self, threshold_mm: u32) -> Result<(), SensorError> {
        self.engine.set_detection_threshold(threshold_mm);
        Ok(())
    }

    fn sample_window_size(&self) -> Option<u8> {
        Some(self.engine.window_size())
    }

    fn set_sample_window_size(&mut self, size: u8) -> Result<(), SensorError> {
        self.engine.set_window_size(size);
        Ok(())
    }

    fn set_direction_detection(&mut self, enabled: bool) -> Result<(), SensorError> {
        self.engine.set_direction_enabled(enabled);
        Ok(())
    }

    /// Feeds the engine directly, bypassing the ranger and rate limit
    #[cfg(any(test, feature = "mock"))]
    fn mock_set_distance(&mut self, distance_mm: u32, now_ms: u32) {
        self.engine.update(distance_mm, now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Deque;
    use stepguard_core::log::NOOP_LOGGER;

    /// Ranger replaying scripted echoes (µs)
    struct ScriptedRanger {
        echoes: Deque<Option<u32>, 32>,
        pings: u32,
    }

    impl ScriptedRanger {
        fn new(echoes: &[Option<u32>]) -> Self {
            let mut queue = Deque::new();
            for e in echoes {
                queue.push_back(*e).unwrap();
            }
            Self {
                echoes: queue,
                pings: 0,
            }
        }
    }

    impl Ranger for ScriptedRanger {
        const SENSOR_TYPE: SensorType = SensorType::Ultrasonic;

        fn init(&mut self) {}

        fn ping(&mut self) -> Option<u32> {
            self.pings += 1;
            self.echoes.pop_front().flatten()
        }

        fn echo_to_mm(echo_us: u32) -> u32 {
            echo_us
        }
    }

    fn sensor(echoes: &[Option<u32>]) -> RangingSensor<ScriptedRanger> {
        let mut s = RangingSensor::new(
            ScriptedRanger::new(echoes),
            SensorConfig::ultrasonic(8, 9),
            &NOOP_LOGGER,
        );
        assert!(s.begin(0));
        s
    }

    #[test]
    fn test_rate_limited() {
        let mut s = sensor(&[Some(1000), Some(1000), Some(1000)]);
        s.update(0);
        s.update(10);
        s.update(74);
        assert_eq!(s.ranger().pings, 1);
        s.update(75);
        assert_eq!(s.ranger().pings, 2);
    }

    #[test]
    fn test_sample_interval_floor() {
        let mut s = sensor(&[]);
        s.set_sample_interval(10);
        assert_eq!(s.engine().sample_interval_ms(), 60);
    }

    #[test]
    fn test_timeout_holds_distance() {
        let mut s = sensor(&[Some(1000), Some(1000), Some(1000), None, Some(5)]);
        for i in 0..5 {
            s.update(i * 75);
        }
        // Timeout and below-minimum echo both hold the median
        assert_eq!(s.distance_mm(), Some(1000));
    }

    #[test]
    fn test_not_ready_before_begin() {
        let mut s = RangingSensor::new(
            ScriptedRanger::new(&[Some(1000)]),
            SensorConfig::ultrasonic(8, 9),
            &NOOP_LOGGER,
        );
        assert!(!s.is_ready());
        s.update(0);
        assert_eq!(s.ranger().pings, 0);
        assert_eq!(s.distance_mm(), None);
    }

    #[test]
    fn test_capability_gated_ops() {
        let mut s = sensor(&[]);
        assert!(s.supports_distance());
        assert!(s.supports_direction());
        assert!(!s.supports_deep_sleep_wake());
        assert_eq!(s.wake_source(), None);
        assert_eq!(s.recalibrate(0), Err(SensorError::Unsupported));
        assert_eq!(s.detection_threshold_mm(), Some(500));
        s.set_detection_threshold(800).unwrap();
        assert_eq!(s.detection_threshold_mm(), Some(800));
        s.set_sample_window_size(25).unwrap();
        assert_eq!(s.sample_window_size(), Some(20));
        assert_eq!(s.direction(), Some(MotionDirection::Unknown));
    }

    #[test]
    fn test_echo_stats_window() {
        let mut stats = EchoStats::default();
        for _ in 0..99 {
            stats.record(true);
        }
        assert_eq!(stats.error_rate_percent(), None);
        stats.record(true);
        assert_eq!(stats.error_rate_percent(), Some(0));
        for _ in 0..10 {
            stats.record(false);
        }
        assert_eq!(stats.error_rate_percent(), Some(10));
        for _ in 0..200 {
            stats.record(false);
        }
        assert_eq!(stats.error_rate_percent(), Some(100));
    }

    #[test]
    fn test_mock_distance_approach() {
        let mut s = sensor(&[]);
        let mut now = 0;
        for mm in (400..=1500).rev().step_by(100) {
            s.mock_set_distance(mm, now);
            now += 75;
        }
        assert!(s.motion_detected());
        assert_eq!(s.last_event(), MotionEvent::ThresholdCrossed);
        assert_eq!(s.event_count(), 1);
        assert_eq!(s.direction(), Some(MotionDirection::Approaching));
    }

    #[test]
    fn test_mock_distance_brisk_approach() {
        let mut s = sensor(&[]);
        let mut now = 0;
        for mm in [1500, 1250, 1000, 750] {
            s.mock_set_distance(mm, now);
            now += 75;
            assert!(!s.motion_detected());
        }
        s.mock_set_distance(500, now);
        assert!(s.motion_detected());
        assert_eq!(s.last_event(), MotionEvent::ThresholdCrossed);
        assert_eq!(s.direction(), Some(MotionDirection::Approaching));
    }
}

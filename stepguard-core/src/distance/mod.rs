//! Distance signal-processing engine
//!
//! Turns noisy raw range samples into a debounced, direction-aware motion
//! decision. Ultrasonic drivers own one [`DistanceEngine`] each and feed it
//! a raw reading once per sample interval; everything after the echo
//! timing happens here.
//!
//! Per cycle:
//!
//! 1. **Wipe check** - a close reading arriving while the median still
//!    reflects a distant object overwrites the window, so the close object
//!    is not hidden behind median lag.
//! 2. **Insertion** - invalid readings (0 or out of range) re-insert the
//!    current median instead of polluting the window.
//! 3. **Median** - the public distance.
//! 4. **Direction** - median deltas against the sensitivity, confirmed only
//!    after persisting for the stability window.
//! 5. **Approach gate** - objects tracked in from outside the threshold may
//!    trigger at once; objects that appear inside it must survive extra
//!    confirmation cycles.
//! 6. **Threshold event** - in zone, moving, direction matches, gate clear.
//!
//! # Usage
//!
//! ```ignore
//! let mut engine = DistanceEngine::new(20, 4000, 3, &NOOP_LOGGER);
//! engine.set_detection_threshold(800);
//!
//! loop {
//!     let raw = ranger.measure_mm(); // 0 on timeout
//!     engine.update(raw, now_ms);
//!     if engine.is_motion_detected() {
//!         // warn pedestrian
//!     }
//! }
//! ```

pub mod tuning;
pub mod window;

use heapless::HistoryBuffer;

use crate::config::{SensorConfig, TriggerMode, ULTRASONIC_SAMPLE_INTERVAL_MS, ULTRASONIC_THRESHOLD_MM};
use crate::log::{Category, Logger};
use crate::traits::{MotionDirection, MotionEvent, SensorError};
use crate::{sg_debug, sg_info, sg_warn};

pub use tuning::Tuning;
pub use window::SampleWindow;

use tuning::{
    APPEARANCE_LEN, DELTA_HISTORY_LEN, MAX_SAMPLE_INTERVAL_MS, MAX_SENSITIVITY_MM,
    MAX_WINDOW_SIZE, MIN_SAMPLE_INTERVAL_MS, MIN_SENSITIVITY_MM, MIN_WINDOW_SIZE,
    RAW_HISTORY_LEN,
};

/// Approach classification for the current visit to the detection zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApproachGate {
    /// Median is outside the detection zone
    Outside,
    /// Object was tracked from outside the threshold; may trigger at once
    Gradual,
    /// Object appeared inside the threshold; waits `remaining` cycles
    Sudden { remaining: u8 },
}

impl ApproachGate {
    pub const fn is_clear(self) -> bool {
        matches!(self, ApproachGate::Gradual | ApproachGate::Sudden { remaining: 0 })
    }
}

/// Shared distance processing for ranging sensors
pub struct DistanceEngine {
    logger: &'static dyn Logger,
    tuning: Tuning,

    min_mm: u32,
    max_mm: u32,
    threshold_mm: u32,
    sample_interval_ms: u32,
    /// 0 = auto (one mm per ms of sample interval)
    sensitivity_mm: u32,
    direction_enabled: bool,
    trigger_mode: TriggerMode,

    window: SampleWindow,
    median_mm: Option<u32>,
    prev_median_mm: Option<u32>,
    has_valid: bool,
    last_raw_mm: u32,
    raw_history: HistoryBuffer<u32, RAW_HISTORY_LEN>,
    deltas: HistoryBuffer<i32, DELTA_HISTORY_LEN>,
    appearance: HistoryBuffer<u32, APPEARANCE_LEN>,

    direction: MotionDirection,
    direction_changed: bool,
    candidate: MotionDirection,
    candidate_since_ms: u32,
    skip_cycles: u8,
    wiped: bool,
    /// Appearance buffer showed an approach from outside the threshold
    /// before the last wipe overwrote it
    wipe_after_approach: bool,
    gate: ApproachGate,

    detected: bool,
    last_event: MotionEvent,
    event_count: u32,
    last_event_time_ms: u32,
}

impl DistanceEngine {
    /// Create an engine for a sensor with the given usable range
    ///
    /// # Arguments
    /// - `min_mm`, `max_mm`: readings outside this range are invalid
    /// - `window_size`: rolling window, clamped to 3-20
    /// - `logger`: diagnostics sink
    pub fn new(min_mm: u32, max_mm: u32, window_size: u8, logger: &'static dyn Logger) -> Self {
        let clamped = window_size.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE);
        if clamped != window_size {
            sg_warn!(
                logger,
                Category::Config,
                "Window size {} out of range, using {}",
                window_size,
                clamped
            );
        }

        Self {
            logger,
            tuning: Tuning::default(),
            min_mm,
            max_mm,
            threshold_mm: ULTRASONIC_THRESHOLD_MM.clamp(min_mm, max_mm),
            sample_interval_ms: ULTRASONIC_SAMPLE_INTERVAL_MS,
            sensitivity_mm: 0,
            direction_enabled: true,
            trigger_mode: TriggerMode::Approaching,
            window: SampleWindow::new(clamped),
            median_mm: None,
            prev_median_mm: None,
            has_valid: false,
            last_raw_mm: 0,
            raw_history: HistoryBuffer::new(),
            deltas: HistoryBuffer::new(),
            appearance: HistoryBuffer::new(),
            direction: MotionDirection::Unknown,
            direction_changed: false,
            candidate: MotionDirection::Unknown,
            candidate_since_ms: 0,
            skip_cycles: 0,
            wiped: false,
            wipe_after_approach: false,
            gate: ApproachGate::Outside,
            detected: false,
            last_event: MotionEvent::None,
            event_count: 0,
            last_event_time_ms: 0,
        }
    }

    /// Apply the tuning fields of a sensor config (zero fields keep defaults)
    pub fn configure(&mut self, config: &SensorConfig) {
        if config.detection_threshold_mm > 0 {
            self.set_detection_threshold(config.detection_threshold_mm);
        }
        if config.sample_interval_ms > 0 {
            self.set_sample_interval(config.sample_interval_ms);
        }
        if config.sample_window_size > 0 {
            self.set_window_size(config.sample_window_size);
        }
        self.set_sensitivity(config.direction_sensitivity_mm);
        self.set_direction_enabled(config.direction_enabled);
        self.trigger_mode = config.trigger_mode;
    }

    /// Process one raw reading (0 = timeout / no echo)
    ///
    /// Must be called exactly once per sample before reading any derived
    /// value.
    pub fn update(&mut self, raw_mm: u32, now_ms: u32) {
        self.last_raw_mm = raw_mm;
        self.raw_history.write(raw_mm);
        let valid = self.is_valid(raw_mm);
        let before = self.median_mm;

        self.wiped = false;
        if valid {
            if let Some(median) = before {
                if raw_mm <= self.threshold_mm
                    && median > self.threshold_mm
                    && median - raw_mm > self.tuning.wipe_delta_mm
                {
                    self.wipe_after_approach = self.approach_evidence();
                    self.wipe(raw_mm, median, now_ms);
                }
            }
        }

        let sample = if valid {
            self.has_valid = true;
            raw_mm
        } else {
            match before {
                Some(median) if self.has_valid => median,
                _ => self.max_mm,
            }
        };
        self.window.push(sample);

        self.prev_median_mm = before;
        self.median_mm = self.window.median();

        self.update_direction(now_ms);

        let in_zone = self.in_zone();
        self.update_gate(in_zone);
        if valid {
            self.appearance.write(raw_mm);
        }

        self.update_detection(in_zone, now_ms);
    }

    fn is_valid(&self, raw_mm: u32) -> bool {
        raw_mm != 0 && raw_mm >= self.min_mm && raw_mm <= self.max_mm
    }

    fn in_zone(&self) -> bool {
        self.median_mm
            .is_some_and(|m| m >= self.min_mm && m <= self.threshold_mm)
    }

    /// Recent valid readings all beyond the threshold and closing in
    fn approach_evidence(&self) -> bool {
        let threshold = self.threshold_mm;
        let mut readings = self.appearance.oldest_ordered();
        let Some(&oldest) = readings.next() else {
            return false;
        };
        let mut newest = oldest;
        for &r in readings {
            if r <= threshold {
                return false;
            }
            newest = r;
        }
        oldest > threshold && newest < oldest
    }

    fn wipe(&mut self, raw_mm: u32, median_mm: u32, now_ms: u32) {
        self.window.fill(raw_mm);
        self.appearance.clear();
        for _ in 0..APPEARANCE_LEN {
            self.appearance.write(raw_mm);
        }

        // Seed direction from the jump the wipe is about to hide
        self.candidate = self.classify(raw_mm as i32 - median_mm as i32);
        self.candidate_since_ms = now_ms;
        self.skip_cycles = self.tuning.wipe_skip_cycles;
        self.wiped = true;

        sg_debug!(
            self.logger,
            Category::Sensor,
            "Window wipe: {} mm -> {} mm",
            median_mm,
            raw_mm
        );
    }

    fn classify(&self, delta_mm: i32) -> MotionDirection {
        let sensitivity = self.effective_sensitivity_mm() as i32;
        if delta_mm <= -sensitivity {
            MotionDirection::Approaching
        } else if delta_mm >= sensitivity {
            MotionDirection::Receding
        } else {
            MotionDirection::Stationary
        }
    }

    fn update_direction(&mut self, now_ms: u32) {
        self.direction_changed = false;

        let (Some(current), Some(previous)) = (self.median_mm, self.prev_median_mm) else {
            return;
        };
        let delta = current as i32 - previous as i32;
        self.deltas.write(delta);

        if !self.direction_enabled || !self.window.is_full() {
            return;
        }

        if self.skip_cycles > 0 {
            self.skip_cycles -= 1;
        } else {
            let observed = self.classify(delta);
            if observed != self.candidate {
                self.candidate = observed;
                self.candidate_since_ms = now_ms;
            }
        }

        if self.candidate != self.direction
            && now_ms.wrapping_sub(self.candidate_since_ms) >= self.tuning.direction_stability_ms
        {
            sg_debug!(
                self.logger,
                Category::Sensor,
                "Direction {} -> {}",
                self.direction.name(),
                self.candidate.name()
            );
            self.direction = self.candidate;
            self.direction_changed = true;
        }
    }

    fn update_gate(&mut self, in_zone: bool) {
        if !in_zone {
            self.gate = ApproachGate::Outside;
            return;
        }

        match self.gate {
            ApproachGate::Outside => {
                let threshold = self.threshold_mm;
                let tracked = if self.wiped {
                    self.wipe_after_approach
                } else {
                    self.prev_median_mm.is_some_and(|m| m > threshold)
                        || self.appearance.as_slice().iter().any(|&r| r > threshold)
                };

                // A tracked approach confirms the direction without waiting
                // out the stability window
                if tracked
                    && self.direction_enabled
                    && self.candidate == MotionDirection::Approaching
                    && self.direction != MotionDirection::Approaching
                {
                    sg_debug!(
                        self.logger,
                        Category::Sensor,
                        "Direction {} -> approaching on tracked entry",
                        self.direction.name()
                    );
                    self.direction = MotionDirection::Approaching;
                    self.direction_changed = true;
                }

                self.gate = if tracked {
                    ApproachGate::Gradual
                } else {
                    ApproachGate::Sudden {
                        remaining: self.tuning.sudden_confirm_cycles,
                    }
                };
                sg_debug!(self.logger, Category::Sensor, "Zone entry: {:?}", self.gate);
            }
            ApproachGate::Sudden { remaining } if remaining > 0 => {
                self.gate = ApproachGate::Sudden {
                    remaining: remaining - 1,
                };
            }
            _ => {}
        }
    }

    fn direction_matches(&self) -> bool {
        matches!(
            (self.trigger_mode, self.direction),
            (TriggerMode::Approaching, MotionDirection::Approaching)
                | (TriggerMode::Receding, MotionDirection::Receding)
                | (
                    TriggerMode::Both,
                    MotionDirection::Approaching | MotionDirection::Receding
                )
        )
    }

    /// Net median change over the delta history (mm)
    pub fn net_movement_mm(&self) -> u32 {
        self.deltas.as_slice().iter().sum::<i32>().unsigned_abs()
    }

    fn update_detection(&mut self, in_zone: bool, now_ms: u32) {
        let moving = self
            .tuning
            .is_significant(self.net_movement_mm(), self.window.spread());
        let direction_ok = !self.direction_enabled || self.direction_matches();
        let detected = in_zone && moving && direction_ok && self.gate.is_clear();

        match (self.detected, detected) {
            (false, true) => {
                self.event_count = self.event_count.wrapping_add(1);
                self.last_event = MotionEvent::ThresholdCrossed;
                self.last_event_time_ms = now_ms;
                sg_info!(
                    self.logger,
                    Category::Sensor,
                    "Threshold crossed at {} mm ({})",
                    self.median_mm.unwrap_or(0),
                    self.direction.name()
                );
            }
            (true, false) => {
                self.last_event = MotionEvent::Cleared;
            }
            (true, true) if self.direction_changed => match self.direction {
                MotionDirection::Approaching => self.last_event = MotionEvent::Approaching,
                MotionDirection::Receding => self.last_event = MotionEvent::Receding,
                _ => {}
            },
            _ => {}
        }
        self.detected = detected;
    }

    /// Drop all samples and derived state; configuration and counters stay
    pub fn reset_tracking(&mut self) {
        self.window.clear();
        self.median_mm = None;
        self.prev_median_mm = None;
        self.has_valid = false;
        self.raw_history.clear();
        self.deltas.clear();
        self.appearance.clear();
        self.direction = MotionDirection::Unknown;
        self.direction_changed = false;
        self.candidate = MotionDirection::Unknown;
        self.skip_cycles = 0;
        self.wiped = false;
        self.wipe_after_approach = false;
        self.gate = ApproachGate::Outside;
        self.detected = false;
    }

    pub fn is_motion_detected(&self) -> bool {
        self.detected
    }

    /// Window median (mm), `None` before the first sample
    pub fn distance_mm(&self) -> Option<u32> {
        self.median_mm
    }

    /// Confirmed direction (`Unknown` when direction detection is off)
    pub fn direction(&self) -> MotionDirection {
        self.direction
    }

    pub fn candidate_direction(&self) -> MotionDirection {
        self.candidate
    }

    pub fn gate(&self) -> ApproachGate {
        self.gate
    }

    pub fn last_raw_mm(&self) -> u32 {
        self.last_raw_mm
    }

    /// Recent raw readings, oldest first
    pub fn raw_history(&self) -> impl Iterator<Item = &u32> {
        self.raw_history.oldest_ordered()
    }

    pub fn window_spread_mm(&self) -> u32 {
        self.window.spread()
    }

    pub fn is_window_full(&self) -> bool {
        self.window.is_full()
    }

    pub fn last_event(&self) -> MotionEvent {
        self.last_event
    }

    pub fn event_count(&self) -> u32 {
        self.event_count
    }

    pub fn last_event_time_ms(&self) -> u32 {
        self.last_event_time_ms
    }

    pub fn reset_event_count(&mut self) {
        self.event_count = 0;
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn set_tuning(&mut self, tuning: Tuning) {
        self.tuning = tuning;
    }

    pub fn min_distance_mm(&self) -> u32 {
        self.min_mm
    }

    pub fn max_distance_mm(&self) -> u32 {
        self.max_mm
    }

    /// Change the valid reading range
    pub fn set_distance_range(&mut self, min_mm: u32, max_mm: u32) -> Result<(), SensorError> {
        if min_mm >= max_mm {
            sg_warn!(
                self.logger,
                Category::Config,
                "Rejected distance range {}-{} mm",
                min_mm,
                max_mm
            );
            return Err(SensorError::InvalidRange);
        }
        self.min_mm = min_mm;
        self.max_mm = max_mm;
        self.set_detection_threshold(self.threshold_mm);
        Ok(())
    }

    pub fn detection_threshold_mm(&self) -> u32 {
        self.threshold_mm
    }

    /// Set the detection threshold, clamped into the valid range
    pub fn set_detection_threshold(&mut self, threshold_mm: u32) {
        let clamped = threshold_mm.clamp(self.min_mm, self.max_mm);
        if clamped != threshold_mm {
            sg_warn!(
                self.logger,
                Category::Config,
                "Threshold {} mm out of range, using {} mm",
                threshold_mm,
                clamped
            );
        }
        self.threshold_mm = clamped;
    }

    pub fn window_size(&self) -> u8 {
        self.window.size()
    }

    /// Resize the rolling window (3-20); discards tracked samples
    pub fn set_window_size(&mut self, size: u8) {
        let clamped = size.clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE);
        if clamped != size {
            sg_warn!(
                self.logger,
                Category::Config,
                "Window size {} out of range, using {}",
                size,
                clamped
            );
        }
        if clamped != self.window.size() {
            self.window.resize(clamped);
            self.reset_tracking();
        }
    }

    pub fn sample_interval_ms(&self) -> u32 {
        self.sample_interval_ms
    }

    /// Set the sample interval (60-1000 ms)
    pub fn set_sample_interval(&mut self, interval_ms: u32) {
        let clamped = interval_ms.clamp(MIN_SAMPLE_INTERVAL_MS, MAX_SAMPLE_INTERVAL_MS);
        if clamped != interval_ms {
            sg_warn!(
                self.logger,
                Category::Config,
                "Sample interval {} ms out of range, using {} ms",
                interval_ms,
                clamped
            );
        }
        self.sample_interval_ms = clamped;
    }

    /// Configured sensitivity, 0 meaning auto
    pub fn sensitivity_mm(&self) -> u32 {
        self.sensitivity_mm
    }

    /// Sensitivity actually applied (auto assumes ~1 m/s walking pace)
    pub fn effective_sensitivity_mm(&self) -> u32 {
        if self.sensitivity_mm == 0 {
            self.sample_interval_ms
        } else {
            self.sensitivity_mm
        }
    }

    /// Set the direction sensitivity (0 = auto, else 5-1000 mm)
    pub fn set_sensitivity(&mut self, sensitivity_mm: u32) {
        if sensitivity_mm == 0 {
            self.sensitivity_mm = 0;
            return;
        }
        let clamped = sensitivity_mm.clamp(MIN_SENSITIVITY_MM, MAX_SENSITIVITY_MM);
        if clamped != sensitivity_mm {
            sg_warn!(
                self.logger,
                Category::Config,
                "Direction sensitivity {} mm out of range, using {} mm",
                sensitivity_mm,
                clamped
            );
        }
        self.sensitivity_mm = clamped;
    }

    pub fn direction_enabled(&self) -> bool {
        self.direction_enabled
    }

    pub fn set_direction_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.direction = MotionDirection::Unknown;
            self.candidate = MotionDirection::Unknown;
            self.skip_cycles = 0;
        }
        self.direction_enabled = enabled;
    }

    pub fn trigger_mode(&self) -> TriggerMode {
        self.trigger_mode
    }

    pub fn set_trigger_mode(&mut self, mode: TriggerMode) {
        self.trigger_mode = mode;
    }
}

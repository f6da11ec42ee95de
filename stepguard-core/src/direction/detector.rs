//! Dual-PIR direction detector
//!
//! Infers "approaching" from the order in which a far-zone and a near-zone
//! PIR fire. PIRs give no range, so only trigger ordering and timing are
//! used: far then near (with a plausible walking gap) is an approach,
//! near alone is a local object, and near/far together is ambiguous.

use crate::config::DirectionDetectorConfig;
use crate::log::{Category, Logger, NOOP_LOGGER};
use crate::manager::SensorManager;
use crate::traits::{MotionDirection, SensorFactory};
use crate::{sg_debug, sg_info};

use super::state::DirectionState;

/// Near/far trigger-ordering state machine
pub struct DirectionDetector {
    logger: &'static dyn Logger,
    config: DirectionDetectorConfig,

    state: DirectionState,
    /// When the current pattern left Idle
    pattern_start_ms: u32,
    far_active: bool,
    near_active: bool,
    far_trigger_ms: Option<u32>,
    near_trigger_ms: Option<u32>,
    confirmed_at_ms: Option<u32>,

    approaching_count: u32,
    unknown_count: u32,
}

impl Default for DirectionDetector {
    fn default() -> Self {
        Self::new(DirectionDetectorConfig::default(), &NOOP_LOGGER)
    }
}

impl DirectionDetector {
    pub fn new(config: DirectionDetectorConfig, logger: &'static dyn Logger) -> Self {
        Self {
            logger,
            config,
            state: DirectionState::Idle,
            pattern_start_ms: 0,
            far_active: false,
            near_active: false,
            far_trigger_ms: None,
            near_trigger_ms: None,
            confirmed_at_ms: None,
            approaching_count: 0,
            unknown_count: 0,
        }
    }

    /// Reset the pattern and latch the sensors' current levels
    ///
    /// Sensors already active at startup are not counted as triggers.
    pub fn begin(&mut self, far_active: bool, near_active: bool) {
        self.reset_state();
        self.far_active = far_active;
        self.near_active = near_active;
        sg_info!(
            self.logger,
            Category::State,
            "Direction detector ready (window {} ms, simultaneous {} ms, timeout {} ms)",
            self.config.confirmation_window_ms,
            self.config.simultaneous_threshold_ms,
            self.config.pattern_timeout_ms
        );
    }

    /// Advance the state machine with the sensors' current motion flags
    pub fn update(&mut self, now_ms: u32, far_active: bool, near_active: bool) {
        if far_active && !self.far_active {
            self.on_far_trigger(now_ms, near_active);
        }
        if near_active && !self.near_active {
            self.on_near_trigger(now_ms, far_active);
        }

        let settled = self.state.settle(far_active, near_active);
        if settled != self.state {
            if settled == DirectionState::Idle {
                self.reset_state();
            } else {
                self.transition(settled);
            }
        }

        if self.state != DirectionState::Idle
            && now_ms.wrapping_sub(self.pattern_start_ms) > self.config.pattern_timeout_ms
        {
            sg_debug!(
                self.logger,
                Category::State,
                "Pattern timeout in {}",
                self.state.name()
            );
            self.unknown_count = self.unknown_count.wrapping_add(1);
            self.reset_state();
        }

        self.far_active = far_active;
        self.near_active = near_active;
    }

    /// Poll the configured far/near slots of a sensor manager
    ///
    /// Empty or disabled slots read as inactive.
    pub fn update_from<F: SensorFactory>(&mut self, manager: &SensorManager<F>, now_ms: u32) {
        let far = manager.slot_motion(self.config.far_slot as usize);
        let near = manager.slot_motion(self.config.near_slot as usize);
        self.update(now_ms, far, near);
    }

    fn is_simultaneous(&self, now_ms: u32, other: Option<u32>) -> bool {
        other.is_some_and(|t| now_ms.wrapping_sub(t) <= self.config.simultaneous_threshold_ms)
    }

    fn on_far_trigger(&mut self, now_ms: u32, near_active: bool) {
        self.far_trigger_ms = Some(now_ms);

        if near_active && self.is_simultaneous(now_ms, self.near_trigger_ms) {
            sg_debug!(self.logger, Category::State, "Simultaneous far/near trigger");
            self.unknown_count = self.unknown_count.wrapping_add(1);
            return;
        }

        if self.state == DirectionState::Idle {
            self.pattern_start_ms = now_ms;
            self.transition(DirectionState::FarOnly);
        }
    }

    fn on_near_trigger(&mut self, now_ms: u32, far_active: bool) {
        self.near_trigger_ms = Some(now_ms);

        if far_active && self.is_simultaneous(now_ms, self.far_trigger_ms) {
            sg_debug!(self.logger, Category::State, "Simultaneous near/far trigger");
            self.unknown_count = self.unknown_count.wrapping_add(1);
            return;
        }

        match self.state {
            DirectionState::Idle => {
                self.pattern_start_ms = now_ms;
                self.transition(DirectionState::NearOnly);
                self.unknown_count = self.unknown_count.wrapping_add(1);
            }
            DirectionState::FarOnly => {
                let Some(far_ms) = self.far_trigger_ms else {
                    return;
                };
                let gap = now_ms.wrapping_sub(far_ms);
                if gap <= self.config.confirmation_window_ms {
                    self.confirm_approaching(now_ms, gap);
                } else {
                    sg_debug!(
                        self.logger,
                        Category::State,
                        "Far->near gap {} ms outside window",
                        gap
                    );
                    self.unknown_count = self.unknown_count.wrapping_add(1);
                }
            }
            _ => {}
        }
    }

    fn confirm_approaching(&mut self, now_ms: u32, gap_ms: u32) {
        self.transition(DirectionState::Approaching);
        self.confirmed_at_ms = Some(now_ms);
        self.approaching_count = self.approaching_count.wrapping_add(1);
        sg_info!(
            self.logger,
            Category::State,
            "Approach confirmed (far->near {} ms, total {})",
            gap_ms,
            self.approaching_count
        );
    }

    fn transition(&mut self, next: DirectionState) {
        sg_debug!(
            self.logger,
            Category::State,
            "{} -> {}",
            self.state.name(),
            next.name()
        );
        self.state = next;
    }

    /// Back to Idle; trigger timestamps are kept for simultaneity checks
    fn reset_state(&mut self) {
        self.state = DirectionState::Idle;
        self.pattern_start_ms = 0;
        self.confirmed_at_ms = None;
    }

    pub fn state(&self) -> DirectionState {
        self.state
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn is_approaching(&self) -> bool {
        self.state == DirectionState::Approaching
    }

    pub fn is_direction_confirmed(&self) -> bool {
        self.confirmed_at_ms.is_some()
    }

    pub fn direction(&self) -> MotionDirection {
        if self.is_direction_confirmed() {
            MotionDirection::Approaching
        } else {
            MotionDirection::Unknown
        }
    }

    /// How long the current approach has been confirmed (ms)
    pub fn confidence_ms(&self, now_ms: u32) -> u32 {
        self.confirmed_at_ms
            .map_or(0, |t| now_ms.wrapping_sub(t))
    }

    pub fn approaching_count(&self) -> u32 {
        self.approaching_count
    }

    pub fn unknown_count(&self) -> u32 {
        self.unknown_count
    }

    pub fn far_active(&self) -> bool {
        self.far_active
    }

    pub fn near_active(&self) -> bool {
        self.near_active
    }

    pub fn reset_statistics(&mut self) {
        self.approaching_count = 0;
        self.unknown_count = 0;
        sg_debug!(self.logger, Category::State, "Direction statistics reset");
    }

    pub fn config(&self) -> &DirectionDetectorConfig {
        &self.config
    }

    pub fn set_confirmation_window_ms(&mut self, window_ms: u32) {
        self.config.confirmation_window_ms = window_ms;
    }

    pub fn set_simultaneous_threshold_ms(&mut self, threshold_ms: u32) {
        self.config.simultaneous_threshold_ms = threshold_ms;
    }

    pub fn set_pattern_timeout_ms(&mut self, timeout_ms: u32) {
        self.config.pattern_timeout_ms = timeout_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> DirectionDetector {
        let mut d = DirectionDetector::default();
        d.begin(false, false);
        d
    }

    #[test]
    fn test_far_then_near_is_approach() {
        let mut d = detector();
        d.update(0, true, false);
        assert_eq!(d.state(), DirectionState::FarOnly);

        d.update(300, true, false);
        d.update(600, true, true);
        assert_eq!(d.state(), DirectionState::Approaching);
        assert!(d.is_approaching());
        assert!(d.is_direction_confirmed());
        assert_eq!(d.direction(), MotionDirection::Approaching);
        assert_eq!(d.approaching_count(), 1);
        assert_eq!(d.confidence_ms(1600), 1000);
    }

    #[test]
    fn test_near_alone_is_local_object() {
        let mut d = detector();
        d.update(0, false, true);
        assert_eq!(d.state(), DirectionState::NearOnly);
        assert_eq!(d.approaching_count(), 0);
        assert_eq!(d.unknown_count(), 1);

        // Far firing later does not promote to an approach
        d.update(1000, true, true);
        assert_eq!(d.state(), DirectionState::BothActive);
        assert_eq!(d.approaching_count(), 0);
    }

    #[test]
    fn test_pattern_timeout() {
        let mut d = detector();
        d.update(0, true, false);
        d.update(10_000, true, false);
        assert_eq!(d.state(), DirectionState::FarOnly);

        d.update(10_001, true, false);
        assert_eq!(d.state(), DirectionState::Idle);
        assert_eq!(d.unknown_count(), 1);

        // Far still held high: no new rising edge, stays idle
        d.update(10_100, true, false);
        assert_eq!(d.state(), DirectionState::Idle);
    }

    #[test]
    fn test_simultaneous_is_ambiguous() {
        let mut d = detector();
        d.update(0, true, false);
        d.update(200, true, true);
        assert_eq!(d.approaching_count(), 0);
        assert_eq!(d.unknown_count(), 1);
        assert_eq!(d.state(), DirectionState::BothActive);
        assert!(!d.is_direction_confirmed());
    }

    #[test]
    fn test_same_tick_triggers_are_ambiguous() {
        let mut d = detector();
        d.update(50, true, true);
        assert_eq!(d.approaching_count(), 0);
        assert_eq!(d.unknown_count(), 1);
        assert!(!d.is_approaching());
    }

    #[test]
    fn test_gap_outside_window_not_confirmed() {
        let mut d = detector();
        d.set_pattern_timeout_ms(20_000);
        d.update(0, true, false);
        d.update(6000, true, true);
        assert!(!d.is_approaching());
        assert_eq!(d.unknown_count(), 1);
    }

    #[test]
    fn test_far_clear_resets() {
        let mut d = detector();
        d.update(0, true, false);
        d.update(2000, false, false);
        assert_eq!(d.state(), DirectionState::Idle);
        assert_eq!(d.unknown_count(), 0);
    }

    #[test]
    fn test_approach_completes_when_both_clear() {
        let mut d = detector();
        d.update(0, true, false);
        d.update(1000, true, true);
        assert!(d.is_approaching());

        d.update(2500, false, true);
        assert!(d.is_approaching());
        d.update(3000, false, false);
        assert_eq!(d.state(), DirectionState::Idle);
        assert!(!d.is_direction_confirmed());
        assert_eq!(d.confidence_ms(3000), 0);
        assert_eq!(d.approaching_count(), 1);
    }

    #[test]
    fn test_begin_ignores_already_active() {
        let mut d = DirectionDetector::default();
        d.begin(true, false);
        d.update(0, true, false);
        assert_eq!(d.state(), DirectionState::Idle);
    }

    #[test]
    fn test_reset_statistics() {
        let mut d = detector();
        d.update(0, false, true);
        d.update(100, false, false);
        d.update(200, true, false);
        d.update(900, true, true);
        assert_eq!(d.approaching_count(), 1);
        assert_eq!(d.unknown_count(), 1);

        d.reset_statistics();
        assert_eq!(d.approaching_count(), 0);
        assert_eq!(d.unknown_count(), 0);
    }
}

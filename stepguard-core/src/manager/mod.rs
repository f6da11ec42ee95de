//! Sensor manager and fusion policy
//!
//! Owns up to [`MAX_SENSORS`] sensors in fixed slots, updates them every
//! tick, and combines their motion flags according to a [`FusionMode`].
//!
//! # Usage
//!
//! ```ignore
//! let mut manager = SensorManager::new(BoardSensorFactory::new(pins), &NOOP_LOGGER);
//! manager.add_sensor(0, &SensorConfig::pir(1), "near", true, now_ms)?;
//! manager.add_sensor(1, &SensorConfig::ultrasonic(8, 9), "", false, now_ms)?;
//! manager.set_fusion_mode(FusionMode::TriggerMeasure);
//! manager.validate_configuration()?;
//! manager.begin(now_ms);
//!
//! loop {
//!     manager.update(now_ms);
//!     if manager.is_motion_detected() {
//!         // raise hazard warning
//!     }
//! }
//! ```

pub mod slot;

use core::fmt::Write;

use heapless::{String, Vec};

use crate::config::{FusionMode, SensorConfig, SensorSetup, MAX_LABEL_LEN, MAX_SENSORS};
use crate::log::{Category, Logger};
use crate::traits::{
    FactoryError, MotionDirection, MotionSensor, SensorError, SensorFactory, WakeSource,
};
use crate::{sg_error, sg_info, sg_warn};

pub use slot::{CombinedStatus, SensorSlot};

/// Errors reported by the sensor manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ManagerError {
    /// Slot index >= MAX_SENSORS
    InvalidSlot,
    /// No sensor in the slot
    EmptySlot,
    /// Factory could not build the sensor
    CreateFailed(FactoryError),
    /// Sensor `begin()` failed
    InitFailed,
    /// Sensor operation failed
    Sensor(SensorError),
    MultiplePrimary,
    TriggerMeasureNeedsTwoSensors,
    TriggerMeasureNeedsPrimary,
}

impl ManagerError {
    pub const fn message(self) -> &'static str {
        match self {
            ManagerError::InvalidSlot => "Invalid slot index",
            ManagerError::EmptySlot => "No sensor in slot",
            ManagerError::CreateFailed(_) => "Failed to create sensor",
            ManagerError::InitFailed => "Failed to initialize sensor",
            ManagerError::Sensor(e) => e.message(),
            ManagerError::MultiplePrimary => "Multiple primary sensors configured",
            ManagerError::TriggerMeasureNeedsTwoSensors => {
                "TRIGGER_MEASURE mode requires at least 2 sensors"
            }
            ManagerError::TriggerMeasureNeedsPrimary => {
                "TRIGGER_MEASURE mode requires a primary sensor"
            }
        }
    }
}

/// Slot-based sensor registry with fusion
pub struct SensorManager<F: SensorFactory> {
    factory: F,
    slots: [Option<SensorSlot<F::Sensor>>; MAX_SENSORS],
    fusion_mode: FusionMode,
    initialized: bool,
    last_error: Option<ManagerError>,
    logger: &'static dyn Logger,
}

impl<F: SensorFactory> SensorManager<F> {
    pub fn new(factory: F, logger: &'static dyn Logger) -> Self {
        Self {
            factory,
            slots: core::array::from_fn(|_| None),
            fusion_mode: FusionMode::Any,
            initialized: false,
            last_error: None,
            logger,
        }
    }

    /// Build a manager from the stored sensor setup and start it
    ///
    /// Slots that fail to build are left empty with the failure in
    /// [`last_error`](Self::last_error). Primary flags are taken as stored so
    /// that [`validate_configuration`](Self::validate_configuration) can
    /// reject a setup with several primaries.
    pub fn from_setup(
        factory: F,
        setup: &SensorSetup,
        logger: &'static dyn Logger,
        now_ms: u32,
    ) -> Self {
        let mut manager = Self::new(factory, logger);
        manager.fusion_mode = setup.fusion_mode;

        for slot_cfg in setup.slots.iter() {
            let index = slot_cfg.slot as usize;
            if manager
                .insert(index, &slot_cfg.config, slot_cfg.label.as_str(), slot_cfg.primary, now_ms)
                .is_ok()
                && !slot_cfg.enabled
            {
                let _ = manager.set_sensor_enabled(index, false);
            }
        }

        manager.begin(now_ms);
        manager
    }

    /// Start every sensor added so far
    ///
    /// Returns false if any sensor failed to start; those slots are emptied.
    pub fn begin(&mut self, now_ms: u32) -> bool {
        let mut ok = true;
        for index in 0..MAX_SENSORS {
            let started = match self.slots[index].as_mut() {
                Some(slot) => slot.sensor.begin(now_ms),
                None => continue,
            };
            if !started {
                ok = false;
                self.fail_init(index);
            }
        }
        self.initialized = true;
        sg_info!(
            self.logger,
            Category::System,
            "Sensor manager started: {} active, fusion {}",
            self.active_sensor_count(),
            self.fusion_mode.name()
        );
        ok
    }

    /// Update every enabled sensor; call once per tick
    pub fn update(&mut self, now_ms: u32) {
        for slot in self.slots.iter_mut().flatten() {
            if slot.enabled {
                slot.sensor.update(now_ms);
            }
        }
    }

    /// Build a sensor into a slot, replacing any existing one
    ///
    /// A primary sensor clears the primary flag of every other slot.
    pub fn add_sensor(
        &mut self,
        index: usize,
        config: &SensorConfig,
        label: &str,
        primary: bool,
        now_ms: u32,
    ) -> Result<(), ManagerError> {
        self.insert(index, config, label, primary, now_ms)?;
        if primary {
            for (i, slot) in self.slots.iter_mut().enumerate() {
                if let Some(slot) = slot {
                    slot.primary = i == index;
                }
            }
        }
        Ok(())
    }

    fn insert(
        &mut self,
        index: usize,
        config: &SensorConfig,
        label: &str,
        primary: bool,
        now_ms: u32,
    ) -> Result<(), ManagerError> {
        if index >= MAX_SENSORS {
            return Err(self.fail(ManagerError::InvalidSlot));
        }

        if self.slots[index].is_some() {
            sg_warn!(self.logger, Category::System, "Replacing sensor in slot {}", index);
            self.remove_sensor(index)?;
        }

        let sensor = match self.factory.create(config) {
            Ok(sensor) => sensor,
            Err(e) => {
                sg_error!(
                    self.logger,
                    Category::System,
                    "Slot {}: cannot create {} sensor ({})",
                    index,
                    config.sensor_type.name(),
                    e.message()
                );
                return Err(self.fail(ManagerError::CreateFailed(e)));
            }
        };

        let name = sensor.capabilities().name;
        self.slots[index] = Some(SensorSlot {
            sensor,
            config: *config,
            enabled: true,
            primary,
            label: make_label(label, index),
        });

        if self.initialized {
            let started = match self.slots[index].as_mut() {
                Some(slot) => slot.sensor.begin(now_ms),
                None => false,
            };
            if !started {
                self.fail_init(index);
                return Err(ManagerError::InitFailed);
            }
        }

        sg_info!(
            self.logger,
            Category::System,
            "Added sensor {} ({}): {}",
            index,
            self.slots[index].as_ref().map_or("", |s| s.label()),
            name
        );
        Ok(())
    }

    fn fail_init(&mut self, index: usize) {
        if let Some(slot) = self.slots[index].take() {
            sg_error!(
                self.logger,
                Category::System,
                "Failed to initialize sensor {} ({})",
                index,
                slot.label()
            );
            self.release_sensor(slot.into_sensor());
        }
        self.last_error = Some(ManagerError::InitFailed);
    }

    fn release_sensor(&mut self, sensor: F::Sensor) {
        self.factory.release(sensor);
        for slot in self.slots.iter_mut().flatten() {
            self.factory.reclaim_shared(&mut slot.sensor);
        }
    }

    fn fail(&mut self, error: ManagerError) -> ManagerError {
        self.last_error = Some(error);
        error
    }

    /// Destroy the sensor in a slot (empty slots are fine)
    pub fn remove_sensor(&mut self, index: usize) -> Result<(), ManagerError> {
        if index >= MAX_SENSORS {
            return Err(self.fail(ManagerError::InvalidSlot));
        }
        if let Some(slot) = self.slots[index].take() {
            sg_info!(
                self.logger,
                Category::System,
                "Removing sensor {} ({})",
                index,
                slot.label()
            );
            self.release_sensor(slot.into_sensor());
        }
        Ok(())
    }

    pub fn set_sensor_enabled(&mut self, index: usize, enabled: bool) -> Result<(), ManagerError> {
        let slot = self.slot_entry(index)?;
        slot.enabled = enabled;
        let label = slot.label.clone();
        sg_info!(
            self.logger,
            Category::System,
            "Sensor {} ({}) {}",
            index,
            label.as_str(),
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    fn slot_entry(&mut self, index: usize) -> Result<&mut SensorSlot<F::Sensor>, ManagerError> {
        if index >= MAX_SENSORS {
            return Err(self.fail(ManagerError::InvalidSlot));
        }
        if self.slots[index].is_none() {
            return Err(self.fail(ManagerError::EmptySlot));
        }
        self.slots[index].as_mut().ok_or(ManagerError::EmptySlot)
    }

    pub fn slot(&self, index: usize) -> Option<&SensorSlot<F::Sensor>> {
        self.slots.get(index)?.as_ref()
    }

    pub fn sensor(&self, index: usize) -> Option<&F::Sensor> {
        self.slot(index).map(SensorSlot::sensor)
    }

    pub fn sensor_mut(&mut self, index: usize) -> Option<&mut F::Sensor> {
        self.slots.get_mut(index)?.as_mut().map(SensorSlot::sensor_mut)
    }

    /// Motion flag of one slot; empty or disabled slots read false
    pub fn slot_motion(&self, index: usize) -> bool {
        self.slot(index)
            .is_some_and(|s| s.enabled && s.sensor.motion_detected())
    }

    fn enabled(&self) -> impl Iterator<Item = &SensorSlot<F::Sensor>> + '_ {
        self.slots.iter().flatten().filter(|s| s.enabled)
    }

    /// Slot index of the deciding sensor
    ///
    /// The enabled primary sensor, or the first enabled sensor if none is
    /// marked primary.
    pub fn primary_index(&self) -> Option<usize> {
        let enabled = |i: &usize| self.slots[*i].as_ref().is_some_and(|s| s.enabled);
        (0..MAX_SENSORS)
            .filter(enabled)
            .find(|&i| self.slots[i].as_ref().is_some_and(|s| s.primary))
            .or_else(|| (0..MAX_SENSORS).find(enabled))
    }

    pub fn primary_sensor(&self) -> Option<&F::Sensor> {
        self.primary_index().and_then(|i| self.sensor(i))
    }

    pub fn fusion_mode(&self) -> FusionMode {
        self.fusion_mode
    }

    pub fn set_fusion_mode(&mut self, mode: FusionMode) {
        self.fusion_mode = mode;
        sg_info!(self.logger, Category::System, "Fusion mode {}", mode.name());
    }

    /// System-level motion decision under the current fusion mode
    pub fn is_motion_detected(&self) -> bool {
        match self.fusion_mode {
            FusionMode::Any => self.enabled().any(|s| s.sensor.motion_detected()),
            FusionMode::All => {
                self.active_sensor_count() > 0
                    && self.enabled().all(|s| s.sensor.motion_detected())
            }
            FusionMode::TriggerMeasure | FusionMode::Independent => self
                .primary_sensor()
                .is_some_and(|s| s.motion_detected()),
        }
    }

    pub fn status(&self) -> CombinedStatus {
        let mut status = CombinedStatus {
            nearest_distance_mm: self.nearest_distance().unwrap_or(0),
            primary_direction: self.primary_direction(),
            ..CombinedStatus::default()
        };

        for slot in self.enabled() {
            status.active_count += 1;
            if slot.sensor.motion_detected() {
                status.detecting_count += 1;
            }
            status.combined_event_count = status
                .combined_event_count
                .wrapping_add(slot.sensor.event_count());
        }
        status.any_motion = status.detecting_count > 0;
        status.all_motion = status.active_count > 0 && status.detecting_count == status.active_count;
        status
    }

    pub fn active_sensor_count(&self) -> u8 {
        self.enabled().count() as u8
    }

    /// Every enabled sensor is warmed up (false with no sensors)
    pub fn all_sensors_ready(&self) -> bool {
        self.active_sensor_count() > 0 && self.enabled().all(|s| s.sensor.is_ready())
    }

    /// Nearest valid distance across enabled distance-capable sensors
    pub fn nearest_distance(&self) -> Option<u32> {
        self.enabled()
            .filter_map(|s| s.sensor.distance_mm())
            .filter(|&d| d > 0)
            .min()
    }

    pub fn primary_direction(&self) -> MotionDirection {
        self.primary_sensor()
            .and_then(|s| s.direction())
            .unwrap_or(MotionDirection::Unknown)
    }

    pub fn reset_event_counts(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.sensor.reset_event_count();
        }
        sg_info!(self.logger, Category::System, "Event counts reset");
    }

    /// Check for conflicting primary flags and fusion requirements
    pub fn validate_configuration(&mut self) -> Result<(), ManagerError> {
        let primaries = self.slots.iter().flatten().filter(|s| s.primary).count();
        if primaries > 1 {
            return Err(self.fail(ManagerError::MultiplePrimary));
        }

        if self.fusion_mode == FusionMode::TriggerMeasure {
            if self.active_sensor_count() < 2 {
                return Err(self.fail(ManagerError::TriggerMeasureNeedsTwoSensors));
            }
            if !self.enabled().any(|s| s.primary) {
                return Err(self.fail(ManagerError::TriggerMeasureNeedsPrimary));
            }
        }
        Ok(())
    }

    pub fn last_error(&self) -> Option<ManagerError> {
        self.last_error
    }

    pub fn last_error_message(&self) -> &'static str {
        self.last_error.map_or("", ManagerError::message)
    }

    /// Wake pins for deep sleep, from every enabled wake-capable sensor
    pub fn wake_sources(&self) -> Vec<WakeSource, MAX_SENSORS> {
        let mut sources = Vec::new();
        for source in self
            .enabled()
            .filter(|s| s.sensor.supports_deep_sleep_wake())
            .filter_map(|s| s.sensor.wake_source())
        {
            // Capacity equals slot count
            let _ = sources.push(source);
        }
        sources
    }

    /// Power-cycle recalibrate a sensor and every sensor on its power rail
    ///
    /// Sensors sharing the rail are restarted logically so their warm-up
    /// matches the physical power cycle.
    pub fn recalibrate_pir(&mut self, index: usize, now_ms: u32) -> Result<(), ManagerError> {
        let slot = self.slot_entry(index)?;
        let power_pin = slot.config.power_pin;
        if let Err(e) = slot.sensor.recalibrate(now_ms) {
            return Err(self.fail(ManagerError::Sensor(e)));
        }

        let Some(pin) = power_pin else {
            return Ok(());
        };
        for (i, other) in self.slots.iter_mut().enumerate() {
            let Some(other) = other else { continue };
            if i != index && other.config.power_pin == Some(pin) && !other.sensor.is_recalibrating()
            {
                if let Err(e) = other.sensor.recalibrate(now_ms) {
                    sg_warn!(
                        self.logger,
                        Category::Sensor,
                        "Sensor {} on shared rail {} not recalibrated: {}",
                        i,
                        pin,
                        e.message()
                    );
                }
            }
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Dump per-slot status through the logger
    pub fn log_status(&self, now_ms: u32) {
        let status = self.status();
        sg_info!(
            self.logger,
            Category::System,
            "Sensors {}/{} active, fusion {}, motion {}, detecting {}",
            status.active_count,
            MAX_SENSORS,
            self.fusion_mode.name(),
            self.is_motion_detected(),
            status.detecting_count
        );

        for (i, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let s = slot.sensor.status();
            sg_info!(
                self.logger,
                Category::System,
                "[{}] {} {}{}{} ready={} motion={} events={} dist={:?} dir={:?} warmup={:?}",
                i,
                slot.label(),
                slot.sensor.capabilities().name,
                if slot.primary { " primary" } else { "" },
                if slot.enabled { "" } else { " disabled" },
                s.ready,
                s.motion,
                s.event_count,
                s.distance_mm,
                s.direction,
                slot.sensor.warmup_remaining_ms(now_ms)
            );
        }

        if let Some(e) = self.last_error {
            sg_warn!(self.logger, Category::System, "Last error: {}", e.message());
        }
    }
}

/// Copy a user label, falling back to "Sensor N"
fn make_label(label: &str, index: usize) -> String<MAX_LABEL_LEN> {
    let mut out = String::new();
    if label.is_empty() {
        let _ = write!(out, "Sensor {}", index);
        return out;
    }
    for c in label.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

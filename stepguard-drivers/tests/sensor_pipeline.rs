//! Factory -> manager -> direction detector, driven through simulated pins

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use stepguard_core::config::{FusionMode, SensorConfig, SensorType};
use stepguard_core::direction::{DirectionDetector, DirectionState};
use stepguard_core::log::NOOP_LOGGER;
use stepguard_core::manager::{ManagerError, SensorManager};
use stepguard_core::traits::{FactoryError, MotionDirection, MotionSensor, SensorFactory};
use stepguard_drivers::sensor::pir::RECAL_POWER_OFF_MS;
use stepguard_drivers::{BoardSensorFactory, PinBank};
use stepguard_hal::{FlexPin, InputPin, OutputPin, PinMode, PulseInput};

const PINS: usize = 16;
const WARMUP_MS: u32 = 100;

type Line = Rc<Cell<bool>>;

/// Simulated board: every pin is a shared level, echoes come from one cell
#[derive(Default)]
struct SimBoard {
    lines: [Line; PINS],
    echo_us: Rc<Cell<Option<u32>>>,
    taken: [bool; PINS],
}

impl SimBoard {
    fn set(&self, pin: u8, high: bool) {
        self.lines[pin as usize].set(high);
    }

    fn get(&self, pin: u8) -> bool {
        self.lines[pin as usize].get()
    }

    fn take(&mut self, pin: u8) -> Option<Line> {
        let slot = self.taken.get_mut(pin as usize)?;
        if *slot {
            return None;
        }
        *slot = true;
        Some(self.lines[pin as usize].clone())
    }
}

struct SimPin(Line);

impl InputPin for SimPin {
    fn is_high(&self) -> bool {
        self.0.get()
    }
}

impl OutputPin for SimPin {
    fn set_high(&mut self) {
        self.0.set(true);
    }

    fn set_low(&mut self) {
        self.0.set(false);
    }

    fn is_set_high(&self) -> bool {
        self.0.get()
    }
}

struct SimEcho(Rc<Cell<Option<u32>>>);

impl PulseInput for SimEcho {
    fn pulse_high_us(&mut self, _timeout_us: u32) -> Option<u32> {
        self.0.get()
    }
}

struct SimFlex {
    line: Line,
    echo: Rc<Cell<Option<u32>>>,
    mode: PinMode,
}

impl OutputPin for SimFlex {
    fn set_high(&mut self) {
        self.line.set(true);
    }

    fn set_low(&mut self) {
        self.line.set(false);
    }

    fn is_set_high(&self) -> bool {
        self.line.get()
    }
}

impl PulseInput for SimFlex {
    fn pulse_high_us(&mut self, _timeout_us: u32) -> Option<u32> {
        self.echo.get()
    }
}

impl FlexPin for SimFlex {
    fn set_mode(&mut self, mode: PinMode) {
        self.mode = mode;
    }

    fn mode(&self) -> PinMode {
        self.mode
    }
}

struct SimDelay;

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Bank handle sharing line state with the test
struct SimBank(Rc<RefCell<SimBoard>>);

impl PinBank for SimBank {
    type Input = SimPin;
    type Output = SimPin;
    type Echo = SimEcho;
    type Flex = SimFlex;
    type Delay = SimDelay;

    fn take_input(&mut self, pin: u8) -> Option<SimPin> {
        self.0.borrow_mut().take(pin).map(SimPin)
    }

    fn take_output(&mut self, pin: u8) -> Option<SimPin> {
        self.0.borrow_mut().take(pin).map(SimPin)
    }

    fn take_echo(&mut self, pin: u8) -> Option<SimEcho> {
        let mut board = self.0.borrow_mut();
        board.take(pin)?;
        Some(SimEcho(board.echo_us.clone()))
    }

    fn take_flex(&mut self, pin: u8) -> Option<SimFlex> {
        let mut board = self.0.borrow_mut();
        let line = board.take(pin)?;
        Some(SimFlex {
            line,
            echo: board.echo_us.clone(),
            mode: PinMode::Input,
        })
    }

    fn delay(&mut self) -> SimDelay {
        SimDelay
    }

    fn release(&mut self, pin: u8) {
        if let Some(taken) = self.0.borrow_mut().taken.get_mut(pin as usize) {
            *taken = false;
        }
    }
}

fn rig() -> (
    Rc<RefCell<SimBoard>>,
    SensorManager<BoardSensorFactory<SimBank>>,
) {
    let board = Rc::new(RefCell::new(SimBoard::default()));
    let factory = BoardSensorFactory::new(SimBank(board.clone()), &NOOP_LOGGER);
    (board, SensorManager::new(factory, &NOOP_LOGGER))
}

fn fast_pir(pin: u8, power: Option<u8>) -> SensorConfig {
    let mut config = match power {
        Some(p) => SensorConfig::pir_with_power(pin, p),
        None => SensorConfig::pir(pin),
    };
    config.warmup_ms = WARMUP_MS;
    config
}

#[test]
fn test_capabilities_follow_created_type() {
    let (_board, mut manager) = rig();
    manager.add_sensor(0, &fast_pir(1, None), "pir", false, 0).unwrap();
    manager
        .add_sensor(1, &SensorConfig::ultrasonic(2, 3), "hcsr04", false, 0)
        .unwrap();
    manager.add_sensor(2, &SensorConfig::grove(4), "grove", false, 0).unwrap();

    let pir = manager.sensor(0).unwrap();
    assert_eq!(pir.sensor_type(), SensorType::Pir);
    assert!(!pir.supports_distance());
    assert!(pir.requires_warmup());

    let sr04 = manager.sensor(1).unwrap();
    assert!(sr04.supports_distance());
    assert!(sr04.supports_direction());
    assert_eq!(sr04.capabilities().max_distance_mm, 4000);

    let grove = manager.sensor(2).unwrap();
    assert_eq!(grove.sensor_type(), SensorType::UltrasonicGrove);
    assert_eq!(grove.detection_threshold_mm(), Some(1200));
}

#[test]
fn test_unsupported_and_missing_pins() {
    let (_board, mut manager) = rig();
    assert!(!manager.factory().is_supported(SensorType::Ir));
    assert_eq!(
        manager.add_sensor(0, &SensorConfig::default_for(SensorType::Ir), "", false, 0),
        Err(ManagerError::CreateFailed(FactoryError::UnsupportedType(
            SensorType::Ir
        )))
    );

    let mut no_echo = SensorConfig::ultrasonic(2, 3);
    no_echo.secondary_pin = None;
    assert_eq!(
        manager.add_sensor(0, &no_echo, "", false, 0),
        Err(ManagerError::CreateFailed(FactoryError::MissingPin))
    );
    assert!(manager.slot(0).is_none());
}

#[test]
fn test_pin_conflict_and_release() {
    let (_board, mut manager) = rig();
    manager.add_sensor(0, &fast_pir(5, None), "", false, 0).unwrap();
    assert_eq!(
        manager.add_sensor(1, &fast_pir(5, None), "", false, 0),
        Err(ManagerError::CreateFailed(FactoryError::PinUnavailable(5)))
    );

    manager.remove_sensor(0).unwrap();
    manager.add_sensor(1, &fast_pir(5, None), "", false, 0).unwrap();

    // Failed echo claim hands the trigger pin back
    manager.add_sensor(2, &fast_pir(7, None), "", false, 0).unwrap();
    assert_eq!(
        manager.add_sensor(3, &SensorConfig::ultrasonic(6, 7), "", false, 0),
        Err(ManagerError::CreateFailed(FactoryError::PinUnavailable(7)))
    );
    manager
        .add_sensor(3, &SensorConfig::ultrasonic(6, 8), "", false, 0)
        .unwrap();
}

#[test]
fn test_dual_pir_approach_through_manager() {
    let (board, mut manager) = rig();
    // Slot 0 near, slot 1 far
    manager.add_sensor(0, &fast_pir(1, None), "near", true, 0).unwrap();
    manager.add_sensor(1, &fast_pir(2, None), "far", false, 0).unwrap();
    manager.set_fusion_mode(FusionMode::TriggerMeasure);
    manager.validate_configuration().unwrap();
    assert!(manager.begin(0));

    let mut detector = DirectionDetector::default();
    detector.begin(false, false);

    for now in (0..=WARMUP_MS).step_by(50) {
        manager.update(now);
    }
    assert!(manager.all_sensors_ready());

    board.borrow().set(2, true);
    manager.update(1000);
    detector.update_from(&manager, 1000);
    assert_eq!(detector.state(), DirectionState::FarOnly);
    // Primary (near) is quiet
    assert!(!manager.is_motion_detected());

    board.borrow().set(1, true);
    manager.update(1800);
    detector.update_from(&manager, 1800);
    assert!(detector.is_approaching());
    assert_eq!(detector.direction(), MotionDirection::Approaching);
    assert_eq!(detector.approaching_count(), 1);
    assert!(manager.is_motion_detected());

    let status = manager.status();
    assert_eq!(status.detecting_count, 2);
    assert_eq!(status.combined_event_count, 2);
    assert_eq!(status.nearest_distance_mm, 0);
}

#[test]
fn test_shared_rail_recalibration() {
    let (board, mut manager) = rig();
    manager
        .add_sensor(0, &fast_pir(1, Some(10)), "near", false, 0)
        .unwrap();
    manager
        .add_sensor(1, &fast_pir(2, Some(10)), "far", false, 0)
        .unwrap();
    manager.begin(0);
    assert!(board.borrow().get(10));

    let wake = manager.wake_sources();
    assert_eq!(wake.len(), 2);
    assert!(wake.iter().all(|w| w.power_pin == Some(10)));

    manager.update(WARMUP_MS);
    assert!(manager.all_sensors_ready());

    manager.recalibrate_pir(1, 500).unwrap();
    assert!(!board.borrow().get(10));
    assert!(manager.sensor(0).unwrap().is_recalibrating());
    assert!(manager.sensor(1).unwrap().is_recalibrating());

    // Second request mid-cycle leaves the timer alone
    manager.recalibrate_pir(0, 2000).unwrap();

    manager.update(500 + RECAL_POWER_OFF_MS);
    assert!(board.borrow().get(10));
    assert!(!manager.sensor(0).unwrap().is_recalibrating());
    assert!(!manager.sensor(1).unwrap().is_recalibrating());
    assert!(!manager.all_sensors_ready());

    manager.update(500 + RECAL_POWER_OFF_MS + WARMUP_MS);
    assert!(manager.all_sensors_ready());
}

#[test]
fn test_rail_passes_to_follower_when_owner_removed() {
    let (board, mut manager) = rig();
    manager
        .add_sensor(0, &fast_pir(1, Some(10)), "owner", false, 0)
        .unwrap();
    manager
        .add_sensor(1, &fast_pir(2, Some(10)), "follower", false, 0)
        .unwrap();
    manager.begin(0);
    manager.update(WARMUP_MS);

    manager.remove_sensor(0).unwrap();
    let follower = manager.sensor(1).unwrap().as_pir().unwrap();
    assert!(follower.owns_power_pin());

    manager.recalibrate_pir(1, 500).unwrap();
    assert!(manager.sensor(1).unwrap().is_recalibrating());
    assert!(!board.borrow().get(10));

    manager.update(500 + RECAL_POWER_OFF_MS);
    assert!(board.borrow().get(10));

    // Rail still held: a new PIR on it follows rather than claiming it
    manager
        .add_sensor(0, &fast_pir(3, Some(10)), "late", false, 0)
        .unwrap();
    assert!(!manager.sensor(0).unwrap().as_pir().unwrap().owns_power_pin());
}

#[test]
fn test_ultrasonic_nearest_distance() {
    let (board, mut manager) = rig();
    manager
        .add_sensor(0, &SensorConfig::ultrasonic(2, 3), "", true, 0)
        .unwrap();
    manager.add_sensor(1, &fast_pir(1, None), "", false, 0).unwrap();
    manager.begin(0);

    // 1 m echo
    board.borrow().echo_us.set(Some(5831));
    for i in 0..8 {
        manager.update(i * 75);
    }
    assert_eq!(manager.nearest_distance(), Some(1000));
    assert_eq!(manager.primary_direction(), MotionDirection::Stationary);
}

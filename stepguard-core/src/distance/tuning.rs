//! Distance engine tuning
//!
//! The movement thresholds were tuned by hand against walking pedestrians.
//! They are collected here so boards can override them through [`Tuning`]
//! without touching the algorithm.

/// Smallest rolling window
pub const MIN_WINDOW_SIZE: u8 = 3;
/// Largest rolling window
pub const MAX_WINDOW_SIZE: u8 = 20;

/// Direction sensitivity bounds (mm) when set explicitly
pub const MIN_SENSITIVITY_MM: u32 = 5;
pub const MAX_SENSITIVITY_MM: u32 = 1000;

/// Sample interval bounds (ms); below 60 ms echoes from the previous ping
/// are still in flight
pub const MIN_SAMPLE_INTERVAL_MS: u32 = 60;
pub const MAX_SAMPLE_INTERVAL_MS: u32 = 1000;

/// Raw reading must undercut the median by more than this to force a wipe
pub const WIPE_DELTA_MM: u32 = 200;
/// Net change that counts as movement when the window is tight
pub const MOVEMENT_NET_MM: u32 = 200;
/// Window spread below which [`MOVEMENT_NET_MM`] applies
pub const MOVEMENT_SPREAD_MAX_MM: u32 = 100;
/// Net change that counts as movement regardless of spread
pub const MOVEMENT_UNCONDITIONAL_MM: u32 = 300;
/// Time a candidate direction must persist before it is confirmed
pub const DIRECTION_STABILITY_MS: u32 = 225;
/// Ordinary samples ignored for direction after a wipe
pub const WIPE_SKIP_CYCLES: u8 = 2;
/// Extra in-zone cycles a sudden appearance must survive
pub const SUDDEN_CONFIRM_CYCLES: u8 = 2;

/// Length of the delta history used for net movement
pub const DELTA_HISTORY_LEN: usize = 5;
/// Length of the raw diagnostic history
pub const RAW_HISTORY_LEN: usize = 5;
/// Length of the pre-filter appearance buffer
pub const APPEARANCE_LEN: usize = 3;

/// Runtime-adjustable movement thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tuning {
    pub wipe_delta_mm: u32,
    pub movement_net_mm: u32,
    pub movement_spread_max_mm: u32,
    pub movement_unconditional_mm: u32,
    pub direction_stability_ms: u32,
    pub wipe_skip_cycles: u8,
    pub sudden_confirm_cycles: u8,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            wipe_delta_mm: WIPE_DELTA_MM,
            movement_net_mm: MOVEMENT_NET_MM,
            movement_spread_max_mm: MOVEMENT_SPREAD_MAX_MM,
            movement_unconditional_mm: MOVEMENT_UNCONDITIONAL_MM,
            direction_stability_ms: DIRECTION_STABILITY_MS,
            wipe_skip_cycles: WIPE_SKIP_CYCLES,
            sudden_confirm_cycles: SUDDEN_CONFIRM_CYCLES,
        }
    }
}

impl Tuning {
    /// Whether a net change over the delta history counts as movement
    pub fn is_significant(&self, net_mm: u32, spread_mm: u32) -> bool {
        (net_mm >= self.movement_net_mm && spread_mm < self.movement_spread_max_mm)
            || net_mm >= self.movement_unconditional_mm
    }
}

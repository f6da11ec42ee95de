//! Direction detector states

/// Trigger-ordering states of a near/far PIR pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DirectionState {
    /// Neither sensor has an open pattern
    #[default]
    Idle,
    /// Far sensor fired first; waiting for near
    FarOnly,
    /// Near sensor fired with no far trigger (local object, hand wave)
    NearOnly,
    /// Both active without a confirmed approach
    BothActive,
    /// Far then near within the confirmation window
    Approaching,
}

impl DirectionState {
    pub const fn name(self) -> &'static str {
        match self {
            DirectionState::Idle => "IDLE",
            DirectionState::FarOnly => "FAR_ONLY",
            DirectionState::NearOnly => "NEAR_ONLY",
            DirectionState::BothActive => "BOTH_ACTIVE",
            DirectionState::Approaching => "APPROACHING",
        }
    }

    /// Level-driven transition applied after edge handling
    ///
    /// Edges (rising triggers) are handled by the detector itself because
    /// they depend on trigger timing; this covers the transitions that only
    /// depend on which sensors are currently active.
    pub fn settle(self, far_active: bool, near_active: bool) -> Self {
        match self {
            DirectionState::FarOnly if far_active && near_active => DirectionState::BothActive,
            DirectionState::FarOnly if !far_active => DirectionState::Idle,
            DirectionState::NearOnly if far_active && near_active => DirectionState::BothActive,
            DirectionState::NearOnly if !near_active => DirectionState::Idle,
            DirectionState::BothActive | DirectionState::Approaching
                if !far_active && !near_active =>
            {
                DirectionState::Idle
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_table() {
        use DirectionState::*;

        assert_eq!(FarOnly.settle(true, true), BothActive);
        assert_eq!(FarOnly.settle(false, false), Idle);
        assert_eq!(FarOnly.settle(true, false), FarOnly);
        assert_eq!(NearOnly.settle(true, true), BothActive);
        assert_eq!(NearOnly.settle(true, false), Idle);
        assert_eq!(BothActive.settle(false, true), BothActive);
        assert_eq!(BothActive.settle(false, false), Idle);
        assert_eq!(Approaching.settle(true, true), Approaching);
        assert_eq!(Approaching.settle(false, false), Idle);
        assert_eq!(Idle.settle(true, true), Idle);
    }
}

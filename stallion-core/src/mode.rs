//! Driver operating modes
//!
//! Selecting a mode and deciding which register values it needs is pure
//! logic; applying the resulting [`ModePlan`] to a chip is left to the
//! driver implementation.
//!
//! ```text
//!            homing && strategy == Stallguard
//!   ┌──────────────┐ ───────────────────────▶ ┌──────────────────┐
//!   │ RunMode      │                          │ StallguardHoming │
//!   │ (Stealth or  │ ◀─────────────────────── │                  │
//!   │  CoolStep)   │       homing ended       └──────────────────┘
//!   └──────────────┘
//! ```

use crate::config::{HomingStrategy, RunMode};
use crate::tstep::{StepTiming, ThresholdError, TSTEP_MAX};

/// TCOOLTHRS outside of homing: CoolStep and StallGuard stay enabled at
/// every velocity
pub const NORMAL_TCOOLTHRS: u32 = TSTEP_MAX;

/// THIGH outside of homing: no high-velocity switchover
pub const NORMAL_THIGH: u32 = 0;

/// Off time used in StealthChop
pub const STEALTHCHOP_TOFF: u8 = 5;

/// TCOOLTHRS offset for the homing window, percent of the homing step time
pub const HOMING_TCOOLTHRS_PERCENT: f32 = 150.0;

/// THIGH offset for the homing window, percent of the homing step time
pub const HOMING_THIGH_PERCENT: f32 = 60.0;

/// Active operating mode of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverMode {
    /// Silent PWM stepping with automatic amplitude scaling
    StealthChop,
    /// SpreadCycle chopper with CoolStep current control
    CoolStep,
    /// CoolStep chopper with a StallGuard window around the homing speed
    StallguardHoming,
}

impl From<RunMode> for DriverMode {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::StealthChop => DriverMode::StealthChop,
            RunMode::CoolStep => DriverMode::CoolStep,
        }
    }
}

/// Decide which mode a driver should be in
pub fn select_mode(homing: bool, strategy: HomingStrategy, run_mode: RunMode) -> DriverMode {
    if homing && strategy == HomingStrategy::Stallguard {
        DriverMode::StallguardHoming
    } else {
        run_mode.into()
    }
}

/// SpreadCycle chopper and DIAG1 configuration shared by CoolStep and
/// StallGuard homing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChopperConfig {
    /// Comparator blank time select (0-3)
    pub blank_time: u8,
    /// Off time (1-15)
    pub off_time: u8,
    /// Hysteresis start (1-8)
    pub hysteresis_start: u8,
    /// Hysteresis end (-3..=12)
    pub hysteresis_end: i8,
    /// Filter StallGuard over four full steps
    pub stall_filter: bool,
    /// DIAG1 push-pull (false = open drain, active low)
    pub diag1_pushpull: bool,
    /// Signal stall on DIAG1
    pub diag1_stall: bool,
}

impl Default for ChopperConfig {
    fn default() -> Self {
        Self {
            blank_time: 1,
            off_time: 3,
            hysteresis_start: 4,
            hysteresis_end: -2,
            stall_filter: true,
            diag1_pushpull: false,
            diag1_stall: true,
        }
    }
}

/// Register values a mode needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModePlan {
    /// StealthChop entry
    StealthChop {
        /// Off time
        off_time: u8,
        /// PWM amplitude autoscaling
        pwm_autoscale: bool,
    },
    /// CoolStep / StallGuard entry
    SpreadCycle {
        /// Chopper and DIAG1 settings
        chopper: ChopperConfig,
        /// TCOOLTHRS: CoolStep and StallGuard active below this velocity
        coolstep_threshold: u32,
        /// THIGH: high-velocity mode above this velocity
        high_threshold: u32,
    },
}

impl ModePlan {
    /// Build the register plan for `mode`
    ///
    /// `homing_rate` (units/min) and `timing` are only used for
    /// [`DriverMode::StallguardHoming`].
    pub fn for_mode(
        mode: DriverMode,
        homing_rate: f32,
        timing: &StepTiming,
    ) -> Result<Self, ThresholdError> {
        let plan = match mode {
            DriverMode::StealthChop => ModePlan::StealthChop {
                off_time: STEALTHCHOP_TOFF,
                pwm_autoscale: true,
            },
            DriverMode::CoolStep => ModePlan::coolstep(),
            DriverMode::StallguardHoming => ModePlan::SpreadCycle {
                chopper: ChopperConfig::default(),
                coolstep_threshold: timing.threshold(homing_rate, HOMING_TCOOLTHRS_PERCENT)?,
                high_threshold: timing.threshold(homing_rate, HOMING_THIGH_PERCENT)?,
            },
        };
        Ok(plan)
    }

    /// CoolStep plan with the static thresholds
    pub fn coolstep() -> Self {
        ModePlan::SpreadCycle {
            chopper: ChopperConfig::default(),
            coolstep_threshold: NORMAL_TCOOLTHRS,
            high_threshold: NORMAL_THIGH,
        }
    }

    /// Check if this plan enables StealthChop
    pub fn pwm_mode(&self) -> bool {
        matches!(self, ModePlan::StealthChop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> StepTiming {
        StepTiming {
            steps_per_unit: 80.0,
            microsteps: 16,
            clock_hz: 12_000_000.0,
        }
    }

    #[test]
    fn test_select_default_mode() {
        assert_eq!(
            select_mode(false, HomingStrategy::Stallguard, RunMode::StealthChop),
            DriverMode::StealthChop
        );
        assert_eq!(
            select_mode(false, HomingStrategy::Switches, RunMode::CoolStep),
            DriverMode::CoolStep
        );
    }

    #[test]
    fn test_select_stallguard_only_when_homing() {
        assert_eq!(
            select_mode(true, HomingStrategy::Stallguard, RunMode::StealthChop),
            DriverMode::StallguardHoming
        );
        // Switch homing keeps the run mode
        assert_eq!(
            select_mode(true, HomingStrategy::Switches, RunMode::StealthChop),
            DriverMode::StealthChop
        );
    }

    #[test]
    fn test_homing_round_trip_restores_default() {
        for run_mode in [RunMode::StealthChop, RunMode::CoolStep] {
            let before = select_mode(false, HomingStrategy::Stallguard, run_mode);
            let homing = select_mode(true, HomingStrategy::Stallguard, run_mode);
            let after = select_mode(false, HomingStrategy::Stallguard, run_mode);
            assert_eq!(homing, DriverMode::StallguardHoming);
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_stealthchop_plan() {
        let plan = ModePlan::for_mode(DriverMode::StealthChop, 600.0, &timing()).unwrap();
        assert_eq!(
            plan,
            ModePlan::StealthChop {
                off_time: 5,
                pwm_autoscale: true
            }
        );
        assert!(plan.pwm_mode());
    }

    #[test]
    fn test_coolstep_plan_uses_static_thresholds() {
        let plan = ModePlan::for_mode(DriverMode::CoolStep, 600.0, &timing()).unwrap();
        assert_eq!(plan, ModePlan::coolstep());
        assert!(!plan.pwm_mode());

        if let ModePlan::SpreadCycle {
            chopper,
            coolstep_threshold,
            high_threshold,
        } = plan
        {
            assert_eq!(chopper.blank_time, 1);
            assert_eq!(chopper.off_time, 3);
            assert_eq!(chopper.hysteresis_start, 4);
            assert_eq!(chopper.hysteresis_end, -2);
            assert!(chopper.stall_filter);
            assert!(!chopper.diag1_pushpull);
            assert!(chopper.diag1_stall);
            assert_eq!(coolstep_threshold, 0xFFFFF);
            assert_eq!(high_threshold, 0);
        }
    }

    #[test]
    fn test_homing_plan_computes_window() {
        let plan = ModePlan::for_mode(DriverMode::StallguardHoming, 600.0, &timing()).unwrap();
        assert_eq!(
            plan,
            ModePlan::SpreadCycle {
                chopper: ChopperConfig::default(),
                coolstep_threshold: 1406,
                high_threshold: 562,
            }
        );
    }

    #[test]
    fn test_homing_plan_rejects_zero_rate() {
        assert_eq!(
            ModePlan::for_mode(DriverMode::StallguardHoming, 0.0, &timing()),
            Err(ThresholdError::InvalidSpeed)
        );
        // Other modes ignore the homing rate
        assert!(ModePlan::for_mode(DriverMode::CoolStep, 0.0, &timing()).is_ok());
    }
}

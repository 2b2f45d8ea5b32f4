//! Per-driver options fixed at construction

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nominal internal clock of the TMC2130/TMC5160 (Hz)
pub const DEFAULT_CLOCK_HZ: f32 = 12_000_000.0;

/// Default operating mode outside of StallGuard homing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RunMode {
    /// Silent voltage-chopper operation
    #[default]
    StealthChop,
    /// SpreadCycle chopper with load-adaptive current
    CoolStep,
}

/// How the machine finds home
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HomingStrategy {
    /// Physical limit switches
    #[default]
    Switches,
    /// Sensorless homing on the DIAG1 stall output
    Stallguard,
}

/// Driver options
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriverOptions {
    /// Mode used whenever StallGuard homing is not active
    pub run_mode: RunMode,
    /// Homing strategy
    pub homing: HomingStrategy,
    /// Also cut motor current over SPI (TOFF = 0) when disabled
    pub electrical_disable: bool,
    /// Disable pin is active-low
    pub disable_inverted: bool,
    /// Chip clock used for TSTEP conversions (Hz)
    pub clock_hz: f32,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            run_mode: RunMode::StealthChop,
            homing: HomingStrategy::Switches,
            electrical_disable: false,
            disable_inverted: false,
            clock_hz: DEFAULT_CLOCK_HZ,
        }
    }
}

//! Axis identity and per-axis driver settings

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of logical axes
pub const MAX_AXES: u8 = 6;

/// Axis letters, indexed by axis number
pub const AXIS_LETTERS: [char; MAX_AXES as usize] = ['X', 'Y', 'Z', 'A', 'B', 'C'];

/// Axis display name ("X", "Z2", ...)
pub type AxisName = String<4>;

/// Which motor of a (possibly ganged) axis a driver belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AxisGroup {
    /// First motor of the axis
    Primary,
    /// Second motor driven in lockstep with the primary
    Ganged,
}

/// Identity of the axis a driver chip is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisId {
    index: u8,
    group: AxisGroup,
}

impl AxisId {
    /// Build an axis identity from a raw motor index
    ///
    /// Indices `0..MAX_AXES` are primary motors, indices from `MAX_AXES`
    /// upwards are the ganged motors of the same axes. The axis index wraps
    /// modulo [`MAX_AXES`].
    pub const fn new(raw_index: u8) -> Self {
        Self {
            index: raw_index % MAX_AXES,
            group: if raw_index < MAX_AXES {
                AxisGroup::Primary
            } else {
                AxisGroup::Ganged
            },
        }
    }

    /// Axis index (0..MAX_AXES)
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    /// Ganged group
    pub const fn group(&self) -> AxisGroup {
        self.group
    }

    /// Axis letter
    pub fn letter(&self) -> char {
        AXIS_LETTERS[self.index()]
    }

    /// Display name, with a `2` suffix for the ganged motor
    pub fn name(&self) -> AxisName {
        let mut name = AxisName::new();
        // Capacity covers a letter plus suffix
        let _ = name.push(self.letter());
        if self.group == AxisGroup::Ganged {
            let _ = name.push('2');
        }
        name
    }
}

/// Driver-related settings for one axis
///
/// Units follow the settings store: amps for run current, percent of run
/// current for hold current.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisSettings {
    /// Microstep resolution (1, 2, 4, ... 256)
    pub microsteps: u16,
    /// Run current in amps RMS
    pub run_current: f32,
    /// Hold current as a percentage of run current
    pub hold_current: f32,
    /// StallGuard threshold (-64..=63, lower = more sensitive)
    pub stallguard: i8,
    /// Steps per unit of travel (steps/mm for linear axes)
    pub steps_per_unit: f32,
}

impl Default for AxisSettings {
    fn default() -> Self {
        Self {
            microsteps: 16,
            run_current: 0.25,
            hold_current: 25.0,
            stallguard: 16,
            steps_per_unit: 100.0,
        }
    }
}

impl AxisSettings {
    /// Run current in milliamps
    pub fn run_current_ma(&self) -> u16 {
        // Float to int casts saturate, negative settings become 0
        (self.run_current * 1000.0) as u16
    }

    /// Hold current as a fraction of run current (0.0-1.0)
    pub fn hold_multiplier(&self) -> f32 {
        self.hold_current / 100.0
    }
}

/// Check whether a microstep count is one the chips can resolve
pub const fn is_supported_microsteps(microsteps: u16) -> bool {
    microsteps != 0 && microsteps <= 256 && microsteps.is_power_of_two()
}

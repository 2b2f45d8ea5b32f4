//! Step-time threshold math
//!
//! Trinamic drivers gate CoolStep and StallGuard by the TSTEP register, the
//! number of chip clock cycles between two 1/256 microsteps. Thresholds are
//! therefore written in clock cycles rather than as a velocity.
//!
//! ```text
//! f_step = speed / 60 * steps_per_unit * (256 / microsteps)   [1/256 steps per s]
//! tstep  = f_clk / f_step * percent / 100
//! ```
//!
//! Larger TSTEP values mean slower motion, so a window that must contain a
//! homing speed uses an offset above 100% for the lower velocity bound
//! (TCOOLTHRS) and below 100% for the upper bound (THIGH).

/// Largest value the 20-bit TSTEP-based registers can hold
pub const TSTEP_MAX: u32 = 0xF_FFFF;

/// Rejected threshold inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ThresholdError {
    /// Speed is zero, negative or not finite
    InvalidSpeed,
    /// Percentage offset is negative or not finite
    InvalidPercent,
    /// Steps per unit is zero, negative or not finite
    InvalidStepsPerUnit,
    /// Microsteps outside 1..=256
    InvalidMicrosteps,
    /// Clock frequency is zero, negative or not finite
    InvalidClock,
}

/// Axis parameters needed to convert a speed to step time
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepTiming {
    /// Steps per unit of travel
    pub steps_per_unit: f32,
    /// Microstep resolution
    pub microsteps: u16,
    /// Chip clock in Hz
    pub clock_hz: f32,
}

impl StepTiming {
    /// Rate of 1/256 microsteps per second at `speed` units/min
    pub fn step_frequency(&self, speed: f32) -> Result<f32, ThresholdError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ThresholdError::InvalidSpeed);
        }
        if !(self.steps_per_unit.is_finite() && self.steps_per_unit > 0.0) {
            return Err(ThresholdError::InvalidStepsPerUnit);
        }
        if self.microsteps == 0 || self.microsteps > 256 {
            return Err(ThresholdError::InvalidMicrosteps);
        }

        // Integer ratio: for the power-of-two resolutions the chip supports
        // this is exact
        let interpolation = (256 / self.microsteps) as f32;
        Ok(speed / 60.0 * self.steps_per_unit * interpolation)
    }

    /// TSTEP value for `speed` units/min, scaled by `percent`
    ///
    /// The result is truncated and saturates at [`TSTEP_MAX`].
    pub fn threshold(&self, speed: f32, percent: f32) -> Result<u32, ThresholdError> {
        if !(percent.is_finite() && percent >= 0.0) {
            return Err(ThresholdError::InvalidPercent);
        }
        if !(self.clock_hz.is_finite() && self.clock_hz > 0.0) {
            return Err(ThresholdError::InvalidClock);
        }

        let f_step = self.step_frequency(speed)?;
        let tstep = self.clock_hz / f_step * percent / 100.0;

        Ok((tstep as u32).min(TSTEP_MAX))
    }
}

/// Convert a speed in units/min to a TSTEP threshold
///
/// Convenience wrapper around [`StepTiming::threshold`].
pub fn step_time_threshold(
    speed: f32,
    percent: f32,
    steps_per_unit: f32,
    microsteps: u16,
    clock_hz: f32,
) -> Result<u32, ThresholdError> {
    StepTiming {
        steps_per_unit,
        microsteps,
        clock_hz,
    }
    .threshold(speed, percent)
}

//! Trinamic register interface
//!
//! Field-level access to a Trinamic driver chip. Implementations keep the
//! shadow registers and perform the bus transfers (see `stallion-drivers`).

use crate::mode::ModePlan;

/// Result of a chip connectivity probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionStatus {
    /// Chip answered with plausible data
    Ok,
    /// Bus reads all ones: chip not connected
    NoConnection,
    /// Bus reads all zeros: chip logic unpowered
    NoPower,
}

impl ConnectionStatus {
    /// Map a probe code (1 = no connection, 2 = no power, other = ok)
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => ConnectionStatus::NoConnection,
            2 => ConnectionStatus::NoPower,
            _ => ConnectionStatus::Ok,
        }
    }

    /// Probe code for this status
    pub fn code(&self) -> u8 {
        match self {
            ConnectionStatus::Ok => 0,
            ConnectionStatus::NoConnection => 1,
            ConnectionStatus::NoPower => 2,
        }
    }

    /// Check if the probe passed
    pub fn is_ok(&self) -> bool {
        matches!(self, ConnectionStatus::Ok)
    }
}

/// Trait for Trinamic driver chips
///
/// Setters update a single register field and write the containing
/// register to the chip.
pub trait TrinamicRegisters {
    /// Error type for register access
    type Error;

    /// Push the power-on configuration to the chip
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Set microstep resolution (1-256)
    fn set_microsteps(&mut self, microsteps: u16) -> Result<(), Self::Error>;

    /// Set run current in mA RMS and hold current as a fraction of it
    fn set_rms_current(&mut self, run_ma: u16, hold_multiplier: f32) -> Result<(), Self::Error>;

    /// Set StallGuard threshold (SGT)
    fn set_stallguard_threshold(&mut self, threshold: i8) -> Result<(), Self::Error>;

    /// Set chopper off time (0 disables the driver stage)
    fn set_off_time(&mut self, toff: u8) -> Result<(), Self::Error>;

    /// Enable StealthChop PWM mode
    fn set_pwm_mode(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Enable PWM amplitude autoscaling
    fn set_pwm_autoscale(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Set comparator blank time select
    fn set_blank_time(&mut self, tbl: u8) -> Result<(), Self::Error>;

    /// Set hysteresis start (1-8)
    fn set_hysteresis_start(&mut self, start: u8) -> Result<(), Self::Error>;

    /// Set hysteresis end (-3..=12)
    fn set_hysteresis_end(&mut self, end: i8) -> Result<(), Self::Error>;

    /// Enable StallGuard filtering
    fn set_stall_filter(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Select push-pull output for DIAG1
    fn set_diag1_pushpull(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Route stall detection to DIAG1
    fn set_diag1_stall(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Write TCOOLTHRS
    fn set_coolstep_threshold(&mut self, tstep: u32) -> Result<(), Self::Error>;

    /// Write THIGH
    fn set_high_threshold(&mut self, tstep: u32) -> Result<(), Self::Error>;

    /// Read TSTEP (time between microsteps in clock cycles)
    fn read_tstep(&mut self) -> Result<u32, Self::Error>;

    /// Read the StallGuard status flag
    fn read_stallguard(&mut self) -> Result<bool, Self::Error>;

    /// Read the raw StallGuard load value
    fn read_sg_result(&mut self) -> Result<u16, Self::Error>;

    /// Probe the chip
    fn test_connection(&mut self) -> Result<ConnectionStatus, Self::Error>;

    /// Write every register a mode plan names
    fn apply_mode(&mut self, plan: &ModePlan) -> Result<(), Self::Error> {
        match *plan {
            ModePlan::StealthChop {
                off_time,
                pwm_autoscale,
            } => {
                self.set_off_time(off_time)?;
                self.set_pwm_mode(true)?;
                self.set_pwm_autoscale(pwm_autoscale)?;
            }
            ModePlan::SpreadCycle {
                chopper,
                coolstep_threshold,
                high_threshold,
            } => {
                self.set_pwm_mode(false)?;
                self.set_blank_time(chopper.blank_time)?;
                self.set_off_time(chopper.off_time)?;
                self.set_hysteresis_start(chopper.hysteresis_start)?;
                self.set_hysteresis_end(chopper.hysteresis_end)?;
                self.set_stall_filter(chopper.stall_filter)?;
                self.set_diag1_pushpull(chopper.diag1_pushpull)?;
                self.set_diag1_stall(chopper.diag1_stall)?;
                self.set_coolstep_threshold(coolstep_threshold)?;
                self.set_high_threshold(high_threshold)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_codes() {
        assert_eq!(ConnectionStatus::from_code(1), ConnectionStatus::NoConnection);
        assert_eq!(ConnectionStatus::from_code(2), ConnectionStatus::NoPower);
        assert_eq!(ConnectionStatus::from_code(0), ConnectionStatus::Ok);
        assert_eq!(ConnectionStatus::from_code(7), ConnectionStatus::Ok);

        for status in [
            ConnectionStatus::Ok,
            ConnectionStatus::NoConnection,
            ConnectionStatus::NoPower,
        ] {
            assert_eq!(ConnectionStatus::from_code(status.code()), status);
        }
        assert!(ConnectionStatus::Ok.is_ok());
        assert!(!ConnectionStatus::NoPower.is_ok());
    }
}

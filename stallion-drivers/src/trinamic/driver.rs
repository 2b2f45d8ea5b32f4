//! Trinamic driver handle
//!
//! One [`TrinamicDriver`] exists per physical driver chip. It pulls the
//! axis settings into the chip and switches between StealthChop, CoolStep
//! and StallGuard homing as the machine state changes.
//!
//! # Usage
//!
//! Construction and initialization are separate: every chip-select line on
//! the shared bus must be inactive before the first chip is talked to.
//!
//! ```ignore
//! let spi = SharedSpi::new(spi);
//! let mut x = TrinamicDriver::new(0, 2130, 0.11, SpiRegisterBus::new(&spi, x_cs), x_en, opts, ctx)?;
//! let mut y = TrinamicDriver::new(1, 2130, 0.11, SpiRegisterBus::new(&spi, y_cs), y_en, opts, ctx)?;
//!
//! x.initialize()?;
//! y.initialize()?;
//!
//! x.set_homing_mode(true)?;   // StallGuard window around the homing speed
//! ```

use embedded_hal::digital::OutputPin;
use stallion_core::config::{AxisId, AxisName, DriverOptions};
use stallion_core::mode::{select_mode, DriverMode, ModePlan};
use stallion_core::traits::{
    AxisConfigProvider, ConnectionStatus, DiagnosticSink, MotionStatusProvider, MsgLevel,
    TrinamicRegisters,
};
use stallion_core::tstep::{StepTiming, TSTEP_MAX};

use super::bus::RegisterBus;
use super::chip::{ChipVariant, TrinamicChip};
use super::TrinamicError;

/// TSTEP reads back as all ones when the bus returns nothing
const TSTEP_INVALID: u32 = u32::MAX;

/// Collaborators a driver reads from and reports to
#[derive(Clone, Copy)]
pub struct DriverContext<'a> {
    /// Settings store
    pub settings: &'a dyn AxisConfigProvider,
    /// Step generator status
    pub motion: &'a dyn MotionStatusProvider,
    /// Operator message channel
    pub diagnostics: &'a dyn DiagnosticSink,
}

/// Trinamic SPI driver for one motor
///
/// A driver built with an unsupported part number is inert: it keeps no
/// chip and every operation returns without touching the bus or the
/// disable pin.
pub struct TrinamicDriver<'a, B, D> {
    axis: AxisId,
    name: AxisName,
    part_number: u16,
    chip: Option<TrinamicChip<B>>,
    disable_pin: D,
    options: DriverOptions,
    ctx: DriverContext<'a>,
    mode: DriverMode,
    homing: bool,
    active: bool,
    disabled: bool,
}

impl<'a, B, D> TrinamicDriver<'a, B, D>
where
    B: RegisterBus,
    D: OutputPin,
{
    /// Create a driver
    ///
    /// # Arguments
    /// - `axis_index`: motor index; `MAX_AXES` and above are ganged motors
    /// - `part_number`: 2130 or 5160
    /// - `r_sense`: sense resistor in ohms
    /// - `bus`: register transport for this chip
    /// - `disable_pin`: driver enable line
    ///
    /// Only raises this chip's select line; no register is touched until
    /// [`initialize`](Self::initialize).
    pub fn new(
        axis_index: u8,
        part_number: u16,
        r_sense: f32,
        mut bus: B,
        disable_pin: D,
        options: DriverOptions,
        ctx: DriverContext<'a>,
    ) -> Result<Self, TrinamicError<B::Error>> {
        let axis = AxisId::new(axis_index);

        // Quiet on the shared bus before anyone else starts talking
        bus.release().map_err(TrinamicError::Bus)?;

        let chip = match ChipVariant::from_part_number(part_number) {
            Some(variant) => Some(TrinamicChip::new(variant, bus, r_sense)),
            None => {
                warn!("Unsupported Trinamic part number {}", part_number);
                ctx.diagnostics.send(
                    MsgLevel::Error,
                    format_args!("Trinamic unsupported p/n:{}", part_number),
                );
                None
            }
        };

        let driver = Self {
            axis,
            name: axis.name(),
            part_number,
            chip,
            disable_pin,
            options,
            ctx,
            mode: options.run_mode.into(),
            homing: false,
            active: false,
            disabled: false,
        };

        if driver.chip.is_some() {
            driver.config_message();
        }

        Ok(driver)
    }

    /// Startup message describing this driver
    fn config_message(&self) {
        self.ctx.diagnostics.send(
            MsgLevel::Info,
            format_args!(
                "{} Axis Trinamic TMC{} Rsense:{:.3} Disable:{} ElectricalDisable:{}",
                self.name,
                self.part_number,
                self.r_sense(),
                if self.options.disable_inverted {
                    "active-low"
                } else {
                    "active-high"
                },
                self.options.electrical_disable,
            ),
        );
    }

    /// Bring the chip up
    ///
    /// Call only after every driver sharing the bus has been constructed.
    /// Returns the connectivity test result; a failed test is reported but
    /// does not keep the driver from becoming active.
    pub fn initialize(&mut self) -> Result<bool, TrinamicError<B::Error>> {
        let Some(chip) = self.chip.as_mut() else {
            return Ok(false);
        };

        chip.bus_mut().begin().map_err(TrinamicError::Bus)?;
        chip.begin()?;

        let connected = self.test()?;
        self.apply_settings()?;

        self.homing = false;
        self.set_mode()?;
        self.active = true;

        info!(
            "Axis {} TMC{} initialized, connected: {}",
            self.axis,
            self.part_number,
            connected
        );
        Ok(connected)
    }

    /// Probe the chip and report the outcome
    ///
    /// A chip that answers also has its DRV_STATUS fault and warning flags
    /// reported.
    pub fn test(&mut self) -> Result<bool, TrinamicError<B::Error>> {
        let Some(chip) = self.chip.as_mut() else {
            return Ok(false);
        };

        let status = chip.test_connection()?;
        let (level, outcome) = match status {
            ConnectionStatus::NoConnection => (MsgLevel::Warning, "test failed. Check connection."),
            ConnectionStatus::NoPower => (MsgLevel::Warning, "test failed. Check motor power."),
            ConnectionStatus::Ok => (MsgLevel::Info, "test passed."),
        };
        self.ctx
            .diagnostics
            .send(level, format_args!("{} Trinamic driver {}", self.name, outcome));

        if status.is_ok() {
            let drv_status = chip.drv_status()?;
            if drv_status.has_fault() {
                self.ctx.diagnostics.send(
                    MsgLevel::Error,
                    format_args!(
                        "{} Trinamic driver fault. Overtemp:{} Short A:{} Short B:{}",
                        self.name,
                        u8::from(drv_status.ot_shutdown),
                        u8::from(drv_status.s2ga),
                        u8::from(drv_status.s2gb)
                    ),
                );
            } else if drv_status.has_warning() {
                self.ctx.diagnostics.send(
                    MsgLevel::Warning,
                    format_args!(
                        "{} Trinamic driver warning. Overtemp:{} Open A:{} Open B:{}",
                        self.name,
                        u8::from(drv_status.ot_prewarning),
                        u8::from(drv_status.ola),
                        u8::from(drv_status.olb)
                    ),
                );
            }
        }

        Ok(status.is_ok())
    }

    /// Push microsteps, current and StallGuard threshold from the settings
    ///
    /// Call whenever one of those settings changes.
    pub fn apply_settings(&mut self) -> Result<(), TrinamicError<B::Error>> {
        let Some(chip) = self.chip.as_mut() else {
            return Ok(());
        };

        let settings = self.ctx.settings.axis_settings(self.axis.index());
        chip.set_microsteps(settings.microsteps)?;
        chip.set_rms_current(settings.run_current_ma(), settings.hold_multiplier())?;
        chip.set_stallguard_threshold(settings.stallguard)?;

        debug!(
            "Axis {} settings: {} usteps, {} mA, sgt {}",
            self.axis,
            settings.microsteps,
            settings.run_current_ma(),
            settings.stallguard
        );
        Ok(())
    }

    /// Enter or leave homing and switch modes accordingly
    pub fn set_homing_mode(&mut self, homing: bool) -> Result<(), TrinamicError<B::Error>> {
        if self.chip.is_none() {
            return Ok(());
        }
        self.homing = homing;
        self.set_mode()
    }

    /// Select the mode for the current homing state and write its registers
    pub fn set_mode(&mut self) -> Result<(), TrinamicError<B::Error>> {
        let Some(chip) = self.chip.as_mut() else {
            return Ok(());
        };

        let mode = select_mode(self.homing, self.options.homing, self.options.run_mode);
        let settings = self.ctx.settings.axis_settings(self.axis.index());
        let homing_rate = self.ctx.settings.homing_feed_rate();
        let timing = StepTiming {
            steps_per_unit: settings.steps_per_unit,
            microsteps: settings.microsteps,
            clock_hz: self.options.clock_hz,
        };

        let plan = match ModePlan::for_mode(mode, homing_rate, &timing) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Axis {} homing window unavailable: {}", self.axis, e);
                self.ctx.diagnostics.send(
                    MsgLevel::Warning,
                    format_args!(
                        "{} Stallguard window invalid for homing rate {:.1} ({:?})",
                        self.name, homing_rate, e
                    ),
                );
                ModePlan::coolstep()
            }
        };

        chip.apply_mode(&plan)?;
        self.mode = mode;
        Ok(())
    }

    /// Disable or enable the motor
    ///
    /// With electrical disable, disabling also sets TOFF = 0 and enabling
    /// rewrites every mode register.
    pub fn set_disable(&mut self, disable: bool) -> Result<(), TrinamicError<B::Error>> {
        if self.chip.is_none() {
            return Ok(());
        }

        let level = if disable != self.options.disable_inverted {
            self.disable_pin.set_high()
        } else {
            self.disable_pin.set_low()
        };
        level.map_err(|_| TrinamicError::Pin)?;

        if self.options.electrical_disable {
            if disable {
                if let Some(chip) = self.chip.as_mut() {
                    chip.set_off_time(0)?;
                }
            } else {
                // TOFF = 0 loses mode state on some chips, restore all of it
                self.set_mode()?;
            }
        }

        self.disabled = disable;
        Ok(())
    }

    /// Report StallGuard status for tuning
    ///
    /// Silent while the motor is not moving.
    pub fn debug_status(&mut self) -> Result<(), TrinamicError<B::Error>> {
        let Some(chip) = self.chip.as_mut() else {
            return Ok(());
        };

        let tstep = chip.read_tstep()?;
        if tstep == TSTEP_MAX || tstep == TSTEP_INVALID {
            return Ok(());
        }

        let stalled = chip.read_stallguard()?;
        let sg_result = chip.read_sg_result()?;
        let rate = self.ctx.motion.realtime_rate();
        let setting = self.ctx.settings.axis_settings(self.axis.index()).stallguard;

        self.ctx.diagnostics.send(
            MsgLevel::Info,
            format_args!(
                "{} Stallguard {}   SG_Val: {:04}   Rate: {:05.0} mm/min SG_Setting:{}",
                self.name,
                u8::from(stalled),
                sg_result,
                rate,
                setting
            ),
        );
        Ok(())
    }

    /// Axis identity
    pub fn axis(&self) -> AxisId {
        self.axis
    }

    /// Axis display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured part number
    pub fn part_number(&self) -> u16 {
        self.part_number
    }

    /// Selected chip variant, `None` for an inert driver
    pub fn variant(&self) -> Option<ChipVariant> {
        self.chip.as_ref().map(|chip| chip.variant())
    }

    /// Sense resistor in ohms
    pub fn r_sense(&self) -> f32 {
        self.chip.as_ref().map_or(0.0, |chip| chip.r_sense())
    }

    /// Chip register interface, `None` for an inert driver
    pub fn chip(&self) -> Option<&TrinamicChip<B>> {
        self.chip.as_ref()
    }

    /// Current mode
    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    /// Check if a homing cycle is in progress
    pub fn is_homing(&self) -> bool {
        self.homing
    }

    /// Check if the driver was initialized
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Check if the motor is disabled
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

//! TMC2130 / TMC5160 register interface
//!
//! [`TrinamicChip`] keeps shadow copies of the configuration registers and
//! implements [`TrinamicRegisters`] on top of any [`RegisterBus`]. The two
//! variants share the register layout used here and differ in current
//! scaling and power-on defaults.

use stallion_core::traits::{ConnectionStatus, TrinamicRegisters};

use super::bus::RegisterBus;
use super::current::{tmc2130_scale, tmc5160_scale, CurrentScale};
use super::registers::{mres, reg, ChopConf, CoolConf, DrvStatus, GConf, IHoldIRun, PwmConf};
use super::TrinamicError;

/// TSTEP and threshold registers are 20 bits wide
const TSTEP_MASK: u32 = 0xF_FFFF;

/// Off time written by `begin`
const BEGIN_TOFF: u8 = 8;

/// Blank time written by `begin`
const BEGIN_TBL: u8 = 1;

/// Power down delay (TMC5160 `begin`)
const TPOWERDOWN_DEFAULT: u32 = 10;

/// Supported driver chips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipVariant {
    /// TMC2130, vsense-based current range
    Tmc2130,
    /// TMC5160, external MOSFETs and global current scaler
    Tmc5160,
}

impl ChipVariant {
    /// Look up a variant by part number (2130, 5160)
    pub fn from_part_number(part_number: u16) -> Option<Self> {
        match part_number {
            2130 => Some(ChipVariant::Tmc2130),
            5160 => Some(ChipVariant::Tmc5160),
            _ => None,
        }
    }

    /// Part number
    pub fn part_number(&self) -> u16 {
        match self {
            ChipVariant::Tmc2130 => 2130,
            ChipVariant::Tmc5160 => 5160,
        }
    }

    fn pwmconf_reset(&self) -> u32 {
        match self {
            ChipVariant::Tmc2130 => PwmConf::TMC2130_RESET,
            ChipVariant::Tmc5160 => PwmConf::TMC5160_RESET,
        }
    }

    fn current_scale(&self, run_ma: u16, hold_multiplier: f32, r_sense: f32) -> CurrentScale {
        match self {
            ChipVariant::Tmc2130 => tmc2130_scale(run_ma, hold_multiplier, r_sense),
            ChipVariant::Tmc5160 => tmc5160_scale(run_ma, hold_multiplier, r_sense),
        }
    }
}

/// One Trinamic driver chip
pub struct TrinamicChip<B> {
    bus: B,
    variant: ChipVariant,
    r_sense: f32,
    gconf: GConf,
    ihold_irun: IHoldIRun,
    chopconf: ChopConf,
    coolconf: CoolConf,
    pwmconf: PwmConf,
    global_scaler: u8,
}

impl<B: RegisterBus> TrinamicChip<B> {
    /// Create a chip with power-on shadow registers
    ///
    /// `r_sense` is the sense resistor in ohms.
    pub fn new(variant: ChipVariant, bus: B, r_sense: f32) -> Self {
        Self {
            bus,
            variant,
            r_sense,
            gconf: GConf::default(),
            ihold_irun: IHoldIRun::default(),
            chopconf: ChopConf::default(),
            coolconf: CoolConf::default(),
            pwmconf: PwmConf(variant.pwmconf_reset()),
            global_scaler: 0,
        }
    }

    /// Chip variant
    pub fn variant(&self) -> ChipVariant {
        self.variant
    }

    /// Sense resistor in ohms
    pub fn r_sense(&self) -> f32 {
        self.r_sense
    }

    /// Register transport
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable register transport
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// GCONF shadow
    pub fn gconf(&self) -> GConf {
        self.gconf
    }

    /// IHOLD_IRUN shadow
    pub fn ihold_irun(&self) -> IHoldIRun {
        self.ihold_irun
    }

    /// CHOPCONF shadow
    pub fn chopconf(&self) -> ChopConf {
        self.chopconf
    }

    /// COOLCONF shadow
    pub fn coolconf(&self) -> CoolConf {
        self.coolconf
    }

    /// PWMCONF shadow
    pub fn pwmconf(&self) -> PwmConf {
        self.pwmconf
    }

    /// GLOBAL_SCALER shadow (0 = full scale)
    pub fn global_scaler(&self) -> u8 {
        self.global_scaler
    }

    /// Read and parse DRV_STATUS
    pub fn drv_status(&mut self) -> Result<DrvStatus, TrinamicError<B::Error>> {
        let raw = self.read(reg::DRV_STATUS)?;
        Ok(DrvStatus::from_register(raw))
    }

    fn write(&mut self, addr: u8, value: u32) -> Result<(), TrinamicError<B::Error>> {
        self.bus.write_register(addr, value).map_err(TrinamicError::Bus)
    }

    fn read(&mut self, addr: u8) -> Result<u32, TrinamicError<B::Error>> {
        self.bus.read_register(addr).map_err(TrinamicError::Bus)
    }

    fn write_gconf(&mut self) -> Result<(), TrinamicError<B::Error>> {
        self.write(reg::GCONF, self.gconf.0)
    }

    fn write_chopconf(&mut self) -> Result<(), TrinamicError<B::Error>> {
        self.write(reg::CHOPCONF, self.chopconf.0)
    }

    fn write_coolconf(&mut self) -> Result<(), TrinamicError<B::Error>> {
        self.write(reg::COOLCONF, self.coolconf.0)
    }

    fn write_pwmconf(&mut self) -> Result<(), TrinamicError<B::Error>> {
        self.write(reg::PWMCONF, self.pwmconf.0)
    }

    fn write_ihold_irun(&mut self) -> Result<(), TrinamicError<B::Error>> {
        self.write(reg::IHOLD_IRUN, self.ihold_irun.0)
    }
}

impl<B: RegisterBus> TrinamicRegisters for TrinamicChip<B> {
    type Error = TrinamicError<B::Error>;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.write_gconf()?;
        self.write_chopconf()?;
        self.write_coolconf()?;
        self.write_pwmconf()?;
        self.write_ihold_irun()?;

        if self.variant == ChipVariant::Tmc5160 {
            self.write(reg::GLOBAL_SCALER, self.global_scaler as u32)?;
            self.write(reg::TPOWERDOWN, TPOWERDOWN_DEFAULT)?;
        }

        // Driver stage stays off (TOFF = 0) until here
        self.chopconf.set_toff(BEGIN_TOFF);
        self.chopconf.set_tbl(BEGIN_TBL);
        self.write_chopconf()
    }

    fn set_microsteps(&mut self, microsteps: u16) -> Result<(), Self::Error> {
        let code = mres(microsteps).ok_or(TrinamicError::InvalidMicrosteps(microsteps))?;
        self.chopconf.set_mres(code);
        self.write_chopconf()
    }

    fn set_rms_current(&mut self, run_ma: u16, hold_multiplier: f32) -> Result<(), Self::Error> {
        let scale = self
            .variant
            .current_scale(run_ma, hold_multiplier, self.r_sense);

        match self.variant {
            ChipVariant::Tmc2130 => {
                if self.chopconf.vsense() != scale.vsense {
                    self.chopconf.set_vsense(scale.vsense);
                    self.write_chopconf()?;
                }
            }
            ChipVariant::Tmc5160 => {
                self.global_scaler = scale.global_scaler;
                self.write(reg::GLOBAL_SCALER, scale.global_scaler as u32)?;
            }
        }

        self.ihold_irun.set_irun(scale.irun);
        self.ihold_irun.set_ihold(scale.ihold);
        self.write_ihold_irun()
    }

    fn set_stallguard_threshold(&mut self, threshold: i8) -> Result<(), Self::Error> {
        self.coolconf.set_sgt(threshold);
        self.write_coolconf()
    }

    fn set_off_time(&mut self, toff: u8) -> Result<(), Self::Error> {
        self.chopconf.set_toff(toff);
        self.write_chopconf()
    }

    fn set_pwm_mode(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.gconf.set_en_pwm_mode(enabled);
        self.write_gconf()
    }

    fn set_pwm_autoscale(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.pwmconf.set_pwm_autoscale(enabled);
        self.write_pwmconf()
    }

    fn set_blank_time(&mut self, tbl: u8) -> Result<(), Self::Error> {
        self.chopconf.set_tbl(tbl);
        self.write_chopconf()
    }

    fn set_hysteresis_start(&mut self, start: u8) -> Result<(), Self::Error> {
        self.chopconf.set_hysteresis_start(start);
        self.write_chopconf()
    }

    fn set_hysteresis_end(&mut self, end: i8) -> Result<(), Self::Error> {
        self.chopconf.set_hysteresis_end(end);
        self.write_chopconf()
    }

    fn set_stall_filter(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.coolconf.set_sfilt(enabled);
        self.write_coolconf()
    }

    fn set_diag1_pushpull(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.gconf.set_diag1_pushpull(enabled);
        self.write_gconf()
    }

    fn set_diag1_stall(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.gconf.set_diag1_stall(enabled);
        self.write_gconf()
    }

    fn set_coolstep_threshold(&mut self, tstep: u32) -> Result<(), Self::Error> {
        self.write(reg::TCOOLTHRS, tstep & TSTEP_MASK)
    }

    fn set_high_threshold(&mut self, tstep: u32) -> Result<(), Self::Error> {
        self.write(reg::THIGH, tstep & TSTEP_MASK)
    }

    fn read_tstep(&mut self) -> Result<u32, Self::Error> {
        self.read(reg::TSTEP)
    }

    fn read_stallguard(&mut self) -> Result<bool, Self::Error> {
        Ok(self.drv_status()?.stallguard)
    }

    fn read_sg_result(&mut self) -> Result<u16, Self::Error> {
        Ok(self.drv_status()?.sg_result)
    }

    fn test_connection(&mut self) -> Result<ConnectionStatus, Self::Error> {
        let code = match self.read(reg::DRV_STATUS)? {
            0xFFFF_FFFF => 1,
            0 => 2,
            _ => 0,
        };
        Ok(ConnectionStatus::from_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trinamic::testing::{FakeBus, FakeRegisters};
    use core::cell::RefCell;
    use stallion_core::mode::{DriverMode, ModePlan};
    use stallion_core::tstep::StepTiming;

    fn chip(variant: ChipVariant, regs: &RefCell<FakeRegisters>) -> TrinamicChip<FakeBus<'_>> {
        TrinamicChip::new(variant, FakeBus::new(regs), 0.11)
    }

    #[test]
    fn test_part_numbers() {
        assert_eq!(ChipVariant::from_part_number(2130), Some(ChipVariant::Tmc2130));
        assert_eq!(ChipVariant::from_part_number(5160), Some(ChipVariant::Tmc5160));
        assert_eq!(ChipVariant::from_part_number(2209), None);
        assert_eq!(ChipVariant::Tmc5160.part_number(), 5160);
    }

    #[test]
    fn test_begin_enables_driver_stage() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = chip(ChipVariant::Tmc2130, &regs);

        tmc.begin().unwrap();

        let regs = regs.borrow();
        let chopconf = ChopConf(regs.value(reg::CHOPCONF));
        assert_eq!(chopconf.toff(), 8);
        assert_eq!(chopconf.tbl(), 1);
        assert_eq!(regs.value(reg::PWMCONF), PwmConf::TMC2130_RESET);
        // No 5160-only registers on a 2130
        assert!(!regs.was_written(reg::GLOBAL_SCALER));
    }

    #[test]
    fn test_tmc5160_begin_writes_scaler() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = chip(ChipVariant::Tmc5160, &regs);

        tmc.begin().unwrap();

        let regs = regs.borrow();
        assert!(regs.was_written(reg::GLOBAL_SCALER));
        assert_eq!(regs.value(reg::TPOWERDOWN), 10);
        assert_eq!(regs.value(reg::PWMCONF), PwmConf::TMC5160_RESET);
    }

    #[test]
    fn test_microsteps() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = chip(ChipVariant::Tmc2130, &regs);

        tmc.set_microsteps(16).unwrap();
        assert_eq!(ChopConf(regs.borrow().value(reg::CHOPCONF)).microsteps(), 16);

        assert_eq!(
            tmc.set_microsteps(12),
            Err(TrinamicError::InvalidMicrosteps(12))
        );
    }

    #[test]
    fn test_rms_current_tmc2130() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = chip(ChipVariant::Tmc2130, &regs);

        tmc.set_rms_current(800, 0.5).unwrap();

        let regs = regs.borrow();
        let ihold_irun = IHoldIRun(regs.value(reg::IHOLD_IRUN));
        assert_eq!(ihold_irun.irun(), 25);
        assert_eq!(ihold_irun.ihold(), 12);
        assert!(ChopConf(regs.value(reg::CHOPCONF)).vsense());
    }

    #[test]
    fn test_rms_current_tmc5160() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = TrinamicChip::new(ChipVariant::Tmc5160, FakeBus::new(&regs), 0.075);

        tmc.set_rms_current(1000, 0.5).unwrap();

        let regs = regs.borrow();
        assert_eq!(regs.value(reg::GLOBAL_SCALER), 133);
        assert_eq!(IHoldIRun(regs.value(reg::IHOLD_IRUN)).irun(), 19);
    }

    #[test]
    fn test_stallguard_threshold() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = chip(ChipVariant::Tmc2130, &regs);

        tmc.set_stallguard_threshold(-5).unwrap();
        assert_eq!(CoolConf(regs.borrow().value(reg::COOLCONF)).sgt(), -5);
    }

    #[test]
    fn test_connection_probe() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = chip(ChipVariant::Tmc2130, &regs);

        regs.borrow_mut().set_read(reg::DRV_STATUS, 0xFFFF_FFFF);
        assert_eq!(tmc.test_connection(), Ok(ConnectionStatus::NoConnection));

        regs.borrow_mut().set_read(reg::DRV_STATUS, 0);
        assert_eq!(tmc.test_connection(), Ok(ConnectionStatus::NoPower));

        regs.borrow_mut().set_read(reg::DRV_STATUS, 0x8000_0000);
        assert_eq!(tmc.test_connection(), Ok(ConnectionStatus::Ok));
    }

    #[test]
    fn test_stallguard_reads() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = chip(ChipVariant::Tmc2130, &regs);

        regs.borrow_mut().set_read(reg::DRV_STATUS, (1 << 24) | 0x0123);
        assert_eq!(tmc.read_stallguard(), Ok(true));
        assert_eq!(tmc.read_sg_result(), Ok(0x0123));
    }

    #[test]
    fn test_apply_stealthchop_plan() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = chip(ChipVariant::Tmc2130, &regs);
        let timing = StepTiming {
            steps_per_unit: 80.0,
            microsteps: 16,
            clock_hz: 12_000_000.0,
        };

        let plan = ModePlan::for_mode(DriverMode::StealthChop, 600.0, &timing).unwrap();
        tmc.apply_mode(&plan).unwrap();

        assert!(tmc.gconf().en_pwm_mode());
        assert!(tmc.pwmconf().pwm_autoscale());
        assert_eq!(tmc.chopconf().toff(), 5);
    }

    #[test]
    fn test_apply_homing_plan() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = chip(ChipVariant::Tmc2130, &regs);
        let timing = StepTiming {
            steps_per_unit: 80.0,
            microsteps: 16,
            clock_hz: 12_000_000.0,
        };

        tmc.set_pwm_mode(true).unwrap();
        let plan = ModePlan::for_mode(DriverMode::StallguardHoming, 600.0, &timing).unwrap();
        tmc.apply_mode(&plan).unwrap();

        let regs = regs.borrow();
        assert_eq!(regs.value(reg::TCOOLTHRS), 1406);
        assert_eq!(regs.value(reg::THIGH), 562);

        let gconf = GConf(regs.value(reg::GCONF));
        assert!(!gconf.en_pwm_mode());
        assert!(gconf.diag1_stall());
        assert!(!gconf.diag1_pushpull());

        let chopconf = ChopConf(regs.value(reg::CHOPCONF));
        assert_eq!(chopconf.tbl(), 1);
        assert_eq!(chopconf.toff(), 3);
        assert_eq!(chopconf.hysteresis_start(), 4);
        assert_eq!(chopconf.hysteresis_end(), -2);
        assert!(CoolConf(regs.value(reg::COOLCONF)).sfilt());
    }

    #[test]
    fn test_thresholds_masked_to_20_bits() {
        let regs = RefCell::new(FakeRegisters::new());
        let mut tmc = chip(ChipVariant::Tmc2130, &regs);

        tmc.set_coolstep_threshold(0xFFF0_0001).unwrap();
        assert_eq!(regs.borrow().value(reg::TCOOLTHRS), 1);
    }
}

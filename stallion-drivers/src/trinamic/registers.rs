//! Register map and shadow registers
//!
//! Write-only registers cannot be read back, so the driver keeps a shadow
//! copy of each configuration register and rewrites the whole word when a
//! field changes. Bit positions are shared by the TMC2130 and TMC5160 for
//! every register used here.

/// Register addresses
pub mod reg {
    /// General configuration
    pub const GCONF: u8 = 0x00;
    /// Global current scaler (TMC5160 only)
    pub const GLOBAL_SCALER: u8 = 0x0B;
    /// Hold/run current settings
    pub const IHOLD_IRUN: u8 = 0x10;
    /// Power down delay
    pub const TPOWERDOWN: u8 = 0x11;
    /// Measured time between microsteps
    pub const TSTEP: u8 = 0x12;
    /// Lower velocity for CoolStep/StallGuard
    pub const TCOOLTHRS: u8 = 0x14;
    /// High velocity threshold
    pub const THIGH: u8 = 0x15;
    /// Chopper configuration
    pub const CHOPCONF: u8 = 0x6C;
    /// CoolStep and StallGuard configuration
    pub const COOLCONF: u8 = 0x6D;
    /// Driver status
    pub const DRV_STATUS: u8 = 0x6F;
    /// StealthChop PWM configuration
    pub const PWMCONF: u8 = 0x70;
}

/// Write bit in the address byte
pub const WRITE_FLAG: u8 = 0x80;

/// Mask of a `width`-bit field
const fn mask(width: u32) -> u32 {
    (1u32 << width) - 1
}

/// Extract a field
const fn get(word: u32, shift: u32, width: u32) -> u32 {
    (word >> shift) & mask(width)
}

/// Replace a field, truncating `value` to the field width
const fn set(word: u32, shift: u32, width: u32, value: u32) -> u32 {
    (word & !(mask(width) << shift)) | ((value & mask(width)) << shift)
}

const fn set_bit(word: u32, bit: u32, on: bool) -> u32 {
    set(word, bit, 1, on as u32)
}

/// GCONF shadow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GConf(pub u32);

impl GConf {
    /// StealthChop enable (bit 2)
    pub fn en_pwm_mode(&self) -> bool {
        get(self.0, 2, 1) != 0
    }

    /// Enable StealthChop
    pub fn set_en_pwm_mode(&mut self, on: bool) {
        self.0 = set_bit(self.0, 2, on);
    }

    /// Stall output on DIAG1 (bit 8)
    pub fn diag1_stall(&self) -> bool {
        get(self.0, 8, 1) != 0
    }

    /// Enable the DIAG1 stall output
    pub fn set_diag1_stall(&mut self, on: bool) {
        self.0 = set_bit(self.0, 8, on);
    }

    /// DIAG1 push-pull output (bit 13)
    pub fn diag1_pushpull(&self) -> bool {
        get(self.0, 13, 1) != 0
    }

    /// Drive DIAG1 push-pull instead of open drain
    pub fn set_diag1_pushpull(&mut self, on: bool) {
        self.0 = set_bit(self.0, 13, on);
    }
}

/// IHOLD_IRUN shadow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IHoldIRun(pub u32);

impl Default for IHoldIRun {
    fn default() -> Self {
        // IHOLDDELAY = 6 before dropping to hold current
        Self(6 << 16)
    }
}

impl IHoldIRun {
    /// Standstill current scale (bits 0-4)
    pub fn ihold(&self) -> u8 {
        get(self.0, 0, 5) as u8
    }

    /// Set IHOLD (0-31)
    pub fn set_ihold(&mut self, cs: u8) {
        self.0 = set(self.0, 0, 5, cs as u32);
    }

    /// Run current scale (bits 8-12)
    pub fn irun(&self) -> u8 {
        get(self.0, 8, 5) as u8
    }

    /// Set IRUN (0-31)
    pub fn set_irun(&mut self, cs: u8) {
        self.0 = set(self.0, 8, 5, cs as u32);
    }
}

/// CHOPCONF shadow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChopConf(pub u32);

impl Default for ChopConf {
    fn default() -> Self {
        // intpol = 1 (interpolate to 256 microsteps), MRES = 256, TOFF = 0
        Self(1 << 28)
    }
}

impl ChopConf {
    /// Off time (bits 0-3), 0 disables the driver stage
    pub fn toff(&self) -> u8 {
        get(self.0, 0, 4) as u8
    }

    /// Set the off time, truncated to 4 bits
    pub fn set_toff(&mut self, toff: u8) {
        self.0 = set(self.0, 0, 4, toff as u32);
    }

    /// Hysteresis start 1-8, stored as HSTRT = start - 1 (bits 4-6)
    pub fn hysteresis_start(&self) -> u8 {
        get(self.0, 4, 3) as u8 + 1
    }

    /// Set the hysteresis start, clamped to 1-8
    pub fn set_hysteresis_start(&mut self, start: u8) {
        let start = start.clamp(1, 8);
        self.0 = set(self.0, 4, 3, (start - 1) as u32);
    }

    /// Hysteresis end -3..=12, stored as HEND = end + 3 (bits 7-10)
    pub fn hysteresis_end(&self) -> i8 {
        get(self.0, 7, 4) as i8 - 3
    }

    /// Set the hysteresis end, clamped to -3..=12
    pub fn set_hysteresis_end(&mut self, end: i8) {
        let end = end.clamp(-3, 12);
        self.0 = set(self.0, 7, 4, (end + 3) as u32);
    }

    /// Comparator blank time select (bits 15-16)
    pub fn tbl(&self) -> u8 {
        get(self.0, 15, 2) as u8
    }

    /// Set the blank time select (0-3)
    pub fn set_tbl(&mut self, tbl: u8) {
        self.0 = set(self.0, 15, 2, tbl as u32);
    }

    /// High sensitivity sense resistor voltage (bit 17, TMC2130 only)
    pub fn vsense(&self) -> bool {
        get(self.0, 17, 1) != 0
    }

    /// Select the low sense voltage range
    pub fn set_vsense(&mut self, on: bool) {
        self.0 = set_bit(self.0, 17, on);
    }

    /// Microstep resolution code (bits 24-27)
    pub fn mres(&self) -> u8 {
        get(self.0, 24, 4) as u8
    }

    /// Set the raw MRES code, see [`mres`]
    pub fn set_mres(&mut self, mres: u8) {
        self.0 = set(self.0, 24, 4, mres as u32);
    }

    /// Microsteps per full step encoded by MRES
    pub fn microsteps(&self) -> u16 {
        256 >> self.mres().min(8)
    }
}

/// Convert microsteps to the MRES register value
pub fn mres(microsteps: u16) -> Option<u8> {
    match microsteps {
        256 => Some(0),
        128 => Some(1),
        64 => Some(2),
        32 => Some(3),
        16 => Some(4),
        8 => Some(5),
        4 => Some(6),
        2 => Some(7),
        1 => Some(8),
        _ => None,
    }
}

/// COOLCONF shadow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoolConf(pub u32);

impl CoolConf {
    /// StallGuard threshold, 7-bit two's complement (bits 16-22)
    pub fn sgt(&self) -> i8 {
        // Sign-extend from 7 bits
        ((get(self.0, 16, 7) as u8) << 1) as i8 >> 1
    }

    /// Set the StallGuard threshold, clamped to -64..=63
    pub fn set_sgt(&mut self, sgt: i8) {
        let sgt = sgt.clamp(-64, 63);
        self.0 = set(self.0, 16, 7, sgt as u8 as u32);
    }

    /// StallGuard filter (bit 24)
    pub fn sfilt(&self) -> bool {
        get(self.0, 24, 1) != 0
    }

    /// Enable the StallGuard filter
    pub fn set_sfilt(&mut self, on: bool) {
        self.0 = set_bit(self.0, 24, on);
    }
}

/// PWMCONF shadow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmConf(pub u32);

impl PwmConf {
    /// TMC2130 power-on value
    pub const TMC2130_RESET: u32 = 0x0005_0480;
    /// TMC5160 power-on value
    pub const TMC5160_RESET: u32 = 0xC40C_001E;

    /// Amplitude autoscaling (bit 18)
    pub fn pwm_autoscale(&self) -> bool {
        get(self.0, 18, 1) != 0
    }

    /// Enable amplitude autoscaling
    pub fn set_pwm_autoscale(&mut self, on: bool) {
        self.0 = set_bit(self.0, 18, on);
    }
}

/// Parsed DRV_STATUS register
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DrvStatus {
    /// StallGuard result (0-1023)
    pub sg_result: u16,
    /// Current scaling (0-31)
    pub cs_actual: u8,
    /// StallGuard status
    pub stallguard: bool,
    /// Overtemperature shutdown
    pub ot_shutdown: bool,
    /// Overtemperature pre-warning
    pub ot_prewarning: bool,
    /// Short to ground on phase A
    pub s2ga: bool,
    /// Short to ground on phase B
    pub s2gb: bool,
    /// Open load on phase A
    pub ola: bool,
    /// Open load on phase B
    pub olb: bool,
    /// Motor standstill indicator
    pub standstill: bool,
}

impl DrvStatus {
    /// Parse from raw DRV_STATUS register value
    pub fn from_register(value: u32) -> Self {
        Self {
            sg_result: get(value, 0, 10) as u16,
            cs_actual: get(value, 16, 5) as u8,
            stallguard: (value & (1 << 24)) != 0,
            ot_shutdown: (value & (1 << 25)) != 0,
            ot_prewarning: (value & (1 << 26)) != 0,
            s2ga: (value & (1 << 27)) != 0,
            s2gb: (value & (1 << 28)) != 0,
            ola: (value & (1 << 29)) != 0,
            olb: (value & (1 << 30)) != 0,
            standstill: (value & (1 << 31)) != 0,
        }
    }

    /// Check if any fault condition is present
    pub fn has_fault(&self) -> bool {
        self.ot_shutdown || self.s2ga || self.s2gb
    }

    /// Check if driver is in warning state
    pub fn has_warning(&self) -> bool {
        self.ot_prewarning || self.ola || self.olb
    }
}

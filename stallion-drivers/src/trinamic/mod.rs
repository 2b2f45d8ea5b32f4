//! Trinamic SPI stepper drivers (TMC2130, TMC5160)
//!
//! # SPI Protocol
//!
//! Both chips use 40-bit SPI datagrams in mode 3, chip select active low:
//! - Byte 0: register address, bit 7 set for writes
//! - Bytes 1-4: data (big-endian)
//!
//! Every response carries the SPI_STATUS byte followed by the data
//! requested by the *previous* datagram, so reads are sent twice.
//!
//! # Modes
//!
//! - StealthChop: quiet voltage-chopper operation (default run mode)
//! - CoolStep: SpreadCycle with load-adaptive current
//! - StallGuard homing: CoolStep with a TSTEP window around the homing speed
//!   so DIAG1 reports a stall when the axis hits its end

pub mod bus;
pub mod chip;
pub mod current;
pub mod driver;
pub mod registers;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::{RegisterBus, SharedSpi, SpiBusError, SpiRegisterBus};
pub use chip::{ChipVariant, TrinamicChip};
pub use driver::{DriverContext, TrinamicDriver};

/// Trinamic driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrinamicError<E> {
    /// Register transport failed
    Bus(E),
    /// Disable pin could not be driven
    Pin,
    /// Microstep resolution the chip cannot represent
    InvalidMicrosteps(u16),
}

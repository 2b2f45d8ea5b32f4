//! Register transport
//!
//! [`RegisterBus`] moves 32-bit register values to and from one chip.
//! [`SpiRegisterBus`] implements it over an `embedded-hal` SPI bus that
//! several chips share, each with its own chip-select line.

use core::cell::{Cell, RefCell};

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use super::registers::WRITE_FLAG;

/// Register-level access to one driver chip
pub trait RegisterBus {
    /// Transport error
    type Error;

    /// One-time bus setup; safe to call once per chip on a shared bus
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Put the chip-select line in its inactive state
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Write a register
    fn write_register(&mut self, addr: u8, value: u32) -> Result<(), Self::Error>;

    /// Read a register
    fn read_register(&mut self, addr: u8) -> Result<u32, Self::Error>;
}

/// SPI transport errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiBusError<S, P> {
    /// SPI transfer failed
    Spi(S),
    /// Chip-select pin failed
    Pin(P),
    /// Bus already borrowed by another transfer
    Busy,
}

/// SPI_STATUS byte returned with every datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiStatus(pub u8);

impl SpiStatus {
    /// Motor standstill
    pub fn standstill(&self) -> bool {
        self.0 & 0x08 != 0
    }
}

/// Build a write datagram
pub fn write_frame(addr: u8, value: u32) -> [u8; 5] {
    let data = value.to_be_bytes();
    [addr | WRITE_FLAG, data[0], data[1], data[2], data[3]]
}

/// Build a read datagram
pub fn read_frame(addr: u8) -> [u8; 5] {
    [addr & !WRITE_FLAG, 0, 0, 0, 0]
}

/// Split a response into status and data
pub fn parse_response(frame: &[u8; 5]) -> (SpiStatus, u32) {
    let data = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
    (SpiStatus(frame[0]), data)
}

/// SPI bus shared by several driver chips
pub struct SharedSpi<SPI> {
    bus: RefCell<SPI>,
    ready: Cell<bool>,
}

impl<SPI: SpiBus> SharedSpi<SPI> {
    /// Wrap a configured SPI bus (mode 3, up to 4 MHz)
    pub fn new(spi: SPI) -> Self {
        Self {
            bus: RefCell::new(spi),
            ready: Cell::new(false),
        }
    }

    /// Check if the bus has been set up
    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// Set the bus up on first use, no-op afterwards
    fn setup<P>(&self) -> Result<(), SpiBusError<SPI::Error, P>> {
        if self.ready.get() {
            return Ok(());
        }
        let mut spi = self.bus.try_borrow_mut().map_err(|_| SpiBusError::Busy)?;
        spi.flush().map_err(SpiBusError::Spi)?;
        self.ready.set(true);
        debug!("Trinamic SPI bus ready");
        Ok(())
    }
}

/// One chip on a [`SharedSpi`]
pub struct SpiRegisterBus<'a, SPI, CS> {
    shared: &'a SharedSpi<SPI>,
    cs: CS,
    status: SpiStatus,
}

impl<'a, SPI, CS> SpiRegisterBus<'a, SPI, CS>
where
    SPI: SpiBus,
    CS: OutputPin,
{
    /// Create a transport for the chip selected by `cs`
    pub fn new(shared: &'a SharedSpi<SPI>, cs: CS) -> Self {
        Self {
            shared,
            cs,
            status: SpiStatus::default(),
        }
    }

    /// Status byte of the last datagram
    pub fn status(&self) -> SpiStatus {
        self.status
    }

    fn transfer(&mut self, frame: &mut [u8; 5]) -> Result<(), SpiBusError<SPI::Error, CS::Error>> {
        let mut spi = self.shared.bus.try_borrow_mut().map_err(|_| SpiBusError::Busy)?;

        self.cs.set_low().map_err(SpiBusError::Pin)?;
        let result = spi.transfer_in_place(frame).and_then(|_| spi.flush());
        // Deselect even when the transfer failed
        self.cs.set_high().map_err(SpiBusError::Pin)?;
        result.map_err(SpiBusError::Spi)?;

        self.status = SpiStatus(frame[0]);
        Ok(())
    }
}

impl<SPI, CS> RegisterBus for SpiRegisterBus<'_, SPI, CS>
where
    SPI: SpiBus,
    CS: OutputPin,
{
    type Error = SpiBusError<SPI::Error, CS::Error>;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.shared.setup()
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(SpiBusError::Pin)
    }

    fn write_register(&mut self, addr: u8, value: u32) -> Result<(), Self::Error> {
        let mut frame = write_frame(addr, value);
        self.transfer(&mut frame)
    }

    fn read_register(&mut self, addr: u8) -> Result<u32, Self::Error> {
        // First response belongs to the previous datagram
        let mut frame = read_frame(addr);
        self.transfer(&mut frame)?;

        let mut frame = read_frame(addr);
        self.transfer(&mut frame)?;
        Ok(parse_response(&frame).1)
    }
}

//! Test doubles for the register transport and driver collaborators

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::fmt::{self, Write};

use heapless::{String, Vec};
use stallion_core::config::AxisSettings;
use stallion_core::traits::{AxisConfigProvider, DiagnosticSink, MotionStatusProvider, MsgLevel};

use super::bus::RegisterBus;

const REGISTER_COUNT: usize = 128;

/// Register file seen by a [`FakeBus`]
pub struct FakeRegisters {
    values: [u32; REGISTER_COUNT],
    written: [bool; REGISTER_COUNT],
    reads: [Option<u32>; REGISTER_COUNT],
    pub writes: usize,
    pub begins: usize,
    pub releases: usize,
}

impl FakeRegisters {
    pub fn new() -> Self {
        Self {
            values: [0; REGISTER_COUNT],
            written: [false; REGISTER_COUNT],
            reads: [None; REGISTER_COUNT],
            writes: 0,
            begins: 0,
            releases: 0,
        }
    }

    /// Last value written to `addr`
    pub fn value(&self, addr: u8) -> u32 {
        self.values[addr as usize]
    }

    pub fn was_written(&self, addr: u8) -> bool {
        self.written[addr as usize]
    }

    /// Value returned by reads of `addr`
    pub fn set_read(&mut self, addr: u8, value: u32) {
        self.reads[addr as usize] = Some(value);
    }

    /// Copy of every register value
    pub fn snapshot(&self) -> [u32; REGISTER_COUNT] {
        self.values
    }
}

/// Register transport backed by a shared [`FakeRegisters`]
pub struct FakeBus<'a> {
    regs: &'a RefCell<FakeRegisters>,
}

impl<'a> FakeBus<'a> {
    pub fn new(regs: &'a RefCell<FakeRegisters>) -> Self {
        Self { regs }
    }
}

impl RegisterBus for FakeBus<'_> {
    type Error = Infallible;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.regs.borrow_mut().begins += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.regs.borrow_mut().releases += 1;
        Ok(())
    }

    fn write_register(&mut self, addr: u8, value: u32) -> Result<(), Self::Error> {
        let mut regs = self.regs.borrow_mut();
        let index = (addr & 0x7F) as usize;
        regs.values[index] = value;
        regs.written[index] = true;
        regs.writes += 1;
        Ok(())
    }

    fn read_register(&mut self, addr: u8) -> Result<u32, Self::Error> {
        let regs = self.regs.borrow();
        let index = (addr & 0x7F) as usize;
        Ok(regs.reads[index].unwrap_or(regs.values[index]))
    }
}

/// Disable pin that remembers its level
#[derive(Default)]
pub struct FakePin<'a> {
    pub level: Option<&'a Cell<Option<bool>>>,
}

impl<'a> FakePin<'a> {
    pub fn new(level: &'a Cell<Option<bool>>) -> Self {
        Self { level: Some(level) }
    }
}

impl embedded_hal::digital::ErrorType for FakePin<'_> {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for FakePin<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if let Some(level) = self.level {
            level.set(Some(false));
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if let Some(level) = self.level {
            level.set(Some(true));
        }
        Ok(())
    }
}

/// Settings store with one settings block for every axis
pub struct FakeSettings {
    pub settings: Cell<AxisSettings>,
    pub homing_rate: Cell<f32>,
}

impl FakeSettings {
    pub fn new(settings: AxisSettings, homing_rate: f32) -> Self {
        Self {
            settings: Cell::new(settings),
            homing_rate: Cell::new(homing_rate),
        }
    }
}

impl AxisConfigProvider for FakeSettings {
    fn axis_settings(&self, _axis: usize) -> AxisSettings {
        self.settings.get()
    }

    fn homing_feed_rate(&self) -> f32 {
        self.homing_rate.get()
    }
}

/// Step generator reporting a fixed rate
pub struct FakeMotion(pub f32);

impl MotionStatusProvider for FakeMotion {
    fn realtime_rate(&self) -> f32 {
        self.0
    }
}

/// Sink that keeps every message
#[derive(Default)]
pub struct RecordingSink {
    messages: RefCell<Vec<(MsgLevel, String<128>), 16>>,
}

impl RecordingSink {
    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }

    /// Level of the first message containing `text`
    pub fn find(&self, text: &str) -> Option<MsgLevel> {
        self.messages
            .borrow()
            .iter()
            .find(|(_, message)| message.contains(text))
            .map(|(level, _)| *level)
    }

    /// Text of the last message
    pub fn last(&self) -> Option<String<128>> {
        self.messages.borrow().last().map(|(_, message)| message.clone())
    }
}

impl DiagnosticSink for RecordingSink {
    fn send(&self, level: MsgLevel, args: fmt::Arguments<'_>) {
        let mut message = String::new();
        let _ = message.write_fmt(args);
        let _ = self.messages.borrow_mut().push((level, message));
    }
}

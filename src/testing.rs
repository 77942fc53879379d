//! Simulated DS1302 on three shared lines, for tests.
//!
//! The simulation records every call made on the lines and runs the chip side
//! of the protocol: command and write bits are latched on rising CLK edges
//! while CE is high, read data is shifted out LSB-first on falling edges after
//! the command byte.

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin, PinState};

use crate::wire::{DataPin, Direction};

/// One call on one of the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Clock(PinState),
    Enable(PinState),
    Data(PinState),
    Sample(PinState),
    Direction(Direction),
}

struct Chip {
    registers: [u8; 8],
    clk: PinState,
    ce: PinState,
    io: PinState,
    direction: Direction,
    bit_count: u8,
    command: u8,
    data_in: u8,
    data_out: u8,
    out_pos: u8,
    out_level: PinState,
    fail_samples: bool,
    events: Vec<Event>,
    reads: Vec<u8>,
    writes: Vec<(u8, u8)>,
}

impl Chip {
    fn index(command: u8) -> usize {
        usize::from((command >> 1) & 0x1F)
    }

    fn is_read(&self) -> bool {
        self.command & 0x01 != 0
    }

    fn rising_edge(&mut self) {
        let bit = u8::from(self.io == PinState::High);
        if self.bit_count < 8 {
            self.command |= bit << self.bit_count;
            self.bit_count += 1;
            if self.bit_count == 8 && self.is_read() {
                self.reads.push(self.command);
                self.data_out = self
                    .registers
                    .get(Self::index(self.command))
                    .copied()
                    .unwrap_or(0);
                self.out_pos = 0;
            }
        } else if self.bit_count < 16 && !self.is_read() {
            self.data_in |= bit << (self.bit_count - 8);
            self.bit_count += 1;
            if self.bit_count == 16 {
                self.commit();
            }
        }
    }

    fn falling_edge(&mut self) {
        if self.bit_count == 8 && self.is_read() && self.out_pos < 8 {
            self.out_level = PinState::from(self.data_out & (1 << self.out_pos) != 0);
            self.out_pos += 1;
        }
    }

    fn commit(&mut self) {
        self.writes.push((self.command, self.data_in));
        let index = Self::index(self.command);
        let protected = self.registers[7] & 0x80 != 0;
        if protected && index != 7 {
            return;
        }
        if let Some(register) = self.registers.get_mut(index) {
            *register = self.data_in;
        }
    }

    fn set_clock(&mut self, level: PinState) {
        self.events.push(Event::Clock(level));
        let previous = core::mem::replace(&mut self.clk, level);
        if self.ce == PinState::Low {
            return;
        }
        match (previous, level) {
            (PinState::Low, PinState::High) => self.rising_edge(),
            (PinState::High, PinState::Low) => self.falling_edge(),
            _ => {}
        }
    }

    fn set_enable(&mut self, level: PinState) {
        self.events.push(Event::Enable(level));
        if self.ce == PinState::Low && level == PinState::High {
            self.bit_count = 0;
            self.command = 0;
            self.data_in = 0;
        }
        self.ce = level;
    }
}

/// Handle on the simulated chip and its event log.
#[derive(Clone)]
pub(crate) struct SimBus {
    chip: Rc<RefCell<Chip>>,
}

impl SimBus {
    pub(crate) fn new() -> Self {
        Self {
            chip: Rc::new(RefCell::new(Chip {
                registers: [0; 8],
                clk: PinState::Low,
                ce: PinState::Low,
                io: PinState::Low,
                direction: Direction::Output,
                bit_count: 0,
                command: 0,
                data_in: 0,
                data_out: 0,
                out_pos: 0,
                out_level: PinState::Low,
                fail_samples: false,
                events: Vec::new(),
                reads: Vec::new(),
                writes: Vec::new(),
            })),
        }
    }

    pub(crate) fn pins(&self) -> (SimClock, SimData, SimEnable) {
        (
            SimClock(self.clone()),
            SimData(self.clone()),
            SimEnable(self.clone()),
        )
    }

    /// Presets the register addressed by a read or write command byte.
    pub(crate) fn set_register(&self, command: u8, value: u8) {
        self.chip.borrow_mut().registers[Chip::index(command)] = value;
    }

    pub(crate) fn register(&self, command: u8) -> u8 {
        self.chip.borrow().registers[Chip::index(command)]
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.chip.borrow().events.clone()
    }

    /// Command bytes of read transactions.
    pub(crate) fn reads(&self) -> Vec<u8> {
        self.chip.borrow().reads.clone()
    }

    /// Completed write transactions as (command, data).
    pub(crate) fn writes(&self) -> Vec<(u8, u8)> {
        self.chip.borrow().writes.clone()
    }

    pub(crate) fn direction(&self) -> Direction {
        self.chip.borrow().direction
    }

    pub(crate) fn fail_samples(&self, fail: bool) {
        self.chip.borrow_mut().fail_samples = fail;
    }
}

pub(crate) struct SimClock(SimBus);
pub(crate) struct SimData(SimBus);
pub(crate) struct SimEnable(SimBus);

impl ErrorType for SimClock {
    type Error = ErrorKind;
}

impl ErrorType for SimData {
    type Error = ErrorKind;
}

impl ErrorType for SimEnable {
    type Error = ErrorKind;
}

impl OutputPin for SimClock {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.chip.borrow_mut().set_clock(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.chip.borrow_mut().set_clock(PinState::High);
        Ok(())
    }
}

impl OutputPin for SimEnable {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.chip.borrow_mut().set_enable(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.chip.borrow_mut().set_enable(PinState::High);
        Ok(())
    }
}

impl OutputPin for SimData {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_state(PinState::Low)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_state(PinState::High)
    }

    fn set_state(&mut self, state: PinState) -> Result<(), Self::Error> {
        let mut chip = self.0.chip.borrow_mut();
        chip.events.push(Event::Data(state));
        chip.io = state;
        Ok(())
    }
}

impl InputPin for SimData {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut chip = self.0.chip.borrow_mut();
        if chip.fail_samples {
            return Err(ErrorKind::Other);
        }
        let level = chip.out_level;
        chip.events.push(Event::Sample(level));
        Ok(level == PinState::High)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl DataPin for SimData {
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error> {
        let mut chip = self.0.chip.borrow_mut();
        chip.events.push(Event::Direction(direction));
        chip.direction = direction;
        Ok(())
    }
}

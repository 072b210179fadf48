//! A simulated TM1638 on the far end of the bus.
//!
//! The simulation only looks at pin levels: it latches DIO on rising clock edges while strobe is
//! low, answers reads from a queue of key scan bytes, and applies complete transactions to its
//! own register file, so tests can check both the raw signals and their effect on the chip.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal_1::delay::DelayNs;
use embedded_hal_1::digital::PinState;
use tm1638::{BitBangingBusDriver, Pins, Timing, Tm1638, ValidationMode};

pub const TIMING: Timing = Timing {
    half_cycle_ns: 500,
    twait_ns: 1_500,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    Init,
    Clock(PinState),
    Strobe(PinState),
    Data(PinState),
    Sample(PinState),
    DataInput,
    DataOutput,
    Delay(u32),
    Release,
}

/// Everything that happened between one falling and the next rising edge of strobe
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    pub written: Vec<u8>,
    pub read: Vec<u8>,
}

#[derive(Default)]
struct Shifter {
    value: u8,
    bits: u8,
}

impl Shifter {
    /// Shift in one bit, LSB first; return the byte once 8 bits are in
    fn push(&mut self, high: bool) -> Option<u8> {
        if high {
            self.value |= 1 << self.bits;
        }
        self.bits += 1;

        if self.bits == 8 {
            let value = self.value;
            *self = Self::default();
            Some(value)
        } else {
            None
        }
    }
}

pub struct Chip {
    pub signals: Vec<Signal>,
    pub transactions: Vec<Transaction>,

    /// Display register file, as the chip would hold it
    pub registers: [u8; 16],
    /// Last display control command received
    pub display_control: Option<u8>,
    pub auto_increment: bool,

    /// Protocol violations seen so far
    pub violations: Vec<&'static str>,

    clock: PinState,
    strobe: PinState,
    data: PinState,
    data_is_input: bool,
    current: Option<Transaction>,
    write_shifter: Shifter,
    read_shifter: Shifter,
    response_bits: VecDeque<bool>,
}

impl Default for Chip {
    fn default() -> Self {
        Self {
            signals: Vec::new(),
            transactions: Vec::new(),
            registers: [0xa5; 16],
            display_control: None,
            auto_increment: true,
            violations: Vec::new(),
            clock: PinState::Low,
            strobe: PinState::High,
            data: PinState::Low,
            data_is_input: false,
            current: None,
            write_shifter: Shifter::default(),
            read_shifter: Shifter::default(),
            response_bits: VecDeque::new(),
        }
    }
}

impl Chip {
    /// Queue key scan bytes for the chip to answer with, in bus order
    pub fn queue_key_bytes(&mut self, bytes: [u8; 4]) {
        for byte in bytes {
            for bit in 0..8 {
                self.response_bits.push_back(byte & (1 << bit) != 0);
            }
        }
    }

    pub fn strobe_falls(&self) -> usize {
        self.signals
            .iter()
            .filter(|s| **s == Signal::Strobe(PinState::Low))
            .count()
    }

    pub fn clear_log(&mut self) {
        self.signals.clear();
        self.transactions.clear();
    }

    pub fn data_is_input(&self) -> bool {
        self.data_is_input
    }

    fn set_clock(&mut self, state: PinState) {
        let rising = self.clock == PinState::Low && state == PinState::High;
        self.clock = state;

        if rising && self.strobe == PinState::Low && !self.data_is_input {
            let high = self.data == PinState::High;
            if let Some(byte) = self.write_shifter.push(high) {
                match self.current.as_mut() {
                    Some(transaction) => transaction.written.push(byte),
                    None => self.violations.push("byte clocked outside of strobe"),
                }
            }
        }
    }

    fn set_strobe(&mut self, state: PinState) {
        match state {
            PinState::Low => {
                if self.current.is_some() {
                    self.violations.push("strobe lowered twice");
                }
                self.current = Some(Transaction::default());
            }
            PinState::High => {
                if let Some(transaction) = self.current.take() {
                    if self.write_shifter.bits != 0 || self.read_shifter.bits != 0 {
                        self.violations.push("strobe raised mid-byte");
                    }
                    self.execute(&transaction);
                    self.transactions.push(transaction);
                }
            }
        }
        self.strobe = state;
    }

    fn sample(&mut self) -> PinState {
        if !self.data_is_input {
            self.violations.push("DIO sampled while driven by host");
        }
        if self.clock != PinState::Low {
            self.violations.push("DIO sampled while clock high");
        }

        let high = self.response_bits.pop_front().unwrap_or(false);
        if let Some(byte) = self.read_shifter.push(high) {
            if let Some(transaction) = self.current.as_mut() {
                transaction.read.push(byte);
            }
        }

        PinState::from(high)
    }

    /// Apply a complete transaction the way the controller would
    fn execute(&mut self, transaction: &Transaction) {
        let Some((&command, data)) = transaction.written.split_first() else {
            return;
        };

        match command & 0b1100_0000 {
            0b0100_0000 => {
                if command & 0b0000_0010 == 0 {
                    self.auto_increment = command & 0b0000_0100 == 0;
                }
            }
            0b1000_0000 => self.display_control = Some(command),
            0b1100_0000 => {
                let mut address = (command & 0x0f) as usize;
                for byte in data {
                    self.registers[address % 16] = *byte;
                    if self.auto_increment {
                        address += 1;
                    }
                }
            }
            _ => self.violations.push("unknown command class"),
        }
    }
}

pub type SharedChip = Rc<RefCell<Chip>>;

pub struct SimPins {
    chip: SharedChip,
}

impl Pins for SimPins {
    type Error = core::convert::Infallible;

    fn init(&mut self) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        chip.signals.push(Signal::Init);
        chip.strobe = PinState::High;
        chip.clock = PinState::Low;
        chip.data = PinState::Low;
        chip.data_is_input = false;
        Ok(())
    }

    fn set_clock(&mut self, state: PinState) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        chip.signals.push(Signal::Clock(state));
        chip.set_clock(state);
        Ok(())
    }

    fn set_strobe(&mut self, state: PinState) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        chip.signals.push(Signal::Strobe(state));
        chip.set_strobe(state);
        Ok(())
    }

    fn set_data(&mut self, state: PinState) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        chip.signals.push(Signal::Data(state));
        if chip.data_is_input {
            chip.violations.push("DIO driven while switched to input");
        }
        chip.data = state;
        Ok(())
    }

    fn read_data(&mut self) -> Result<PinState, Self::Error> {
        let mut chip = self.chip.borrow_mut();
        let state = chip.sample();
        chip.signals.push(Signal::Sample(state));
        Ok(state)
    }

    fn data_as_input(&mut self) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        chip.signals.push(Signal::DataInput);
        chip.data_is_input = true;
        Ok(())
    }

    fn data_as_output(&mut self) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        chip.signals.push(Signal::DataOutput);
        chip.data_is_input = false;
        Ok(())
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        chip.signals.push(Signal::Release);
        chip.data_is_input = true;
        Ok(())
    }
}

pub struct SimDelay {
    chip: SharedChip,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.chip.borrow_mut().signals.push(Signal::Delay(ns));
    }
}

pub type SimDriver = Tm1638<BitBangingBusDriver<SimPins, SimDelay>>;

/// Build a driver talking to a fresh simulated chip.  Nothing has been sent yet.
pub fn connect(validation: ValidationMode) -> (SimDriver, SharedChip) {
    let chip = SharedChip::default();

    let tm1638 = Tm1638::builder()
        .timing(TIMING)
        .validation(validation)
        .with_delay(SimDelay { chip: chip.clone() })
        .with_bit_banging_driver(SimPins { chip: chip.clone() })
        .build()
        .unwrap();

    (tm1638, chip)
}

/// Like [`connect`], after `init` and with the log cleared
pub fn connect_initialized(validation: ValidationMode) -> (SimDriver, SharedChip) {
    let (mut tm1638, chip) = connect(validation);
    tm1638.init().unwrap();
    chip.borrow_mut().clear_log();

    (tm1638, chip)
}

/// The written bytes of every transaction since the log was last cleared
pub fn written(chip: &SharedChip) -> Vec<Vec<u8>> {
    chip.borrow()
        .transactions
        .iter()
        .map(|t| t.written.clone())
        .collect()
}

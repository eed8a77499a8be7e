//! Processor status register (P).
//!
//! Eight one-bit flags packed into a single byte. The byte is the only
//! source of truth; every flag accessor is a shift and mask over it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single bit of the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Carry,
    Zero,
    InterruptDisable,
    /// Settable but inert: the NES CPU has no decimal arithmetic.
    Decimal,
    Break,
    Unused,
    Overflow,
    /// Also known as Negative (N).
    Sign,
}

impl Flag {
    pub const ALL: [Flag; 8] = [
        Flag::Carry,
        Flag::Zero,
        Flag::InterruptDisable,
        Flag::Decimal,
        Flag::Break,
        Flag::Unused,
        Flag::Overflow,
        Flag::Sign,
    ];

    pub fn bit(self) -> u8 {
        match self {
            Flag::Carry => 0,
            Flag::Zero => 1,
            Flag::InterruptDisable => 2,
            Flag::Decimal => 3,
            Flag::Break => 4,
            Flag::Unused => 5,
            Flag::Overflow => 6,
            Flag::Sign => 7,
        }
    }

    pub fn mask(self) -> u8 {
        1 << self.bit()
    }

    /// Single-letter name used in trace output, e.g. `C` or `V`.
    pub fn letter(self) -> char {
        match self {
            Flag::Carry => 'C',
            Flag::Zero => 'Z',
            Flag::InterruptDisable => 'I',
            Flag::Decimal => 'D',
            Flag::Break => 'B',
            Flag::Unused => '-',
            Flag::Overflow => 'V',
            Flag::Sign => 'S',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Flag::Carry => "carry",
            Flag::Zero => "zero",
            Flag::InterruptDisable => "interrupt_disable",
            Flag::Decimal => "decimal",
            Flag::Break => "break",
            Flag::Unused => "unused",
            Flag::Overflow => "overflow",
            Flag::Sign => "sign",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusRegister(u8);

impl StatusRegister {
    pub fn new(byte: u8) -> Self {
        StatusRegister(byte)
    }

    /// Returns 0 or 1.
    pub fn get(&self, flag: Flag) -> u8 {
        (self.0 & flag.mask()) >> flag.bit()
    }

    pub fn is_set(&self, flag: Flag) -> bool {
        self.0 & flag.mask() != 0
    }

    pub fn set(&mut self, flag: Flag) {
        self.0 |= flag.mask();
    }

    pub fn clear(&mut self, flag: Flag) {
        self.0 &= !flag.mask();
    }

    pub fn assign(&mut self, flag: Flag, value: bool) {
        if value {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    pub fn read(&self) -> u8 {
        self.0
    }

    pub fn write(&mut self, byte: u8) {
        self.0 = byte;
    }
}

impl fmt::Display for StatusRegister {
    /// Renders high bit first, lowercase for a clear flag: `Sv-bdIzc`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in Flag::ALL.iter().rev() {
            let letter = flag.letter();
            if self.is_set(*flag) {
                write!(f, "{}", letter)?;
            } else {
                write!(f, "{}", letter.to_ascii_lowercase())?;
            }
        }
        Ok(())
    }
}

impl From<u8> for StatusRegister {
    fn from(byte: u8) -> Self {
        StatusRegister(byte)
    }
}

impl From<StatusRegister> for u8 {
    fn from(status: StatusRegister) -> Self {
        status.0
    }
}

//! # NES 6502 CPU Emulator
//!
//! An implementation of the MOS 6502 as wired into the NES: the full
//! documented instruction set over a 64 KiB address space with the console's
//! RAM and I/O register mirroring.
//!
//! ## Features
//!
//! - All 151 documented opcodes, dispatched through a 256-entry table
//! - Binary-mode flag handling for arithmetic, logic, shifts and compares
//! - Hardware quirks kept intact (zero-page wraparound, JMP indirect page bug)
//! - iNES cartridge loading, JSON snapshots, Prometheus counters
//!
//! ## Example
//!
//! ```rust
//! use nes6502::{Cpu, Flag};
//!
//! let mut cpu = Cpu::new();
//!
//! // LDA #$42, TAX
//! cpu.load_program(&[0xA9, 0x42, 0xAA], 0x8000);
//!
//! // Set reset vector
//! cpu.write(0xFFFC, 0x00);
//! cpu.write(0xFFFD, 0x80);
//!
//! cpu.reset();
//! cpu.step().unwrap(); // Execute LDA
//! cpu.step().unwrap(); // Execute TAX
//!
//! assert_eq!(cpu.get_register_x(), 0x42);
//! assert!(!cpu.get_flag(Flag::Zero));
//! ```

pub mod addressing;
pub mod cartridge;
pub mod config;
pub mod cpu;
mod instructions;
pub mod memory;
pub mod metrics;
pub mod opcodes;
pub mod snapshots;
pub mod status;

pub use addressing::AddressingMode;
pub use cartridge::{Cartridge, CartridgeError};
pub use config::{EmulatorConfig, EntryPoint};
pub use cpu::{Cpu, CpuError};
pub use memory::Memory;
pub use opcodes::{opcode_info, Instruction, Mnemonic};
pub use snapshots::{Snapshot, SnapshotError};
pub use status::{Flag, StatusRegister};

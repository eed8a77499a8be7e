use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::{EmulatorConfig, EntryPoint};
use crate::memory::Memory;
use crate::metrics::{record_illegal_opcode, record_instruction, record_reset, Timer};
use crate::opcodes::{disassemble, opcode_info};
use crate::status::{Flag, StatusRegister};

/// Base of the hardware stack page; SP indexes into `0x0100..=0x01FF`.
pub const STACK_BASE: u16 = 0x0100;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const BRK_VECTOR: u16 = 0xFFFE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("illegal opcode 0x{opcode:02X} at ${pc:04X}")]
    IllegalOpcode { opcode: u8, pc: u16 },

    #[error("CPU is halted at ${pc:04X}")]
    Halted { pc: u16 },
}

pub struct Cpu {
    pub(crate) a: u8,       // Accumulator
    pub(crate) x: u8,       // X Index Register
    pub(crate) y: u8,       // Y Index Register
    pub(crate) pc: u16,     // Program Counter
    pub(crate) sp: u8,      // Stack Pointer
    pub(crate) status: StatusRegister,
    pub(crate) memory: Memory,

    config: EmulatorConfig,
    instructions: u64,
    halted: bool,
}

impl Cpu {
    /// All registers zeroed, memory cleared, default configuration.
    pub fn new() -> Self {
        Self::with_memory(Memory::new())
    }

    /// Wraps a pre-populated memory image, e.g. one a cartridge was mapped into.
    pub fn with_memory(memory: Memory) -> Self {
        Cpu {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            sp: 0,
            status: StatusRegister::default(),
            memory,
            config: EmulatorConfig::default(),
            instructions: 0,
            halted: false,
        }
    }

    pub fn with_config(config: EmulatorConfig) -> Self {
        let mut cpu = Self::new();
        cpu.config = config;
        cpu
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EmulatorConfig) {
        self.config = config;
    }

    /// Applies the configured memory pokes, then loads PC from the entry point
    /// and puts the registers in their power-up state.
    pub fn reset(&mut self) {
        for (&address, &value) in &self.config.initial_memory {
            self.memory.write(address, value);
        }

        self.pc = match self.config.entry_point {
            EntryPoint::ResetVector => self.memory.read_u16(RESET_VECTOR),
            EntryPoint::Address(address) => address,
        };

        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = self.config.stack_pointer;
        self.status.write(Flag::Unused.mask() | Flag::InterruptDisable.mask());
        self.instructions = 0;
        self.halted = false;

        record_reset();
        debug!("cpu reset, entry point ${:04X}", self.pc);
    }

    /// Executes exactly one instruction, operand bytes included.
    ///
    /// An illegal opcode leaves every register untouched (PC still points at
    /// the offending byte) and halts the CPU; later calls report `Halted`.
    pub fn step(&mut self) -> Result<(), CpuError> {
        if self.halted {
            return Err(CpuError::Halted { pc: self.pc });
        }

        let pc = self.pc;
        let opcode = self.memory.read(pc);
        let Some(instruction) = opcode_info(opcode) else {
            self.halted = true;
            record_illegal_opcode(opcode);
            warn!("illegal opcode 0x{:02X} at ${:04X}, halting", opcode, pc);
            return Err(CpuError::IllegalOpcode { opcode, pc });
        };

        if self.config.trace {
            let (text, _) = disassemble(&self.memory, pc);
            trace!(
                "{:04X}  {:02X}  {:<12} A:{:02X} X:{:02X} Y:{:02X} P:{} SP:{:02X}",
                pc, opcode, text, self.a, self.x, self.y, self.status, self.sp
            );
        }

        let timer = Timer::new();
        self.pc = pc.wrapping_add(1);
        (instruction.execute)(self, instruction.mode);
        self.instructions += 1;

        // Record metrics for this instruction
        record_instruction(opcode, instruction.mnemonic.as_str(), timer.elapsed());
        Ok(())
    }

    /// Steps until `max_steps` instructions have run or one fails. Returns the
    /// number executed. The configured step limit, if any, also caps the run.
    pub fn run(&mut self, max_steps: u64) -> Result<u64, CpuError> {
        let budget = match self.config.step_limit {
            Some(limit) => max_steps.min(limit),
            None => max_steps,
        };
        let mut executed = 0;
        while executed < budget {
            self.step()?;
            executed += 1;
        }
        Ok(executed)
    }

    // Getters
    pub fn get_register_a(&self) -> u8 { self.a }
    pub fn get_register_x(&self) -> u8 { self.x }
    pub fn get_register_y(&self) -> u8 { self.y }
    pub fn get_pc(&self) -> u16 { self.pc }
    pub fn get_sp(&self) -> u8 { self.sp }
    pub fn get_status(&self) -> u8 { self.status.read() }
    pub fn status(&self) -> StatusRegister { self.status }
    pub fn is_halted(&self) -> bool { self.halted }
    pub fn instruction_count(&self) -> u64 { self.instructions }

    pub fn get_flag(&self, flag: Flag) -> bool {
        self.status.is_set(flag)
    }

    // Setters, for test setup and snapshot restore
    pub fn set_register_a(&mut self, value: u8) { self.a = value; }
    pub fn set_register_x(&mut self, value: u8) { self.x = value; }
    pub fn set_register_y(&mut self, value: u8) { self.y = value; }
    pub fn set_pc(&mut self, value: u16) { self.pc = value; }
    pub fn set_sp(&mut self, value: u8) { self.sp = value; }
    pub fn set_status(&mut self, value: u8) { self.status.write(value); }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        self.status.assign(flag, value);
    }

    pub(crate) fn set_halted(&mut self, halted: bool) {
        self.halted = halted;
    }

    pub(crate) fn set_instruction_count(&mut self, count: u64) {
        self.instructions = count;
    }

    /// Clears a halt so stepping can continue after the caller fixed memory.
    pub fn resume(&mut self) {
        self.halted = false;
    }

    // Memory access
    pub fn read(&self, address: u16) -> u8 {
        self.memory.read(address)
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.memory.write(address, value);
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn load_program(&mut self, program: &[u8], start: u16) {
        self.memory.load_rom(program, start);
    }

    // Stack operations
    pub fn push(&mut self, value: u8) {
        self.memory.write(STACK_BASE + self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub fn pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.memory.read(STACK_BASE + self.sp as u16)
    }

    pub(crate) fn push_u16(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push((value & 0xFF) as u8);
    }

    pub(crate) fn pop_u16(&mut self) -> u16 {
        let low = self.pop() as u16;
        let high = self.pop() as u16;
        (high << 8) | low
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("a", &format_args!("{:02X}", self.a))
            .field("x", &format_args!("{:02X}", self.x))
            .field("y", &format_args!("{:02X}", self.y))
            .field("pc", &format_args!("{:04X}", self.pc))
            .field("sp", &format_args!("{:02X}", self.sp))
            .field("status", &format_args!("{}", self.status))
            .field("instructions", &self.instructions)
            .field("halted", &self.halted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boot(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(program, 0x8000);
        cpu.write(0xFFFC, 0x00);
        cpu.write(0xFFFD, 0x80);
        cpu.reset();
        cpu
    }

    #[test]
    fn test_new_is_zeroed() {
        let cpu = Cpu::new();
        assert_eq!(cpu.get_register_a(), 0);
        assert_eq!(cpu.get_register_x(), 0);
        assert_eq!(cpu.get_register_y(), 0);
        assert_eq!(cpu.get_sp(), 0);
        assert_eq!(cpu.get_pc(), 0);
        assert_eq!(cpu.get_status(), 0);
        assert!(!cpu.is_halted());
    }

    #[test]
    fn test_reset_reads_vector() {
        let cpu = boot(&[0xEA]);
        assert_eq!(cpu.get_pc(), 0x8000);
        assert_eq!(cpu.get_sp(), 0xFD);
        assert!(cpu.get_flag(Flag::InterruptDisable));
        assert!(cpu.get_flag(Flag::Unused));
    }

    #[test]
    fn test_reset_explicit_entry_point() {
        let mut config = EmulatorConfig::default();
        config.entry_point = EntryPoint::Address(0xC000);
        config.initial_memory.insert(0x0010, 0x77);

        let mut cpu = Cpu::with_config(config);
        cpu.reset();

        assert_eq!(cpu.get_pc(), 0xC000);
        assert_eq!(cpu.read(0x0010), 0x77);
    }

    #[test]
    fn test_lda_immediate() {
        // LDA #$42
        let mut cpu = boot(&[0xA9, 0x42]);
        cpu.step().unwrap();

        assert_eq!(cpu.get_register_a(), 0x42);
        assert_eq!(cpu.get_pc(), 0x8002);
        assert!(!cpu.get_flag(Flag::Zero));
        assert!(!cpu.get_flag(Flag::Sign));
        assert_eq!(cpu.instruction_count(), 1);
    }

    #[test]
    fn test_illegal_opcode_halts_without_side_effects() {
        let mut cpu = boot(&[0xA9, 0x42, 0x02]);
        cpu.step().unwrap();

        let err = cpu.step().unwrap_err();
        assert_eq!(err, CpuError::IllegalOpcode { opcode: 0x02, pc: 0x8002 });
        assert_eq!(err.to_string(), "illegal opcode 0x02 at $8002");
        assert_eq!(cpu.get_pc(), 0x8002);
        assert_eq!(cpu.get_register_a(), 0x42);
        assert!(cpu.is_halted());

        assert_eq!(cpu.step(), Err(CpuError::Halted { pc: 0x8002 }));
        assert_eq!(cpu.instruction_count(), 1);
    }

    #[test]
    fn test_resume_after_patching() {
        let mut cpu = boot(&[0x02]);
        assert!(cpu.step().is_err());

        cpu.write(0x8000, 0xEA);
        cpu.resume();
        cpu.step().unwrap();
        assert_eq!(cpu.get_pc(), 0x8001);
    }

    #[test]
    fn test_run_counts_and_stops_on_error() {
        // NOP, NOP, NOP, illegal
        let mut cpu = boot(&[0xEA, 0xEA, 0xEA, 0xFF]);
        assert_eq!(cpu.run(2), Ok(2));
        assert_eq!(cpu.run(10), Err(CpuError::IllegalOpcode { opcode: 0xFF, pc: 0x8003 }));
        assert_eq!(cpu.instruction_count(), 3);
    }

    #[test]
    fn test_run_respects_step_limit() {
        let mut config = EmulatorConfig::default();
        config.step_limit = Some(3);
        let mut cpu = Cpu::with_config(config);
        cpu.load_program(&[0xEA; 16], 0x8000);
        cpu.set_pc(0x8000);

        assert_eq!(cpu.run(100), Ok(3));
        assert_eq!(cpu.get_pc(), 0x8003);
    }

    #[test]
    fn test_stack_is_lifo() {
        let mut cpu = boot(&[]);
        let start = cpu.get_sp();
        for value in [0x11, 0x22, 0x33] {
            cpu.push(value);
        }
        assert_eq!(cpu.get_sp(), start.wrapping_sub(3));
        assert_eq!(cpu.read(0x01FD), 0x11);

        assert_eq!(cpu.pop(), 0x33);
        assert_eq!(cpu.pop(), 0x22);
        assert_eq!(cpu.pop(), 0x11);
        assert_eq!(cpu.get_sp(), start);
    }

    #[test]
    fn test_stack_wraps_without_protection() {
        let mut cpu = Cpu::new();
        cpu.set_sp(0x00);
        cpu.push(0xAB);
        assert_eq!(cpu.get_sp(), 0xFF);
        assert_eq!(cpu.read(0x0100), 0xAB);
        assert_eq!(cpu.pop(), 0xAB);
        assert_eq!(cpu.get_sp(), 0x00);
    }

    #[test]
    fn test_stack_word_order() {
        let mut cpu = boot(&[]);
        cpu.push_u16(0x1234);
        assert_eq!(cpu.read(0x01FD), 0x12);
        assert_eq!(cpu.read(0x01FC), 0x34);
        assert_eq!(cpu.pop_u16(), 0x1234);
    }
}

//! Addressing-mode resolution.
//!
//! Every resolver runs with PC pointing at the first operand byte and leaves
//! it pointing at the next opcode. Hardware quirks are reproduced, not fixed:
//! zero-page indexing wraps inside page zero, and an indirect pointer at
//! `$xxFF` fetches its high byte from `$xx00`.

use serde::{Deserialize, Serialize};

use crate::cpu::Cpu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    /// `($nn,X)`, pre-indexed.
    IndexedIndirect,
    /// `($nn),Y`, post-indexed.
    IndirectIndexed,
}

impl AddressingMode {
    /// Bytes consumed after the opcode.
    pub fn operand_bytes(self) -> u16 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Relative
            | AddressingMode::IndexedIndirect
            | AddressingMode::IndirectIndexed => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
        }
    }
}

/// Where a read-modify-write instruction takes its operand from and puts its
/// result back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Accumulator,
    Memory(u16),
}

/// Little-endian pointer read that never carries out of the pointer's page.
fn page_wrapped_pointer(cpu: &Cpu, pointer: u16) -> u16 {
    let low = cpu.read(pointer) as u16;
    let high_address = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
    let high = cpu.read(high_address) as u16;
    (high << 8) | low
}

impl Cpu {
    pub(crate) fn fetch_byte(&mut self) -> u8 {
        let byte = self.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    pub(crate) fn fetch_word(&mut self) -> u16 {
        let low = self.fetch_byte() as u16;
        let high = self.fetch_byte() as u16;
        (high << 8) | low
    }

    /// Effective address for `mode`, advancing PC past the operand bytes.
    ///
    /// `Implied` and `Accumulator` consume nothing and return the current PC;
    /// callers that need the accumulator go through [`Cpu::resolve`].
    /// `Relative` returns the branch target without jumping.
    pub fn get_address(&mut self, mode: AddressingMode) -> u16 {
        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => self.pc,
            AddressingMode::Immediate => {
                let address = self.pc;
                self.pc = self.pc.wrapping_add(1);
                address
            }
            AddressingMode::ZeroPage => self.fetch_byte() as u16,
            AddressingMode::ZeroPageX => self.fetch_byte().wrapping_add(self.x) as u16,
            AddressingMode::ZeroPageY => self.fetch_byte().wrapping_add(self.y) as u16,
            AddressingMode::Relative => {
                let offset = self.fetch_byte();
                self.pc.wrapping_add_signed(offset as i8 as i16)
            }
            AddressingMode::Absolute => self.fetch_word(),
            AddressingMode::AbsoluteX => self.fetch_word().wrapping_add(self.x as u16),
            AddressingMode::AbsoluteY => self.fetch_word().wrapping_add(self.y as u16),
            AddressingMode::Indirect => {
                let pointer = self.fetch_word();
                page_wrapped_pointer(self, pointer)
            }
            AddressingMode::IndexedIndirect => {
                let pointer = self.fetch_byte().wrapping_add(self.x) as u16;
                page_wrapped_pointer(self, pointer)
            }
            AddressingMode::IndirectIndexed => {
                let pointer = self.fetch_byte() as u16;
                page_wrapped_pointer(self, pointer).wrapping_add(self.y as u16)
            }
        }
    }

    /// Operand value for `mode`; the accumulator itself in accumulator mode.
    pub fn operand(&mut self, mode: AddressingMode) -> u8 {
        match self.resolve(mode) {
            Operand::Accumulator => self.a,
            Operand::Memory(address) => self.read(address),
        }
    }

    pub(crate) fn resolve(&mut self, mode: AddressingMode) -> Operand {
        match mode {
            AddressingMode::Accumulator => Operand::Accumulator,
            _ => Operand::Memory(self.get_address(mode)),
        }
    }

    pub(crate) fn load(&self, operand: Operand) -> u8 {
        match operand {
            Operand::Accumulator => self.a,
            Operand::Memory(address) => self.read(address),
        }
    }

    pub(crate) fn store(&mut self, operand: Operand, value: u8) {
        match operand {
            Operand::Accumulator => self.a = value,
            Operand::Memory(address) => self.write(address, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_at(pc: u16, operands: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(operands, pc);
        cpu.set_pc(pc);
        cpu
    }

    #[test]
    fn test_immediate_is_pc() {
        let mut cpu = cpu_at(0x8001, &[0x42]);
        assert_eq!(cpu.get_address(AddressingMode::Immediate), 0x8001);
        assert_eq!(cpu.get_pc(), 0x8002);
    }

    #[test]
    fn test_zero_page_x_wraps_in_page_zero() {
        let mut cpu = cpu_at(0x8000, &[0xFF]);
        cpu.set_register_x(0x01);
        assert_eq!(cpu.get_address(AddressingMode::ZeroPageX), 0x0000);
        assert_eq!(cpu.get_pc(), 0x8001);

        // 0x80 + 0x7F is 0xFF, which a `% 0xFF` would turn into 0x00
        let mut cpu = cpu_at(0x8000, &[0x80]);
        cpu.set_register_x(0x7F);
        assert_eq!(cpu.get_address(AddressingMode::ZeroPageX), 0x00FF);

        let mut cpu = cpu_at(0x8000, &[0xF0]);
        cpu.set_register_y(0x20);
        assert_eq!(cpu.get_address(AddressingMode::ZeroPageY), 0x0010);
    }

    #[test]
    fn test_absolute_modes() {
        let mut cpu = cpu_at(0x8000, &[0x34, 0x12]);
        assert_eq!(cpu.get_address(AddressingMode::Absolute), 0x1234);
        assert_eq!(cpu.get_pc(), 0x8002);

        let mut cpu = cpu_at(0x8000, &[0xFF, 0xFF]);
        cpu.set_register_x(0x02);
        assert_eq!(cpu.get_address(AddressingMode::AbsoluteX), 0x0001);

        let mut cpu = cpu_at(0x8000, &[0xF0, 0x12]);
        cpu.set_register_y(0x20);
        assert_eq!(cpu.get_address(AddressingMode::AbsoluteY), 0x1310);
    }

    #[test]
    fn test_indirect_page_boundary_bug() {
        let mut cpu = cpu_at(0x8000, &[0xFF, 0x02]);
        cpu.write(0x02FF, 0x80);
        cpu.write(0x0300, 0x50);
        cpu.write(0x0200, 0x40);

        assert_eq!(cpu.get_address(AddressingMode::Indirect), 0x4080);
        assert_eq!(cpu.get_pc(), 0x8002);

        let mut cpu = cpu_at(0x8000, &[0x10, 0x02]);
        cpu.write(0x0210, 0xCD);
        cpu.write(0x0211, 0xAB);
        assert_eq!(cpu.get_address(AddressingMode::Indirect), 0xABCD);
    }

    #[test]
    fn test_indexed_indirect_wraps_pointer() {
        let mut cpu = cpu_at(0x8000, &[0xFE]);
        cpu.set_register_x(0x01);
        cpu.write(0x00FF, 0x34);
        cpu.write(0x0000, 0x12);
        cpu.write(0x0100, 0x99);

        assert_eq!(cpu.get_address(AddressingMode::IndexedIndirect), 0x1234);
        assert_eq!(cpu.get_pc(), 0x8001);
    }

    #[test]
    fn test_indirect_indexed_crosses_pages() {
        let mut cpu = cpu_at(0x8000, &[0x40]);
        cpu.set_register_y(0x10);
        cpu.write(0x0040, 0xF8);
        cpu.write(0x0041, 0x30);

        assert_eq!(cpu.get_address(AddressingMode::IndirectIndexed), 0x3108);

        let mut cpu = cpu_at(0x8000, &[0x40]);
        cpu.set_register_y(0x02);
        cpu.write(0x0040, 0xFF);
        cpu.write(0x0041, 0xFF);
        assert_eq!(cpu.get_address(AddressingMode::IndirectIndexed), 0x0001);
    }

    #[test]
    fn test_relative_target() {
        let mut cpu = cpu_at(0x8001, &[0xFC]);
        assert_eq!(cpu.get_address(AddressingMode::Relative), 0x7FFE);
        assert_eq!(cpu.get_pc(), 0x8002);
    }

    #[test]
    fn test_accumulator_operand() {
        let mut cpu = cpu_at(0x8000, &[0x99]);
        cpu.set_register_a(0x5A);
        assert_eq!(cpu.operand(AddressingMode::Accumulator), 0x5A);
        assert_eq!(cpu.get_pc(), 0x8000);

        assert_eq!(cpu.operand(AddressingMode::Immediate), 0x99);
        assert_eq!(cpu.get_pc(), 0x8001);
    }

    #[test]
    fn test_operand_bytes() {
        assert_eq!(AddressingMode::Accumulator.operand_bytes(), 0);
        assert_eq!(AddressingMode::IndirectIndexed.operand_bytes(), 1);
        assert_eq!(AddressingMode::Indirect.operand_bytes(), 2);
    }
}

//! Opcode dispatch table.
//!
//! The table is a 256-entry array indexed by opcode byte, built once on first
//! use and never mutated afterwards. Entries left as `None` are illegal opcodes.

use lazy_static::lazy_static;
use std::fmt;

use crate::addressing::AddressingMode;
use crate::cpu::Cpu;
use crate::memory::Memory;

/// Instruction body. The addressing mode selects operand resolution; the
/// body itself is shared across every mode it is bound to.
pub type Handler = fn(&mut Cpu, AddressingMode);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl Mnemonic {
    pub fn as_str(self) -> &'static str {
        match self {
            Mnemonic::Adc => "ADC",
            Mnemonic::And => "AND",
            Mnemonic::Asl => "ASL",
            Mnemonic::Bcc => "BCC",
            Mnemonic::Bcs => "BCS",
            Mnemonic::Beq => "BEQ",
            Mnemonic::Bit => "BIT",
            Mnemonic::Bmi => "BMI",
            Mnemonic::Bne => "BNE",
            Mnemonic::Bpl => "BPL",
            Mnemonic::Brk => "BRK",
            Mnemonic::Bvc => "BVC",
            Mnemonic::Bvs => "BVS",
            Mnemonic::Clc => "CLC",
            Mnemonic::Cld => "CLD",
            Mnemonic::Cli => "CLI",
            Mnemonic::Clv => "CLV",
            Mnemonic::Cmp => "CMP",
            Mnemonic::Cpx => "CPX",
            Mnemonic::Cpy => "CPY",
            Mnemonic::Dec => "DEC",
            Mnemonic::Dex => "DEX",
            Mnemonic::Dey => "DEY",
            Mnemonic::Eor => "EOR",
            Mnemonic::Inc => "INC",
            Mnemonic::Inx => "INX",
            Mnemonic::Iny => "INY",
            Mnemonic::Jmp => "JMP",
            Mnemonic::Jsr => "JSR",
            Mnemonic::Lda => "LDA",
            Mnemonic::Ldx => "LDX",
            Mnemonic::Ldy => "LDY",
            Mnemonic::Lsr => "LSR",
            Mnemonic::Nop => "NOP",
            Mnemonic::Ora => "ORA",
            Mnemonic::Pha => "PHA",
            Mnemonic::Php => "PHP",
            Mnemonic::Pla => "PLA",
            Mnemonic::Plp => "PLP",
            Mnemonic::Rol => "ROL",
            Mnemonic::Ror => "ROR",
            Mnemonic::Rti => "RTI",
            Mnemonic::Rts => "RTS",
            Mnemonic::Sbc => "SBC",
            Mnemonic::Sec => "SEC",
            Mnemonic::Sed => "SED",
            Mnemonic::Sei => "SEI",
            Mnemonic::Sta => "STA",
            Mnemonic::Stx => "STX",
            Mnemonic::Sty => "STY",
            Mnemonic::Tax => "TAX",
            Mnemonic::Tay => "TAY",
            Mnemonic::Tsx => "TSX",
            Mnemonic::Txa => "TXA",
            Mnemonic::Txs => "TXS",
            Mnemonic::Tya => "TYA",
        }
    }

    fn handler(self) -> Handler {
        match self {
            Mnemonic::Adc => Cpu::adc,
            Mnemonic::And => Cpu::and,
            Mnemonic::Asl => Cpu::asl,
            Mnemonic::Bcc => Cpu::bcc,
            Mnemonic::Bcs => Cpu::bcs,
            Mnemonic::Beq => Cpu::beq,
            Mnemonic::Bit => Cpu::bit,
            Mnemonic::Bmi => Cpu::bmi,
            Mnemonic::Bne => Cpu::bne,
            Mnemonic::Bpl => Cpu::bpl,
            Mnemonic::Brk => Cpu::brk,
            Mnemonic::Bvc => Cpu::bvc,
            Mnemonic::Bvs => Cpu::bvs,
            Mnemonic::Clc => Cpu::clc,
            Mnemonic::Cld => Cpu::cld,
            Mnemonic::Cli => Cpu::cli,
            Mnemonic::Clv => Cpu::clv,
            Mnemonic::Cmp => Cpu::cmp,
            Mnemonic::Cpx => Cpu::cpx,
            Mnemonic::Cpy => Cpu::cpy,
            Mnemonic::Dec => Cpu::dec,
            Mnemonic::Dex => Cpu::dex,
            Mnemonic::Dey => Cpu::dey,
            Mnemonic::Eor => Cpu::eor,
            Mnemonic::Inc => Cpu::inc,
            Mnemonic::Inx => Cpu::inx,
            Mnemonic::Iny => Cpu::iny,
            Mnemonic::Jmp => Cpu::jmp,
            Mnemonic::Jsr => Cpu::jsr,
            Mnemonic::Lda => Cpu::lda,
            Mnemonic::Ldx => Cpu::ldx,
            Mnemonic::Ldy => Cpu::ldy,
            Mnemonic::Lsr => Cpu::lsr,
            Mnemonic::Nop => Cpu::nop,
            Mnemonic::Ora => Cpu::ora,
            Mnemonic::Pha => Cpu::pha,
            Mnemonic::Php => Cpu::php,
            Mnemonic::Pla => Cpu::pla,
            Mnemonic::Plp => Cpu::plp,
            Mnemonic::Rol => Cpu::rol,
            Mnemonic::Ror => Cpu::ror,
            Mnemonic::Rti => Cpu::rti,
            Mnemonic::Rts => Cpu::rts,
            Mnemonic::Sbc => Cpu::sbc,
            Mnemonic::Sec => Cpu::sec,
            Mnemonic::Sed => Cpu::sed,
            Mnemonic::Sei => Cpu::sei,
            Mnemonic::Sta => Cpu::sta,
            Mnemonic::Stx => Cpu::stx,
            Mnemonic::Sty => Cpu::sty,
            Mnemonic::Tax => Cpu::tax,
            Mnemonic::Tay => Cpu::tay,
            Mnemonic::Tsx => Cpu::tsx,
            Mnemonic::Txa => Cpu::txa,
            Mnemonic::Txs => Cpu::txs,
            Mnemonic::Tya => Cpu::tya,
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bound entry of the dispatch table.
#[derive(Clone, Copy)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    pub execute: Handler,
}

impl Instruction {
    fn new(opcode: u8, mnemonic: Mnemonic, mode: AddressingMode) -> Self {
        Instruction {
            opcode,
            mnemonic,
            mode,
            execute: mnemonic.handler(),
        }
    }

    /// Opcode byte plus operand bytes.
    pub fn size(&self) -> u16 {
        1 + self.mode.operand_bytes()
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("opcode", &format_args!("0x{:02X}", self.opcode))
            .field("mnemonic", &self.mnemonic)
            .field("mode", &self.mode)
            .finish()
    }
}

use AddressingMode::*;
use Mnemonic::*;

// Documented NMOS 6502 opcodes. Everything else is illegal.
const OPCODES: [(u8, Mnemonic, AddressingMode); 151] = [
    (0x69, Adc, Immediate), (0x65, Adc, ZeroPage), (0x75, Adc, ZeroPageX), (0x6D, Adc, Absolute),
    (0x7D, Adc, AbsoluteX), (0x79, Adc, AbsoluteY), (0x61, Adc, IndexedIndirect), (0x71, Adc, IndirectIndexed),

    (0x29, And, Immediate), (0x25, And, ZeroPage), (0x35, And, ZeroPageX), (0x2D, And, Absolute),
    (0x3D, And, AbsoluteX), (0x39, And, AbsoluteY), (0x21, And, IndexedIndirect), (0x31, And, IndirectIndexed),

    (0x0A, Asl, Accumulator), (0x06, Asl, ZeroPage), (0x16, Asl, ZeroPageX), (0x0E, Asl, Absolute),
    (0x1E, Asl, AbsoluteX),

    (0x90, Bcc, Relative), (0xB0, Bcs, Relative), (0xF0, Beq, Relative), (0x30, Bmi, Relative),
    (0xD0, Bne, Relative), (0x10, Bpl, Relative), (0x50, Bvc, Relative), (0x70, Bvs, Relative),

    (0x24, Bit, ZeroPage), (0x2C, Bit, Absolute),

    (0x00, Brk, Implied),

    (0x18, Clc, Implied), (0xD8, Cld, Implied), (0x58, Cli, Implied), (0xB8, Clv, Implied),

    (0xC9, Cmp, Immediate), (0xC5, Cmp, ZeroPage), (0xD5, Cmp, ZeroPageX), (0xCD, Cmp, Absolute),
    (0xDD, Cmp, AbsoluteX), (0xD9, Cmp, AbsoluteY), (0xC1, Cmp, IndexedIndirect), (0xD1, Cmp, IndirectIndexed),

    (0xE0, Cpx, Immediate), (0xE4, Cpx, ZeroPage), (0xEC, Cpx, Absolute),
    (0xC0, Cpy, Immediate), (0xC4, Cpy, ZeroPage), (0xCC, Cpy, Absolute),

    (0xC6, Dec, ZeroPage), (0xD6, Dec, ZeroPageX), (0xCE, Dec, Absolute), (0xDE, Dec, AbsoluteX),
    (0xCA, Dex, Implied), (0x88, Dey, Implied),

    (0x49, Eor, Immediate), (0x45, Eor, ZeroPage), (0x55, Eor, ZeroPageX), (0x4D, Eor, Absolute),
    (0x5D, Eor, AbsoluteX), (0x59, Eor, AbsoluteY), (0x41, Eor, IndexedIndirect), (0x51, Eor, IndirectIndexed),

    (0xE6, Inc, ZeroPage), (0xF6, Inc, ZeroPageX), (0xEE, Inc, Absolute), (0xFE, Inc, AbsoluteX),
    (0xE8, Inx, Implied), (0xC8, Iny, Implied),

    (0x4C, Jmp, Absolute), (0x6C, Jmp, Indirect),
    (0x20, Jsr, Absolute),

    (0xA9, Lda, Immediate), (0xA5, Lda, ZeroPage), (0xB5, Lda, ZeroPageX), (0xAD, Lda, Absolute),
    (0xBD, Lda, AbsoluteX), (0xB9, Lda, AbsoluteY), (0xA1, Lda, IndexedIndirect), (0xB1, Lda, IndirectIndexed),

    (0xA2, Ldx, Immediate), (0xA6, Ldx, ZeroPage), (0xB6, Ldx, ZeroPageY), (0xAE, Ldx, Absolute),
    (0xBE, Ldx, AbsoluteY),

    (0xA0, Ldy, Immediate), (0xA4, Ldy, ZeroPage), (0xB4, Ldy, ZeroPageX), (0xAC, Ldy, Absolute),
    (0xBC, Ldy, AbsoluteX),

    (0x4A, Lsr, Accumulator), (0x46, Lsr, ZeroPage), (0x56, Lsr, ZeroPageX), (0x4E, Lsr, Absolute),
    (0x5E, Lsr, AbsoluteX),

    (0xEA, Nop, Implied),

    (0x09, Ora, Immediate), (0x05, Ora, ZeroPage), (0x15, Ora, ZeroPageX), (0x0D, Ora, Absolute),
    (0x1D, Ora, AbsoluteX), (0x19, Ora, AbsoluteY), (0x01, Ora, IndexedIndirect), (0x11, Ora, IndirectIndexed),

    (0x48, Pha, Implied), (0x08, Php, Implied), (0x68, Pla, Implied), (0x28, Plp, Implied),

    (0x2A, Rol, Accumulator), (0x26, Rol, ZeroPage), (0x36, Rol, ZeroPageX), (0x2E, Rol, Absolute),
    (0x3E, Rol, AbsoluteX),

    (0x6A, Ror, Accumulator), (0x66, Ror, ZeroPage), (0x76, Ror, ZeroPageX), (0x6E, Ror, Absolute),
    (0x7E, Ror, AbsoluteX),

    (0x40, Rti, Implied), (0x60, Rts, Implied),

    (0xE9, Sbc, Immediate), (0xE5, Sbc, ZeroPage), (0xF5, Sbc, ZeroPageX), (0xED, Sbc, Absolute),
    (0xFD, Sbc, AbsoluteX), (0xF9, Sbc, AbsoluteY), (0xE1, Sbc, IndexedIndirect), (0xF1, Sbc, IndirectIndexed),

    (0x38, Sec, Implied), (0xF8, Sed, Implied), (0x78, Sei, Implied),

    (0x85, Sta, ZeroPage), (0x95, Sta, ZeroPageX), (0x8D, Sta, Absolute), (0x9D, Sta, AbsoluteX),
    (0x99, Sta, AbsoluteY), (0x81, Sta, IndexedIndirect), (0x91, Sta, IndirectIndexed),

    (0x86, Stx, ZeroPage), (0x96, Stx, ZeroPageY), (0x8E, Stx, Absolute),
    (0x84, Sty, ZeroPage), (0x94, Sty, ZeroPageX), (0x8C, Sty, Absolute),

    (0xAA, Tax, Implied), (0xA8, Tay, Implied), (0xBA, Tsx, Implied),
    (0x8A, Txa, Implied), (0x9A, Txs, Implied), (0x98, Tya, Implied),
];

fn build_table() -> [Option<Instruction>; 256] {
    let mut table: [Option<Instruction>; 256] = [None; 256];
    for &(opcode, mnemonic, mode) in OPCODES.iter() {
        table[opcode as usize] = Some(Instruction::new(opcode, mnemonic, mode));
    }
    table
}

lazy_static! {
    /// Global opcode table, indexed by opcode byte.
    pub static ref OPCODE_TABLE: [Option<Instruction>; 256] = build_table();
}

pub fn opcode_info(opcode: u8) -> Option<&'static Instruction> {
    OPCODE_TABLE[opcode as usize].as_ref()
}

/// Get opcode name for metrics and traces
pub fn get_instruction_name(opcode: u8) -> &'static str {
    opcode_info(opcode)
        .map(|instruction| instruction.mnemonic.as_str())
        .unwrap_or("ILLEGAL")
}

/// Renders the instruction at `pc` in assembler syntax, e.g. `LDA ($20),Y`.
/// Returns the text and the instruction length in bytes.
pub fn disassemble(memory: &Memory, pc: u16) -> (String, u16) {
    let opcode = memory.read(pc);
    let Some(instruction) = opcode_info(opcode) else {
        return (format!(".byte ${:02X}", opcode), 1);
    };

    let lo = memory.read(pc.wrapping_add(1));
    let hi = memory.read(pc.wrapping_add(2));
    let word = u16::from_le_bytes([lo, hi]);
    let name = instruction.mnemonic.as_str();

    let text = match instruction.mode {
        Implied => name.to_string(),
        Accumulator => format!("{} A", name),
        Immediate => format!("{} #${:02X}", name, lo),
        ZeroPage => format!("{} ${:02X}", name, lo),
        ZeroPageX => format!("{} ${:02X},X", name, lo),
        ZeroPageY => format!("{} ${:02X},Y", name, lo),
        Relative => {
            let target = pc.wrapping_add(2).wrapping_add_signed(lo as i8 as i16);
            format!("{} ${:04X}", name, target)
        }
        Absolute => format!("{} ${:04X}", name, word),
        AbsoluteX => format!("{} ${:04X},X", name, word),
        AbsoluteY => format!("{} ${:04X},Y", name, word),
        Indirect => format!("{} (${:04X})", name, word),
        IndexedIndirect => format!("{} (${:02X},X)", name, lo),
        IndirectIndexed => format!("{} (${:02X}),Y", name, lo),
    };

    (text, instruction.size())
}

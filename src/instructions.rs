//! Instruction semantics.
//!
//! Each body takes the addressing mode it was bound to in the dispatch table.
//! Bodies that have no operand ignore it. Decimal mode is never applied.

use crate::addressing::AddressingMode;
use crate::cpu::{Cpu, BRK_VECTOR};
use crate::status::Flag;

impl Cpu {
    /// Zero and Sign from a result byte.
    pub(crate) fn set_flags(&mut self, result: u8) {
        self.status.assign(Flag::Zero, result == 0);
        self.status.assign(Flag::Sign, result >= 0x80);
    }

    /// `lhs - rhs - borrow`, setting Carry (no borrow), Zero and Sign.
    /// Shared by SBC and the compare family.
    fn subtract(&mut self, lhs: u8, rhs: u8, borrow: u8) -> u8 {
        let difference = lhs as i16 - rhs as i16 - borrow as i16;
        self.status.assign(Flag::Carry, difference >= 0);
        let result = difference as u8;
        self.set_flags(result);
        result
    }

    /// Relative jump by a signed offset byte.
    fn do_jump(&mut self, offset: u8) {
        self.pc = self.pc.wrapping_add_signed(offset as i8 as i16);
    }

    /// The offset byte is consumed whether or not the branch is taken.
    fn branch_if(&mut self, condition: bool) {
        let offset = self.fetch_byte();
        if condition {
            self.do_jump(offset);
        }
    }

    // Loads and stores
    pub(crate) fn lda(&mut self, mode: AddressingMode) {
        self.a = self.operand(mode);
        self.set_flags(self.a);
    }

    pub(crate) fn ldx(&mut self, mode: AddressingMode) {
        self.x = self.operand(mode);
        self.set_flags(self.x);
    }

    pub(crate) fn ldy(&mut self, mode: AddressingMode) {
        self.y = self.operand(mode);
        self.set_flags(self.y);
    }

    pub(crate) fn sta(&mut self, mode: AddressingMode) {
        let address = self.get_address(mode);
        self.write(address, self.a);
    }

    pub(crate) fn stx(&mut self, mode: AddressingMode) {
        let address = self.get_address(mode);
        self.write(address, self.x);
    }

    pub(crate) fn sty(&mut self, mode: AddressingMode) {
        let address = self.get_address(mode);
        self.write(address, self.y);
    }

    // Arithmetic
    pub(crate) fn adc(&mut self, mode: AddressingMode) {
        let value = self.operand(mode);
        let carry = self.status.get(Flag::Carry) as u16;
        let sum = self.a as u16 + value as u16 + carry;
        let result = sum as u8;

        let overflow = (self.a ^ result) & (value ^ result) & 0x80 != 0;
        self.status.assign(Flag::Carry, sum > 0xFF);
        self.status.assign(Flag::Overflow, overflow);

        self.a = result;
        self.set_flags(self.a);
    }

    pub(crate) fn sbc(&mut self, mode: AddressingMode) {
        let value = self.operand(mode);
        let borrow = 1 - self.status.get(Flag::Carry);
        let lhs = self.a;
        let result = self.subtract(lhs, value, borrow);

        let overflow = (lhs ^ result) & (!value ^ result) & 0x80 != 0;
        self.status.assign(Flag::Overflow, overflow);
        self.a = result;
    }

    // Compare operations; the operand is never written back
    pub(crate) fn cmp(&mut self, mode: AddressingMode) {
        let value = self.operand(mode);
        self.subtract(self.a, value, 0);
    }

    pub(crate) fn cpx(&mut self, mode: AddressingMode) {
        let value = self.operand(mode);
        self.subtract(self.x, value, 0);
    }

    pub(crate) fn cpy(&mut self, mode: AddressingMode) {
        let value = self.operand(mode);
        self.subtract(self.y, value, 0);
    }

    // Logical
    pub(crate) fn and(&mut self, mode: AddressingMode) {
        self.a &= self.operand(mode);
        self.set_flags(self.a);
    }

    pub(crate) fn ora(&mut self, mode: AddressingMode) {
        self.a |= self.operand(mode);
        self.set_flags(self.a);
    }

    pub(crate) fn eor(&mut self, mode: AddressingMode) {
        self.a ^= self.operand(mode);
        self.set_flags(self.a);
    }

    pub(crate) fn bit(&mut self, mode: AddressingMode) {
        let value = self.operand(mode);
        self.status.assign(Flag::Zero, self.a & value == 0);
        self.status.assign(Flag::Sign, value & 0x80 != 0);
        self.status.assign(Flag::Overflow, value & 0x40 != 0);
    }

    // Shifts and rotates, on memory or the accumulator
    pub(crate) fn asl(&mut self, mode: AddressingMode) {
        let target = self.resolve(mode);
        let value = self.load(target);
        let result = value << 1;
        self.status.assign(Flag::Carry, value & 0x80 != 0);
        self.set_flags(result);
        self.store(target, result);
    }

    pub(crate) fn lsr(&mut self, mode: AddressingMode) {
        let target = self.resolve(mode);
        let value = self.load(target);
        let result = value >> 1;
        self.status.assign(Flag::Carry, value & 0x01 != 0);
        self.set_flags(result);
        self.store(target, result);
    }

    pub(crate) fn rol(&mut self, mode: AddressingMode) {
        let target = self.resolve(mode);
        let value = self.load(target);
        let result = (value << 1) | self.status.get(Flag::Carry);
        self.status.assign(Flag::Carry, value & 0x80 != 0);
        self.set_flags(result);
        self.store(target, result);
    }

    pub(crate) fn ror(&mut self, mode: AddressingMode) {
        let target = self.resolve(mode);
        let value = self.load(target);
        let result = (value >> 1) | (self.status.get(Flag::Carry) << 7);
        self.status.assign(Flag::Carry, value & 0x01 != 0);
        self.set_flags(result);
        self.store(target, result);
    }

    // Increments and decrements
    pub(crate) fn inc(&mut self, mode: AddressingMode) {
        let address = self.get_address(mode);
        let result = self.read(address).wrapping_add(1);
        self.write(address, result);
        self.set_flags(result);
    }

    pub(crate) fn dec(&mut self, mode: AddressingMode) {
        let address = self.get_address(mode);
        let result = self.read(address).wrapping_sub(1);
        self.write(address, result);
        self.set_flags(result);
    }

    pub(crate) fn inx(&mut self, _mode: AddressingMode) {
        self.x = self.x.wrapping_add(1);
        self.set_flags(self.x);
    }

    pub(crate) fn iny(&mut self, _mode: AddressingMode) {
        self.y = self.y.wrapping_add(1);
        self.set_flags(self.y);
    }

    pub(crate) fn dex(&mut self, _mode: AddressingMode) {
        self.x = self.x.wrapping_sub(1);
        self.set_flags(self.x);
    }

    pub(crate) fn dey(&mut self, _mode: AddressingMode) {
        self.y = self.y.wrapping_sub(1);
        self.set_flags(self.y);
    }

    // Register transfers
    pub(crate) fn tax(&mut self, _mode: AddressingMode) {
        self.x = self.a;
        self.set_flags(self.x);
    }

    pub(crate) fn tay(&mut self, _mode: AddressingMode) {
        self.y = self.a;
        self.set_flags(self.y);
    }

    pub(crate) fn txa(&mut self, _mode: AddressingMode) {
        self.a = self.x;
        self.set_flags(self.a);
    }

    pub(crate) fn tya(&mut self, _mode: AddressingMode) {
        self.a = self.y;
        self.set_flags(self.a);
    }

    pub(crate) fn tsx(&mut self, _mode: AddressingMode) {
        self.x = self.sp;
        self.set_flags(self.x);
    }

    // TXS leaves the flags alone
    pub(crate) fn txs(&mut self, _mode: AddressingMode) {
        self.sp = self.x;
    }

    // Stack
    pub(crate) fn pha(&mut self, _mode: AddressingMode) {
        self.push(self.a);
    }

    pub(crate) fn php(&mut self, _mode: AddressingMode) {
        self.push(self.status.read());
    }

    pub(crate) fn pla(&mut self, _mode: AddressingMode) {
        self.a = self.pop();
        self.set_flags(self.a);
    }

    pub(crate) fn plp(&mut self, _mode: AddressingMode) {
        let byte = self.pop();
        self.status.write(byte);
    }

    // Jumps and subroutines
    pub(crate) fn jmp(&mut self, mode: AddressingMode) {
        self.pc = self.get_address(mode);
    }

    /// Pushes the address of the last operand byte, not the next opcode.
    pub(crate) fn jsr(&mut self, mode: AddressingMode) {
        let target = self.get_address(mode);
        self.push_u16(self.pc.wrapping_sub(1));
        self.pc = target;
    }

    pub(crate) fn rts(&mut self, _mode: AddressingMode) {
        self.pc = self.pop_u16().wrapping_add(1);
    }

    /// Software interrupt: skips the padding byte, pushes PC then P, and
    /// vectors through `$FFFE`.
    pub(crate) fn brk(&mut self, _mode: AddressingMode) {
        self.status.set(Flag::Break);
        self.pc = self.pc.wrapping_add(1);
        self.push_u16(self.pc);
        self.push(self.status.read());
        self.pc = self.memory.read_u16(BRK_VECTOR);
    }

    pub(crate) fn rti(&mut self, _mode: AddressingMode) {
        let byte = self.pop();
        self.status.write(byte);
        self.pc = self.pop_u16();
    }

    // Branches
    pub(crate) fn bcc(&mut self, _mode: AddressingMode) {
        self.branch_if(!self.status.is_set(Flag::Carry));
    }

    pub(crate) fn bcs(&mut self, _mode: AddressingMode) {
        self.branch_if(self.status.is_set(Flag::Carry));
    }

    pub(crate) fn beq(&mut self, _mode: AddressingMode) {
        self.branch_if(self.status.is_set(Flag::Zero));
    }

    pub(crate) fn bne(&mut self, _mode: AddressingMode) {
        self.branch_if(!self.status.is_set(Flag::Zero));
    }

    pub(crate) fn bmi(&mut self, _mode: AddressingMode) {
        self.branch_if(self.status.is_set(Flag::Sign));
    }

    pub(crate) fn bpl(&mut self, _mode: AddressingMode) {
        self.branch_if(!self.status.is_set(Flag::Sign));
    }

    pub(crate) fn bvc(&mut self, _mode: AddressingMode) {
        self.branch_if(!self.status.is_set(Flag::Overflow));
    }

    pub(crate) fn bvs(&mut self, _mode: AddressingMode) {
        self.branch_if(self.status.is_set(Flag::Overflow));
    }

    // Flag manipulation
    pub(crate) fn clc(&mut self, _mode: AddressingMode) {
        self.status.clear(Flag::Carry);
    }

    pub(crate) fn sec(&mut self, _mode: AddressingMode) {
        self.status.set(Flag::Carry);
    }

    pub(crate) fn cli(&mut self, _mode: AddressingMode) {
        self.status.clear(Flag::InterruptDisable);
    }

    pub(crate) fn sei(&mut self, _mode: AddressingMode) {
        self.status.set(Flag::InterruptDisable);
    }

    pub(crate) fn cld(&mut self, _mode: AddressingMode) {
        self.status.clear(Flag::Decimal);
    }

    pub(crate) fn sed(&mut self, _mode: AddressingMode) {
        self.status.set(Flag::Decimal);
    }

    pub(crate) fn clv(&mut self, _mode: AddressingMode) {
        self.status.clear(Flag::Overflow);
    }

    pub(crate) fn nop(&mut self, _mode: AddressingMode) {}
}

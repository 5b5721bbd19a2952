//! A single instruction: an opcode plus its raw operand bytes

use super::codec::{encode_i32, Decoder};
use super::opcode::OpCode;

/// One bytecode instruction
///
/// Operands are kept in their encoded form; the interpreter decodes them when
/// the instruction is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    opcode: OpCode,
    operands: Vec<u8>,
}

impl Instruction {
    /// Create an instruction from an opcode and already-encoded operands
    #[must_use]
    pub fn new(opcode: OpCode, operands: Vec<u8>) -> Self {
        Self { opcode, operands }
    }

    /// Create an instruction with no operands
    #[must_use]
    pub fn simple(opcode: OpCode) -> Self {
        Self::new(opcode, Vec::new())
    }

    /// Create a conditional jump with a resolved relative offset
    #[must_use]
    pub fn jump(opcode: OpCode, offset: i32) -> Self {
        debug_assert!(opcode.is_jump());
        let mut operands = Vec::with_capacity(4);
        encode_i32(&mut operands, offset);
        Self::new(opcode, operands)
    }

    /// The opcode
    #[must_use]
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// The encoded operand bytes
    #[must_use]
    pub fn operands(&self) -> &[u8] {
        &self.operands
    }

    /// Encoded size in bytes (opcode byte plus operands)
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.operands.len()
    }

    /// A decoder over this instruction's operands
    #[must_use]
    pub fn decoder(&self) -> Decoder<'_> {
        Decoder::new(&self.operands)
    }

    /// The relative offset of a jump instruction
    #[must_use]
    pub fn jump_offset(&self) -> Option<i32> {
        if !self.opcode.is_jump() {
            return None;
        }
        self.decoder().read_i32().ok()
    }

    /// Overwrite the offset operand of a jump instruction
    pub(crate) fn patch_jump(&mut self, offset: i32) {
        debug_assert!(self.opcode.is_jump());
        self.operands.clear();
        encode_i32(&mut self.operands, offset);
    }

    /// Append the serialized form to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.opcode as u8);
        out.extend_from_slice(&self.operands);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_offset_round_trip() {
        let mut jump = Instruction::jump(OpCode::JumpIfTrue, -3);
        assert_eq!(jump.jump_offset(), Some(-3));
        assert_eq!(jump.size(), 5);

        jump.patch_jump(12);
        assert_eq!(jump.jump_offset(), Some(12));
    }

    #[test]
    fn non_jump_has_no_offset() {
        assert_eq!(Instruction::simple(OpCode::RuleEnd).jump_offset(), None);
    }

    #[test]
    fn serialized_layout() {
        let mut out = Vec::new();
        Instruction::jump(OpCode::JumpIfFalse, 1).write_to(&mut out);
        Instruction::simple(OpCode::RuleEnd).write_to(&mut out);
        assert_eq!(out, [0x02, 1, 0, 0, 0, 0x11]);
    }
}

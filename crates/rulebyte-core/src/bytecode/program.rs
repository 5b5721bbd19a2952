//! Resolved programs and their on-disk form

use std::path::Path;

use thiserror::Error;

use super::codec::{CodecError, Decoder};
use super::instruction::Instruction;
use super::opcode::OpCode;

/// Errors raised while reading a serialized program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#04x} at byte {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("malformed {opcode} operands at byte {offset}: {source}")]
    Operands {
        opcode: OpCode,
        offset: usize,
        source: CodecError,
    },
}

/// Errors raised by the program file helpers
#[derive(Error, Debug)]
pub enum ProgramFileError {
    #[error("failed to access program file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid program file: {0}")]
    Decode(#[from] DecodeError),
}

/// A fully resolved instruction sequence
///
/// Instruction indices are addresses; jumps carry offsets relative to the
/// instruction after the jump. A program is never mutated once built, so it
/// can be shared between interpreters behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Create a program from resolved instructions
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Number of instructions
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the program has no instructions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instructions in address order
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Consume the program, returning its instructions
    #[must_use]
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    /// Get an instruction by address
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Serialized size in bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.instructions.iter().map(Instruction::size).sum()
    }

    /// Number of `RULE_START` instructions
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| i.opcode() == OpCode::RuleStart)
            .count()
    }

    /// Serialize as a flat concatenation of `opcode byte + operand bytes`
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        for instruction in &self.instructions {
            instruction.write_to(&mut out);
        }
        out
    }

    /// Parse a serialized program
    ///
    /// Each opcode's operand shape determines where the next instruction
    /// starts. Operand contents are not validated beyond their lengths.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut instructions = Vec::new();
        let mut offset = 0;

        while offset < bytes.len() {
            let byte = bytes[offset];
            let opcode = OpCode::try_from(byte)
                .map_err(|opcode| DecodeError::UnknownOpcode { opcode, offset })?;

            let body = &bytes[offset + 1..];
            let mut decoder = Decoder::new(body);
            opcode
                .skip_operands(&mut decoder)
                .map_err(|source| DecodeError::Operands {
                    opcode,
                    offset,
                    source,
                })?;

            let len = decoder.offset();
            instructions.push(Instruction::new(opcode, body[..len].to_vec()));
            offset += 1 + len;
        }

        Ok(Self { instructions })
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

/// Write a program to `path`
pub fn write_program(path: impl AsRef<Path>, program: &Program) -> Result<(), ProgramFileError> {
    std::fs::write(path, program.to_bytes())?;
    Ok(())
}

/// Read a program from `path`
pub fn read_program(path: impl AsRef<Path>) -> Result<Program, ProgramFileError> {
    let bytes = std::fs::read(path)?;
    Ok(Program::from_bytes(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::codec::{encode_f32, encode_str};

    fn comparison(fact: &str, operand: f32) -> Instruction {
        let mut operands = Vec::new();
        encode_str(&mut operands, fact).unwrap();
        encode_f32(&mut operands, operand);
        Instruction::new(OpCode::FloatGt, operands)
    }

    #[test]
    fn bytes_round_trip() {
        let program = Program::new(vec![
            comparison("speed", 80.0),
            Instruction::jump(OpCode::JumpIfTrue, 1),
            Instruction::simple(OpCode::Nop),
            Instruction::simple(OpCode::RuleEnd),
        ]);

        let bytes = program.to_bytes();
        assert_eq!(bytes.len(), program.byte_len());
        assert_eq!(Program::from_bytes(&bytes).unwrap(), program);
    }

    #[test]
    fn unknown_opcode_reports_offset() {
        let mut bytes = Program::new(vec![Instruction::simple(OpCode::Nop)]).to_bytes();
        bytes.push(0xEE);

        let err = Program::from_bytes(&bytes).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownOpcode {
                opcode: 0xEE,
                offset: 1
            }
        );
    }

    #[test]
    fn truncated_operands() {
        let err = Program::from_bytes(&[OpCode::JumpIfTrue as u8, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Operands {
                opcode: OpCode::JumpIfTrue,
                offset: 0,
                ..
            }
        ));
    }

    #[test]
    fn empty_input_is_empty_program() {
        assert!(Program::from_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.rbc");
        let program = Program::new(vec![comparison("load", 0.5), Instruction::simple(OpCode::RuleEnd)]);

        write_program(&path, &program).unwrap();
        assert_eq!(read_program(&path).unwrap(), program);
    }
}

//! Bytecode module for the Rulebyte interpreter
//!
//! This module provides:
//! - `OpCode`: The bytecode instruction set
//! - `ScalarValue`: Typed literals and facts
//! - Operand codec for length-prefixed strings and fixed-width scalars
//! - `Instruction` and `Program`: Encoded instruction streams
//! - `Compiler`: Rule tree to bytecode compilation
//! - Label allocation and jump resolution
//! - Disassembler utilities for debugging

pub mod codec;
mod compiler;
mod debug;
pub mod emit;
mod error;
mod instruction;
mod label;
mod opcode;
mod program;
mod resolver;
mod value;

pub use codec::{CodecError, Decoder, MAX_STRING_LEN};
pub use compiler::Compiler;
pub use debug::{disassemble_instruction, disassemble_program};
pub use emit::{select_opcode, Operator};
pub use error::{CompileError, CompileErrorKind, CompileResult};
pub use instruction::Instruction;
pub use label::{Label, LabelAllocator};
pub use opcode::OpCode;
pub use program::{read_program, write_program, DecodeError, Program, ProgramFileError};
pub use resolver::{strip_labels, Assembler};
pub use value::{ScalarValue, ValueType};

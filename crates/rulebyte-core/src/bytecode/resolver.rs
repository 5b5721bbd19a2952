//! Label marking and jump resolution
//!
//! The compiler appends instructions to an [`Assembler`], emitting jumps
//! against symbolic labels and `LABEL` marker instructions where those labels
//! land. [`Assembler::resolve`] then runs two passes: the first records the
//! index of every marker, the second rewrites each pending jump to the
//! relative offset `target - jump - 1`.

use std::collections::HashMap;

use tracing::trace;

use super::codec::encode_str;
use super::error::{CompileError, CompileErrorKind, CompileResult};
use super::instruction::Instruction;
use super::label::Label;
use super::opcode::OpCode;
use super::program::Program;

/// A jump whose offset is still a symbolic label
#[derive(Debug, Clone)]
struct PendingJump {
    index: usize,
    label: String,
}

/// An instruction stream whose jumps have not been resolved yet
#[derive(Debug, Default)]
pub struct Assembler {
    instructions: Vec<Instruction>,
    pending: Vec<PendingJump>,
}

impl Assembler {
    /// Create an empty assembler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions emitted so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if nothing has been emitted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Append an instruction, returning its index
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    /// Append a jump to `label`, returning its index
    ///
    /// The offset is written as zero and patched by [`Assembler::resolve`].
    pub fn emit_jump(&mut self, opcode: OpCode, label: Label) -> usize {
        let index = self.emit(Instruction::jump(opcode, 0));
        self.pending.push(PendingJump {
            index,
            label: label.to_string(),
        });
        index
    }

    /// Append the marker that binds `label` to the next instruction
    pub fn mark(&mut self, label: Label) -> CompileResult<usize> {
        let mut operands = Vec::new();
        encode_str(&mut operands, &label.to_string())?;
        Ok(self.emit(Instruction::new(OpCode::Label, operands)))
    }

    /// Resolve every pending jump
    ///
    /// Fails on the first undefined or duplicated label; nothing is returned
    /// in that case.
    pub fn resolve(self) -> CompileResult<Program> {
        let Assembler {
            mut instructions,
            pending,
        } = self;

        // Pass 1: label positions
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (index, instruction) in instructions.iter().enumerate() {
            if instruction.opcode() != OpCode::Label {
                continue;
            }
            let name = instruction.decoder().read_str()?.to_string();
            if positions.insert(name.clone(), index).is_some() {
                return Err(CompileError::new(CompileErrorKind::DuplicateLabel(name)));
            }
        }

        // Pass 2: patch jumps
        for jump in &pending {
            let target = *positions.get(&jump.label).ok_or_else(|| {
                CompileError::new(CompileErrorKind::UndefinedLabel(jump.label.clone()))
            })?;
            let offset = relative_offset(jump.index, target)?;
            trace!(label = %jump.label, index = jump.index, target, offset, "resolved jump");
            instructions[jump.index].patch_jump(offset);
        }

        Ok(Program::new(instructions))
    }
}

/// Offset from the instruction after `from` to `to`
fn relative_offset(from: usize, to: usize) -> CompileResult<i32> {
    let from = i64::try_from(from).map_err(|_| CompileErrorKind::JumpTooLarge)?;
    let to = i64::try_from(to).map_err(|_| CompileErrorKind::JumpTooLarge)?;
    i32::try_from(to - from - 1).map_err(|_| CompileErrorKind::JumpTooLarge.into())
}

/// Remove every `LABEL` instruction and recompute jump offsets
///
/// Offsets must already be resolved. A jump that targeted a marker now lands
/// on the first real instruction after it.
pub fn strip_labels(program: &Program) -> CompileResult<Program> {
    let instructions = program.instructions();

    // new_index[i] is the compacted address of old index i; the extra slot
    // maps the end of the program.
    let mut new_index = Vec::with_capacity(instructions.len() + 1);
    let mut next = 0usize;
    for instruction in instructions {
        new_index.push(next);
        if instruction.opcode() != OpCode::Label {
            next += 1;
        }
    }
    new_index.push(next);

    let mut stripped = Vec::with_capacity(next);
    for (index, instruction) in instructions.iter().enumerate() {
        match instruction.opcode() {
            OpCode::Label => {}
            opcode if opcode.is_jump() => {
                let offset = instruction
                    .jump_offset()
                    .ok_or(CompileErrorKind::JumpOutOfRange { index })?;
                let target = i64::try_from(index)
                    .ok()
                    .map(|i| i + 1 + i64::from(offset))
                    .and_then(|t| usize::try_from(t).ok())
                    .and_then(|t| new_index.get(t).copied())
                    .ok_or(CompileErrorKind::JumpOutOfRange { index })?;
                let offset = relative_offset(new_index[index], target)?;
                stripped.push(Instruction::jump(opcode, offset));
            }
            _ => stripped.push(instruction.clone()),
        }
    }

    Ok(Program::new(stripped))
}

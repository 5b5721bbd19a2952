//! Instruction set for the Rulebyte interpreter

use super::codec::{CodecError, Decoder};
use super::value::ValueType;

/// Bytecode operation codes
///
/// Discriminants are part of the file format and must not be renumbered.
/// Comparisons are split per operand type so the interpreter never branches
/// on a runtime type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // ===== Control =====
    /// Does nothing
    Nop = 0x00,

    /// Branch if the last comparison was true
    /// Operand: i32 relative offset
    JumpIfTrue = 0x01,

    /// Branch if the last comparison was false
    /// Operand: i32 relative offset
    JumpIfFalse = 0x02,

    /// Jump target marker, no runtime effect
    /// Operand: string label name
    Label = 0x03,

    // ===== Rule Framing =====
    /// Start of a rule
    /// Operand: string rule name
    RuleStart = 0x10,

    /// End of a rule
    RuleEnd = 0x11,

    /// Rule priority
    /// Operand: i32 priority
    Priority = 0x12,

    // ===== Float Comparisons =====
    // Operands: string fact name, f32 operand
    FloatGt = 0x20,
    FloatLt = 0x21,
    FloatGte = 0x22,
    FloatLte = 0x23,
    FloatEq = 0x24,
    FloatNeq = 0x25,

    // ===== String Comparisons =====
    // Operands: string fact name, string operand
    StrEq = 0x30,
    StrNeq = 0x31,
    StrContains = 0x32,
    StrNotContains = 0x33,

    // ===== Bool Comparisons =====
    // Operands: string fact name, bool operand
    BoolEq = 0x40,
    BoolNeq = 0x41,

    // ===== Effects =====
    /// Dispatch an action to the host
    /// Operands: string type, string target, string value
    ExecAction = 0x50,

    /// Hand a script definition to the host
    /// Operands: string name, i32 parameter count, one string per parameter,
    /// string body
    ScriptDef = 0x51,

    /// Invoke a host script
    /// Operands: string script name, string argument
    ScriptCall = 0x52,
}

impl OpCode {
    /// Every opcode, in discriminant order
    pub const ALL: [OpCode; 22] = [
        OpCode::Nop,
        OpCode::JumpIfTrue,
        OpCode::JumpIfFalse,
        OpCode::Label,
        OpCode::RuleStart,
        OpCode::RuleEnd,
        OpCode::Priority,
        OpCode::FloatGt,
        OpCode::FloatLt,
        OpCode::FloatGte,
        OpCode::FloatLte,
        OpCode::FloatEq,
        OpCode::FloatNeq,
        OpCode::StrEq,
        OpCode::StrNeq,
        OpCode::StrContains,
        OpCode::StrNotContains,
        OpCode::BoolEq,
        OpCode::BoolNeq,
        OpCode::ExecAction,
        OpCode::ScriptDef,
        OpCode::ScriptCall,
    ];

    /// Get the name of this opcode for debugging
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Nop => "NOP",
            OpCode::JumpIfTrue => "JUMP_IF_TRUE",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::Label => "LABEL",
            OpCode::RuleStart => "RULE_START",
            OpCode::RuleEnd => "RULE_END",
            OpCode::Priority => "PRIORITY",
            OpCode::FloatGt => "FLOAT_GT",
            OpCode::FloatLt => "FLOAT_LT",
            OpCode::FloatGte => "FLOAT_GTE",
            OpCode::FloatLte => "FLOAT_LTE",
            OpCode::FloatEq => "FLOAT_EQ",
            OpCode::FloatNeq => "FLOAT_NEQ",
            OpCode::StrEq => "STR_EQ",
            OpCode::StrNeq => "STR_NEQ",
            OpCode::StrContains => "STR_CONTAINS",
            OpCode::StrNotContains => "STR_NOT_CONTAINS",
            OpCode::BoolEq => "BOOL_EQ",
            OpCode::BoolNeq => "BOOL_NEQ",
            OpCode::ExecAction => "EXEC_ACTION",
            OpCode::ScriptDef => "SCRIPT_DEF",
            OpCode::ScriptCall => "SCRIPT_CALL",
        }
    }

    /// Returns true for the conditional jumps
    #[must_use]
    pub fn is_jump(self) -> bool {
        matches!(self, OpCode::JumpIfTrue | OpCode::JumpIfFalse)
    }

    /// Returns the operand type of a comparison opcode, or `None` for
    /// everything else
    #[must_use]
    pub fn comparison_type(self) -> Option<ValueType> {
        match self {
            OpCode::FloatGt
            | OpCode::FloatLt
            | OpCode::FloatGte
            | OpCode::FloatLte
            | OpCode::FloatEq
            | OpCode::FloatNeq => Some(ValueType::Number),
            OpCode::StrEq | OpCode::StrNeq | OpCode::StrContains | OpCode::StrNotContains => {
                Some(ValueType::String)
            }
            OpCode::BoolEq | OpCode::BoolNeq => Some(ValueType::Bool),
            _ => None,
        }
    }

    /// Advance `decoder` past this opcode's operands
    ///
    /// The file format has no length fields, so this is how a reader finds
    /// the next instruction boundary.
    pub fn skip_operands(self, decoder: &mut Decoder<'_>) -> Result<(), CodecError> {
        match self {
            OpCode::Nop | OpCode::RuleEnd => Ok(()),
            OpCode::JumpIfTrue | OpCode::JumpIfFalse | OpCode::Priority => {
                decoder.take(4).map(|_| ())
            }
            OpCode::Label | OpCode::RuleStart => decoder.skip_str(),
            OpCode::FloatGt
            | OpCode::FloatLt
            | OpCode::FloatGte
            | OpCode::FloatLte
            | OpCode::FloatEq
            | OpCode::FloatNeq => {
                decoder.skip_str()?;
                decoder.take(4).map(|_| ())
            }
            OpCode::StrEq | OpCode::StrNeq | OpCode::StrContains | OpCode::StrNotContains => {
                decoder.skip_str()?;
                decoder.skip_str()
            }
            OpCode::BoolEq | OpCode::BoolNeq => {
                decoder.skip_str()?;
                decoder.take(1).map(|_| ())
            }
            OpCode::ExecAction => {
                decoder.skip_str()?;
                decoder.skip_str()?;
                decoder.skip_str()
            }
            OpCode::ScriptDef => {
                decoder.skip_str()?;
                let count = decoder.read_i32()?;
                for _ in 0..count.max(0) {
                    decoder.skip_str()?;
                }
                decoder.skip_str()
            }
            OpCode::ScriptCall => {
                decoder.skip_str()?;
                decoder.skip_str()
            }
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(OpCode::Nop),
            0x01 => Ok(OpCode::JumpIfTrue),
            0x02 => Ok(OpCode::JumpIfFalse),
            0x03 => Ok(OpCode::Label),
            0x10 => Ok(OpCode::RuleStart),
            0x11 => Ok(OpCode::RuleEnd),
            0x12 => Ok(OpCode::Priority),
            0x20 => Ok(OpCode::FloatGt),
            0x21 => Ok(OpCode::FloatLt),
            0x22 => Ok(OpCode::FloatGte),
            0x23 => Ok(OpCode::FloatLte),
            0x24 => Ok(OpCode::FloatEq),
            0x25 => Ok(OpCode::FloatNeq),
            0x30 => Ok(OpCode::StrEq),
            0x31 => Ok(OpCode::StrNeq),
            0x32 => Ok(OpCode::StrContains),
            0x33 => Ok(OpCode::StrNotContains),
            0x40 => Ok(OpCode::BoolEq),
            0x41 => Ok(OpCode::BoolNeq),
            0x50 => Ok(OpCode::ExecAction),
            0x51 => Ok(OpCode::ScriptDef),
            0x52 => Ok(OpCode::ScriptCall),
            _ => Err(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_roundtrip() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::try_from(op as u8), Ok(op), "{op:?} has wrong discriminant");
        }
    }

    #[test]
    fn unassigned_bytes_rejected() {
        let accepted = (0..=u8::MAX).filter(|b| OpCode::try_from(*b).is_ok()).count();
        assert_eq!(accepted, OpCode::ALL.len());
        assert_eq!(OpCode::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn opcode_names() {
        assert_eq!(OpCode::JumpIfTrue.name(), "JUMP_IF_TRUE");
        assert_eq!(OpCode::StrNotContains.name(), "STR_NOT_CONTAINS");
        assert_eq!(OpCode::ExecAction.to_string(), "EXEC_ACTION");
    }

    #[test]
    fn comparison_families() {
        assert_eq!(OpCode::FloatLte.comparison_type(), Some(ValueType::Number));
        assert_eq!(OpCode::StrContains.comparison_type(), Some(ValueType::String));
        assert_eq!(OpCode::BoolNeq.comparison_type(), Some(ValueType::Bool));
        assert_eq!(OpCode::JumpIfFalse.comparison_type(), None);
        assert!(OpCode::JumpIfFalse.is_jump());
        assert!(!OpCode::Label.is_jump());
    }
}

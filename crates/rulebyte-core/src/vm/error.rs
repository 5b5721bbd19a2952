//! Runtime errors for the Rulebyte interpreter

use std::fmt;

use thiserror::Error;

use super::handler::HostError;
use crate::bytecode::{CodecError, DecodeError, OpCode, ValueType};

/// A runtime error that halted execution
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    /// The kind of error
    pub kind: RuntimeErrorKind,

    /// Index of the instruction being executed
    pub ip: Option<usize>,

    /// Name of the rule being executed
    pub rule: Option<String>,
}

impl RuntimeError {
    /// Create a new runtime error
    #[must_use]
    pub fn new(kind: RuntimeErrorKind) -> Self {
        Self {
            kind,
            ip: None,
            rule: None,
        }
    }

    /// Record where execution stopped
    #[must_use]
    pub fn at(mut self, ip: usize, rule: Option<&str>) -> Self {
        self.ip = Some(ip);
        self.rule = rule.map(str::to_string);
        self
    }
}

impl From<RuntimeErrorKind> for RuntimeError {
    fn from(kind: RuntimeErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<DecodeError> for RuntimeError {
    fn from(error: DecodeError) -> Self {
        match error {
            DecodeError::UnknownOpcode { opcode, offset } => {
                Self::new(RuntimeErrorKind::UnknownOpcode { opcode, offset })
            }
            DecodeError::Operands { source, .. } => Self::new(RuntimeErrorKind::Decode(source)),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime error: {}", self.kind)?;
        match (self.ip, &self.rule) {
            (Some(ip), Some(rule)) => write!(f, " (at instruction {ip} in rule '{rule}')"),
            (Some(ip), None) => write!(f, " (at instruction {ip})"),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// The kind of runtime error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    #[error("unknown opcode {opcode:#04x} at byte {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("malformed operands: {0}")]
    Decode(CodecError),

    #[error("fact '{0}' is not defined")]
    MissingFact(String),

    #[error("fact '{fact}' is {found}, but {opcode} compares {expected} values")]
    FactTypeMismatch {
        fact: String,
        opcode: OpCode,
        expected: ValueType,
        found: ValueType,
    },

    #[error("jump target {target} outside program of {len} instructions")]
    JumpOutOfBounds { target: i64, len: usize },

    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    #[error("step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),

    #[error("action handler failed: {0}")]
    Host(HostError),
}

impl From<CodecError> for RuntimeErrorKind {
    fn from(error: CodecError) -> Self {
        RuntimeErrorKind::Decode(error)
    }
}

impl From<HostError> for RuntimeErrorKind {
    fn from(error: HostError) -> Self {
        RuntimeErrorKind::Host(error)
    }
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

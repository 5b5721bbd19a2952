//! Compiler error types

use std::fmt;

use thiserror::Error;

use super::codec::CodecError;
use super::value::ValueType;

/// A compilation error
///
/// Compilation stops at the first error; no partial program is returned.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    /// The kind of error
    pub kind: CompileErrorKind,

    /// Name of the rule being compiled, when known
    pub rule: Option<String>,

    /// Optional hint for fixing the error
    pub hint: Option<String>,
}

impl CompileError {
    /// Create a new compile error
    #[must_use]
    pub fn new(kind: CompileErrorKind) -> Self {
        Self {
            kind,
            rule: None,
            hint: None,
        }
    }

    /// Attach the rule name, keeping any name already recorded
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        if self.rule.is_none() {
            self.rule = Some(rule.into());
        }
        self
    }

    /// Add a hint to the error
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<CompileErrorKind> for CompileError {
    fn from(kind: CompileErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<CodecError> for CompileError {
    fn from(error: CodecError) -> Self {
        Self::new(CompileErrorKind::Encoding(error))
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "rule '{rule}': ")?;
        }
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {hint}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// The kind of compilation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileErrorKind {
    #[error("unsupported operator '{operator}' for {value_type} value")]
    UnsupportedOperator {
        operator: String,
        value_type: ValueType,
    },

    #[error("condition node has neither a fact nor any 'all'/'any' children")]
    EmptyCondition,

    #[error("jump references undefined label '{0}'")]
    UndefinedLabel(String),

    #[error("label '{0}' is defined more than once")]
    DuplicateLabel(String),

    #[error("jump from instruction {index} lands outside the program")]
    JumpOutOfRange { index: usize },

    #[error("jump offset too large")]
    JumpTooLarge,

    #[error("priority {0} does not fit in 32 bits")]
    PriorityOutOfRange(u32),

    #[error("too many script parameters ({0})")]
    TooManyParameters(usize),

    #[error("operand encoding failed: {0}")]
    Encoding(CodecError),
}

/// Result type for compilation operations
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_rule_and_hint() {
        let err = CompileError::new(CompileErrorKind::UnsupportedOperator {
            operator: "XYZ".to_string(),
            value_type: ValueType::Number,
        })
        .with_rule("Freeze")
        .with_hint("numbers accept GT, LT, GTE, LTE, EQ, NEQ");

        assert_eq!(
            err.to_string(),
            "rule 'Freeze': unsupported operator 'XYZ' for number value\n  hint: numbers accept GT, LT, GTE, LTE, EQ, NEQ"
        );
    }

    #[test]
    fn innermost_rule_wins() {
        let err = CompileError::new(CompileErrorKind::EmptyCondition)
            .with_rule("inner")
            .with_rule("outer");
        assert_eq!(err.rule.as_deref(), Some("inner"));
    }
}

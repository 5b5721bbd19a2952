//! Instruction constructors and operator selection
//!
//! Every function here builds one fully encoded [`Instruction`]; value
//! encoding is delegated to the codec so operand layouts live in one place.

use std::fmt;
use std::str::FromStr;

use super::codec::{encode_bool, encode_f32, encode_i32, encode_str};
use super::error::{CompileError, CompileErrorKind, CompileResult};
use super::instruction::Instruction;
use super::opcode::OpCode;
use super::value::{ScalarValue, ValueType};

/// Comparison operators accepted in rule conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
    Contains,
    NotContains,
}

impl Operator {
    /// The upper-case symbol used in rule sources
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Gt => "GT",
            Operator::Lt => "LT",
            Operator::Gte => "GTE",
            Operator::Lte => "LTE",
            Operator::Eq => "EQ",
            Operator::Neq => "NEQ",
            Operator::Contains => "CONTAINS",
            Operator::NotContains => "NOT_CONTAINS",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Operator {
    type Err = ();

    /// Symbols are matched case-sensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GT" => Ok(Operator::Gt),
            "LT" => Ok(Operator::Lt),
            "GTE" => Ok(Operator::Gte),
            "LTE" => Ok(Operator::Lte),
            "EQ" => Ok(Operator::Eq),
            "NEQ" => Ok(Operator::Neq),
            "CONTAINS" => Ok(Operator::Contains),
            "NOT_CONTAINS" => Ok(Operator::NotContains),
            _ => Err(()),
        }
    }
}

/// Operators accepted for each value type, for error hints
fn accepted(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Number => "GT, LT, GTE, LTE, EQ, NEQ",
        ValueType::String => "EQ, NEQ, CONTAINS, NOT_CONTAINS",
        ValueType::Bool => "EQ, NEQ",
    }
}

/// Pick the comparison opcode for an operator symbol and a literal
pub fn select_opcode(operator: &str, value: &ScalarValue) -> CompileResult<OpCode> {
    let value_type = value.value_type();
    let opcode = operator.parse::<Operator>().ok().and_then(|op| {
        Some(match (value_type, op) {
            (ValueType::Number, Operator::Gt) => OpCode::FloatGt,
            (ValueType::Number, Operator::Lt) => OpCode::FloatLt,
            (ValueType::Number, Operator::Gte) => OpCode::FloatGte,
            (ValueType::Number, Operator::Lte) => OpCode::FloatLte,
            (ValueType::Number, Operator::Eq) => OpCode::FloatEq,
            (ValueType::Number, Operator::Neq) => OpCode::FloatNeq,
            (ValueType::String, Operator::Eq) => OpCode::StrEq,
            (ValueType::String, Operator::Neq) => OpCode::StrNeq,
            (ValueType::String, Operator::Contains) => OpCode::StrContains,
            (ValueType::String, Operator::NotContains) => OpCode::StrNotContains,
            (ValueType::Bool, Operator::Eq) => OpCode::BoolEq,
            (ValueType::Bool, Operator::Neq) => OpCode::BoolNeq,
            _ => return None,
        })
    });

    opcode.ok_or_else(|| {
        CompileError::new(CompileErrorKind::UnsupportedOperator {
            operator: operator.to_string(),
            value_type,
        })
        .with_hint(format!("{value_type} values accept {}", accepted(value_type)))
    })
}

/// `<comparison> fact operand`
pub fn comparison(opcode: OpCode, fact: &str, value: &ScalarValue) -> CompileResult<Instruction> {
    let mut operands = Vec::new();
    encode_str(&mut operands, fact)?;
    match value {
        ScalarValue::Int(_) | ScalarValue::Float(_) => {
            let x = value.as_f32().unwrap_or_default();
            encode_f32(&mut operands, x);
        }
        ScalarValue::String(s) => encode_str(&mut operands, s)?,
        ScalarValue::Bool(b) => encode_bool(&mut operands, *b),
    }
    Ok(Instruction::new(opcode, operands))
}

/// `RULE_START name`
pub fn rule_start(name: &str) -> CompileResult<Instruction> {
    let mut operands = Vec::new();
    encode_str(&mut operands, name)?;
    Ok(Instruction::new(OpCode::RuleStart, operands))
}

/// `RULE_END`
#[must_use]
pub fn rule_end() -> Instruction {
    Instruction::simple(OpCode::RuleEnd)
}

/// `PRIORITY p`
pub fn priority(priority: u32) -> CompileResult<Instruction> {
    let value = i32::try_from(priority).map_err(|_| CompileErrorKind::PriorityOutOfRange(priority))?;
    let mut operands = Vec::with_capacity(4);
    encode_i32(&mut operands, value);
    Ok(Instruction::new(OpCode::Priority, operands))
}

/// `EXEC_ACTION type target value`
pub fn exec_action(kind: &str, target: &str, value: &str) -> CompileResult<Instruction> {
    let mut operands = Vec::new();
    encode_str(&mut operands, kind)?;
    encode_str(&mut operands, target)?;
    encode_str(&mut operands, value)?;
    Ok(Instruction::new(OpCode::ExecAction, operands))
}

/// `SCRIPT_DEF name count params... body`
pub fn script_def(name: &str, params: &[String], body: &str) -> CompileResult<Instruction> {
    let count = i32::try_from(params.len())
        .map_err(|_| CompileErrorKind::TooManyParameters(params.len()))?;
    let mut operands = Vec::new();
    encode_str(&mut operands, name)?;
    encode_i32(&mut operands, count);
    for param in params {
        encode_str(&mut operands, param)?;
    }
    encode_str(&mut operands, body)?;
    Ok(Instruction::new(OpCode::ScriptDef, operands))
}

/// `SCRIPT_CALL name argument`
pub fn script_call(name: &str, argument: &str) -> CompileResult<Instruction> {
    let mut operands = Vec::new();
    encode_str(&mut operands, name)?;
    encode_str(&mut operands, argument)?;
    Ok(Instruction::new(OpCode::ScriptCall, operands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::codec::{CodecError, MAX_STRING_LEN};

    #[test]
    fn numeric_operators() {
        let n = ScalarValue::Int(5);
        assert_eq!(select_opcode("GT", &n).unwrap(), OpCode::FloatGt);
        assert_eq!(select_opcode("LTE", &n).unwrap(), OpCode::FloatLte);
        assert_eq!(
            select_opcode("NEQ", &ScalarValue::Float(1.5)).unwrap(),
            OpCode::FloatNeq
        );
    }

    #[test]
    fn string_and_bool_operators() {
        let s = ScalarValue::string("eu-");
        assert_eq!(select_opcode("CONTAINS", &s).unwrap(), OpCode::StrContains);
        assert_eq!(select_opcode("NOT_CONTAINS", &s).unwrap(), OpCode::StrNotContains);
        assert_eq!(select_opcode("EQ", &true.into()).unwrap(), OpCode::BoolEq);
    }

    #[test]
    fn unknown_operator_names_operator_and_type() {
        let err = select_opcode("XYZ", &ScalarValue::Int(1)).unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::UnsupportedOperator {
                operator: "XYZ".to_string(),
                value_type: ValueType::Number,
            }
        );
        assert!(err.to_string().contains("XYZ"));
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn operator_not_valid_for_type() {
        assert!(select_opcode("GT", &ScalarValue::string("x")).is_err());
        assert!(select_opcode("CONTAINS", &ScalarValue::Int(3)).is_err());
        assert!(select_opcode("LT", &ScalarValue::Bool(false)).is_err());
    }

    #[test]
    fn operators_are_case_sensitive() {
        assert!(select_opcode("gt", &ScalarValue::Int(1)).is_err());
    }

    #[test]
    fn int_literal_encoded_as_float() {
        let instruction = comparison(OpCode::FloatGt, "a", &ScalarValue::Int(5)).unwrap();
        let mut decoder = instruction.decoder();
        assert_eq!(decoder.read_str().unwrap(), "a");
        assert!((decoder.read_f32().unwrap() - 5.0).abs() < f32::EPSILON);
        assert!(decoder.is_empty());
    }

    #[test]
    fn script_def_layout() {
        let params = vec!["x".to_string(), "y".to_string()];
        let instruction = script_def("add", &params, "x + y").unwrap();
        let mut decoder = instruction.decoder();
        assert_eq!(decoder.read_str().unwrap(), "add");
        assert_eq!(decoder.read_i32().unwrap(), 2);
        assert_eq!(decoder.read_str().unwrap(), "x");
        assert_eq!(decoder.read_str().unwrap(), "y");
        assert_eq!(decoder.read_str().unwrap(), "x + y");
    }

    #[test]
    fn oversized_action_value_rejected() {
        let long = "v".repeat(MAX_STRING_LEN + 1);
        let err = exec_action("log", "console", &long).unwrap_err();
        assert_eq!(
            err.kind,
            CompileErrorKind::Encoding(CodecError::StringTooLong(MAX_STRING_LEN + 1))
        );
    }
}

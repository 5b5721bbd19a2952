//! Bytecode disassembler for debugging

use std::fmt::Write;

use super::codec::{CodecError, Decoder};
use super::instruction::Instruction;
use super::opcode::OpCode;
use super::program::Program;

/// Disassemble a program to a string, one instruction per line
pub fn disassemble_program(program: &Program, name: &str) -> String {
    let mut output = String::new();

    writeln!(output, "== {name} ==").unwrap();

    for (index, instruction) in program.instructions().iter().enumerate() {
        writeln!(output, "{}", disassemble_instruction(index, instruction)).unwrap();
    }

    output
}

/// Disassemble a single instruction at `index`
pub fn disassemble_instruction(index: usize, instruction: &Instruction) -> String {
    let mut output = String::new();
    let opcode = instruction.opcode();
    write!(output, "{index:04} {:16}", opcode.name()).unwrap();

    let mut decoder = instruction.decoder();
    if write_operands(&mut output, index, opcode, &mut decoder).is_err() {
        output.push_str(" <malformed operands>");
    }

    output.trim_end().to_string()
}

fn write_operands(
    output: &mut String,
    index: usize,
    opcode: OpCode,
    decoder: &mut Decoder<'_>,
) -> Result<(), CodecError> {
    match opcode {
        // No operand
        OpCode::Nop | OpCode::RuleEnd => {}

        OpCode::JumpIfTrue | OpCode::JumpIfFalse => {
            let offset = decoder.read_i32()?;
            let target = index as i64 + 1 + i64::from(offset);
            write!(output, " {offset:4} -> {target}").unwrap();
        }

        OpCode::Label | OpCode::RuleStart => {
            write!(output, " {}", decoder.read_str()?).unwrap();
        }

        OpCode::Priority => {
            write!(output, " {}", decoder.read_i32()?).unwrap();
        }

        OpCode::FloatGt
        | OpCode::FloatLt
        | OpCode::FloatGte
        | OpCode::FloatLte
        | OpCode::FloatEq
        | OpCode::FloatNeq => {
            let fact = decoder.read_str()?;
            write!(output, " {fact} {}", decoder.read_f32()?).unwrap();
        }

        OpCode::StrEq | OpCode::StrNeq | OpCode::StrContains | OpCode::StrNotContains => {
            let fact = decoder.read_str()?;
            write!(output, " {fact} {:?}", decoder.read_str()?).unwrap();
        }

        OpCode::BoolEq | OpCode::BoolNeq => {
            let fact = decoder.read_str()?;
            write!(output, " {fact} {}", decoder.read_bool()?).unwrap();
        }

        OpCode::ExecAction => {
            let kind = decoder.read_str()?;
            let target = decoder.read_str()?;
            write!(output, " {kind} {target} {:?}", decoder.read_str()?).unwrap();
        }

        OpCode::ScriptDef => {
            let name = decoder.read_str()?;
            let count = decoder.read_i32()?;
            let mut params = Vec::new();
            for _ in 0..count.max(0) {
                params.push(decoder.read_str()?);
            }
            let body = decoder.read_str()?;
            write!(output, " {name}({}) {body:?}", params.join(", ")).unwrap();
        }

        OpCode::ScriptCall => {
            let name = decoder.read_str()?;
            write!(output, " {name} {:?}", decoder.read_str()?).unwrap();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::codec::encode_str;
    use crate::bytecode::emit;
    use crate::bytecode::ScalarValue;

    #[test]
    fn disassemble_simple() {
        let program = Program::new(vec![
            emit::rule_start("Freeze").unwrap(),
            emit::priority(1).unwrap(),
            emit::comparison(OpCode::FloatLt, "temperature", &ScalarValue::Int(0)).unwrap(),
            Instruction::jump(OpCode::JumpIfFalse, 1),
            emit::exec_action("alert", "console", "freezing").unwrap(),
            emit::rule_end(),
        ]);
        let output = disassemble_program(&program, "rules");

        assert!(output.starts_with("== rules ==\n"));
        assert!(output.contains("0000 RULE_START       Freeze"));
        assert!(output.contains("0001 PRIORITY         1"));
        assert!(output.contains("FLOAT_LT         temperature 0"));
        assert!(output.contains("JUMP_IF_FALSE       1 -> 5"));
        assert!(output.contains("EXEC_ACTION      alert console \"freezing\""));
        assert!(output.contains("0005 RULE_END"));
    }

    #[test]
    fn script_definition() {
        let params = vec!["a".to_string(), "b".to_string()];
        let line = disassemble_instruction(0, &emit::script_def("sum", &params, "a+b").unwrap());
        assert_eq!(line, "0000 SCRIPT_DEF       sum(a, b) \"a+b\"");
    }

    #[test]
    fn malformed_operands_are_flagged() {
        let mut operands = Vec::new();
        encode_str(&mut operands, "fact").unwrap();
        let line = disassemble_instruction(3, &Instruction::new(OpCode::BoolEq, operands));
        assert!(line.ends_with("<malformed operands>"));
    }
}

//! Bytecode interpreter for Rulebyte programs
//!
//! This module provides:
//! - `Interpreter`: fetch/decode/execute over a resolved [`Program`]
//! - `FactTable`: the typed facts comparisons read
//! - `ActionHandler`: the host boundary for actions and scripts
//! - Runtime error types

mod error;
mod facts;
mod handler;

pub use error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
pub use facts::FactTable;
pub use handler::{
    ActionCall, ActionHandler, ConsoleHandler, HostError, RecordedAction, RecordingHandler,
    ScriptCall, ScriptDefinition,
};

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::bytecode::{Decoder, Instruction, OpCode, Program, ScalarValue, ValueType};
use crate::config::{FactPolicy, InterpreterConfig};

/// Interpreter lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Constructed, never executed
    Ready,
    /// Inside `execute`
    Running,
    /// The last run finished, normally or with an error
    Halted,
}

/// Summary of one `execute` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Rules that dispatched at least one action or script call, in order
    pub fired_rules: Vec<String>,
    /// `EXEC_ACTION` instructions handed to the host
    pub actions_dispatched: usize,
    /// `SCRIPT_CALL` instructions handed to the host
    pub scripts_called: usize,
    pub instructions_executed: u64,
    /// Every fact a comparison looked up, in evaluation order
    pub facts_read: Vec<String>,
}

impl ExecutionReport {
    /// Returns true if `rule` fired during the run
    #[must_use]
    pub fn fired(&self, rule: &str) -> bool {
        self.fired_rules.iter().any(|r| r == rule)
    }
}

/// Per-run registers
#[derive(Debug, Default)]
struct Registers {
    ip: usize,
    /// Result of the last comparison
    flag: bool,
    rule: Option<String>,
    rule_fired: bool,
    report: ExecutionReport,
}

impl Registers {
    fn dispatched(&mut self) {
        if !self.rule_fired {
            self.rule_fired = true;
            if let Some(rule) = &self.rule {
                self.report.fired_rules.push(rule.clone());
            }
        }
    }
}

/// The bytecode interpreter
///
/// Owns its fact table and instruction pointer; the program is shared.
#[derive(Debug, Clone)]
pub struct Interpreter {
    program: Arc<Program>,
    facts: FactTable,
    config: InterpreterConfig,
    state: State,
}

impl Interpreter {
    /// Create an interpreter with the default configuration
    pub fn new(program: impl Into<Arc<Program>>) -> Self {
        Self::with_config(program, InterpreterConfig::default())
    }

    /// Create an interpreter with an explicit configuration
    pub fn with_config(program: impl Into<Arc<Program>>, config: InterpreterConfig) -> Self {
        Self {
            program: program.into(),
            facts: FactTable::new(),
            config,
            state: State::Ready,
        }
    }

    /// Load a serialized program
    pub fn from_bytes(bytes: &[u8]) -> RuntimeResult<Self> {
        Ok(Self::new(Program::from_bytes(bytes)?))
    }

    #[must_use]
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    #[must_use]
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn facts(&self) -> &FactTable {
        &self.facts
    }

    pub fn facts_mut(&mut self) -> &mut FactTable {
        &mut self.facts
    }

    /// Replace the whole fact table
    pub fn set_facts(&mut self, facts: FactTable) {
        self.facts = facts;
    }

    /// Set one fact
    pub fn set_fact(&mut self, name: impl Into<String>, value: impl Into<ScalarValue>) {
        self.facts.insert(name, value);
    }

    /// Run the program from the first instruction to the end
    ///
    /// Each call starts afresh at index 0, so facts may be changed between
    /// runs. Any error halts the run immediately.
    pub fn execute(&mut self, handler: &mut dyn ActionHandler) -> RuntimeResult<ExecutionReport> {
        self.state = State::Running;
        let program = Arc::clone(&self.program);
        let instructions = program.instructions();
        let mut regs = Registers::default();

        while let Some(instruction) = instructions.get(regs.ip) {
            if let Some(limit) = self.config.max_steps {
                if regs.report.instructions_executed >= limit {
                    return Err(self.halt(RuntimeErrorKind::StepLimitExceeded(limit), &regs));
                }
            }

            trace!(ip = regs.ip, opcode = %instruction.opcode(), "execute");
            match self.dispatch(instruction, &mut regs, handler, instructions.len()) {
                Ok(next) => regs.ip = next,
                Err(kind) => return Err(self.halt(kind, &regs)),
            }
            regs.report.instructions_executed += 1;
        }

        self.state = State::Halted;
        debug!(
            fired = regs.report.fired_rules.len(),
            actions = regs.report.actions_dispatched,
            instructions = regs.report.instructions_executed,
            "execution finished"
        );
        Ok(regs.report)
    }

    fn halt(&mut self, kind: RuntimeErrorKind, regs: &Registers) -> RuntimeError {
        self.state = State::Halted;
        RuntimeError::new(kind).at(regs.ip, regs.rule.as_deref())
    }

    /// Execute one instruction, returning the next instruction pointer
    fn dispatch(
        &self,
        instruction: &Instruction,
        regs: &mut Registers,
        handler: &mut dyn ActionHandler,
        len: usize,
    ) -> Result<usize, RuntimeErrorKind> {
        let opcode = instruction.opcode();
        let mut operands = instruction.decoder();
        let next = regs.ip + 1;

        match opcode {
            OpCode::Nop | OpCode::Label => {}

            OpCode::JumpIfTrue | OpCode::JumpIfFalse => {
                let offset = operands.read_i32()?;
                if regs.flag == (opcode == OpCode::JumpIfTrue) {
                    return jump_target(regs.ip, offset, len);
                }
            }

            OpCode::RuleStart => {
                let name = operands.read_str()?;
                regs.rule = Some(name.to_string());
                regs.rule_fired = false;
                regs.flag = false;
            }

            OpCode::Priority => {
                let priority = operands.read_i32()?;
                trace!(rule = ?regs.rule, priority, "rule priority");
            }

            OpCode::RuleEnd => {
                if regs.rule_fired {
                    debug!(rule = ?regs.rule, "rule fired");
                }
                regs.rule = None;
                regs.rule_fired = false;
            }

            OpCode::FloatGt
            | OpCode::FloatLt
            | OpCode::FloatGte
            | OpCode::FloatLte
            | OpCode::FloatEq
            | OpCode::FloatNeq
            | OpCode::StrEq
            | OpCode::StrNeq
            | OpCode::StrContains
            | OpCode::StrNotContains
            | OpCode::BoolEq
            | OpCode::BoolNeq => {
                regs.flag = self.compare(opcode, &mut operands, regs)?;
            }

            OpCode::ExecAction => {
                let kind = operands.read_str()?;
                let target = operands.read_str()?;
                let value = operands.read_str()?;
                handler.execute(&ActionCall {
                    rule: regs.rule.as_deref(),
                    kind,
                    target,
                    value,
                })?;
                regs.report.actions_dispatched += 1;
                regs.dispatched();
            }

            OpCode::ScriptDef => {
                let name = operands.read_str()?;
                let count = operands.read_i32()?;
                let count = usize::try_from(count).map_err(|_| {
                    RuntimeErrorKind::InvalidOperand(format!(
                        "script '{name}' has negative parameter count {count}"
                    ))
                })?;
                let mut params = Vec::with_capacity(count.min(operands.remaining()));
                for _ in 0..count {
                    params.push(operands.read_str()?);
                }
                let body = operands.read_str()?;
                handler.define_script(&ScriptDefinition {
                    rule: regs.rule.as_deref(),
                    name,
                    params,
                    body,
                })?;
            }

            OpCode::ScriptCall => {
                let name = operands.read_str()?;
                let argument = operands.read_str()?;
                handler.call_script(&ScriptCall {
                    rule: regs.rule.as_deref(),
                    name,
                    argument,
                })?;
                regs.report.scripts_called += 1;
                regs.dispatched();
            }
        }

        Ok(next)
    }

    /// Evaluate a typed comparison
    #[allow(clippy::float_cmp)]
    fn compare(
        &self,
        opcode: OpCode,
        operands: &mut Decoder<'_>,
        regs: &mut Registers,
    ) -> Result<bool, RuntimeErrorKind> {
        let fact = operands.read_str()?;
        regs.report.facts_read.push(fact.to_string());

        let Some(expected) = opcode.comparison_type() else {
            return Err(RuntimeErrorKind::InvalidOperand(format!(
                "{opcode} is not a comparison"
            )));
        };
        let Some(value) = self.facts.get(fact) else {
            return self.unreadable(RuntimeErrorKind::MissingFact(fact.to_string()));
        };
        let mismatch = || RuntimeErrorKind::FactTypeMismatch {
            fact: fact.to_string(),
            opcode,
            expected,
            found: value.value_type(),
        };

        let result = match expected {
            ValueType::Number => {
                let operand = operands.read_f32()?;
                let Some(x) = value.as_f32() else {
                    return self.unreadable(mismatch());
                };
                match opcode {
                    OpCode::FloatGt => x > operand,
                    OpCode::FloatLt => x < operand,
                    OpCode::FloatGte => x >= operand,
                    OpCode::FloatLte => x <= operand,
                    OpCode::FloatEq => x == operand,
                    _ => x != operand,
                }
            }
            ValueType::String => {
                let operand = operands.read_str()?;
                let Some(s) = value.as_str() else {
                    return self.unreadable(mismatch());
                };
                match opcode {
                    OpCode::StrEq => s == operand,
                    OpCode::StrNeq => s != operand,
                    OpCode::StrContains => s.contains(operand),
                    _ => !s.contains(operand),
                }
            }
            ValueType::Bool => {
                let operand = operands.read_bool()?;
                let Some(b) = value.as_bool() else {
                    return self.unreadable(mismatch());
                };
                if opcode == OpCode::BoolEq {
                    b == operand
                } else {
                    b != operand
                }
            }
        };

        trace!(fact, %value, result, "compared");
        Ok(result)
    }

    /// Apply the fact policy to a missing or mistyped fact
    fn unreadable(&self, kind: RuntimeErrorKind) -> Result<bool, RuntimeErrorKind> {
        match self.config.fact_policy {
            FactPolicy::Lenient => {
                warn!("{kind}; comparison is false");
                Ok(false)
            }
            FactPolicy::Strict => Err(kind),
        }
    }
}

/// Absolute target of a taken jump; the end of the program is a valid target
fn jump_target(ip: usize, offset: i32, len: usize) -> Result<usize, RuntimeErrorKind> {
    let target = i64::try_from(ip).unwrap_or(i64::MAX) + 1 + i64::from(offset);
    usize::try_from(target)
        .ok()
        .filter(|t| *t <= len)
        .ok_or(RuntimeErrorKind::JumpOutOfBounds { target, len })
}

//! Rule tree to bytecode compiler
//!
//! Each rule is assembled on its own and resolved before the next one starts,
//! so labels never outlive their rule and fragments can simply be
//! concatenated. Jump offsets are relative, which keeps a resolved fragment
//! valid at any position in the final program.

use tracing::debug;

use super::emit;
use super::error::{CompileError, CompileErrorKind, CompileResult};
use super::instruction::Instruction;
use super::label::{Label, LabelAllocator};
use super::opcode::OpCode;
use super::program::Program;
use super::resolver::{strip_labels, Assembler};
use crate::config::CompilerConfig;
use crate::rule::{Action, Condition, ConditionGroup, Rule, RuleSet, SCRIPT_ACTION};

/// Bytecode compiler
///
/// A compiler owns the label state for one compile job. It can be reused for
/// several rulesets; labels are recycled after every rule.
#[derive(Debug, Default)]
pub struct Compiler {
    config: CompilerConfig,
    labels: LabelAllocator,
}

impl Compiler {
    /// Create a compiler with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler with an explicit configuration
    #[must_use]
    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            config,
            labels: LabelAllocator::new(),
        }
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Label allocator statistics
    #[must_use]
    pub fn labels(&self) -> &LabelAllocator {
        &self.labels
    }

    /// Compile a ruleset into a resolved program
    ///
    /// Stops at the first error. The error names the offending rule.
    pub fn compile(&mut self, ruleset: &RuleSet) -> CompileResult<Program> {
        let mut rules: Vec<&Rule> = ruleset.rules.iter().collect();
        if self.config.sort_by_priority {
            // Stable, so equal priorities keep source order
            rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        }

        let mut instructions = Vec::new();
        for rule in rules {
            let fragment = self
                .compile_rule(rule)
                .map_err(|e| e.with_rule(&rule.name))?;
            debug!(
                rule = %rule.name,
                priority = rule.priority,
                instructions = fragment.len(),
                "compiled rule"
            );
            instructions.extend(fragment.into_instructions());
        }

        let mut program = Program::new(instructions);
        if self.config.strip_labels {
            program = strip_labels(&program)?;
        }

        debug!(
            rules = ruleset.rules.len(),
            instructions = program.len(),
            bytes = program.byte_len(),
            peak_labels = self.labels.peak(),
            "compiled ruleset"
        );
        Ok(program)
    }

    /// Compile one rule into a resolved fragment
    ///
    /// Labels are released whether or not the rule compiled.
    pub fn compile_rule(&mut self, rule: &Rule) -> CompileResult<Program> {
        let result = self.assemble_rule(rule);
        self.labels.release_all();
        result
    }

    fn assemble_rule(&mut self, rule: &Rule) -> CompileResult<Program> {
        let mut asm = Assembler::new();
        asm.emit(emit::rule_start(&rule.name)?);
        asm.emit(emit::priority(rule.priority)?);
        for (name, script) in &rule.scripts {
            asm.emit(emit::script_def(name, &script.params, &script.body)?);
        }

        let body = self.labels.allocate();
        let skip = self.labels.allocate();
        self.lower_wired(&mut asm, &rule.conditions, body, skip)?;

        asm.mark(body)?;
        for action in &rule.actions {
            asm.emit(action_instruction(action)?);
        }
        asm.mark(skip)?;
        asm.emit(emit::rule_end());

        asm.resolve()
    }

    // ===== Condition Lowering =====

    /// Lower `node` so that control always leaves through `success` or `fail`
    ///
    /// A leaf only jumps on success, so the failure jump is added here.
    fn lower_wired(
        &mut self,
        asm: &mut Assembler,
        node: &Condition,
        success: Label,
        fail: Label,
    ) -> CompileResult<()> {
        self.lower(asm, node, success, fail)?;
        if node.is_fact() {
            asm.emit_jump(OpCode::JumpIfFalse, fail);
        }
        Ok(())
    }

    fn lower(
        &mut self,
        asm: &mut Assembler,
        node: &Condition,
        success: Label,
        fail: Label,
    ) -> CompileResult<()> {
        match node {
            Condition::Fact(leaf) => {
                let opcode = emit::select_opcode(&leaf.operator, &leaf.value)?;
                asm.emit(emit::comparison(opcode, &leaf.fact, &leaf.value)?);
                asm.emit_jump(OpCode::JumpIfTrue, success);
                Ok(())
            }
            Condition::Group(group) => self.lower_group(asm, group, success, fail),
        }
    }

    fn lower_group(
        &mut self,
        asm: &mut Assembler,
        group: &ConditionGroup,
        success: Label,
        fail: Label,
    ) -> CompileResult<()> {
        match (group.all.is_empty(), group.any.is_empty()) {
            (true, true) => Err(CompileError::new(CompileErrorKind::EmptyCondition)),
            (false, true) => self.lower_all(asm, &group.all, success, fail),
            (true, false) => self.lower_any(asm, &group.any, success, fail),
            (false, false) => {
                let any_entry = self.labels.allocate();
                self.lower_all(asm, &group.all, any_entry, fail)?;
                asm.mark(any_entry)?;
                self.lower_any(asm, &group.any, success, fail)
            }
        }
    }

    fn lower_all(
        &mut self,
        asm: &mut Assembler,
        children: &[Condition],
        success: Label,
        fail: Label,
    ) -> CompileResult<()> {
        let Some((last, rest)) = children.split_last() else {
            return Err(CompileError::new(CompileErrorKind::EmptyCondition));
        };
        for child in rest {
            let next = self.labels.allocate();
            self.lower_wired(asm, child, next, fail)?;
            asm.mark(next)?;
        }
        self.lower_wired(asm, last, success, fail)
    }

    fn lower_any(
        &mut self,
        asm: &mut Assembler,
        children: &[Condition],
        success: Label,
        fail: Label,
    ) -> CompileResult<()> {
        let Some((last, rest)) = children.split_last() else {
            return Err(CompileError::new(CompileErrorKind::EmptyCondition));
        };
        for child in rest {
            let next = self.labels.allocate();
            self.lower_wired(asm, child, success, next)?;
            asm.mark(next)?;
        }
        self.lower_wired(asm, last, success, fail)
    }
}

fn action_instruction(action: &Action) -> CompileResult<Instruction> {
    let value = action.value.to_string();
    if action.kind == SCRIPT_ACTION {
        emit::script_call(&action.target, &value)
    } else {
        emit::exec_action(&action.kind, &action.target, &value)
    }
}

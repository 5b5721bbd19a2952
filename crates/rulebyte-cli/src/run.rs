//! Program execution for `rulebyte run` and `rulebyte disasm`.

use anyhow::{anyhow, Context, Result};
use rulebyte_core::bytecode::{disassemble_program, read_program};
use rulebyte_core::vm::{ConsoleHandler, Interpreter, RecordingHandler};
use rulebyte_core::{load_facts, EngineConfig, ExecutionReport, FactPolicy, FactTable, ScalarValue};
use std::path::{Path, PathBuf};

/// Options for `rulebyte run`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub program: PathBuf,
    pub facts: Option<PathBuf>,
    /// `NAME=VALUE` facts applied after the fact file.
    pub overrides: Vec<String>,
    /// Missing or mistyped facts are errors (overrides the config file).
    pub strict: bool,
    pub dry_run: bool,
}

/// Execute a compiled program once against a fact file.
pub fn run_program(options: &RunOptions, config: EngineConfig) -> Result<()> {
    let program = read_program(&options.program)
        .with_context(|| format!("Failed to read program '{}'", options.program.display()))?;
    let facts = collect_facts(options)?;

    let mut interpreter_config = config.interpreter;
    if options.strict {
        interpreter_config.fact_policy = FactPolicy::Strict;
    }

    let mut vm = Interpreter::with_config(program, interpreter_config);
    vm.set_facts(facts);

    let report = if options.dry_run {
        let mut handler = RecordingHandler::new();
        let report = vm.execute(&mut handler).context("Execution failed")?;
        for action in &handler.actions {
            println!(
                "would {} -> {}: {} (rule {})",
                action.kind,
                action.target,
                action.value,
                action.rule.as_deref().unwrap_or("-")
            );
        }
        for (name, argument) in &handler.script_calls {
            println!("would call script {name}({argument})");
        }
        report
    } else {
        let stdout = std::io::stdout();
        let mut handler = ConsoleHandler::new(stdout.lock());
        vm.execute(&mut handler).context("Execution failed")?
    };

    print_summary(&report);
    Ok(())
}

fn collect_facts(options: &RunOptions) -> Result<FactTable> {
    let mut facts = match &options.facts {
        Some(path) => load_facts(path)
            .with_context(|| format!("Failed to load facts from '{}'", path.display()))?,
        None => FactTable::new(),
    };

    for assignment in &options.overrides {
        let (name, value) = assignment
            .split_once('=')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| anyhow!("Invalid fact '{assignment}', expected NAME=VALUE"))?;
        facts.insert(name, ScalarValue::parse_literal(value));
    }

    Ok(facts)
}

fn print_summary(report: &ExecutionReport) {
    let fired = if report.fired_rules.is_empty() {
        "none".to_string()
    } else {
        report.fired_rules.join(", ")
    };
    println!(
        "Fired: {fired} ({} actions, {} script calls, {} instructions)",
        report.actions_dispatched, report.scripts_called, report.instructions_executed
    );
}

/// Print the disassembly of a bytecode file.
pub fn disassemble(path: &Path) -> Result<()> {
    let program = read_program(path)
        .with_context(|| format!("Failed to read program '{}'", path.display()))?;
    print!("{}", disassemble_program(&program, &path.display().to_string()));
    Ok(())
}

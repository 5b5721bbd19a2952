//! Ruleset compilation for `rulebyte compile`.

use anyhow::{Context, Result};
use rulebyte_core::bytecode::{disassemble_program, Compiler, Program};
use rulebyte_core::{load_ruleset, EngineConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Options for `rulebyte compile`.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Strip label markers (overrides the config file).
    pub optimize: bool,
    pub validate_only: bool,
    pub verbose: bool,
}

/// Validate and compile a rule source, writing the program atomically.
///
/// Nothing is written when validation or compilation fails.
pub fn compile_rules(options: &CompileOptions, config: EngineConfig) -> Result<()> {
    let ruleset = load_ruleset(&options.input)
        .with_context(|| format!("Failed to load rules from '{}'", options.input.display()))?;

    if options.validate_only {
        println!(
            "{}: {} rules valid",
            options.input.display(),
            ruleset.rules.len()
        );
        return Ok(());
    }

    let mut compiler_config = config.compiler;
    compiler_config.strip_labels |= options.optimize;

    let program = Compiler::with_config(compiler_config)
        .compile(&ruleset)
        .context("Compilation failed")?;

    if options.verbose {
        print!(
            "{}",
            disassemble_program(&program, &options.input.display().to_string())
        );
    }

    write_atomic(&options.output, &program)?;
    info!(output = %options.output.display(), "wrote program");

    println!(
        "Compiled {} rules into {} instructions ({} bytes) -> {}",
        program.rule_count(),
        program.len(),
        program.byte_len(),
        options.output.display()
    );
    Ok(())
}

/// Write through a temp file in the destination directory, then rename.
fn write_atomic(path: &Path, program: &Program) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in '{}'", dir.display()))?;
    file.write_all(&program.to_bytes())
        .context("Failed to write program")?;
    file.persist(path)
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    Ok(())
}

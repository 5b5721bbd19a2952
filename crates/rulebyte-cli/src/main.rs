//! Rulebyte CLI - Command-line interface for the Rulebyte rule engine

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rulebyte_core::EngineConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

mod compile;
mod run;

#[derive(Parser)]
#[command(name = "rulebyte")]
#[command(version = rulebyte_core::VERSION)]
#[command(about = "Compile rules to bytecode and run them against facts", long_about = None)]
struct Cli {
    /// Print disassembly and debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./rulebyte.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON, YAML, or TOML ruleset to a bytecode file
    Compile {
        /// Rule source file
        input: PathBuf,

        /// Bytecode output file
        output: PathBuf,

        /// Strip label markers from the compiled program
        #[arg(long)]
        optimize: bool,

        /// Only validate the ruleset, write nothing
        #[arg(long)]
        validate_only: bool,
    },

    /// Execute a bytecode file against a fact file
    Run {
        /// Bytecode file
        program: PathBuf,

        /// Fact file (JSON, YAML, or TOML map of scalars)
        #[arg(long)]
        facts: Option<PathBuf>,

        /// Set a fact, overriding the fact file (e.g. `--set temperature=-5`)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        overrides: Vec<String>,

        /// Treat missing or mistyped facts as errors
        #[arg(long)]
        strict: bool,

        /// Report actions instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a human-readable listing of a bytecode file
    Disasm {
        /// Bytecode file
        program: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile {
            input,
            output,
            optimize,
            validate_only,
        } => {
            let options = compile::CompileOptions {
                input,
                output,
                optimize,
                validate_only,
                verbose: cli.verbose,
            };
            compile::compile_rules(&options, config)?;
        }

        Commands::Run {
            program,
            facts,
            overrides,
            strict,
            dry_run,
        } => {
            let options = run::RunOptions {
                program,
                facts,
                overrides,
                strict,
                dry_run,
            };
            run::run_program(&options, config)?;
        }

        Commands::Disasm { program } => {
            run::disassemble(&program)?;
        }
    }

    Ok(())
}

/// Install the stderr subscriber; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()));
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let (config, found) = EngineConfig::discover(&cwd).context("Failed to load rulebyte.toml")?;
    if let Some(path) = found {
        debug!(path = %path.display(), "loaded config");
    }
    Ok(config)
}

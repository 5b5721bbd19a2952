//! Rulebyte Core - Rule compiler and bytecode interpreter
//!
//! This crate provides the core functionality:
//! - Rule: Rule trees, source loading, and validation
//! - Bytecode: Instruction set, encoding, and compiler
//! - VM: Bytecode execution against a fact table
//! - Config: Engine configuration

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rule module - rule trees and their JSON/YAML/TOML sources
pub mod rule;

/// Bytecode module - instruction set and compiler
pub mod bytecode;

/// Virtual Machine module - bytecode execution
pub mod vm;

/// Engine configuration (`rulebyte.toml`)
pub mod config;

// Re-export commonly used types
pub use bytecode::{disassemble_program, CompileError, Compiler, Program, ScalarValue};
pub use config::{EngineConfig, FactPolicy};
pub use rule::{load_facts, load_ruleset, RuleSet};
pub use vm::{ActionHandler, ExecutionReport, FactTable, Interpreter, RuntimeError};

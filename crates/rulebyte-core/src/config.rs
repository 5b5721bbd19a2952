//! Engine configuration (`rulebyte.toml`) parsing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conventional configuration file name.
pub const CONFIG_FILE: &str = "rulebyte.toml";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("max_steps must be greater than zero")]
    ZeroStepLimit,
}

/// The complete rulebyte.toml configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Compiler settings.
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Interpreter settings.
    #[serde(default)]
    pub interpreter: InterpreterConfig,
}

/// Compiler section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Remove `LABEL` markers after resolution.
    #[serde(default)]
    pub strip_labels: bool,

    /// Emit rules by descending priority instead of source order.
    #[serde(default = "default_true")]
    pub sort_by_priority: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            strip_labels: false,
            sort_by_priority: true,
        }
    }
}

/// What a comparison does when its fact is missing or has the wrong type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactPolicy {
    /// The comparison is false.
    #[default]
    Lenient,
    /// Execution halts with a runtime error.
    Strict,
}

/// Interpreter section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterpreterConfig {
    #[serde(default)]
    pub fact_policy: FactPolicy,

    /// Instruction budget per `execute`; unlimited when absent.
    #[serde(default)]
    pub max_steps: Option<u64>,
}

impl EngineConfig {
    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown keys or invalid values.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        if config.interpreter.max_steps == Some(0) {
            return Err(ConfigError::ZeroStepLimit);
        }
        Ok(config)
    }

    /// Load `rulebyte.toml` from `dir` if present, else the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn discover(dir: impl AsRef<Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if path.is_file() {
            let config = Self::from_path(&path)?;
            Ok((config, Some(path)))
        } else {
            Ok((Self::default(), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = EngineConfig::parse("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.compiler.sort_by_priority);
        assert!(!config.compiler.strip_labels);
        assert_eq!(config.interpreter.fact_policy, FactPolicy::Lenient);
        assert_eq!(config.interpreter.max_steps, None);
    }

    #[test]
    fn full_config() {
        let config = EngineConfig::parse(
            r#"
[compiler]
strip_labels = true
sort_by_priority = false

[interpreter]
fact_policy = "strict"
max_steps = 500
"#,
        )
        .unwrap();
        assert!(config.compiler.strip_labels);
        assert!(!config.compiler.sort_by_priority);
        assert_eq!(config.interpreter.fact_policy, FactPolicy::Strict);
        assert_eq!(config.interpreter.max_steps, Some(500));
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = EngineConfig::parse("[compiler]\ninline = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_step_limit_rejected() {
        let err = EngineConfig::parse("[interpreter]\nmax_steps = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroStepLimit));
    }

    #[test]
    fn discover_finds_file() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) = EngineConfig::discover(dir.path()).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(path.is_none());

        std::fs::write(dir.path().join(CONFIG_FILE), "[interpreter]\nfact_policy = \"strict\"\n").unwrap();
        let (config, path) = EngineConfig::discover(dir.path()).unwrap();
        assert_eq!(config.interpreter.fact_policy, FactPolicy::Strict);
        assert_eq!(path, Some(dir.path().join(CONFIG_FILE)));
    }
}

//! Raw rule sources and file loading

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::validate::ValidationErrors;
use super::{RuleSet, Script};
use crate::bytecode::ScalarValue;
use crate::vm::FactTable;

/// Errors that can occur while loading rule or fact sources
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot infer source format of '{0}', expected .json, .yaml, .yml, or .toml")]
    UnknownFormat(String),

    #[error("{0}")]
    Invalid(#[from] ValidationErrors),
}

/// Textual source format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
    Toml,
}

impl SourceFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(SourceFormat::Json),
            Some("yaml" | "yml") => Ok(SourceFormat::Yaml),
            Some("toml") => Ok(SourceFormat::Toml),
            _ => Err(SourceError::UnknownFormat(path.display().to_string())),
        }
    }

    fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, SourceError> {
        Ok(match self {
            SourceFormat::Json => serde_json::from_str(text)?,
            SourceFormat::Yaml => serde_yaml::from_str(text)?,
            SourceFormat::Toml => toml::from_str(text)?,
        })
    }
}

/// A ruleset exactly as it appears in a source file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRuleSet {
    #[serde(default)]
    pub rules: Vec<RawRule>,
}

/// A rule before validation; every field may be missing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRule {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub priority: Option<i64>,

    #[serde(default)]
    pub conditions: Option<RawCondition>,

    #[serde(default)]
    pub actions: Vec<RawAction>,

    #[serde(default)]
    pub scripts: BTreeMap<String, Script>,
}

/// A condition node before validation
///
/// Leaves set `fact`, `operator`, and `value`; groups set `all` and/or
/// `any`. Which shape the node has is decided by the validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCondition {
    #[serde(default)]
    pub fact: Option<String>,

    #[serde(default)]
    pub operator: Option<String>,

    #[serde(default)]
    pub value: Option<ScalarValue>,

    #[serde(default)]
    pub all: Option<Vec<RawCondition>>,

    #[serde(default)]
    pub any: Option<Vec<RawCondition>>,
}

/// An action before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAction {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub value: Option<ScalarValue>,
}

/// Parse and validate a ruleset from text
pub fn parse_ruleset(text: &str, format: SourceFormat) -> Result<RuleSet, SourceError> {
    let raw: RawRuleSet = format.parse(text)?;
    Ok(raw.validate()?)
}

/// Load and validate a ruleset, choosing the format from the extension
pub fn load_ruleset(path: impl AsRef<Path>) -> Result<RuleSet, SourceError> {
    let path = path.as_ref();
    let format = SourceFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    parse_ruleset(&text, format)
}

/// Parse a fact table from a flat map of names to scalars
pub fn parse_facts(text: &str, format: SourceFormat) -> Result<FactTable, SourceError> {
    let facts: BTreeMap<String, ScalarValue> = format.parse(text)?;
    Ok(facts.into_iter().collect())
}

/// Load a fact table, choosing the format from the extension
pub fn load_facts(path: impl AsRef<Path>) -> Result<FactTable, SourceError> {
    let path = path.as_ref();
    let format = SourceFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    parse_facts(&text, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Condition;

    const FREEZE_JSON: &str = r#"{
        "rules": [{
            "name": "Freeze",
            "priority": 1,
            "conditions": {"all": [{"fact": "temperature", "operator": "LT", "value": 0}]},
            "actions": [{"type": "alert", "target": "console", "value": "freezing"}]
        }]
    }"#;

    #[test]
    fn parse_json_ruleset() {
        let ruleset = parse_ruleset(FREEZE_JSON, SourceFormat::Json).unwrap();
        assert_eq!(ruleset.rules.len(), 1);

        let rule = &ruleset.rules[0];
        assert_eq!(rule.name, "Freeze");
        assert_eq!(rule.priority, 1);
        assert_eq!(
            rule.conditions,
            Condition::all(vec![Condition::fact("temperature", "LT", 0)])
        );
        assert_eq!(rule.actions[0].kind, "alert");
        assert_eq!(rule.actions[0].value, ScalarValue::string("freezing"));
    }

    #[test]
    fn parse_yaml_ruleset() {
        let yaml = r"
rules:
  - name: Hot
    priority: 3
    conditions:
      any:
        - { fact: temperature, operator: GT, value: 35.5 }
        - { fact: alarm, operator: EQ, value: true }
    actions:
      - { type: alert, target: pager, value: hot }
    scripts:
      cool:
        params: [level]
        body: fan(level)
";
        let ruleset = parse_ruleset(yaml, SourceFormat::Yaml).unwrap();
        let rule = &ruleset.rules[0];
        assert_eq!(
            rule.conditions,
            Condition::any(vec![
                Condition::fact("temperature", "GT", 35.5f32),
                Condition::fact("alarm", "EQ", true),
            ])
        );
        assert_eq!(rule.scripts["cool"].params, vec!["level".to_string()]);
    }

    #[test]
    fn parse_toml_ruleset() {
        let toml = r#"
[[rules]]
name = "Region"
priority = 0

[rules.conditions]
all = [{ fact = "region", operator = "CONTAINS", value = "eu-" }]

[[rules.actions]]
type = "route"
target = "queue"
value = "europe"
"#;
        let ruleset = parse_ruleset(toml, SourceFormat::Toml).unwrap();
        assert_eq!(ruleset.rules[0].name, "Region");
    }

    #[test]
    fn unknown_fields_rejected() {
        let json = r#"{"rules": [{"name": "x", "priority": 1, "colour": "red"}]}"#;
        assert!(matches!(
            parse_ruleset(json, SourceFormat::Json),
            Err(SourceError::Json(_))
        ));
    }

    #[test]
    fn validation_errors_surface() {
        let json = r#"{"rules": [{"name": "", "priority": -1, "conditions": {"all": []}}]}"#;
        let err = parse_ruleset(json, SourceFormat::Json).unwrap_err();
        let SourceError::Invalid(errors) = err else {
            panic!("expected validation errors, got {err}");
        };
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a.JSON")).unwrap(), SourceFormat::Json);
        assert_eq!(SourceFormat::from_path(Path::new("a.yml")).unwrap(), SourceFormat::Yaml);
        assert_eq!(SourceFormat::from_path(Path::new("a.toml")).unwrap(), SourceFormat::Toml);
        assert!(SourceFormat::from_path(Path::new("rules.txt")).is_err());
    }

    #[test]
    fn parse_fact_table() {
        let facts = parse_facts(
            r#"{"temperature": -5, "city": "Oslo", "alarm": false, "load": 0.75}"#,
            SourceFormat::Json,
        )
        .unwrap();
        assert_eq!(facts.len(), 4);
        assert_eq!(facts.get("temperature"), Some(&ScalarValue::Int(-5)));
        assert_eq!(facts.get("load"), Some(&ScalarValue::Float(0.75)));
    }
}

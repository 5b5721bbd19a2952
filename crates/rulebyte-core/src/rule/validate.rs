//! Structural validation of raw rule sources
//!
//! Validation collects every problem in the ruleset rather than stopping at
//! the first, and any problem rejects the whole batch.

use std::fmt;

use thiserror::Error;

use super::source::{RawAction, RawCondition, RawRule, RawRuleSet};
use super::{Action, Condition, ConditionGroup, FactCondition, Rule, RuleSet};

/// The kind of validation error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("priority must be non-negative, got {0}")]
    NegativePriority(i64),

    #[error("priority {0} is too large (max 2147483647)")]
    PriorityTooLarge(i64),

    #[error("rule conditions must contain an 'all' or 'any' group")]
    RootNotGroup,

    #[error("condition node has neither a fact nor any 'all'/'any' children")]
    EmptyCondition,

    #[error("condition node mixes fact, operator, or value with 'all'/'any' groups")]
    MixedCondition,
}

/// A validation error with the path of the offending element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The kind of error
    pub kind: ValidationErrorKind,
    /// Location in the source, e.g. `rules[0].conditions.all[2]`
    pub path: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

impl std::error::Error for ValidationError {}

/// Every validation error found in a ruleset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    /// Number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the errors
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ruleset is invalid ({} errors):", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Default)]
struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    fn error(&mut self, path: &str, kind: ValidationErrorKind) {
        self.errors.push(ValidationError {
            kind,
            path: path.to_string(),
        });
    }

    fn rule(&mut self, raw: &RawRule, path: &str) -> Option<Rule> {
        let name = match raw.name.as_deref() {
            None => {
                self.error(path, ValidationErrorKind::MissingField("name"));
                None
            }
            Some("") => {
                self.error(path, ValidationErrorKind::EmptyField("name"));
                None
            }
            Some(name) => Some(name.to_string()),
        };

        let priority = match raw.priority.unwrap_or(0) {
            p if p < 0 => {
                self.error(path, ValidationErrorKind::NegativePriority(p));
                None
            }
            p => match u32::try_from(p) {
                Ok(p) if i32::try_from(p).is_ok() => Some(p),
                _ => {
                    self.error(path, ValidationErrorKind::PriorityTooLarge(p));
                    None
                }
            },
        };

        let conditions_path = format!("{path}.conditions");
        let conditions = match &raw.conditions {
            None => {
                self.error(path, ValidationErrorKind::MissingField("conditions"));
                None
            }
            Some(node) if node.fact.is_some() && node.all.is_none() && node.any.is_none() => {
                self.error(&conditions_path, ValidationErrorKind::RootNotGroup);
                None
            }
            Some(node) => self.condition(node, &conditions_path),
        };

        let mut actions = Vec::with_capacity(raw.actions.len());
        for (i, action) in raw.actions.iter().enumerate() {
            if let Some(action) = self.action(action, &format!("{path}.actions[{i}]")) {
                actions.push(action);
            }
        }

        Some(Rule {
            name: name?,
            priority: priority?,
            conditions: conditions?,
            actions,
            scripts: raw.scripts.clone(),
        })
    }

    fn condition(&mut self, raw: &RawCondition, path: &str) -> Option<Condition> {
        let is_group = raw.all.is_some() || raw.any.is_some();

        let is_leaf = raw.fact.is_some() || raw.operator.is_some() || raw.value.is_some();
        if is_leaf && is_group {
            self.error(path, ValidationErrorKind::MixedCondition);
            return None;
        }

        if is_group {
            let all = self.children(raw.all.as_deref(), &format!("{path}.all"));
            let any = self.children(raw.any.as_deref(), &format!("{path}.any"));
            let (all, any) = (all?, any?);
            if all.is_empty() && any.is_empty() {
                self.error(path, ValidationErrorKind::EmptyCondition);
                return None;
            }
            return Some(Condition::Group(ConditionGroup { all, any }));
        }

        if raw.fact.is_none() && raw.operator.is_none() && raw.value.is_none() {
            self.error(path, ValidationErrorKind::EmptyCondition);
            return None;
        }

        let fact = self.required_text(raw.fact.as_deref(), "fact", path);
        let operator = self.required_text(raw.operator.as_deref(), "operator", path);
        let value = raw.value.clone();
        if value.is_none() {
            self.error(path, ValidationErrorKind::MissingField("value"));
        }

        Some(Condition::Fact(FactCondition {
            fact: fact?,
            operator: operator?,
            value: value?,
        }))
    }

    fn children(&mut self, raw: Option<&[RawCondition]>, path: &str) -> Option<Vec<Condition>> {
        let Some(raw) = raw else {
            return Some(Vec::new());
        };
        let mut ok = true;
        let mut children = Vec::with_capacity(raw.len());
        for (i, child) in raw.iter().enumerate() {
            match self.condition(child, &format!("{path}[{i}]")) {
                Some(child) => children.push(child),
                None => ok = false,
            }
        }
        ok.then_some(children)
    }

    fn action(&mut self, raw: &RawAction, path: &str) -> Option<Action> {
        let kind = self.required_text(raw.kind.as_deref(), "type", path);
        let target = raw.target.clone();
        if target.is_none() {
            self.error(path, ValidationErrorKind::MissingField("target"));
        }
        let value = raw.value.clone();
        if value.is_none() {
            self.error(path, ValidationErrorKind::MissingField("value"));
        }
        Some(Action {
            kind: kind?,
            target: target?,
            value: value?,
        })
    }

    fn required_text(&mut self, value: Option<&str>, field: &'static str, path: &str) -> Option<String> {
        match value {
            None => {
                self.error(path, ValidationErrorKind::MissingField(field));
                None
            }
            Some("") => {
                self.error(path, ValidationErrorKind::EmptyField(field));
                None
            }
            Some(text) => Some(text.to_string()),
        }
    }
}

impl RawRuleSet {
    /// Validate the raw ruleset and build the rule tree
    ///
    /// A missing `priority` defaults to 0.
    pub fn validate(&self) -> Result<RuleSet, ValidationErrors> {
        let mut validator = Validator::default();
        let mut rules = Vec::with_capacity(self.rules.len());

        for (i, raw) in self.rules.iter().enumerate() {
            if let Some(rule) = validator.rule(raw, &format!("rules[{i}]")) {
                rules.push(rule);
            }
        }

        if validator.errors.is_empty() {
            Ok(RuleSet { rules })
        } else {
            Err(ValidationErrors(validator.errors))
        }
    }
}

//! Rule definitions
//!
//! This module provides:
//! - The validated rule tree consumed by the compiler
//! - Raw serde models for JSON, YAML, and TOML rule sources
//! - A validator that turns raw sources into rule trees
//! - File loaders for rulesets and fact tables

mod source;
mod validate;

pub use source::{
    load_facts, load_ruleset, parse_facts, parse_ruleset, RawAction, RawCondition, RawRule,
    RawRuleSet, SourceError, SourceFormat,
};
pub use validate::{ValidationError, ValidationErrorKind, ValidationErrors};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bytecode::ScalarValue;

/// An ordered list of rules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Create a ruleset from rules
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

/// A named, prioritized condition tree guarding a list of actions
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub priority: u32,
    pub conditions: Condition,
    pub actions: Vec<Action>,
    pub scripts: BTreeMap<String, Script>,
}

impl Rule {
    /// Create a rule with no actions or scripts
    #[must_use]
    pub fn new(name: impl Into<String>, priority: u32, conditions: Condition) -> Self {
        Self {
            name: name.into(),
            priority,
            conditions,
            actions: Vec::new(),
            scripts: BTreeMap::new(),
        }
    }

    /// Append an action
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Add a named script
    #[must_use]
    pub fn with_script(mut self, name: impl Into<String>, script: Script) -> Self {
        self.scripts.insert(name.into(), script);
        self
    }
}

/// A node of a condition tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single fact comparison
    Fact(FactCondition),
    /// A conjunction and/or disjunction of child nodes
    Group(ConditionGroup),
}

impl Condition {
    /// Leaf comparing `fact` against `value` with `operator`
    #[must_use]
    pub fn fact(
        fact: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<ScalarValue>,
    ) -> Self {
        Condition::Fact(FactCondition {
            fact: fact.into(),
            operator: operator.into(),
            value: value.into(),
        })
    }

    /// Group satisfied when every child is
    #[must_use]
    pub fn all(children: Vec<Condition>) -> Self {
        Condition::Group(ConditionGroup {
            all: children,
            any: Vec::new(),
        })
    }

    /// Group satisfied when at least one child is
    #[must_use]
    pub fn any(children: Vec<Condition>) -> Self {
        Condition::Group(ConditionGroup {
            all: Vec::new(),
            any: children,
        })
    }

    /// Returns true for a leaf comparison
    #[must_use]
    pub fn is_fact(&self) -> bool {
        matches!(self, Condition::Fact(_))
    }
}

/// A leaf comparison
#[derive(Debug, Clone, PartialEq)]
pub struct FactCondition {
    pub fact: String,
    pub operator: String,
    pub value: ScalarValue,
}

/// An internal node
///
/// With both lists present the node holds only if every `all` child and at
/// least one `any` child hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionGroup {
    pub all: Vec<Condition>,
    pub any: Vec<Condition>,
}

impl ConditionGroup {
    /// Returns true if the group has no children at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }
}

/// An effect performed when a rule's conditions hold
///
/// An action of type [`SCRIPT_ACTION`] invokes the script named by `target`
/// with `value` as its argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: String,
    pub target: String,
    pub value: ScalarValue,
}

/// Action type that calls a user script
pub const SCRIPT_ACTION: &str = "script";

impl Action {
    /// Create an action
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        target: impl Into<String>,
        value: impl Into<ScalarValue>,
    ) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
            value: value.into(),
        }
    }
}

/// A named user script carried through to the host scripting collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub params: Vec<String>,
    pub body: String,
}

impl Script {
    /// Create a script
    #[must_use]
    pub fn new(params: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            params,
            body: body.into(),
        }
    }
}

//! Host callbacks for actions and scripts

use std::collections::BTreeMap;
use std::io::Write;

use thiserror::Error;

/// Errors reported by an [`ActionHandler`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("{0}")]
    Failed(String),

    #[error("scripts are not supported by this handler (called '{0}')")]
    ScriptUnavailable(String),

    #[error("script '{0}' was never defined")]
    UnknownScript(String),
}

/// An `EXEC_ACTION` as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionCall<'a> {
    /// Rule that dispatched the action
    pub rule: Option<&'a str>,
    pub kind: &'a str,
    pub target: &'a str,
    pub value: &'a str,
}

/// A `SCRIPT_DEF` as seen by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDefinition<'a> {
    pub rule: Option<&'a str>,
    pub name: &'a str,
    pub params: Vec<&'a str>,
    pub body: &'a str,
}

/// A `SCRIPT_CALL` as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptCall<'a> {
    pub rule: Option<&'a str>,
    pub name: &'a str,
    pub argument: &'a str,
}

/// Receives the effects of an executing program
///
/// Calls are synchronous; an error halts the interpreter.
pub trait ActionHandler {
    /// Perform an action
    fn execute(&mut self, call: &ActionCall<'_>) -> Result<(), HostError>;

    /// Register a script; ignored by default
    fn define_script(&mut self, _definition: &ScriptDefinition<'_>) -> Result<(), HostError> {
        Ok(())
    }

    /// Invoke a script; unsupported by default
    fn call_script(&mut self, call: &ScriptCall<'_>) -> Result<(), HostError> {
        Err(HostError::ScriptUnavailable(call.name.to_string()))
    }
}

/// An action captured by [`RecordingHandler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAction {
    pub rule: Option<String>,
    pub kind: String,
    pub target: String,
    pub value: String,
}

impl RecordedAction {
    /// The `(type, target, value)` triple
    #[must_use]
    pub fn triple(&self) -> (&str, &str, &str) {
        (&self.kind, &self.target, &self.value)
    }
}

/// A handler that records everything it receives
///
/// Scripts must be defined before they are called.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    pub actions: Vec<RecordedAction>,
    pub scripts: BTreeMap<String, (Vec<String>, String)>,
    pub script_calls: Vec<(String, String)>,
    failing_kind: Option<String>,
}

impl RecordingHandler {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every action of type `kind`
    #[must_use]
    pub fn failing_on(mut self, kind: impl Into<String>) -> Self {
        self.failing_kind = Some(kind.into());
        self
    }

    /// Forget recorded actions and calls, keeping defined scripts
    pub fn clear(&mut self) {
        self.actions.clear();
        self.script_calls.clear();
    }
}

impl ActionHandler for RecordingHandler {
    fn execute(&mut self, call: &ActionCall<'_>) -> Result<(), HostError> {
        if self.failing_kind.as_deref() == Some(call.kind) {
            return Err(HostError::Failed(format!("action '{}' rejected", call.kind)));
        }
        self.actions.push(RecordedAction {
            rule: call.rule.map(str::to_string),
            kind: call.kind.to_string(),
            target: call.target.to_string(),
            value: call.value.to_string(),
        });
        Ok(())
    }

    fn define_script(&mut self, definition: &ScriptDefinition<'_>) -> Result<(), HostError> {
        let params = definition.params.iter().map(|p| (*p).to_string()).collect();
        self.scripts
            .insert(definition.name.to_string(), (params, definition.body.to_string()));
        Ok(())
    }

    fn call_script(&mut self, call: &ScriptCall<'_>) -> Result<(), HostError> {
        if !self.scripts.contains_key(call.name) {
            return Err(HostError::UnknownScript(call.name.to_string()));
        }
        self.script_calls
            .push((call.name.to_string(), call.argument.to_string()));
        Ok(())
    }
}

/// A handler that prints actions to a writer
#[derive(Debug)]
pub struct ConsoleHandler<W: Write> {
    out: W,
}

impl<W: Write> ConsoleHandler<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, rule: Option<&str>, text: std::fmt::Arguments<'_>) -> Result<(), HostError> {
        let rule = rule.unwrap_or("-");
        writeln!(self.out, "[{rule}] {text}").map_err(|e| HostError::Failed(e.to_string()))
    }
}

impl<W: Write> ActionHandler for ConsoleHandler<W> {
    fn execute(&mut self, call: &ActionCall<'_>) -> Result<(), HostError> {
        self.line(
            call.rule,
            format_args!("{} -> {}: {}", call.kind, call.target, call.value),
        )
    }

    fn define_script(&mut self, definition: &ScriptDefinition<'_>) -> Result<(), HostError> {
        self.line(
            definition.rule,
            format_args!("define script {}({})", definition.name, definition.params.join(", ")),
        )
    }

    fn call_script(&mut self, call: &ScriptCall<'_>) -> Result<(), HostError> {
        self.line(
            call.rule,
            format_args!("script {}({})", call.name, call.argument),
        )
    }
}

//! Shared types for the hookgate workspace.
//!
//! - [`ActionDescriptor`]: the attempted action handed to the decision gate
//! - [`Decision`]: the gate's verdict (`allow`, `warn`, `block`)
//! - [`EventRecord`]: one append-only entry of lifecycle history
//! - [`config`]: rule set and runtime configuration loaded from YAML/TOML

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// Configuration types shared across all hookgate crates
pub mod config;
pub mod error;
pub mod event;

pub use config::{
    ConfigError, GateConfig, GatePolicy, LogConfig, Rule, RuleAction, RuleFile, TargetField,
};
pub use error::{InvariantError, RuleEvaluationError};
pub use event::{EventRecord, EventType, UNKNOWN_SESSION};

/// Current time at the microsecond resolution used for every recorded timestamp.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Name under which submitted prompts pass through the gate.
pub const PROMPT_ACTION: &str = "UserPromptSubmit";

/// What the gate is being asked about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// A tool call (`PreToolUse`).
    #[default]
    ToolUse,
    /// A prompt the user submitted (`UserPromptSubmit`).
    Prompt,
}

/// An action the agent runtime is about to execute.
///
/// Built once from the runtime's hook input and never modified afterwards.
/// Parameter values are flattened to strings; the map iterates in key order,
/// which is the "parameter order" used by `any_param` rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    kind: ActionKind,
    tool_name: String,
    parameters: BTreeMap<String, String>,
    session_id: String,
    timestamp: DateTime<Utc>,
}

impl ActionDescriptor {
    /// Create a descriptor with no parameters.
    pub fn new(tool_name: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::ToolUse,
            tool_name: tool_name.into(),
            parameters: BTreeMap::new(),
            session_id: session_id.into(),
            timestamp: now_micros(),
        }
    }

    /// Add a parameter while building the descriptor.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Replace all parameters while building the descriptor.
    pub fn with_params(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Build a descriptor from a hook's `tool_input` value.
    ///
    /// A malformed `tool_input` never fails construction: the problem is
    /// logged and the descriptor carries an empty parameter map.
    pub fn from_tool_input(
        tool_name: impl Into<String>,
        session_id: impl Into<String>,
        tool_input: &Value,
    ) -> Self {
        let tool_name = tool_name.into();
        let parameters = match parameters_from_json(tool_input) {
            Ok(parameters) => parameters,
            Err(e) => {
                tracing::warn!(tool = %tool_name, error = %e, "Treating tool parameters as empty");
                BTreeMap::new()
            }
        };

        Self::new(tool_name, session_id).with_params(parameters)
    }

    /// A submitted prompt, carried as the `prompt` parameter.
    pub fn prompt(session_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Prompt,
            ..Self::new(PROMPT_ACTION, session_id).with_param("prompt", prompt)
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Look up a parameter; absent parameters are `None`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Shell command text (`command` parameter), empty when absent.
    pub fn command_text(&self) -> &str {
        self.param("command").unwrap_or("")
    }

    /// Prompt text, empty when absent.
    pub fn prompt_text(&self) -> &str {
        self.param("prompt").unwrap_or("")
    }

    /// Target file path, empty when absent.
    ///
    /// Checks `file_path`, then `notebook_path`, then `path`.
    pub fn file_path(&self) -> &str {
        ["file_path", "notebook_path", "path"]
            .iter()
            .find_map(|key| self.param(key))
            .unwrap_or("")
    }
}

/// Flatten a `tool_input` JSON object into string parameters.
///
/// Strings are kept verbatim, `null` becomes the empty string, and every other
/// value is rendered as compact JSON text.
pub fn parameters_from_json(value: &Value) -> Result<BTreeMap<String, String>, RuleEvaluationError> {
    match value {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect()),
        Value::Null => Ok(BTreeMap::new()),
        other => Err(RuleEvaluationError::NotAnObject(json_kind(other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Outcome of evaluating an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The action proceeds silently.
    Allow,
    /// The action proceeds; the reason is surfaced as a notice.
    Warn,
    /// The action must not be executed.
    Block,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Allow, Outcome::Warn, Outcome::Block];

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Allow => "allow",
            Outcome::Warn => "warn",
            Outcome::Block => "block",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict returned to the agent runtime for one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub outcome: Outcome,
    pub reason: Option<String>,
    pub matched_rule_id: Option<String>,
}

impl Decision {
    /// No rule matched.
    pub fn allow() -> Self {
        Self {
            outcome: Outcome::Allow,
            reason: None,
            matched_rule_id: None,
        }
    }

    pub fn warn(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Warn,
            reason: Some(reason.into()),
            matched_rule_id: Some(rule_id.into()),
        }
    }

    pub fn block(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Block,
            reason: Some(reason.into()),
            matched_rule_id: Some(rule_id.into()),
        }
    }

    /// Decision used when the gate itself failed.
    ///
    /// The gate fails open: the action is allowed and the error is attached
    /// as the reason so it shows up in the recorded history.
    pub fn fail_open(error: impl fmt::Display) -> Self {
        Self {
            outcome: Outcome::Allow,
            reason: Some(format!("gate error: {}", error)),
            matched_rule_id: None,
        }
    }

    pub fn is_block(&self) -> bool {
        self.outcome == Outcome::Block
    }

    pub fn is_warn(&self) -> bool {
        self.outcome == Outcome::Warn
    }
}

//! Rule definitions.
//!
//! Rules are plain data: a target field, a regex, and what to do on a match.
//! They are compiled and interpreted by `hookgate-policy`.

use crate::ActionKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which part of an action a rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetField {
    /// The `command` parameter (shell tools).
    CommandText,
    /// The target path (`file_path`, `notebook_path` or `path`).
    FilePath,
    /// Every parameter value, each tested on its own.
    AnyParam,
    /// The tool name itself.
    ToolName,
    /// The text of a submitted prompt. Rules on this field only see prompts;
    /// every other field only sees tool calls.
    Prompt,
}

impl TargetField {
    /// The kind of action this field belongs to.
    pub fn action_kind(self) -> ActionKind {
        match self {
            Self::Prompt => ActionKind::Prompt,
            _ => ActionKind::ToolUse,
        }
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandText => write!(f, "command_text"),
            Self::FilePath => write!(f, "file_path"),
            Self::AnyParam => write!(f, "any_param"),
            Self::ToolName => write!(f, "tool_name"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// What happens when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Block,
    Warn,
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

/// A forbidden or flagged pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier, reported as `matched_rule_id`.
    pub id: String,

    /// Field of the action the pattern is applied to.
    pub target_field: TargetField,

    /// Regex, searched anywhere in the field (not anchored).
    pub pattern: String,

    /// Block or warn.
    pub action: RuleAction,

    /// Message returned as the decision reason.
    pub message: String,

    /// Only apply to these tools (empty = every tool). Ignored for prompts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,

    /// Field values matching this regex never trigger the rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// Compile both patterns case-insensitively.
    #[serde(default, skip_serializing_if = "is_false")]
    pub case_insensitive: bool,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        target_field: TargetField,
        pattern: impl Into<String>,
        action: RuleAction,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            target_field,
            pattern: pattern.into(),
            action,
            message: message.into(),
            tools: Vec::new(),
            exclude: None,
            case_insensitive: false,
        }
    }

    pub fn block(
        id: impl Into<String>,
        target_field: TargetField,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(id, target_field, pattern, RuleAction::Block, message)
    }

    pub fn warn(
        id: impl Into<String>,
        target_field: TargetField,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(id, target_field, pattern, RuleAction::Warn, message)
    }

    /// Restrict the rule to the given tools.
    pub fn for_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set the exclusion pattern.
    pub fn excluding(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Whether this rule looks at actions of the given tool.
    pub fn applies_to(&self, tool_name: &str) -> bool {
        self.tools.is_empty() || self.tools.iter().any(|t| t == tool_name)
    }
}

/// A standalone rules file referenced from `rules_files`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

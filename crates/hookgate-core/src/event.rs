//! Lifecycle event types.
//!
//! An [`EventRecord`] is the unit of history: created once at the moment an
//! event occurs, appended to the log views, then only ever read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::InvariantError;
use crate::{ActionDescriptor, Decision, Outcome};

/// Session id recorded when the runtime did not send one.
pub const UNKNOWN_SESSION: &str = "unknown";

/// Lifecycle event raised by the agent runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(alias = "session_start")]
    SessionStart,
    #[serde(alias = "session_stop", alias = "Stop", alias = "SessionEnd")]
    SessionStop,
    #[serde(alias = "pre_tool_use")]
    PreToolUse,
    #[serde(alias = "post_tool_use")]
    PostToolUse,
    #[serde(alias = "subagent_stop")]
    SubagentStop,
    #[serde(alias = "user_prompt_submit")]
    UserPromptSubmit,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [EventType; 6] = [
        EventType::SessionStart,
        EventType::SessionStop,
        EventType::PreToolUse,
        EventType::PostToolUse,
        EventType::SubagentStop,
        EventType::UserPromptSubmit,
    ];

    /// Canonical name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "SessionStart",
            Self::SessionStop => "SessionStop",
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::SubagentStop => "SubagentStop",
            Self::UserPromptSubmit => "UserPromptSubmit",
        }
    }

    /// File-name friendly form used for the per-type views.
    pub fn slug(self) -> &'static str {
        match self {
            Self::SessionStart => "session_start",
            Self::SessionStop => "session_stop",
            Self::PreToolUse => "pre_tool_use",
            Self::PostToolUse => "post_tool_use",
            Self::SubagentStop => "subagent_stop",
            Self::UserPromptSubmit => "user_prompt_submit",
        }
    }

    /// Whether the gate decides on the event before it proceeds.
    pub fn is_gated(self) -> bool {
        matches!(self, Self::PreToolUse | Self::UserPromptSubmit)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown event type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type '{0}' (expected one of SessionStart, SessionStop, PreToolUse, PostToolUse, SubagentStop, UserPromptSubmit)")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    /// Accepts canonical names, snake_case, and the runtime's `Stop` /
    /// `SessionEnd` names for session stop. Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "sessionstart" => Ok(Self::SessionStart),
            "sessionstop" | "stop" | "sessionend" => Ok(Self::SessionStop),
            "pretooluse" => Ok(Self::PreToolUse),
            "posttooluse" => Ok(Self::PostToolUse),
            "subagentstop" => Ok(Self::SubagentStop),
            "userpromptsubmit" => Ok(Self::UserPromptSubmit),
            _ => Err(UnknownEventType(s.to_string())),
        }
    }
}

/// One entry of lifecycle history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event ID.
    pub event_id: Uuid,

    /// Event type.
    pub event_type: EventType,

    /// Agent session that raised the event.
    pub session_id: String,

    /// When the event was recorded (microsecond precision).
    pub timestamp: DateTime<Utc>,

    /// Event-specific data (tool name and input, prompt text, ...).
    #[serde(default)]
    pub payload: Map<String, Value>,

    /// Gate decision; always present on `PreToolUse` records and set on
    /// gated `UserPromptSubmit` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

impl EventRecord {
    /// Create a record stamped with the current time.
    pub fn new(event_type: EventType, session_id: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            session_id: session_id.into(),
            timestamp: crate::now_micros(),
            payload,
            decision: None,
        }
    }

    /// Record for an evaluated `PreToolUse` action.
    ///
    /// `tool_input` is kept as the runtime sent it so the history shows the
    /// original parameter types.
    pub fn pre_tool_use(action: &ActionDescriptor, tool_input: Value, decision: Decision) -> Self {
        let mut payload = Map::new();
        payload.insert("tool_name".to_string(), Value::String(action.tool_name().to_string()));
        payload.insert("tool_input".to_string(), tool_input);

        Self::new(EventType::PreToolUse, action.session_id(), payload).with_decision(decision)
    }

    /// Attach the gate decision.
    pub fn with_decision(mut self, decision: Decision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// `payload.tool_name`, when present.
    pub fn tool_name(&self) -> Option<&str> {
        self.payload.get("tool_name").and_then(Value::as_str)
    }

    /// Check the history invariants before the record is written.
    pub fn validate(&self) -> Result<(), InvariantError> {
        if self.event_type == EventType::PreToolUse && self.decision.is_none() {
            return Err(InvariantError::MissingDecision(self.event_type));
        }

        if let Some(decision) = &self.decision {
            match (decision.outcome, &decision.matched_rule_id) {
                (Outcome::Allow, Some(rule)) => {
                    return Err(InvariantError::AllowWithRule(rule.clone()));
                }
                (Outcome::Warn | Outcome::Block, None) => {
                    return Err(InvariantError::MissingRule(decision.outcome));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Format the record as a human-readable log line.
    ///
    /// Format: `[timestamp] EventType session=... [tool=...] [decision=...]`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} session={}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
            self.event_type,
            self.session_id,
        );

        if let Some(tool) = self.tool_name() {
            line.push_str(&format!(" tool={}", tool));
        }

        if let Some(ref decision) = self.decision {
            line.push_str(&format!(" decision={}", decision.outcome));
            if let Some(ref rule) = decision.matched_rule_id {
                line.push_str(&format!(" rule={}", rule));
            }
            if let Some(ref reason) = decision.reason {
                line.push_str(&format!(" reason=\"{}\"", reason.replace('"', "'")));
            }
        }

        line
    }
}

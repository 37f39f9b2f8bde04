//! `hookgate hook <EVENT>` command implementation.
//!
//! Runs once per lifecycle event raised by the agent runtime:
//! - reads the hook JSON from stdin
//! - for `PreToolUse` and `UserPromptSubmit`, decides on the tool call or
//!   prompt (exit code 2 blocks it)
//! - records the event in the log views
//!
//! The gate fails open. Anything that goes wrong here (bad input, broken
//! configuration, unwritable logs) is logged and the action is allowed. A
//! gated event whose input cannot be read is still recorded, with the
//! fail-open decision and the read error.

use anyhow::{Context, Result};
use hookgate_audit::EventRecorder;
use hookgate_core::{
    ActionDescriptor, Decision, EventRecord, EventType, GateConfig, Outcome, UNKNOWN_SESSION,
};
use hookgate_policy::Gate;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::io::Read;
use std::process::ExitCode;

use crate::settings::Settings;

/// Exit code that tells the runtime to block the tool call.
const BLOCK_EXIT_CODE: u8 = 2;

/// Hook input as sent by the runtime on stdin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default)]
    pub hook_event_name: Option<String>,

    #[serde(default)]
    pub tool_name: Option<String>,

    #[serde(default)]
    pub tool_input: Value,

    /// Everything else (`cwd`, `prompt`, `tool_response`, ...), kept in the
    /// recorded payload as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HookInput {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            anyhow::bail!("empty hook input");
        }
        serde_json::from_str(raw).context("hook input is not a valid JSON object")
    }

    pub fn session(&self) -> &str {
        self.session_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SESSION)
    }

    pub fn action(&self) -> ActionDescriptor {
        ActionDescriptor::from_tool_input(
            self.tool_name.clone().unwrap_or_default(),
            self.session(),
            &self.tool_input,
        )
    }

    /// Prompt text of a `UserPromptSubmit` event.
    pub fn prompt(&self) -> &str {
        self.extra.get("prompt").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn prompt_action(&self) -> ActionDescriptor {
        ActionDescriptor::prompt(self.session(), self.prompt())
    }

    /// The action to gate for `event_type`, if the event is gated.
    pub fn gated_action(&self, event_type: EventType) -> Option<ActionDescriptor> {
        match event_type {
            EventType::PreToolUse => Some(self.action()),
            EventType::UserPromptSubmit => Some(self.prompt_action()),
            _ => None,
        }
    }

    /// Record for the event as received.
    pub fn into_record(self, event_type: EventType) -> EventRecord {
        let session = self.session().to_string();
        let mut payload = self.extra;
        if let Some(tool) = self.tool_name {
            payload.insert("tool_name".to_string(), Value::String(tool));
        }
        if !self.tool_input.is_null() {
            payload.insert("tool_input".to_string(), self.tool_input);
        }
        EventRecord::new(event_type, session, payload)
    }

    /// Record for a gated `PreToolUse` event.
    pub fn pre_tool_use_record(&self, action: &ActionDescriptor, decision: Decision) -> EventRecord {
        let mut record = EventRecord::pre_tool_use(action, self.tool_input.clone(), decision);
        for (key, value) in &self.extra {
            record.payload.entry(key.clone()).or_insert_with(|| value.clone());
        }
        record
    }
}

/// Record for a gated event whose input could not be read.
pub fn unreadable_input_record(event_type: EventType, error: &str, decision: Decision) -> EventRecord {
    let mut payload = Map::new();
    payload.insert("input_error".to_string(), Value::String(error.to_string()));
    EventRecord::new(event_type, UNKNOWN_SESSION, payload).with_decision(decision)
}

/// What the hook writes back to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookResponse {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: u8,
}

impl HookResponse {
    /// Nothing to say; let the runtime continue.
    pub fn pass() -> Self {
        Self {
            stdout: None,
            stderr: None,
            exit_code: 0,
        }
    }

    /// Response for a gate decision, either as exit code plus stderr text or
    /// as the runtime's JSON format on stdout.
    ///
    /// Tool calls get a `hookSpecificOutput` permission decision. Prompts
    /// only produce JSON when blocked; a warning goes to stderr.
    pub fn for_decision(event_type: EventType, decision: &Decision, json_output: bool) -> Self {
        let rule = decision.matched_rule_id.as_deref().unwrap_or_default();
        let reason = decision.reason.as_deref().unwrap_or_default();

        if json_output && event_type == EventType::UserPromptSubmit {
            return match decision.outcome {
                Outcome::Block => Self {
                    stdout: Some(json!({ "decision": "block", "reason": reason }).to_string()),
                    stderr: None,
                    exit_code: 0,
                },
                Outcome::Warn => Self {
                    stdout: None,
                    stderr: Some(format!("WARNING [{}]: {}", rule, reason)),
                    exit_code: 0,
                },
                Outcome::Allow => Self::pass(),
            };
        }

        if json_output {
            let permission = if decision.is_block() { "deny" } else { "allow" };
            let mut output = json!({
                "hookEventName": EventType::PreToolUse.as_str(),
                "permissionDecision": permission,
            });
            if let Some(reason) = &decision.reason {
                output["permissionDecisionReason"] = Value::String(reason.clone());
            }
            return Self {
                stdout: Some(json!({ "hookSpecificOutput": output }).to_string()),
                stderr: None,
                exit_code: 0,
            };
        }

        match decision.outcome {
            Outcome::Block => Self {
                stdout: None,
                stderr: Some(format!("BLOCKED [{}]: {}", rule, reason)),
                exit_code: BLOCK_EXIT_CODE,
            },
            Outcome::Warn => Self {
                stdout: None,
                stderr: Some(format!("WARNING [{}]: {}", rule, reason)),
                exit_code: 0,
            },
            Outcome::Allow => Self::pass(),
        }
    }

    pub fn emit(&self) -> ExitCode {
        if let Some(out) = &self.stdout {
            println!("{}", out);
        }
        if let Some(err) = &self.stderr {
            eprintln!("{}", err);
        }
        ExitCode::from(self.exit_code)
    }
}

/// Decide on a tool call or prompt, failing open on any gate error.
pub fn decide(config: Result<&GateConfig, &anyhow::Error>, action: &ActionDescriptor) -> Decision {
    let config = match config {
        Ok(config) => config,
        Err(e) => return fail_open(e),
    };
    match Gate::from_config(config) {
        Ok(gate) => gate.decide(action),
        Err(e) => fail_open(e),
    }
}

fn fail_open(error: impl std::fmt::Display) -> Decision {
    tracing::error!(error = %error, "Gate error, allowing the action");
    Decision::fail_open(error)
}

/// Run the `hookgate hook` command.
pub fn run(settings: &Settings, event: &str, json_output: bool) -> Result<ExitCode> {
    let event_type = match event.parse::<EventType>() {
        Ok(event_type) => event_type,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unsupported hook event");
            return Ok(ExitCode::SUCCESS);
        }
    };

    let mut raw = String::new();
    let input = std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read hook input from stdin")
        .and_then(|_| HookInput::parse(&raw));

    let config = settings
        .load_config()
        .context("failed to load hookgate configuration");
    let logging = match &config {
        Ok(config) => settings.log_config(config),
        Err(_) => settings.log_config(&GateConfig::default()),
    };
    let recorder = EventRecorder::new(logging);

    let input = match input {
        Ok(input) => input,
        Err(e) => {
            let error = format!("{e:#}");
            tracing::error!(error = %error, event = %event_type, "Unreadable hook input");
            if !event_type.is_gated() {
                return Ok(ExitCode::SUCCESS);
            }
            let decision = fail_open(&error);
            recorder.record_or_warn(unreadable_input_record(event_type, &error, decision.clone()));
            return Ok(HookResponse::for_decision(event_type, &decision, json_output).emit());
        }
    };

    if let Some(name) = &input.hook_event_name
        && name.parse::<EventType>().ok() != Some(event_type)
    {
        tracing::debug!(argument = %event_type, input = %name, "Hook event name mismatch, using argument");
    }

    let Some(action) = input.gated_action(event_type) else {
        recorder.record_or_warn(input.into_record(event_type));
        return Ok(ExitCode::SUCCESS);
    };

    let decision = decide(config.as_ref(), &action);
    let record = match event_type {
        EventType::PreToolUse => input.pre_tool_use_record(&action, decision.clone()),
        _ => input.into_record(event_type).with_decision(decision.clone()),
    };
    recorder.record_or_warn(record);

    Ok(HookResponse::for_decision(event_type, &decision, json_output).emit())
}

//! Rule inspection commands.
//!
//! `hookgate rules list` - Show the effective rules in evaluation order.
//! `hookgate rules test` - Evaluate one tool call or prompt without recording it.

use anyhow::{Context, Result};
use hookgate_core::{ActionDescriptor, ActionKind, Outcome};
use hookgate_policy::Gate;

use crate::settings::Settings;

fn load_gate(settings: &Settings) -> Result<Gate> {
    let config = settings.load_config().context("Failed to load configuration")?;
    Gate::from_config(&config).context("Failed to compile rules")
}

/// Parse a `key=value` pair for `--param`.
pub fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("invalid parameter '{}': expected key=value", s))
}

/// Build the action for `rules test`. A prompt takes precedence over a tool.
pub fn test_action(tool: Option<String>, params: Vec<(String, String)>, prompt: Option<String>) -> ActionDescriptor {
    if let Some(prompt) = prompt {
        return ActionDescriptor::prompt("rules-test", prompt);
    }
    params
        .into_iter()
        .fold(ActionDescriptor::new(tool.unwrap_or_default(), "rules-test"), |action, (key, value)| {
            action.with_param(key, value)
        })
}

/// List the effective rules.
pub fn list(settings: &Settings, verbose: bool) -> Result<()> {
    let gate = load_gate(settings)?;

    if gate.rules().is_empty() {
        println!("No rules configured: every action is allowed.");
        return Ok(());
    }

    println!("\nRules ({}), evaluated in order:", gate.rules().len());
    println!("{}", "-".repeat(60));
    for (index, compiled) in gate.rules().rules().iter().enumerate() {
        let rule = compiled.rule();
        let tools = if rule.tools.is_empty() {
            "all tools".to_string()
        } else {
            rule.tools.join(", ")
        };
        println!(
            "{:>3}. {:<22} {:<5}  {} ({})",
            index + 1,
            rule.id,
            rule.action.to_string(),
            rule.target_field,
            tools
        );
        println!("     {}", rule.message);
        if verbose {
            println!("     pattern: {}", rule.pattern);
            if let Some(exclude) = &rule.exclude {
                println!("     exclude: {}", exclude);
            }
            if rule.case_insensitive {
                println!("     case-insensitive");
            }
        }
    }

    if gate.policy().escalate_warnings {
        println!("\nWarnings are escalated to blocks.");
    }
    println!();
    Ok(())
}

/// Evaluate a hypothetical action and show every rule that matches it.
pub fn test(settings: &Settings, action: &ActionDescriptor) -> Result<()> {
    let gate = load_gate(settings)?;

    let decision = gate.decide(action);
    let matched = gate.matching_rules(action);

    match action.kind() {
        ActionKind::Prompt => println!("\nPrompt: {}", action.prompt_text()),
        ActionKind::ToolUse => {
            println!("\nTool: {}", action.tool_name());
            for (key, value) in action.parameters() {
                println!("  {} = {}", key, value);
            }
        }
    }
    println!();

    match decision.outcome {
        Outcome::Allow => println!("Decision: allow"),
        outcome => println!(
            "Decision: {} [{}] {}",
            outcome,
            decision.matched_rule_id.as_deref().unwrap_or_default(),
            decision.reason.as_deref().unwrap_or_default()
        ),
    }

    if matched.is_empty() {
        println!("No rules matched.");
    } else {
        println!("Matching rules ({}):", matched.len());
        for rule in matched {
            println!("  - {} ({})", rule.id, rule.action);
        }
    }
    println!();
    Ok(())
}

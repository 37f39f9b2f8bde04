//! `hookgate init` command implementation.
//!
//! Writes a starter configuration with the built-in rules enabled and one
//! example custom rule.

use anyhow::{Context, Result};
use hookgate_core::{GateConfig, Rule, TargetField};
use std::fs;
use std::path::Path;

const HEADER: &str = "\
# hookgate configuration
#
# Built-in rules (include_default_rules) are evaluated first, then the rules
# below, in order. The first matching block rule wins; otherwise the first
# matching warn rule is reported; otherwise the action is allowed.
#
# target_field: command_text | file_path | any_param | tool_name | prompt
# action:       block | warn
";

/// The configuration written by `hookgate init`.
pub fn starter_config() -> GateConfig {
    GateConfig {
        rules: vec![Rule::warn(
            "sudo",
            TargetField::CommandText,
            r"\bsudo\b",
            "Command runs with elevated privileges",
        )],
        ..Default::default()
    }
}

/// Run the `hookgate init` command.
pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists. Use --force to overwrite.", path.display());
    }

    let yaml = starter_config().to_yaml().context("Failed to render configuration")?;
    fs::write(path, format!("{}\n{}", HEADER, yaml))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {}", path.display());
    println!("Next: register `hookgate hook <EVENT>` for each lifecycle event in your agent's hook settings.");
    Ok(())
}

//! `hookgate check` command implementation.
//!
//! Validates a configuration file:
//! - JSON Schema validation against the embedded `GateConfig` schema
//! - Rule compilation (patterns, ids), across inline and referenced rules
//! - Warnings for configurations that silently allow everything

use anyhow::{Context, Result};
use hookgate_core::GateConfig;
use hookgate_core::config::ConfigFormat;
use hookgate_policy::RuleSet;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};

/// Embedded so validation works without the schema files on disk.
const GATE_CONFIG_SCHEMA: &str = include_str!("../../../../schemas/GateConfig.schema.json");

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Which check produced the finding.
    pub category: String,
    pub message: String,
    /// Location within the file (e.g. "/rules/2/action").
    pub location: Option<String>,
}

impl CheckFinding {
    fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            location: None,
        }
    }

    fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    fn warning(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    fn info(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, message)
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn extend(&mut self, findings: impl IntoIterator<Item = CheckFinding>) {
        self.findings.extend(findings);
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Print human-readable summary, most severe first.
    pub fn print_summary(&self) {
        let mut findings: Vec<_> = self.findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.category.cmp(&b.category)));

        if !findings.is_empty() {
            println!();
            println!("{}", "-".repeat(60));
        }
        for finding in findings {
            let location = finding
                .location
                .as_deref()
                .map(|l| format!(" [{}]", l))
                .unwrap_or_default();
            println!(
                "  {:<5} [{}]{}: {}",
                finding.severity, finding.category, location, finding.message
            );
        }

        println!();
        let errors = self.count(Severity::Error);
        let warnings = self.count(Severity::Warning);
        if errors == 0 && warnings == 0 {
            println!("All checks passed.");
        } else {
            println!("Summary: {} error(s), {} warning(s)", errors, warnings);
        }
    }
}

/// Run all configuration checks.
pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let Some(config_path) = config_path else {
        println!("No configuration file found; the built-in defaults are in effect.");
        let errors = RuleSet::check(GateConfig::default().effective_rules());
        anyhow::ensure!(errors.is_empty(), "Built-in rules failed to compile");
        return Ok(());
    };

    println!("Checking {}...", config_path.display());
    let mut results = CheckResults::default();

    results.extend(validate_schema(&config_path)?);

    // Structural errors make the semantic checks meaningless.
    if !results.has_errors() {
        match GateConfig::load_with_context(&config_path) {
            Ok(config) => results.extend(check_rules(&config)),
            Err(e) => results.extend([CheckFinding::error("load", e.to_string())]),
        }
    }

    results.print_summary();

    if results.has_errors() {
        anyhow::bail!(
            "Configuration check failed with {} error(s)",
            results.count(Severity::Error)
        );
    }
    Ok(())
}

/// Validate the raw file against the embedded JSON Schema.
pub fn validate_schema(path: &Path) -> Result<Vec<CheckFinding>> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let value: JsonValue = match ConfigFormat::from_path(path) {
        ConfigFormat::Yaml => match serde_yaml::from_str(&content) {
            Ok(v) => v,
            Err(e) => return Ok(vec![CheckFinding::error("syntax", format!("Failed to parse YAML: {}", e))]),
        },
        ConfigFormat::Toml => match toml::from_str(&content) {
            Ok(v) => v,
            Err(e) => return Ok(vec![CheckFinding::error("syntax", format!("Failed to parse TOML: {}", e))]),
        },
    };

    validate_value(&value)
}

fn validate_value(value: &JsonValue) -> Result<Vec<CheckFinding>> {
    let schema: JsonValue = serde_json::from_str(GATE_CONFIG_SCHEMA).context("Embedded schema is not valid JSON")?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| anyhow::anyhow!("Failed to compile embedded schema: {}", e))?;

    Ok(validator
        .iter_errors(value)
        .map(|error| {
            let path = error.instance_path().to_string();
            let location = if path.is_empty() { "(root)".to_string() } else { path };
            CheckFinding::error("json-schema", error.to_string()).with_location(location)
        })
        .collect())
}

/// Compile every effective rule and flag risky settings.
fn check_rules(config: &GateConfig) -> Vec<CheckFinding> {
    let mut findings: Vec<CheckFinding> = RuleSet::check(config.effective_rules())
        .into_iter()
        .map(|e| {
            let finding = CheckFinding::error("rules", e.to_string());
            match e.rule_id() {
                Some(id) => finding.with_location(format!("rule '{}'", id)),
                None => finding,
            }
        })
        .collect();

    if config.effective_rules().is_empty() {
        findings.push(CheckFinding::warning(
            "rules",
            "No rules configured and default rules disabled: every action is allowed",
        ));
    }
    if !config.logging.enabled {
        findings.push(CheckFinding::info("logging", "Event logging is disabled"));
    }
    if config.gate.escalate_warnings {
        findings.push(CheckFinding::info("gate", "Warnings are escalated to blocks"));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookgate_core::{Rule, TargetField};

    #[test]
    fn test_default_config_passes_schema() {
        let yaml = GateConfig::default().to_yaml().unwrap();
        let value: JsonValue = serde_yaml::from_str(&yaml).unwrap();
        assert!(validate_value(&value).unwrap().is_empty());
    }

    #[test]
    fn test_schema_errors_have_locations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hookgate.yaml");
        fs::write(
            &path,
            "rules:\n  - id: r\n    target_field: command_text\n    pattern: x\n    action: explode\n    message: m\n",
        )
        .unwrap();

        let findings = validate_schema(&path).unwrap();
        assert!(!findings.is_empty());
        assert!(findings.iter().all(|f| f.severity == Severity::Error));
        assert!(
            findings
                .iter()
                .any(|f| f.location.as_deref().is_some_and(|l| l.starts_with("/rules/0")))
        );
    }

    #[test]
    fn test_toml_config_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hookgate.toml");
        fs::write(&path, "include_default_rules = true\n\n[gate]\nescalate_warnings = true\n").unwrap();
        assert!(validate_schema(&path).unwrap().is_empty());

        fs::write(&path, "include_default_rules = \"yes\"\n").unwrap();
        assert_eq!(validate_schema(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_check_rules_reports_bad_patterns() {
        let mut config = GateConfig::default();
        config.rules.push(Rule::block("broken", TargetField::AnyParam, "(", "m"));
        config.rules.push(Rule::warn("broken", TargetField::AnyParam, "x", "m"));

        let findings = check_rules(&config);
        let errors: Vec<_> = findings.iter().filter(|f| f.severity == Severity::Error).collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].location.as_deref(), Some("rule 'broken'"));
    }

    #[test]
    fn test_check_rules_warns_when_nothing_is_enforced() {
        let config = GateConfig {
            include_default_rules: false,
            ..Default::default()
        };
        let findings = check_rules(&config);
        assert!(findings.iter().any(|f| f.severity == Severity::Warning));
    }
}

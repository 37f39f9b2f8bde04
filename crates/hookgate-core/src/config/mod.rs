//! Configuration types for hookgate.
//!
//! Configuration is loaded once per invocation from `hookgate.yaml` (or a
//! `.toml` file) and never changes afterwards.
//!
//! # Configuration Files
//!
//! - **hookgate.yaml**: rules, gate policy and logging settings
//! - **rules_files**: extra rule lists (`rules: [...]`) referenced from the
//!   main file, resolved relative to it

pub mod defaults;
pub mod logging;
pub mod rules;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use logging::LogConfig;
pub use rules::{Rule, RuleAction, RuleFile, TargetField};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hookgate.yaml";

/// Complete hookgate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Configuration version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Prepend the built-in baseline rules.
    #[serde(default = "default_true")]
    pub include_default_rules: bool,

    /// Inline rules, evaluated in order.
    #[serde(default)]
    pub rules: Vec<Rule>,

    /// Additional rule files, appended after the inline rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules_files: Vec<PathBuf>,

    /// Gate behavior.
    #[serde(default)]
    pub gate: GatePolicy,

    /// Event logging.
    #[serde(default)]
    pub logging: LogConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            version: Some("1".to_string()),
            include_default_rules: true,
            rules: Vec::new(),
            rules_files: Vec::new(),
            gate: GatePolicy::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Gate policy knobs.
///
/// Internal gate failures always fail open (`allow` with the error attached
/// as the reason, logged at error level).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Turn every `warn` decision into a `block` (high-security deployments).
    #[serde(default)]
    pub escalate_warnings: bool,
}

fn default_true() -> bool {
    true
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Serialization format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from the file extension (`.toml`, anything else is YAML).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, ConfigError> {
    match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(ConfigError::from),
        ConfigFormat::Toml => toml::from_str(content).map_err(ConfigError::from),
    }
}

impl GateConfig {
    /// Load configuration from a YAML or TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = read_file(path)?;
        parse(&content, ConfigFormat::from_path(path))
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        parse(content, ConfigFormat::Yaml)
    }

    /// Parse configuration from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        parse(content, ConfigFormat::Toml)
    }

    /// Render as YAML (used by `hookgate init`).
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::from)
    }

    /// Load configuration and resolve all external references.
    ///
    /// Rules from `rules_files` are appended to the inline rules in listed
    /// order. Relative paths (rule files and the log directory) are resolved
    /// against the configuration file's directory.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        for rules_file in &config.rules_files.clone() {
            let rules_path = if rules_file.is_absolute() {
                rules_file.clone()
            } else {
                base_dir.join(rules_file)
            };

            let content = read_file(&rules_path)?;
            let file: RuleFile = parse(&content, ConfigFormat::from_path(&rules_path))?;
            tracing::debug!(path = %rules_path.display(), count = file.rules.len(), "Loaded rules file");
            config.rules.extend(file.rules);
        }

        if config.logging.directory.is_relative() {
            config.logging.directory = base_dir.join(&config.logging.directory);
        }

        Ok(config)
    }

    /// The rules in evaluation order: baseline rules first, then configured ones.
    pub fn effective_rules(&self) -> Vec<Rule> {
        let mut rules = if self.include_default_rules {
            defaults::default_rules()
        } else {
            Vec::new()
        };
        rules.extend(self.rules.iter().cloned());
        rules
    }

    /// Get a configured (or default) rule by id.
    pub fn get_rule(&self, id: &str) -> Option<Rule> {
        self.effective_rules().into_iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
version: "1"
include_default_rules: false
rules:
  - id: no-drop-table
    target_field: any_param
    pattern: '(?i)drop\s+table'
    action: block
    message: Dropping tables is not allowed
  - id: sudo
    target_field: command_text
    pattern: '\bsudo\b'
    action: warn
    message: sudo requested
gate:
  escalate_warnings: true
logging:
  directory: /var/log/hookgate
  stdout: true
"#;

    #[test]
    fn test_from_yaml() {
        let config = GateConfig::from_yaml(SAMPLE).unwrap();
        assert!(!config.include_default_rules);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].target_field, TargetField::AnyParam);
        assert_eq!(config.rules[1].action, RuleAction::Warn);
        assert!(config.gate.escalate_warnings);
        assert!(config.logging.enabled);
        assert!(config.logging.stdout);
        assert_eq!(config.logging.directory, PathBuf::from("/var/log/hookgate"));
        assert_eq!(config.effective_rules().len(), 2);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = GateConfig::from_yaml("{}").unwrap();
        assert!(config.include_default_rules);
        assert!(!config.gate.escalate_warnings);
        assert_eq!(config.logging, LogConfig::default());
        assert_eq!(config.effective_rules(), defaults::default_rules());
    }

    #[test]
    fn test_from_toml() {
        let content = r#"
include_default_rules = true

[[rules]]
id = "no-force-checkout"
target_field = "command_text"
pattern = 'git\s+checkout\s+-f'
action = "warn"
message = "Force checkout discards changes"

[logging]
directory = "hook-logs"
"#;
        let config = GateConfig::from_toml(content).unwrap();
        assert_eq!(config.rules.len(), 1);
        let rules = config.effective_rules();
        assert_eq!(rules.len(), defaults::default_rules().len() + 1);
        assert_eq!(rules.last().unwrap().id, "no-force-checkout");
        assert_eq!(config.logging.directory, PathBuf::from("hook-logs"));
    }

    #[test]
    fn test_load_with_context_resolves_rule_files() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("hookgate.yaml");
        let extra = dir.path().join("extra-rules.yaml");

        let mut f = fs::File::create(&main).unwrap();
        writeln!(
            f,
            "include_default_rules: false\nrules_files: [extra-rules.yaml]\nrules:\n  - {{id: inline, target_field: tool_name, pattern: '^WebFetch$', action: warn, message: web}}"
        )
        .unwrap();

        let mut f = fs::File::create(&extra).unwrap();
        writeln!(
            f,
            "rules:\n  - {{id: from-file, target_field: command_text, pattern: mkfs, action: block, message: no mkfs}}"
        )
        .unwrap();

        let config = GateConfig::load_with_context(&main).unwrap();
        let ids: Vec<_> = config.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["inline", "from-file"]);
        assert_eq!(config.logging.directory, dir.path().join("logs"));
    }

    #[test]
    fn test_missing_rules_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("hookgate.yaml");
        fs::write(&main, "rules_files: [nope.yaml]\n").unwrap();

        let err = GateConfig::load_with_context(&main).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_default_config_yaml_roundtrip() {
        let config = GateConfig::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = GateConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}

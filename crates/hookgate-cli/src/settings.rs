//! Configuration discovery shared by every command.

use hookgate_core::config::{ConfigError, DEFAULT_CONFIG_FILE};
use hookgate_core::{GateConfig, LogConfig};
use std::path::{Path, PathBuf};

/// Global options resolved from flags and environment.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    config: Option<PathBuf>,
    log_dir: Option<PathBuf>,
}

impl Settings {
    pub fn new(config: Option<PathBuf>, log_dir: Option<PathBuf>) -> Self {
        Self { config, log_dir }
    }

    /// The configuration file in effect: the explicit one, else
    /// `./hookgate.yaml` when it exists, else none (built-in defaults).
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config {
            return Some(path.clone());
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        local.is_file().then(|| local.to_path_buf())
    }

    pub fn load_config(&self) -> Result<GateConfig, ConfigError> {
        match self.config_path() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration");
                GateConfig::load_with_context(&path)
            }
            None => {
                tracing::debug!("No configuration file, using built-in defaults");
                Ok(GateConfig::default())
            }
        }
    }

    /// Logging configuration with the `--log-dir` override applied.
    pub fn log_config(&self, config: &GateConfig) -> LogConfig {
        let mut logging = config.logging.clone();
        if let Some(dir) = &self.log_dir {
            logging.directory = dir.clone();
        }
        logging
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_override() {
        let config = GateConfig::default();

        let settings = Settings::new(None, Some(PathBuf::from("/tmp/hooks")));
        assert_eq!(settings.log_config(&config).directory, PathBuf::from("/tmp/hooks"));

        let settings = Settings::default();
        assert_eq!(settings.log_config(&config).directory, config.logging.directory);
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.yaml");
        std::fs::write(&path, "include_default_rules: false\nlogging:\n  directory: history\n").unwrap();

        let settings = Settings::new(Some(path.clone()), None);
        assert_eq!(settings.config_path(), Some(path));

        let config = settings.load_config().unwrap();
        assert!(config.effective_rules().is_empty());
        assert_eq!(config.logging.directory, dir.path().join("history"));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let settings = Settings::new(Some(PathBuf::from("/nonexistent/hookgate.yaml")), None);
        assert!(settings.load_config().is_err());
    }
}

//! Event logging configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the event recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Whether events are recorded at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Directory holding the log views.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Also echo each record as a human-readable line on stderr.
    #[serde(default)]
    pub stdout: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            directory: default_directory(),
            stdout: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_directory() -> PathBuf {
    PathBuf::from("logs")
}

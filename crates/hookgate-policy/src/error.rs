//! Rule compilation errors.

use thiserror::Error;

/// A rule could not be turned into a matcher.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule has no id.
    #[error("rule #{index} has an empty id")]
    EmptyId { index: usize },

    /// Two rules share an id, so `matched_rule_id` would be ambiguous.
    #[error("duplicate rule id '{id}'")]
    DuplicateId { id: String },

    /// The match pattern is not a valid regex.
    #[error("rule '{id}': invalid pattern: {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },

    /// The exclusion pattern is not a valid regex.
    #[error("rule '{id}': invalid exclude pattern: {source}")]
    InvalidExclude {
        id: String,
        #[source]
        source: regex::Error,
    },
}

impl RuleError {
    /// Id of the offending rule, when it has one.
    pub fn rule_id(&self) -> Option<&str> {
        match self {
            Self::EmptyId { .. } => None,
            Self::DuplicateId { id }
            | Self::InvalidPattern { id, .. }
            | Self::InvalidExclude { id, .. } => Some(id),
        }
    }
}

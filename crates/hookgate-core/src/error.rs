//! Error types for malformed actions and records.

use crate::event::EventType;
use thiserror::Error;

/// An action descriptor field could not be read as expected.
///
/// Always recovered: the gate treats the field as empty and keeps evaluating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleEvaluationError {
    /// `tool_input` was not a JSON object.
    #[error("tool_input must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// A record violates one of the history invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("{0} record is missing its decision")]
    MissingDecision(EventType),

    #[error("allow decision must not name a matched rule (got '{0}')")]
    AllowWithRule(String),

    #[error("{0} decision must name the rule that produced it")]
    MissingRule(crate::Outcome),
}

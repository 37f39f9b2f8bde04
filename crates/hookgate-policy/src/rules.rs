//! Compiled rule set.
//!
//! Patterns are compiled once when the gate is built; evaluation never
//! touches the regex compiler.

use crate::error::RuleError;
use hookgate_core::{ActionDescriptor, ActionKind, Rule, TargetField};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// A rule with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: Rule,
    pattern: Regex,
    exclude: Option<Regex>,
}

impl CompiledRule {
    /// Compile a single rule.
    pub fn compile(rule: Rule) -> Result<Self, RuleError> {
        let pattern = build_regex(&rule.pattern, rule.case_insensitive).map_err(|source| {
            RuleError::InvalidPattern {
                id: rule.id.clone(),
                source,
            }
        })?;

        let exclude = match &rule.exclude {
            Some(exclude) => Some(build_regex(exclude, rule.case_insensitive).map_err(|source| {
                RuleError::InvalidExclude {
                    id: rule.id.clone(),
                    source,
                }
            })?),
            None => None,
        };

        Ok(Self {
            rule,
            pattern,
            exclude,
        })
    }

    /// The source rule.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn id(&self) -> &str {
        &self.rule.id
    }

    /// Whether the rule matches the action.
    ///
    /// Missing fields are matched as the empty string. For `any_param` each
    /// parameter value is searched on its own, in parameter order. Prompt
    /// rules only see prompts and tool rules only see tool calls.
    pub fn matches(&self, action: &ActionDescriptor) -> bool {
        if self.rule.target_field.action_kind() != action.kind() {
            return false;
        }
        if action.kind() == ActionKind::ToolUse && !self.rule.applies_to(action.tool_name()) {
            return false;
        }

        match self.rule.target_field {
            TargetField::CommandText => self.matches_value(action.command_text()),
            TargetField::FilePath => self.matches_value(action.file_path()),
            TargetField::ToolName => self.matches_value(action.tool_name()),
            TargetField::Prompt => self.matches_value(action.prompt_text()),
            TargetField::AnyParam => {
                if action.parameters().is_empty() {
                    self.matches_value("")
                } else {
                    action.parameters().values().any(|v| self.matches_value(v))
                }
            }
        }
    }

    fn matches_value(&self, value: &str) -> bool {
        self.pattern.is_match(value) && !self.exclude.as_ref().is_some_and(|e| e.is_match(value))
    }
}

fn build_regex(pattern: &str, case_insensitive: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
}

/// An ordered, immutable sequence of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// An empty rule set (everything is allowed).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile rules, keeping their order.
    ///
    /// Fails on the first rule with an empty or duplicate id or an invalid
    /// pattern.
    pub fn compile(rules: impl IntoIterator<Item = Rule>) -> Result<Self, RuleError> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::new();

        for (index, rule) in rules.into_iter().enumerate() {
            if rule.id.trim().is_empty() {
                return Err(RuleError::EmptyId { index });
            }
            if !seen.insert(rule.id.clone()) {
                return Err(RuleError::DuplicateId { id: rule.id });
            }
            compiled.push(CompiledRule::compile(rule)?);
        }

        Ok(Self { rules: compiled })
    }

    /// Compile every rule and collect all errors instead of stopping at the first.
    pub fn check(rules: impl IntoIterator<Item = Rule>) -> Vec<RuleError> {
        let mut seen = HashSet::new();
        let mut errors = Vec::new();

        for (index, rule) in rules.into_iter().enumerate() {
            if rule.id.trim().is_empty() {
                errors.push(RuleError::EmptyId { index });
                continue;
            }
            if !seen.insert(rule.id.clone()) {
                errors.push(RuleError::DuplicateId { id: rule.id });
                continue;
            }
            if let Err(e) = CompiledRule::compile(rule) {
                errors.push(e);
            }
        }

        errors
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

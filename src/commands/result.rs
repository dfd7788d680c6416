//! Structured outcome of handling one command.

use crate::domain::BrokenRuleResult;
use crate::events::{Artifact, CorrelationId};

use super::validation::ValidationResult;
use super::CommandError;

/// Classification of a command that did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorKind {
    NotAuthorized,
    ValidationFailed,
    BrokenBusinessRule,
    HandlerThrew,
    /// The only kind a caller may retry by reloading and reapplying.
    StoreCommitConflict,
}

#[derive(Debug)]
pub struct CommandResult {
    pub correlation_id: CorrelationId,
    pub command_type: Artifact,
    pub security_messages: Vec<String>,
    pub validation_results: Vec<ValidationResult>,
    pub command_validation_messages: Vec<String>,
    pub broken_rules: Vec<BrokenRuleResult>,
    /// Innermost cause of a handling or commit failure.
    pub exception: Option<CommandError>,
}

impl CommandResult {
    pub fn for_command(correlation_id: CorrelationId, command_type: Artifact) -> Self {
        Self {
            correlation_id,
            command_type,
            security_messages: Vec::new(),
            validation_results: Vec::new(),
            command_validation_messages: Vec::new(),
            broken_rules: Vec::new(),
            exception: None,
        }
    }

    pub fn passed_security(&self) -> bool {
        self.security_messages.is_empty()
    }

    pub fn invalid(&self) -> bool {
        !self.validation_results.is_empty() || !self.command_validation_messages.is_empty()
    }

    pub fn has_broken_rules(&self) -> bool {
        !self.broken_rules.is_empty()
    }

    /// No validation errors, no exception, authorized.
    pub fn success(&self) -> bool {
        self.exception.is_none() && !self.invalid() && self.passed_security()
    }

    /// Command-level messages followed by per-member ones.
    pub fn all_validation_messages(&self) -> Vec<String> {
        self.command_validation_messages
            .iter()
            .cloned()
            .chain(
                self.validation_results
                    .iter()
                    .map(|result| result.message.clone()),
            )
            .collect()
    }

    pub fn error_kind(&self) -> Option<CommandErrorKind> {
        if !self.passed_security() {
            return Some(CommandErrorKind::NotAuthorized);
        }
        if self.invalid() {
            return Some(CommandErrorKind::ValidationFailed);
        }
        if let Some(exception) = &self.exception {
            return Some(if exception.is_concurrency_conflict() {
                CommandErrorKind::StoreCommitConflict
            } else {
                CommandErrorKind::HandlerThrew
            });
        }
        if self.has_broken_rules() {
            return Some(CommandErrorKind::BrokenBusinessRule);
        }
        None
    }
}

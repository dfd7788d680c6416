//! Command validation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::events::ArtifactId;

use super::CommandRequest;

/// A violation tied to specific members of the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub message: String,
    pub members: Vec<String>,
}

impl ValidationResult {
    pub fn new(message: impl Into<String>, members: &[&str]) -> Self {
        Self {
            message: message.into(),
            members: members.iter().map(|member| member.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub validation_results: Vec<ValidationResult>,
    /// Violations of the command as a whole.
    pub command_validation_messages: Vec<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn member(message: impl Into<String>, members: &[&str]) -> Self {
        Self {
            validation_results: vec![ValidationResult::new(message, members)],
            ..Self::default()
        }
    }

    pub fn command(message: impl Into<String>) -> Self {
        Self {
            command_validation_messages: vec![message.into()],
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validation_results.is_empty() && self.command_validation_messages.is_empty()
    }

    fn merge(&mut self, other: ValidationOutcome) {
        self.validation_results.extend(other.validation_results);
        self.command_validation_messages
            .extend(other.command_validation_messages);
    }
}

/// Checks a command's content. Must be free of side effects.
pub trait CommandValidator: Send + Sync {
    fn validate(&self, request: &CommandRequest) -> ValidationOutcome;
}

impl<F> CommandValidator for F
where
    F: Fn(&CommandRequest) -> ValidationOutcome + Send + Sync,
{
    fn validate(&self, request: &CommandRequest) -> ValidationOutcome {
        self(request)
    }
}

/// Every validator that applies to a command, with their findings combined.
#[derive(Clone, Default)]
pub struct CommandValidators {
    any: Vec<Arc<dyn CommandValidator>>,
    by_command: HashMap<ArtifactId, Vec<Arc<dyn CommandValidator>>>,
}

impl CommandValidators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate every command.
    pub fn add(&mut self, validator: impl CommandValidator + 'static) -> &mut Self {
        self.any.push(Arc::new(validator));
        self
    }

    /// Validate commands of one type.
    pub fn add_for(
        &mut self,
        command_type: ArtifactId,
        validator: impl CommandValidator + 'static,
    ) -> &mut Self {
        self.by_command
            .entry(command_type)
            .or_default()
            .push(Arc::new(validator));
        self
    }

    pub fn validate(&self, request: &CommandRequest) -> ValidationOutcome {
        let specific = self
            .by_command
            .get(&request.command_type.id)
            .into_iter()
            .flatten();
        let mut outcome = ValidationOutcome::valid();
        for validator in self.any.iter().chain(specific) {
            outcome.merge(validator.validate(request));
        }
        outcome
    }
}

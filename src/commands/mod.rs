//! Command transaction coordinator.
//!
//! A command runs through authorize, validate, handle and commit inside
//! a `CommandContext` that owns every aggregate the handlers touch.
//! Commits use optimistic concurrency on each aggregate's version.

mod context;
mod coordinator;
mod handlers;
mod request;
mod result;
mod security;
mod validation;

pub use context::{CommandContext, CommitReport};
pub use coordinator::{CommandCoordinator, CommandCoordinatorBuilder, TransactionOutcome};
pub use handlers::{BoxError, CommandHandler, CommandHandlerError, CommandHandlers};
pub use request::{Command, CommandRequest};
pub use result::{CommandErrorKind, CommandResult};
pub use security::{AllowAll, AuthorizationResult, CommandSecurity};
pub use validation::{CommandValidator, CommandValidators, ValidationOutcome, ValidationResult};

use crate::domain::DomainError;
use crate::events::{AggregateRootVersion, Artifact, EventSourceId};
use crate::interfaces::StorageError;

/// Failure recorded as a command result's exception.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command {0} was not handled by any command handler")]
    CommandWasNotHandled(Artifact),

    #[error("Command handler panicked: {0}")]
    HandlerPanicked(String),

    /// A collaborator outside the handlers panicked: security, validation or the store.
    #[error("Command pipeline panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Handler(BoxError),

    #[error("Aggregate error: {0}")]
    Domain(#[from] DomainError),

    #[error("Commit of event source {event_source} failed: {source}")]
    Commit {
        event_source: EventSourceId,
        #[source]
        source: StorageError,
    },
}

impl CommandError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, CommandError::Commit { source, .. } if source.is_concurrency_conflict())
    }

    /// Expected and stored versions of a conflicting commit.
    pub fn conflict_versions(&self) -> Option<(AggregateRootVersion, AggregateRootVersion)> {
        match self {
            CommandError::Commit {
                source: StorageError::ConcurrencyConflict {
                    expected, actual, ..
                },
                ..
            } => Some((*expected, *actual)),
            _ => None,
        }
    }
}

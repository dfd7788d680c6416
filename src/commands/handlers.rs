//! Domain command handlers and their registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::DomainError;
use crate::events::{Artifact, ArtifactId};

use super::{CommandContext, CommandError, CommandRequest};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure raised by a command handler.
#[derive(Debug, thiserror::Error)]
pub enum CommandHandlerError {
    /// Wraps a failure raised by a nested invocation; never the real cause.
    #[error("Invocation of command handler failed: {0}")]
    Invocation(Box<CommandHandlerError>),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Failed(BoxError),
}

impl CommandHandlerError {
    pub fn failed(error: impl Into<BoxError>) -> Self {
        CommandHandlerError::Failed(error.into())
    }

    pub fn invocation(inner: CommandHandlerError) -> Self {
        CommandHandlerError::Invocation(Box::new(inner))
    }

    /// Strip every invocation wrapper.
    pub fn innermost(self) -> Self {
        let mut error = self;
        while let CommandHandlerError::Invocation(inner) = error {
            error = *inner;
        }
        error
    }
}

impl From<CommandHandlerError> for CommandError {
    fn from(error: CommandHandlerError) -> Self {
        match error {
            CommandHandlerError::Invocation(inner) => CommandError::from(*inner),
            CommandHandlerError::Domain(error) => CommandError::Domain(error),
            CommandHandlerError::Failed(error) => CommandError::Handler(error),
        }
    }
}

/// Handles commands of one or more types against aggregates of the context.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        context: &mut CommandContext,
        request: &CommandRequest,
    ) -> Result<(), CommandHandlerError>;
}

/// Command type to handlers. Built at composition time.
#[derive(Clone, Default)]
pub struct CommandHandlers {
    handlers: HashMap<ArtifactId, Vec<Arc<dyn CommandHandler>>>,
}

impl CommandHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        command_type: Artifact,
        handler: impl CommandHandler + 'static,
    ) -> &mut Self {
        self.register_shared(command_type, Arc::new(handler))
    }

    pub fn register_shared(
        &mut self,
        command_type: Artifact,
        handler: Arc<dyn CommandHandler>,
    ) -> &mut Self {
        self.handlers
            .entry(command_type.id)
            .or_default()
            .push(handler);
        self
    }

    pub fn handles(&self, command_type: &Artifact) -> bool {
        self.handlers.contains_key(&command_type.id)
    }

    /// Run every handler for the command, in registration order, stopping at the first failure.
    pub(crate) async fn handle(
        &self,
        context: &mut CommandContext,
        request: &CommandRequest,
    ) -> Result<(), CommandError> {
        let handlers = match self.handlers.get(&request.command_type.id) {
            Some(handlers) if !handlers.is_empty() => handlers,
            _ => return Err(CommandError::CommandWasNotHandled(request.command_type)),
        };
        for handler in handlers {
            handler.handle(context, request).await?;
        }
        debug!(
            command_type = %request.command_type,
            handlers = handlers.len(),
            "Command handled"
        );
        Ok(())
    }
}

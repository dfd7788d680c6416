//! Authorize, validate, handle and commit one command.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::config::CommandsConfig;
use crate::events::{CorrelationId, ExecutionContext};
use crate::interfaces::EventStore;
use crate::processing::EventProcessingCompletion;
use crate::utils::panic_message;
use crate::utils::retry::conflict_backoff;

use super::security::{AllowAll, CommandSecurity};
use super::validation::{CommandValidators, ValidationOutcome};
use super::{
    CommandContext, CommandError, CommandErrorKind, CommandHandlers, CommandRequest, CommandResult,
};

/// What became of a command's transaction scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
}

/// Why the pipeline stopped before committing.
enum Halt {
    Unauthorized(Vec<String>),
    Invalid(ValidationOutcome),
    Fault(CommandError),
}

/// Handles commands inside their own transaction scope.
///
/// Every outcome is reported through `CommandResult`; nothing is raised
/// across this boundary.
pub struct CommandCoordinator {
    store: Arc<dyn EventStore>,
    execution_context: ExecutionContext,
    security: Arc<dyn CommandSecurity>,
    validators: CommandValidators,
    handlers: CommandHandlers,
    completion: Option<EventProcessingCompletion>,
    handler_wait_timeout: Duration,
    conflict_backoff: ExponentialBuilder,
}

impl CommandCoordinator {
    pub fn builder(
        store: Arc<dyn EventStore>,
        execution_context: ExecutionContext,
    ) -> CommandCoordinatorBuilder {
        CommandCoordinatorBuilder::new(store, execution_context)
    }

    /// Open a transaction scope for `correlation_id`.
    pub fn establish(&self, correlation_id: CorrelationId) -> CommandContext {
        let context = CommandContext::new(
            self.execution_context.with_correlation(correlation_id),
            self.store.clone(),
        );
        match &self.completion {
            Some(completion) => context.with_completion(completion.clone(), self.handler_wait_timeout),
            None => context,
        }
    }

    pub async fn handle(&self, request: CommandRequest) -> CommandResult {
        self.handle_in(request).await.0
    }

    /// Handle a command and report what happened to its transaction scope.
    #[tracing::instrument(name = "command.handle", skip_all, fields(command_type = %request.command_type, correlation_id = tracing::field::Empty))]
    pub async fn handle_in(&self, request: CommandRequest) -> (CommandResult, TransactionOutcome) {
        let correlation_id = if request.correlation_id.is_nil() {
            CorrelationId::new()
        } else {
            request.correlation_id
        };
        tracing::Span::current().record("correlation_id", tracing::field::display(&correlation_id));
        let request = request.with_correlation(correlation_id);

        let mut result = CommandResult::for_command(correlation_id, request.command_type);
        let mut context = self.establish(correlation_id);

        let outcome = AssertUnwindSafe(self.run(&mut context, &request, &mut result))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(Halt::Fault(CommandError::Panicked(panic_message(panic))))
            });
        match outcome {
            Ok(()) => (result, TransactionOutcome::Committed),
            Err(halt) => {
                match halt {
                    Halt::Unauthorized(messages) => {
                        debug!("Command not authorized");
                        result.security_messages = messages;
                    }
                    Halt::Invalid(outcome) => {
                        debug!("Command is invalid");
                        result.validation_results = outcome.validation_results;
                        result.command_validation_messages = outcome.command_validation_messages;
                    }
                    Halt::Fault(exception) => {
                        error!(error = %exception, "Error handling command");
                        result.exception = Some(exception);
                    }
                }
                context.rollback();
                (result, TransactionOutcome::RolledBack)
            }
        }
    }

    async fn run(
        &self,
        context: &mut CommandContext,
        request: &CommandRequest,
        result: &mut CommandResult,
    ) -> Result<(), Halt> {
        debug!("Authorize");
        let authorization = self.security.authorize(request);
        if !authorization.is_authorized() {
            return Err(Halt::Unauthorized(authorization.into_messages()));
        }

        debug!("Validate");
        let validation = self.validators.validate(request);
        if !validation.is_valid() {
            return Err(Halt::Invalid(validation));
        }

        debug!("Handle the command");
        self.invoke_handlers(context, request)
            .await
            .map_err(Halt::Fault)?;

        result.broken_rules = context.broken_rules();

        debug!("Commit transaction");
        context.commit().await.map_err(Halt::Fault)?;
        Ok(())
    }

    async fn invoke_handlers(
        &self,
        context: &mut CommandContext,
        request: &CommandRequest,
    ) -> Result<(), CommandError> {
        AssertUnwindSafe(self.handlers.handle(context, request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(CommandError::HandlerPanicked(panic_message(panic))))
    }

    /// Handle a command, reloading and reapplying it while commits conflict.
    ///
    /// Only `StoreCommitConflict` is retried, with the coordinator's conflict
    /// backoff. Every attempt shares one correlation id.
    pub async fn handle_with_retry(&self, request: CommandRequest) -> CommandResult {
        self.handle_with_backoff(request, self.conflict_backoff).await
    }

    /// `handle_with_retry` with an explicit backoff.
    pub async fn handle_with_backoff(
        &self,
        request: CommandRequest,
        backoff: ExponentialBuilder,
    ) -> CommandResult {
        let request = if request.correlation_id.is_nil() {
            request.with_correlation(CorrelationId::new())
        } else {
            request
        };
        let mut delays = backoff.build();
        let mut attempt = 1u32;
        loop {
            let (result, _) = self.handle_in(request.clone()).await;
            if result.error_kind() != Some(CommandErrorKind::StoreCommitConflict) {
                return result;
            }
            match delays.next() {
                Some(delay) => {
                    warn!(
                        correlation_id = %request.correlation_id,
                        attempt,
                        ?delay,
                        "Commit conflict, retrying command"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    warn!(
                        correlation_id = %request.correlation_id,
                        attempt,
                        "Commit conflict, retries exhausted"
                    );
                    return result;
                }
            }
        }
    }
}

pub struct CommandCoordinatorBuilder {
    store: Arc<dyn EventStore>,
    execution_context: ExecutionContext,
    security: Arc<dyn CommandSecurity>,
    validators: CommandValidators,
    handlers: CommandHandlers,
    completion: Option<EventProcessingCompletion>,
    handler_wait_timeout: Duration,
    conflict_backoff: ExponentialBuilder,
}

impl CommandCoordinatorBuilder {
    pub fn new(store: Arc<dyn EventStore>, execution_context: ExecutionContext) -> Self {
        Self {
            store,
            execution_context,
            security: Arc::new(AllowAll),
            validators: CommandValidators::new(),
            handlers: CommandHandlers::new(),
            completion: None,
            handler_wait_timeout: CommandContext::DEFAULT_HANDLER_WAIT_TIMEOUT,
            conflict_backoff: conflict_backoff(),
        }
    }

    pub fn config(mut self, config: &CommandsConfig) -> Self {
        self.handler_wait_timeout = config.handler_wait_timeout();
        self.conflict_backoff = config.conflict_retry.builder();
        self
    }

    /// Backoff between attempts of `handle_with_retry`.
    pub fn conflict_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.conflict_backoff = backoff;
        self
    }

    pub fn security(mut self, security: impl CommandSecurity + 'static) -> Self {
        self.security = Arc::new(security);
        self
    }

    pub fn validators(mut self, validators: CommandValidators) -> Self {
        self.validators = validators;
        self
    }

    pub fn handlers(mut self, handlers: CommandHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Wait for local event handlers after every commit.
    pub fn completion(mut self, completion: EventProcessingCompletion) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn handler_wait_timeout(mut self, timeout: Duration) -> Self {
        self.handler_wait_timeout = timeout;
        self
    }

    pub fn build(self) -> CommandCoordinator {
        CommandCoordinator {
            store: self.store,
            execution_context: self.execution_context,
            security: self.security,
            validators: self.validators,
            handlers: self.handlers,
            completion: self.completion,
            handler_wait_timeout: self.handler_wait_timeout,
            conflict_backoff: self.conflict_backoff,
        }
    }
}

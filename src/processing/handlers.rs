//! Event handlers: a dispatch table from event type to user code.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use backon::ExponentialBuilder;
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::events::{
    decode, Artifact, ArtifactId, CommittedEvent, Event, EventLogSequenceNumber, EventSourceId,
    ExecutionContext, HandlerId, PartitionId, ScopeId,
};
use crate::proto;
use crate::proto_ext::{committed_event_from_proto, id_from_proto, required};
use crate::reverse_call::{CancellationSignal, ReverseCallClient, ReverseCallDispatcher};
use crate::utils::panic_message;
use crate::utils::retry::reconnect_backoff;

use super::protocols::{EventHandlerProtocol, EventHandlerRegistration};
use super::{failure_reason, processor, EventProcessingCompletion, HandlerError, ProcessorError};

/// Where and when the event being handled happened.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    pub sequence_number: EventLogSequenceNumber,
    pub event_source: EventSourceId,
    pub occurred: DateTime<Utc>,
    pub execution_context: ExecutionContext,
    pub partition: PartitionId,
    pub scope: ScopeId,
    pub retry_count: u32,
}

type HandleFn =
    Arc<dyn Fn(Value, EventContext) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

#[derive(Clone)]
struct Method {
    artifact: Artifact,
    invoke: HandleFn,
}

/// Collects handle methods for one event handler.
pub struct EventHandlerBuilder {
    id: HandlerId,
    scope: ScopeId,
    partitioned: bool,
    methods: Vec<Method>,
}

impl EventHandlerBuilder {
    /// A partitioned handler in the default scope.
    pub fn new(id: HandlerId) -> Self {
        Self {
            id,
            scope: ScopeId::DEFAULT,
            partitioned: true,
            methods: Vec::new(),
        }
    }

    pub fn in_scope(mut self, scope: ScopeId) -> Self {
        self.scope = scope;
        self
    }

    pub fn unpartitioned(mut self) -> Self {
        self.partitioned = false;
        self
    }

    /// Handle events of type `E` with `method`.
    pub fn handle<E, F, Fut>(mut self, method: F) -> Self
    where
        E: Event,
        F: Fn(E, EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let artifact = E::artifact();
        let invoke: HandleFn = Arc::new(move |content: Value, context: EventContext| {
            match decode::<E>(artifact, &content) {
                Ok(event) => method(event, context).boxed(),
                Err(error) => {
                    let error: HandlerError = error.into();
                    future::ready(Err(error)).boxed()
                }
            }
        });
        self.methods.push(Method { artifact, invoke });
        self
    }

    /// Validate and freeze the dispatch table.
    pub fn build(self) -> Result<EventHandler, ProcessorError> {
        if self.id.is_reserved() {
            return Err(ProcessorError::IllegalProcessorId(self.id));
        }
        if self.methods.is_empty() {
            return Err(ProcessorError::NoEventTypes(self.id));
        }
        let mut methods = HashMap::with_capacity(self.methods.len());
        for method in self.methods {
            let artifact = method.artifact;
            if methods.insert(artifact.id, method).is_some() {
                return Err(ProcessorError::DuplicateHandlerFor {
                    processor: self.id,
                    event_type: artifact,
                });
            }
        }
        Ok(EventHandler {
            id: self.id,
            scope: self.scope,
            partitioned: self.partitioned,
            methods,
        })
    }
}

/// A validated event handler. The dispatch table is read-only.
pub struct EventHandler {
    id: HandlerId,
    scope: ScopeId,
    partitioned: bool,
    methods: HashMap<ArtifactId, Method>,
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandler")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("partitioned", &self.partitioned)
            .field("event_types", &self.event_types())
            .finish()
    }
}

impl EventHandler {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn partitioned(&self) -> bool {
        self.partitioned
    }

    pub fn event_types(&self) -> Vec<Artifact> {
        let mut types: Vec<Artifact> = self.methods.values().map(|m| m.artifact).collect();
        types.sort_by_key(|artifact| artifact.id);
        types
    }

    /// Invoke the method registered for the event's type.
    pub async fn handle(&self, event: &CommittedEvent, context: EventContext) -> Result<(), HandlerError> {
        let method = self
            .methods
            .get(&event.artifact.id)
            .ok_or_else(|| format!("No handle method for event type {}", event.artifact))?;
        (method.invoke)(event.content.clone(), context).await
    }
}

struct HandlerDispatcher {
    handler: EventHandler,
    completion: Option<EventProcessingCompletion>,
}

impl HandlerDispatcher {
    async fn process(&self, request: &proto::HandleEventRequest) -> Result<CommittedEvent, HandlerError> {
        let stream_event = required(request.event.as_ref(), "event")?;
        let event = committed_event_from_proto(required(stream_event.event.as_ref(), "event.event")?)?;
        let partition: PartitionId = match stream_event.partition_id.as_ref() {
            Some(_) => id_from_proto(stream_event.partition_id.as_ref(), "partition_id")?,
            None => PartitionId::nil(),
        };
        let context = EventContext {
            sequence_number: event.event_log_sequence_number,
            event_source: event.event_source,
            occurred: event.occurred,
            execution_context: event.execution_context,
            partition,
            scope: self.handler.scope,
            retry_count: request.retry_count,
        };
        match AssertUnwindSafe(self.handler.handle(&event, context))
            .catch_unwind()
            .await
        {
            Ok(result) => result.map(|()| event),
            Err(panic) => Err(format!("handler panicked: {}", panic_message(panic)).into()),
        }
    }

    fn notify_completed(&self, event: &CommittedEvent) {
        let Some(completion) = &self.completion else {
            return;
        };
        let notified = std::panic::catch_unwind(AssertUnwindSafe(|| {
            completion.notify_completed(
                event.execution_context.correlation_id,
                self.handler.id,
                event.artifact.id,
            )
        }));
        if notified.is_err() {
            error!(
                handler_id = %self.handler.id,
                correlation_id = %event.execution_context.correlation_id,
                "Failed to record event handler completion"
            );
        }
    }
}

#[async_trait]
impl ReverseCallDispatcher<EventHandlerProtocol> for HandlerDispatcher {
    async fn dispatch(&self, request: proto::HandleEventRequest) -> proto::EventHandlerResponse {
        let call_context = request.call_context.clone().unwrap_or_default();
        let response_context = Some(proto::ReverseCallResponseContext {
            call_number: call_context.call_number,
            execution_context: call_context.execution_context,
        });

        match self.process(&request).await {
            Ok(event) => {
                debug!(
                    handler_id = %self.handler.id,
                    event_type = %event.artifact,
                    sequence_number = %event.event_log_sequence_number,
                    "Event handled"
                );
                self.notify_completed(&event);
                proto::EventHandlerResponse {
                    call_context: response_context,
                    succeeded: true,
                    retry: false,
                    failure_reason: String::new(),
                }
            }
            Err(error) => {
                warn!(
                    handler_id = %self.handler.id,
                    call_number = call_context.call_number,
                    retry_count = request.retry_count,
                    error = %error,
                    "Event handler failed"
                );
                proto::EventHandlerResponse {
                    call_context: response_context,
                    succeeded: false,
                    retry: false,
                    failure_reason: failure_reason(error.as_ref()),
                }
            }
        }
    }
}

/// Runs event handlers against the runtime.
pub struct EventHandlerProcessor {
    client: ReverseCallClient<EventHandlerProtocol>,
    execution_context: ExecutionContext,
    completion: Option<EventProcessingCompletion>,
    backoff: ExponentialBuilder,
}

impl EventHandlerProcessor {
    pub fn new(
        client: ReverseCallClient<EventHandlerProtocol>,
        execution_context: ExecutionContext,
    ) -> Self {
        Self {
            client,
            execution_context,
            completion: None,
            backoff: reconnect_backoff(),
        }
    }

    /// Report handled events so that command commits can wait for them.
    pub fn with_completion(mut self, completion: EventProcessingCompletion) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// Serve `handler` until `cancel` fires.
    #[instrument(name = "event_handler.register", skip_all, fields(handler_id = %handler.id()))]
    pub async fn register(
        &self,
        handler: EventHandler,
        cancel: CancellationSignal,
    ) -> Result<(), ProcessorError> {
        if handler.id.is_reserved() {
            return Err(ProcessorError::IllegalProcessorId(handler.id));
        }
        let registration = EventHandlerRegistration {
            execution_context: self.execution_context,
            handler_id: handler.id,
            scope: handler.scope,
            event_types: handler.event_types(),
            partitioned: handler.partitioned,
        };
        if let Some(completion) = &self.completion {
            completion.register_handler(
                handler.id,
                registration.event_types.iter().map(|artifact| artifact.id),
            );
        }

        let handler_id = handler.id;
        let dispatcher = HandlerDispatcher {
            handler,
            completion: self.completion.clone(),
        };
        let result = processor::run(
            &self.client,
            &registration,
            &dispatcher,
            self.backoff,
            &cancel,
        )
        .await;

        if let Some(completion) = &self.completion {
            completion.unregister_handler(handler_id);
        }
        result
    }
}

#[cfg(test)]
pub(super) fn dispatcher_for(
    handler: EventHandler,
    completion: Option<EventProcessingCompletion>,
) -> impl ReverseCallDispatcher<EventHandlerProtocol> {
    HandlerDispatcher {
        handler,
        completion,
    }
}

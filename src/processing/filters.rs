//! Partitioned filters: decide whether an event enters a stream, and in which partition.
//!
//! Public filters make the same decision over events committed as public.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use backon::ExponentialBuilder;
use futures::FutureExt;
use tracing::{debug, instrument, warn};

use crate::events::{CommittedEvent, ExecutionContext, FilterId, PartitionId, ScopeId};
use crate::proto;
use crate::proto_ext::{committed_event_from_proto, required, UuidExt};
use crate::reverse_call::{CancellationSignal, ReverseCallClient, ReverseCallDispatcher};
use crate::utils::panic_message;
use crate::utils::retry::reconnect_backoff;

use super::protocols::{
    FilterProtocol, FilterRegistration, PublicFilterProtocol, PublicFilterRegistration,
};
use super::{failure_reason, processor, HandlerError, ProcessorError};

/// A filter's verdict on one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionedFilterResult {
    pub included: bool,
    pub partition: PartitionId,
}

impl PartitionedFilterResult {
    pub fn included(partition: PartitionId) -> Self {
        Self {
            included: true,
            partition,
        }
    }

    pub fn excluded() -> Self {
        Self {
            included: false,
            partition: PartitionId::nil(),
        }
    }
}

#[async_trait]
pub trait PartitionedFilter: Send + Sync {
    async fn filter(&self, event: &CommittedEvent) -> Result<PartitionedFilterResult, HandlerError>;
}

#[async_trait]
impl<F> PartitionedFilter for F
where
    F: Fn(&CommittedEvent) -> Result<PartitionedFilterResult, HandlerError> + Send + Sync,
{
    async fn filter(&self, event: &CommittedEvent) -> Result<PartitionedFilterResult, HandlerError> {
        self(event)
    }
}

struct FilterDispatcher {
    filter_id: FilterId,
    filter: Arc<dyn PartitionedFilter>,
}

impl FilterDispatcher {
    async fn process(
        &self,
        request: &proto::FilterEventRequest,
    ) -> Result<PartitionedFilterResult, HandlerError> {
        let event = committed_event_from_proto(required(request.event.as_ref(), "event")?)?;
        match AssertUnwindSafe(self.filter.filter(&event)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(format!("filter panicked: {}", panic_message(panic)).into()),
        }
    }

    async fn respond(&self, request: proto::FilterEventRequest) -> proto::PartitionedFilterResponse {
        let call_context = request.call_context.clone().unwrap_or_default();
        let response_context = Some(proto::ReverseCallResponseContext {
            call_number: call_context.call_number,
            execution_context: call_context.execution_context,
        });

        match self.process(&request).await {
            Ok(result) => {
                debug!(
                    filter_id = %self.filter_id,
                    call_number = call_context.call_number,
                    included = result.included,
                    partition = %result.partition,
                    "Event filtered"
                );
                proto::PartitionedFilterResponse {
                    call_context: response_context,
                    is_included: result.included,
                    partition_id: Some(result.partition.to_proto_uuid()),
                    failure: None,
                }
            }
            Err(error) => {
                warn!(
                    filter_id = %self.filter_id,
                    call_number = call_context.call_number,
                    error = %error,
                    "Filter failed"
                );
                proto::PartitionedFilterResponse {
                    call_context: response_context,
                    is_included: false,
                    partition_id: None,
                    failure: Some(proto::ProcessorFailure {
                        reason: failure_reason(error.as_ref()),
                        retry: false,
                    }),
                }
            }
        }
    }
}

#[async_trait]
impl ReverseCallDispatcher<FilterProtocol> for FilterDispatcher {
    async fn dispatch(&self, request: proto::FilterEventRequest) -> proto::PartitionedFilterResponse {
        self.respond(request).await
    }
}

#[async_trait]
impl ReverseCallDispatcher<PublicFilterProtocol> for FilterDispatcher {
    async fn dispatch(&self, request: proto::FilterEventRequest) -> proto::PartitionedFilterResponse {
        self.respond(request).await
    }
}

/// Runs partitioned filters against the runtime.
pub struct FilterProcessor {
    client: ReverseCallClient<FilterProtocol>,
    execution_context: ExecutionContext,
    backoff: ExponentialBuilder,
}

impl FilterProcessor {
    pub fn new(client: ReverseCallClient<FilterProtocol>, execution_context: ExecutionContext) -> Self {
        Self {
            client,
            execution_context,
            backoff: reconnect_backoff(),
        }
    }

    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// Serve `filter` under `filter_id` until `cancel` fires.
    #[instrument(name = "filter.register", skip_all, fields(filter_id = %filter_id))]
    pub async fn register(
        &self,
        filter_id: FilterId,
        scope: ScopeId,
        filter: Arc<dyn PartitionedFilter>,
        cancel: CancellationSignal,
    ) -> Result<(), ProcessorError> {
        if filter_id.is_reserved() {
            return Err(ProcessorError::IllegalProcessorId(filter_id));
        }
        let registration = FilterRegistration {
            execution_context: self.execution_context,
            filter_id,
            scope,
        };
        let dispatcher = FilterDispatcher { filter_id, filter };
        processor::run(
            &self.client,
            &registration,
            &dispatcher,
            self.backoff,
            &cancel,
        )
        .await
    }
}

/// Runs filters over public events against the runtime.
pub struct PublicFilterProcessor {
    client: ReverseCallClient<PublicFilterProtocol>,
    execution_context: ExecutionContext,
    backoff: ExponentialBuilder,
}

impl PublicFilterProcessor {
    pub fn new(
        client: ReverseCallClient<PublicFilterProtocol>,
        execution_context: ExecutionContext,
    ) -> Self {
        Self {
            client,
            execution_context,
            backoff: reconnect_backoff(),
        }
    }

    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// Serve `filter` over public events under `filter_id` until `cancel` fires.
    #[instrument(name = "public_filter.register", skip_all, fields(filter_id = %filter_id))]
    pub async fn register(
        &self,
        filter_id: FilterId,
        filter: Arc<dyn PartitionedFilter>,
        cancel: CancellationSignal,
    ) -> Result<(), ProcessorError> {
        if filter_id.is_reserved() {
            return Err(ProcessorError::IllegalProcessorId(filter_id));
        }
        let registration = PublicFilterRegistration {
            execution_context: self.execution_context,
            filter_id,
        };
        let dispatcher = FilterDispatcher { filter_id, filter };
        processor::run(
            &self.client,
            &registration,
            &dispatcher,
            self.backoff,
            &cancel,
        )
        .await
    }
}

#[cfg(test)]
pub(super) fn dispatcher_for(
    filter_id: FilterId,
    filter: Arc<dyn PartitionedFilter>,
) -> impl ReverseCallDispatcher<FilterProtocol> {
    FilterDispatcher { filter_id, filter }
}

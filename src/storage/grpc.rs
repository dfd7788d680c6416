//! EventStore backed by the runtime's event store service.

use async_trait::async_trait;
use tonic::transport::Channel;
use tracing::{debug, warn};

use crate::events::{
    AggregateRootVersion, Artifact, CommittedAggregateEvents, EventSourceId, ExecutionContext,
    UncommittedAggregateEvents,
};
use crate::interfaces::{EventStore, Result, StorageError};
use crate::proto::{self, services::EventStoreClient};
use crate::proto_ext::{committed_aggregate_events_from_proto, ConversionError, UuidExt};

impl From<ConversionError> for StorageError {
    fn from(error: ConversionError) -> Self {
        StorageError::InvalidResponse(error.to_string())
    }
}

fn check_failure(failure: Option<proto::Failure>) -> Result<()> {
    match failure {
        Some(failure) => Err(StorageError::Failure {
            reason: failure.reason,
        }),
        None => Ok(()),
    }
}

fn fetched(
    event_source: EventSourceId,
    aggregate_root: Artifact,
    response: proto::FetchForAggregateResponse,
) -> Result<CommittedAggregateEvents> {
    check_failure(response.failure)?;
    match response.events {
        Some(events) => Ok(committed_aggregate_events_from_proto(&events)?),
        None => Ok(CommittedAggregateEvents::empty(event_source, aggregate_root)),
    }
}

fn committed(
    event_source: EventSourceId,
    response: proto::CommitAggregateEventsResponse,
) -> Result<CommittedAggregateEvents> {
    if let Some(conflict) = response.conflict {
        warn!(
            %event_source,
            expected = conflict.expected_version,
            actual = conflict.actual_version,
            "Aggregate was advanced by another commit"
        );
        return Err(StorageError::ConcurrencyConflict {
            event_source,
            expected: AggregateRootVersion::new(conflict.expected_version),
            actual: AggregateRootVersion::new(conflict.actual_version),
        });
    }
    check_failure(response.failure)?;

    let events = response.events.ok_or_else(|| {
        StorageError::InvalidResponse("commit response carried no events".to_string())
    })?;
    Ok(committed_aggregate_events_from_proto(&events)?)
}

/// Event store client for the runtime.
///
/// Reads are issued under the store's execution context; commits carry the
/// context of the command being committed.
#[derive(Debug, Clone)]
pub struct GrpcEventStore {
    client: EventStoreClient,
    execution_context: ExecutionContext,
}

impl GrpcEventStore {
    pub fn new(channel: Channel, execution_context: ExecutionContext) -> Self {
        Self {
            client: EventStoreClient::new(channel),
            execution_context,
        }
    }

    fn aggregate_request(
        &self,
        event_source: EventSourceId,
        aggregate_root: Artifact,
    ) -> proto::FetchForAggregateRequest {
        proto::FetchForAggregateRequest {
            call_context: Some(self.execution_context.into()),
            event_source_id: Some(event_source.to_proto_uuid()),
            aggregate_root: Some(aggregate_root.into()),
        }
    }
}

#[async_trait]
impl EventStore for GrpcEventStore {
    async fn fetch_for_aggregate(
        &self,
        event_source: EventSourceId,
        aggregate_root: Artifact,
    ) -> Result<CommittedAggregateEvents> {
        let response = self
            .client
            .clone()
            .fetch_for_aggregate(self.aggregate_request(event_source, aggregate_root))
            .await?
            .into_inner();
        let events = fetched(event_source, aggregate_root, response)?;
        debug!(
            %event_source,
            aggregate_root = %aggregate_root,
            count = events.len(),
            "Fetched aggregate events"
        );
        Ok(events)
    }

    async fn version_for(
        &self,
        event_source: EventSourceId,
        aggregate_root: Artifact,
    ) -> Result<AggregateRootVersion> {
        let response = self
            .client
            .clone()
            .version_for_aggregate(self.aggregate_request(event_source, aggregate_root))
            .await?
            .into_inner();
        check_failure(response.failure)?;
        Ok(AggregateRootVersion::new(response.version))
    }

    async fn commit_for_aggregate(
        &self,
        execution_context: &ExecutionContext,
        events: UncommittedAggregateEvents,
    ) -> Result<CommittedAggregateEvents> {
        let request = proto::CommitAggregateEventsRequest {
            call_context: Some((*execution_context).into()),
            events: Some((&events).into()),
        };
        let response = self
            .client
            .clone()
            .commit_for_aggregate(request)
            .await?
            .into_inner();

        committed(events.event_source, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: Artifact = Artifact::from_u128(0xacc);

    fn committed_stream(event_source: EventSourceId) -> proto::CommittedAggregateEvents {
        proto::CommittedAggregateEvents {
            event_source_id: Some(event_source.to_proto_uuid()),
            aggregate_root: Some(ACCOUNT.into()),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_conflict_carries_stored_version() {
        let event_source = EventSourceId::new();
        let response = proto::CommitAggregateEventsResponse {
            failure: None,
            events: None,
            conflict: Some(proto::AggregateRootVersionConflict {
                expected_version: 2,
                actual_version: 3,
            }),
        };
        match committed(event_source, response).unwrap_err() {
            StorageError::ConcurrencyConflict {
                event_source: conflicted,
                expected,
                actual,
            } => {
                assert_eq!(conflicted, event_source);
                assert_eq!(expected, AggregateRootVersion::new(2));
                assert_eq!(actual, AggregateRootVersion::new(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failure_is_not_a_conflict() {
        let response = proto::CommitAggregateEventsResponse {
            failure: Some(proto::Failure {
                id: None,
                reason: "tenant not found".to_string(),
            }),
            events: None,
            conflict: None,
        };
        let err = committed(EventSourceId::new(), response).unwrap_err();
        assert!(matches!(&err, StorageError::Failure { reason } if reason == "tenant not found"));
        assert!(!err.is_concurrency_conflict());
    }

    #[test]
    fn test_commit_without_events_is_invalid() {
        let response = proto::CommitAggregateEventsResponse::default();
        let err = committed(EventSourceId::new(), response).unwrap_err();
        assert!(matches!(err, StorageError::InvalidResponse(_)));
    }

    #[test]
    fn test_commit_returns_committed_stream() {
        let event_source = EventSourceId::new();
        let response = proto::CommitAggregateEventsResponse {
            failure: None,
            events: Some(committed_stream(event_source)),
            conflict: None,
        };
        let events = committed(event_source, response).unwrap();
        assert_eq!(events.event_source(), event_source);
        assert_eq!(events.aggregate_root(), ACCOUNT);
    }

    #[test]
    fn test_fetch_without_events_is_empty_history() {
        let event_source = EventSourceId::new();
        let events = fetched(
            event_source,
            ACCOUNT,
            proto::FetchForAggregateResponse::default(),
        )
        .unwrap();
        assert!(events.is_empty());
        assert_eq!(events.aggregate_root_version(), None);
    }

    #[test]
    fn test_fetch_with_bad_stream_is_invalid_response() {
        let mut stream = committed_stream(EventSourceId::new());
        stream.event_source_id = None;
        let response = proto::FetchForAggregateResponse {
            failure: None,
            events: Some(stream),
        };
        let err = fetched(EventSourceId::new(), ACCOUNT, response).unwrap_err();
        assert!(matches!(err, StorageError::InvalidResponse(_)));
    }
}

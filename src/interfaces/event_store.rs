//! Event store interface.

use async_trait::async_trait;
use tonic::{Code, Status};

use crate::events::{
    AggregateRootVersion, Artifact, CommittedAggregateEvents, EventSourceId, EventsError,
    ExecutionContext, UncommittedAggregateEvents,
};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The aggregate was advanced by another commit between load and commit.
    #[error("Concurrency conflict on {event_source}: expected version {expected}, stored version is {actual}")]
    ConcurrencyConflict {
        event_source: EventSourceId,
        expected: AggregateRootVersion,
        actual: AggregateRootVersion,
    },

    #[error("Event store unavailable: {0}")]
    Unavailable(String),

    #[error("Event store reported failure: {reason}")]
    Failure { reason: String },

    #[error("Invalid response from event store: {0}")]
    InvalidResponse(String),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("gRPC error: {0}")]
    Grpc(Box<Status>),

    #[error("Event error: {0}")]
    Events(#[from] EventsError),
}

impl From<Status> for StorageError {
    fn from(status: Status) -> Self {
        StorageError::Grpc(Box::new(status))
    }
}

impl StorageError {
    /// Only version conflicts may be retried by reloading and reapplying.
    pub fn is_concurrency_conflict(&self) -> bool {
        match self {
            StorageError::ConcurrencyConflict { .. } => true,
            StorageError::Grpc(status) => status.code() == Code::Aborted,
            _ => false,
        }
    }
}

/// Interface for the remote event store.
///
/// Implementations:
/// - `InMemoryEventStore`: process-local storage for tests and embedding
/// - `GrpcEventStore`: the runtime's event store service
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Retrieve the full committed history of an aggregate, oldest first.
    async fn fetch_for_aggregate(
        &self,
        event_source: EventSourceId,
        aggregate_root: Artifact,
    ) -> Result<CommittedAggregateEvents>;

    /// Current version of an aggregate without fetching its events.
    async fn version_for(
        &self,
        event_source: EventSourceId,
        aggregate_root: Artifact,
    ) -> Result<AggregateRootVersion>;

    /// Append events if the stored version equals the expected version.
    ///
    /// Returns `StorageError::ConcurrencyConflict` carrying the stored version
    /// otherwise. Nothing is appended on conflict.
    async fn commit_for_aggregate(
        &self,
        execution_context: &ExecutionContext,
        events: UncommittedAggregateEvents,
    ) -> Result<CommittedAggregateEvents>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_retryable() {
        let conflict = StorageError::ConcurrencyConflict {
            event_source: EventSourceId::new(),
            expected: AggregateRootVersion::new(2),
            actual: AggregateRootVersion::new(3),
        };
        assert!(conflict.is_concurrency_conflict());
        assert!(StorageError::from(Status::aborted("conflict")).is_concurrency_conflict());
        assert!(!StorageError::from(Status::internal("boom")).is_concurrency_conflict());
        assert!(!StorageError::Unavailable("down".into()).is_concurrency_conflict());
    }
}

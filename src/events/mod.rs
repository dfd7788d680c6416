//! Versioned event log types.
//!
//! Immutable values describing event identity, ordering and causality.
//! Everything here is plain data; no module in this crate mutates a
//! committed event after the store has returned it.

mod committed;
mod event;
mod ids;
mod uncommitted;

pub use committed::{CommittedAggregateEvent, CommittedAggregateEvents, CommittedEvent};
pub use event::{decode, encode, DomainEvent, Event};
pub use ids::{
    AggregateRootVersion, Artifact, ArtifactId, CorrelationId, EventLogSequenceNumber,
    EventProcessorId, EventSourceId, ExecutionContext, FilterId, HandlerId, MicroserviceId,
    PartitionId, ScopeId, StreamId, TenantId,
};
pub use uncommitted::{UncommittedAggregateEvents, UncommittedEvent};

/// Errors constructing or decoding event log values.
#[derive(Debug, thiserror::Error)]
pub enum EventsError {
    #[error("Event was applied to event source {actual}, expected {expected}")]
    EventAppliedToOtherEventSource {
        expected: EventSourceId,
        actual: EventSourceId,
    },

    #[error("Aggregate root version out of order: expected {expected}, got {actual}")]
    AggregateRootVersionOutOfOrder {
        expected: AggregateRootVersion,
        actual: AggregateRootVersion,
    },

    #[error("No event type is registered for artifact {0}")]
    UnknownArtifact(Artifact),

    #[error("Event content error: {0}")]
    Content(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EventsError>;

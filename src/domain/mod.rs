//! Aggregate replay engine.
//!
//! Aggregates are rebuilt from their committed history, accumulate new
//! events in memory and are tracked by the command context that loaded
//! them until it commits or rolls back.

mod aggregate;
mod aggregate_of;
mod broken_rules;
mod repository;
pub(crate) mod tracked;

pub use aggregate::{AggregateRoot, AggregateRootState};
pub(crate) use aggregate::create_checked;
pub use aggregate_of::AggregateOf;
pub use broken_rules::{BrokenRule, BrokenRuleResult};
pub use repository::AggregateRootRepository;

use crate::events::{AggregateRootVersion, Artifact, EventSourceId, EventsError};
use crate::interfaces::StorageError;

/// Errors loading or tracking aggregates.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// The stream holds events written by a different aggregate root type.
    /// Retrying will not change the stored data.
    #[error("Event {event} was applied by aggregate root {applied_by}, not {aggregate_root}")]
    EventAppliedByOtherAggregateRoot {
        aggregate_root: Artifact,
        applied_by: Artifact,
        event: Artifact,
    },

    #[error("Event was applied to event source {actual}, expected {expected}")]
    EventAppliedToOtherEventSource {
        expected: EventSourceId,
        actual: EventSourceId,
    },

    #[error("Committed events start at version {actual}, aggregate is at {expected}")]
    AggregateRootVersionOutOfOrder {
        expected: AggregateRootVersion,
        actual: AggregateRootVersion,
    },

    /// The aggregate's factory did not keep the requested id.
    #[error("Factory for {aggregate_root} created {created} when asked for {requested}")]
    InvalidFactory {
        aggregate_root: Artifact,
        requested: EventSourceId,
        created: EventSourceId,
    },

    #[error("Aggregate {event_source} is already tracked as a different type with artifact {aggregate_root}")]
    ArtifactCollision {
        aggregate_root: Artifact,
        event_source: EventSourceId,
    },

    #[error("Event error: {0}")]
    Events(#[from] EventsError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, DomainError>;

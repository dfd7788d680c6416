//! Events already persisted by the event store.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{
    AggregateRootVersion, Artifact, EventLogSequenceNumber, EventSourceId, EventsError,
    ExecutionContext, Result,
};

/// A persisted event as seen by event handlers and filters.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedEvent {
    pub event_log_sequence_number: EventLogSequenceNumber,
    pub occurred: DateTime<Utc>,
    pub event_source: EventSourceId,
    pub execution_context: ExecutionContext,
    pub artifact: Artifact,
    pub content: Value,
    pub public: bool,
}

/// A persisted event that was applied by an aggregate root.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedAggregateEvent {
    pub event_log_sequence_number: EventLogSequenceNumber,
    pub occurred: DateTime<Utc>,
    pub event_source: EventSourceId,
    pub aggregate_root: Artifact,
    /// Version of the aggregate when this event was applied.
    pub aggregate_root_version: AggregateRootVersion,
    pub execution_context: ExecutionContext,
    pub artifact: Artifact,
    pub content: Value,
    pub public: bool,
}

impl From<CommittedAggregateEvent> for CommittedEvent {
    fn from(event: CommittedAggregateEvent) -> Self {
        Self {
            event_log_sequence_number: event.event_log_sequence_number,
            occurred: event.occurred,
            event_source: event.event_source,
            execution_context: event.execution_context,
            artifact: event.artifact,
            content: event.content,
            public: event.public,
        }
    }
}

/// The ordered history of one event source as applied by one aggregate root type.
///
/// Events belong to the stream's event source and carry consecutive versions.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedAggregateEvents {
    event_source: EventSourceId,
    aggregate_root: Artifact,
    events: Vec<CommittedAggregateEvent>,
}

impl CommittedAggregateEvents {
    pub fn new(
        event_source: EventSourceId,
        aggregate_root: Artifact,
        events: Vec<CommittedAggregateEvent>,
    ) -> Result<Self> {
        let mut previous: Option<AggregateRootVersion> = None;
        for event in &events {
            if event.event_source != event_source {
                return Err(EventsError::EventAppliedToOtherEventSource {
                    expected: event_source,
                    actual: event.event_source,
                });
            }
            if let Some(previous) = previous {
                let expected = previous.checked_next().ok_or(
                    EventsError::AggregateRootVersionOutOfOrder {
                        expected: previous,
                        actual: event.aggregate_root_version,
                    },
                )?;
                if event.aggregate_root_version != expected {
                    return Err(EventsError::AggregateRootVersionOutOfOrder {
                        expected,
                        actual: event.aggregate_root_version,
                    });
                }
            }
            previous = Some(event.aggregate_root_version);
        }
        Ok(Self {
            event_source,
            aggregate_root,
            events,
        })
    }

    /// A stream with no history.
    pub fn empty(event_source: EventSourceId, aggregate_root: Artifact) -> Self {
        Self {
            event_source,
            aggregate_root,
            events: Vec::new(),
        }
    }

    pub fn event_source(&self) -> EventSourceId {
        self.event_source
    }

    pub fn aggregate_root(&self) -> Artifact {
        self.aggregate_root
    }

    pub fn events(&self) -> &[CommittedAggregateEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Version the aggregate reaches after every event has been applied.
    pub fn aggregate_root_version(&self) -> Option<AggregateRootVersion> {
        self.events
            .last()
            .map(|event| event.aggregate_root_version.next())
    }

    pub fn into_events(self) -> Vec<CommittedAggregateEvent> {
        self.events
    }
}

impl<'a> IntoIterator for &'a CommittedAggregateEvents {
    type Item = &'a CommittedAggregateEvent;
    type IntoIter = std::slice::Iter<'a, CommittedAggregateEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

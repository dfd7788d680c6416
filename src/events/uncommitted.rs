//! Events applied in memory and not yet durable.

use serde_json::Value;

use super::{AggregateRootVersion, Artifact, EventSourceId};

#[derive(Debug, Clone, PartialEq)]
pub struct UncommittedEvent {
    pub artifact: Artifact,
    pub content: Value,
    pub public: bool,
}

/// Pending events of one aggregate, to be appended at `expected_aggregate_root_version`.
#[derive(Debug, Clone, PartialEq)]
pub struct UncommittedAggregateEvents {
    pub event_source: EventSourceId,
    pub aggregate_root: Artifact,
    pub expected_aggregate_root_version: AggregateRootVersion,
    pub events: Vec<UncommittedEvent>,
}

impl UncommittedAggregateEvents {
    pub fn new(
        event_source: EventSourceId,
        aggregate_root: Artifact,
        expected_aggregate_root_version: AggregateRootVersion,
    ) -> Self {
        Self {
            event_source,
            aggregate_root,
            expected_aggregate_root_version,
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event: UncommittedEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

//! Test fixtures shared by unit tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AggregateRoot, AggregateRootState};
use crate::events::{
    AggregateRootVersion, Artifact, DomainEvent, EventSourceId, EventsError, ExecutionContext,
    MicroserviceId, TenantId, UncommittedAggregateEvents, UncommittedEvent,
};

pub const COUNTER: Artifact = Artifact::from_u128(0xc0);
pub const INCREMENTED: Artifact = Artifact::from_u128(0xc1);
pub const RESET: Artifact = Artifact::from_u128(0xc2);
pub const AUDIT: Artifact = Artifact::from_u128(0xa0);
pub const AUDITED: Artifact = Artifact::from_u128(0xa1);

pub fn execution_context() -> ExecutionContext {
    ExecutionContext::new(MicroserviceId::new(), TenantId::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CounterEvent {
    Incremented { by: u32 },
    Reset,
}

impl DomainEvent for CounterEvent {
    fn artifact(&self) -> Artifact {
        match self {
            CounterEvent::Incremented { .. } => INCREMENTED,
            CounterEvent::Reset => RESET,
        }
    }

    fn to_content(&self) -> crate::events::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_content(artifact: Artifact, content: &Value) -> crate::events::Result<Self> {
        if artifact != INCREMENTED && artifact != RESET {
            return Err(EventsError::UnknownArtifact(artifact));
        }
        Ok(serde_json::from_value(content.clone())?)
    }
}

/// Stateful aggregate folding increments into a running total.
#[derive(Debug)]
pub struct Counter {
    root: AggregateRootState<CounterEvent>,
    pub total: u32,
}

impl Counter {
    pub fn increment(&mut self, by: u32) {
        self.apply(CounterEvent::Incremented { by });
    }
}

impl AggregateRoot for Counter {
    type Event = CounterEvent;

    fn artifact() -> Artifact {
        COUNTER
    }

    fn create(event_source: EventSourceId) -> Self {
        Self {
            root: AggregateRootState::new(event_source),
            total: 0,
        }
    }

    fn state(&self) -> &AggregateRootState<CounterEvent> {
        &self.root
    }

    fn state_mut(&mut self) -> &mut AggregateRootState<CounterEvent> {
        &mut self.root
    }

    fn on(&mut self, event: &CounterEvent) {
        match event {
            CounterEvent::Incremented { by } => self.total += by,
            CounterEvent::Reset => self.total = 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audited {
    pub note: String,
}

impl DomainEvent for Audited {
    fn artifact(&self) -> Artifact {
        AUDITED
    }

    fn to_content(&self) -> crate::events::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_content(_artifact: Artifact, content: &Value) -> crate::events::Result<Self> {
        Ok(serde_json::from_value(content.clone())?)
    }
}

/// Aggregate that never derives state from history.
#[derive(Debug)]
pub struct Audit {
    root: AggregateRootState<Audited>,
}

impl AggregateRoot for Audit {
    type Event = Audited;
    const STATELESS: bool = true;

    fn artifact() -> Artifact {
        AUDIT
    }

    fn create(event_source: EventSourceId) -> Self {
        Self {
            root: AggregateRootState::new(event_source),
        }
    }

    fn state(&self) -> &AggregateRootState<Audited> {
        &self.root
    }

    fn state_mut(&mut self) -> &mut AggregateRootState<Audited> {
        &mut self.root
    }
}

/// `count` increments by one, expected at `expected`, as `aggregate_root` wrote them.
pub fn increments(
    event_source: EventSourceId,
    aggregate_root: Artifact,
    expected: u64,
    count: usize,
) -> UncommittedAggregateEvents {
    let mut events = UncommittedAggregateEvents::new(
        event_source,
        aggregate_root,
        AggregateRootVersion::new(expected),
    );
    for _ in 0..count {
        events.push(UncommittedEvent {
            artifact: INCREMENTED,
            content: serde_json::json!({ "Incremented": { "by": 1 } }),
            public: false,
        });
    }
    events
}

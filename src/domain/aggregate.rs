//! Aggregate root capability trait and its embedded state.

use crate::events::{
    AggregateRootVersion, Artifact, CommittedAggregateEvents, DomainEvent, EventSourceId,
    UncommittedAggregateEvents, UncommittedEvent,
};

use super::{BrokenRule, DomainError, Result};

/// Identity, version and pending work of one aggregate instance.
#[derive(Debug)]
pub struct AggregateRootState<E> {
    event_source: EventSourceId,
    version: AggregateRootVersion,
    uncommitted: Vec<E>,
    broken_rules: Vec<BrokenRule>,
}

impl<E: DomainEvent> AggregateRootState<E> {
    pub fn new(event_source: EventSourceId) -> Self {
        Self {
            event_source,
            version: AggregateRootVersion::INITIAL,
            uncommitted: Vec::new(),
            broken_rules: Vec::new(),
        }
    }

    pub fn event_source(&self) -> EventSourceId {
        self.event_source
    }

    pub fn version(&self) -> AggregateRootVersion {
        self.version
    }

    pub fn uncommitted_events(&self) -> &[E] {
        &self.uncommitted
    }

    pub fn broken_rules(&self) -> &[BrokenRule] {
        &self.broken_rules
    }

    /// Version the store must hold for the pending events to be appended.
    pub fn expected_version(&self) -> AggregateRootVersion {
        AggregateRootVersion::new(self.version.value() - self.uncommitted.len() as u64)
    }

    pub(crate) fn record(&mut self, event: E) {
        self.uncommitted.push(event);
        self.version = self.version.next();
    }

    pub(crate) fn break_rule(&mut self, rule: BrokenRule) {
        self.broken_rules.push(rule);
    }

    /// Skip replay of a stateless aggregate.
    pub(crate) fn fast_forward(&mut self, version: AggregateRootVersion) {
        self.version = version;
    }

    /// Pending events in wire form.
    pub(crate) fn to_uncommitted(
        &self,
        aggregate_root: Artifact,
    ) -> Result<UncommittedAggregateEvents> {
        let mut events =
            UncommittedAggregateEvents::new(self.event_source, aggregate_root, self.expected_version());
        for event in &self.uncommitted {
            events.push(UncommittedEvent {
                artifact: event.artifact(),
                content: event.to_content()?,
                public: event.is_public(),
            });
        }
        Ok(events)
    }

    /// Drop pending events after the store acknowledged them.
    pub(crate) fn mark_committed(&mut self) {
        self.uncommitted.clear();
    }
}

/// An aggregate root: derives state from its events and produces new ones.
///
/// Implementors embed an `AggregateRootState` and expose it through
/// `state`/`state_mut`. `create` is the only way the replay engine
/// constructs instances.
pub trait AggregateRoot: Send + Sync + Sized + 'static {
    type Event: DomainEvent;

    /// Aggregates whose state does not depend on history skip replay and
    /// are only fast-forwarded to the stored version.
    const STATELESS: bool = false;

    fn artifact() -> Artifact;

    fn create(event_source: EventSourceId) -> Self;

    fn state(&self) -> &AggregateRootState<Self::Event>;

    fn state_mut(&mut self) -> &mut AggregateRootState<Self::Event>;

    /// Fold one event into the aggregate's state.
    fn on(&mut self, _event: &Self::Event) {}

    /// Apply a new event: fold it and keep it for commit.
    fn apply(&mut self, event: Self::Event) {
        self.on(&event);
        self.state_mut().record(event);
    }

    fn fail(&mut self, rule: BrokenRule) {
        self.state_mut().break_rule(rule);
    }

    fn event_source_id(&self) -> EventSourceId {
        self.state().event_source()
    }

    fn version(&self) -> AggregateRootVersion {
        self.state().version()
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        self.state().uncommitted_events()
    }

    fn broken_rules(&self) -> &[BrokenRule] {
        self.state().broken_rules()
    }
}

/// Build `T` for `event_source` through its factory.
///
/// A factory that does not keep the requested id is a configuration error.
pub(crate) fn create_checked<T: AggregateRoot>(event_source: EventSourceId) -> Result<T> {
    let aggregate = T::create(event_source);
    if aggregate.event_source_id() != event_source {
        return Err(DomainError::InvalidFactory {
            aggregate_root: T::artifact(),
            requested: event_source,
            created: aggregate.event_source_id(),
        });
    }
    Ok(aggregate)
}

/// Fold a committed stream into `aggregate`.
///
/// The whole stream is validated and decoded before the first event is
/// applied, so on error the aggregate is left exactly as it was.
pub(crate) fn re_apply<T: AggregateRoot>(
    aggregate: &mut T,
    stream: &CommittedAggregateEvents,
) -> Result<()> {
    let aggregate_root = T::artifact();
    let event_source = aggregate.event_source_id();
    if stream.event_source() != event_source {
        return Err(DomainError::EventAppliedToOtherEventSource {
            expected: event_source,
            actual: stream.event_source(),
        });
    }

    let mut decoded = Vec::with_capacity(stream.len());
    let mut expected_version = aggregate.version();
    for event in stream {
        if event.aggregate_root.id != aggregate_root.id {
            return Err(DomainError::EventAppliedByOtherAggregateRoot {
                aggregate_root,
                applied_by: event.aggregate_root,
                event: event.artifact,
            });
        }
        if event.aggregate_root_version != expected_version {
            return Err(DomainError::AggregateRootVersionOutOfOrder {
                expected: expected_version,
                actual: event.aggregate_root_version,
            });
        }
        decoded.push(T::Event::from_content(event.artifact, &event.content)?);
        expected_version = expected_version.checked_next().ok_or(
            DomainError::AggregateRootVersionOutOfOrder {
                expected: expected_version,
                actual: event.aggregate_root_version,
            },
        )?;
    }

    for event in &decoded {
        aggregate.on(event);
    }
    aggregate.state_mut().fast_forward(expected_version);
    Ok(())
}

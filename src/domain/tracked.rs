//! Type-erased view of aggregates owned by a command context.

use std::any::Any;

use crate::events::{Artifact, DomainEvent as _, EventSourceId, UncommittedAggregateEvents};

use super::{AggregateRoot, BrokenRuleResult, Result};

pub(crate) trait TrackedAggregate: Send + Sync {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn aggregate_root(&self) -> Artifact;

    fn event_source(&self) -> EventSourceId;

    fn has_pending(&self) -> bool;

    fn pending_event_types(&self) -> Vec<Artifact>;

    fn pending(&self) -> Result<UncommittedAggregateEvents>;

    fn mark_committed(&mut self);

    fn broken_rule_results(&self) -> Vec<BrokenRuleResult>;
}

impl<T: AggregateRoot> TrackedAggregate for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn aggregate_root(&self) -> Artifact {
        T::artifact()
    }

    fn event_source(&self) -> EventSourceId {
        self.event_source_id()
    }

    fn has_pending(&self) -> bool {
        !self.uncommitted_events().is_empty()
    }

    fn pending_event_types(&self) -> Vec<Artifact> {
        self.uncommitted_events()
            .iter()
            .map(|event| event.artifact())
            .collect()
    }

    fn pending(&self) -> Result<UncommittedAggregateEvents> {
        self.state().to_uncommitted(T::artifact())
    }

    fn mark_committed(&mut self) {
        self.state_mut().mark_committed();
    }

    fn broken_rule_results(&self) -> Vec<BrokenRuleResult> {
        let aggregate_type = short_type_name::<T>();
        let event_source = self.event_source_id().to_string();
        self.broken_rules()
            .iter()
            .map(|rule| BrokenRuleResult::new(rule, aggregate_type, &event_source))
            .collect()
    }
}

/// Last path segment of `T`'s name, without generic arguments.
pub(super) fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    let path = name.split('<').next().unwrap_or(name);
    path.rsplit("::").next().unwrap_or(path)
}

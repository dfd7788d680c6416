//! The transaction scope of one command execution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::domain::tracked::TrackedAggregate;
use crate::domain::{
    create_checked, AggregateOf, AggregateRoot, AggregateRootRepository, BrokenRuleResult,
    DomainError,
};
use crate::events::{
    ArtifactId, CommittedAggregateEvents, CorrelationId, EventSourceId, ExecutionContext,
};
use crate::interfaces::EventStore;
use crate::processing::{EventProcessingCompletion, WaitOutcome};

use super::CommandError;

type TrackingKey = (ArtifactId, EventSourceId);

/// What a commit wrote and whether local handlers caught up.
#[derive(Debug, Default)]
pub struct CommitReport {
    pub committed: Vec<CommittedAggregateEvents>,
    /// `None` when nothing was committed or no completion table is attached.
    pub handlers: Option<WaitOutcome>,
}

/// Owns every aggregate loaded while handling one command.
///
/// Aggregates are kept in the order they were first requested and are
/// committed in that order. Each aggregate commits independently; a failed
/// commit does not retract those before it.
pub struct CommandContext {
    execution_context: ExecutionContext,
    store: Arc<dyn EventStore>,
    repository: AggregateRootRepository,
    completion: Option<EventProcessingCompletion>,
    handler_wait_timeout: Duration,
    tracked: Vec<Box<dyn TrackedAggregate>>,
    index: HashMap<TrackingKey, usize>,
}

impl CommandContext {
    pub const DEFAULT_HANDLER_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(execution_context: ExecutionContext, store: Arc<dyn EventStore>) -> Self {
        Self {
            execution_context,
            repository: AggregateRootRepository::new(store.clone()),
            store,
            completion: None,
            handler_wait_timeout: Self::DEFAULT_HANDLER_WAIT_TIMEOUT,
            tracked: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Wait for local event handlers after committing, for at most `timeout`.
    pub fn with_completion(
        mut self,
        completion: EventProcessingCompletion,
        timeout: Duration,
    ) -> Self {
        self.completion = Some(completion);
        self.handler_wait_timeout = timeout;
        self
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.execution_context.correlation_id
    }

    pub fn execution_context(&self) -> &ExecutionContext {
        &self.execution_context
    }

    pub fn aggregate_of<T: AggregateRoot>(&mut self) -> AggregateOf<'_, T> {
        AggregateOf::new(self)
    }

    pub fn is_tracking<T: AggregateRoot>(&self, event_source: EventSourceId) -> bool {
        self.index.contains_key(&(T::artifact().id, event_source))
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub(crate) fn track_new<T: AggregateRoot>(
        &mut self,
        event_source: EventSourceId,
    ) -> crate::domain::Result<&mut T> {
        let key = (T::artifact().id, event_source);
        if !self.index.contains_key(&key) {
            let aggregate = create_checked::<T>(event_source)?;
            self.insert(key, Box::new(aggregate));
        }
        self.tracked_mut::<T>(key)
    }

    pub(crate) async fn track<T: AggregateRoot>(
        &mut self,
        event_source: EventSourceId,
    ) -> crate::domain::Result<&mut T> {
        let key = (T::artifact().id, event_source);
        if !self.index.contains_key(&key) {
            let aggregate = self.repository.get::<T>(event_source).await?;
            self.insert(key, Box::new(aggregate));
        }
        self.tracked_mut::<T>(key)
    }

    fn insert(&mut self, key: TrackingKey, aggregate: Box<dyn TrackedAggregate>) {
        debug!(event_source = %key.1, "Tracking aggregate");
        self.index.insert(key, self.tracked.len());
        self.tracked.push(aggregate);
    }

    fn tracked_mut<T: AggregateRoot>(
        &mut self,
        key: TrackingKey,
    ) -> crate::domain::Result<&mut T> {
        let position = self.index.get(&key).copied();
        position
            .and_then(|position| self.tracked.get_mut(position))
            .and_then(|aggregate| aggregate.as_any_mut().downcast_mut::<T>())
            .ok_or_else(|| DomainError::ArtifactCollision {
                aggregate_root: T::artifact(),
                event_source: key.1,
            })
    }

    /// Broken rules recorded on every tracked aggregate.
    pub fn broken_rules(&self) -> Vec<BrokenRuleResult> {
        self.tracked
            .iter()
            .flat_map(|aggregate| aggregate.broken_rule_results())
            .collect()
    }

    /// Commit the pending events of every tracked aggregate.
    ///
    /// Aggregates without pending events cause no store call. After all
    /// commits succeed, waits for local handlers of the committed event types.
    #[tracing::instrument(name = "command.commit", skip_all, fields(correlation_id = %self.execution_context.correlation_id))]
    pub async fn commit(&mut self) -> Result<CommitReport, CommandError> {
        let event_types: Vec<ArtifactId> = self
            .tracked
            .iter()
            .flat_map(|aggregate| aggregate.pending_event_types())
            .map(|artifact| artifact.id)
            .collect();
        if event_types.is_empty() {
            debug!("No pending events to commit");
            return Ok(CommitReport::default());
        }

        let waiter = self.completion.as_ref().map(|completion| {
            completion.register_waiter(self.execution_context.correlation_id, event_types)
        });

        let mut committed = Vec::new();
        for aggregate in self.tracked.iter_mut() {
            if !aggregate.has_pending() {
                continue;
            }
            let pending = aggregate.pending()?;
            let event_source = pending.event_source;
            let expected = pending.expected_aggregate_root_version;
            let events = self
                .store
                .commit_for_aggregate(&self.execution_context, pending)
                .await
                .map_err(|source| CommandError::Commit {
                    event_source,
                    source,
                })?;
            aggregate.mark_committed();
            info!(
                %event_source,
                aggregate_root = %aggregate.aggregate_root(),
                %expected,
                count = events.len(),
                "Committed events"
            );
            committed.push(events);
        }

        let handlers = match waiter {
            Some(waiter) => Some(waiter.wait(self.handler_wait_timeout).await),
            None => None,
        };
        Ok(CommitReport {
            committed,
            handlers,
        })
    }

    /// Abandon every tracked aggregate and its pending events.
    pub fn rollback(self) {
        debug!(
            correlation_id = %self.execution_context.correlation_id,
            tracked = self.tracked.len(),
            "Rolling back command context"
        );
    }
}

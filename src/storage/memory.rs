//! In-memory EventStore implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::events::{
    AggregateRootVersion, Artifact, ArtifactId, CommittedAggregateEvent,
    CommittedAggregateEvents, EventLogSequenceNumber, EventSourceId, ExecutionContext,
    UncommittedAggregateEvents,
};
use crate::interfaces::{EventStore, Result, StorageError};

type StreamKey = (EventSourceId, ArtifactId);

/// Event store that keeps every aggregate stream in memory.
///
/// Commits are serialised by a single write lock, so the version check and
/// the append happen atomically.
#[derive(Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<CommittedAggregateEvent>>>,
    next_sequence_number: AtomicU64,
    commit_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    fail_on_commit: RwLock<bool>,
    fail_on_fetch: RwLock<bool>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_commit(&self, fail: bool) {
        *self.fail_on_commit.write().await = fail;
    }

    pub async fn set_fail_on_fetch(&self, fail: bool) {
        *self.fail_on_fetch.write().await = fail;
    }

    /// Number of commit requests received, including rejected ones.
    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Append events as if committed by `aggregate_root`, bypassing the version check.
    ///
    /// Seeds history for tests, including histories that a correct aggregate
    /// would never produce.
    pub async fn seed(
        &self,
        execution_context: &ExecutionContext,
        stream_owner: Artifact,
        events: UncommittedAggregateEvents,
    ) {
        let key = (events.event_source, stream_owner.id);
        let mut streams = self.streams.write().await;
        let stream = streams.entry(key).or_default();
        let start = AggregateRootVersion::new(stream.len() as u64);
        let committed = self.to_committed(execution_context, start, &events);
        stream.extend(committed);
    }

    fn to_committed(
        &self,
        execution_context: &ExecutionContext,
        start: AggregateRootVersion,
        events: &UncommittedAggregateEvents,
    ) -> Vec<CommittedAggregateEvent> {
        let occurred = Utc::now();
        events
            .events
            .iter()
            .enumerate()
            .map(|(offset, event)| CommittedAggregateEvent {
                event_log_sequence_number: EventLogSequenceNumber::new(
                    self.next_sequence_number.fetch_add(1, Ordering::SeqCst),
                ),
                occurred,
                event_source: events.event_source,
                aggregate_root: events.aggregate_root,
                aggregate_root_version: start.advanced_by(offset),
                execution_context: *execution_context,
                artifact: event.artifact,
                content: event.content.clone(),
                public: event.public,
            })
            .collect()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn fetch_for_aggregate(
        &self,
        event_source: EventSourceId,
        aggregate_root: Artifact,
    ) -> Result<CommittedAggregateEvents> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_on_fetch.read().await {
            return Err(StorageError::Unavailable("fetch disabled".to_string()));
        }
        let streams = self.streams.read().await;
        let events = streams
            .get(&(event_source, aggregate_root.id))
            .cloned()
            .unwrap_or_default();
        Ok(CommittedAggregateEvents::new(
            event_source,
            aggregate_root,
            events,
        )?)
    }

    async fn version_for(
        &self,
        event_source: EventSourceId,
        aggregate_root: Artifact,
    ) -> Result<AggregateRootVersion> {
        let streams = self.streams.read().await;
        let length = streams
            .get(&(event_source, aggregate_root.id))
            .map_or(0, Vec::len);
        Ok(AggregateRootVersion::new(length as u64))
    }

    async fn commit_for_aggregate(
        &self,
        execution_context: &ExecutionContext,
        events: UncommittedAggregateEvents,
    ) -> Result<CommittedAggregateEvents> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_on_commit.read().await {
            return Err(StorageError::Unavailable("commit disabled".to_string()));
        }

        let key = (events.event_source, events.aggregate_root.id);
        let mut streams = self.streams.write().await;
        let stream = streams.entry(key).or_default();
        let stored = AggregateRootVersion::new(stream.len() as u64);
        if stored != events.expected_aggregate_root_version {
            return Err(StorageError::ConcurrencyConflict {
                event_source: events.event_source,
                expected: events.expected_aggregate_root_version,
                actual: stored,
            });
        }

        let committed = self.to_committed(execution_context, stored, &events);
        stream.extend(committed.iter().cloned());
        debug!(
            event_source = %events.event_source,
            count = committed.len(),
            version = %stored.advanced_by(committed.len()),
            "Committed aggregate events"
        );
        Ok(CommittedAggregateEvents::new(
            events.event_source,
            events.aggregate_root,
            committed,
        )?)
    }
}

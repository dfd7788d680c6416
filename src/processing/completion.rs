//! Tracks which event handlers have processed the events of a command.
//!
//! A commit registers a waiter for the event types it is about to produce
//! and then blocks, bounded by a timeout, until every handler registered
//! for those types reports completion for the command's correlation id.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::events::{ArtifactId, CorrelationId, HandlerId};

/// How a wait for handler completion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Completed,
    TimedOut { outstanding: usize },
}

struct Waiter {
    correlation_id: CorrelationId,
    outstanding: HashSet<(HandlerId, ArtifactId)>,
    done: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct Table {
    handlers: HashMap<ArtifactId, HashSet<HandlerId>>,
    waiters: HashMap<u64, Waiter>,
    next_waiter: u64,
}

/// Shared completion table, safe to use from many handler tasks at once.
#[derive(Clone, Default)]
pub struct EventProcessingCompletion {
    table: Arc<Mutex<Table>>,
}

impl EventProcessingCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `handler_id` processes events of the given types.
    pub fn register_handler(
        &self,
        handler_id: HandlerId,
        event_types: impl IntoIterator<Item = ArtifactId>,
    ) {
        let mut table = self.table.lock();
        for event_type in event_types {
            table
                .handlers
                .entry(event_type)
                .or_default()
                .insert(handler_id);
        }
    }

    pub fn unregister_handler(&self, handler_id: HandlerId) {
        let mut table = self.table.lock();
        for handlers in table.handlers.values_mut() {
            handlers.remove(&handler_id);
        }
        table.handlers.retain(|_, handlers| !handlers.is_empty());
    }

    /// Start waiting for every handler of `event_types` to complete `correlation_id`.
    ///
    /// Register before committing so that no completion can be missed.
    pub fn register_waiter(
        &self,
        correlation_id: CorrelationId,
        event_types: impl IntoIterator<Item = ArtifactId>,
    ) -> CompletionWaiter {
        let (done, receiver) = oneshot::channel();
        let mut table = self.table.lock();
        let outstanding: HashSet<(HandlerId, ArtifactId)> = event_types
            .into_iter()
            .flat_map(|event_type| {
                table
                    .handlers
                    .get(&event_type)
                    .into_iter()
                    .flatten()
                    .map(move |handler| (*handler, event_type))
            })
            .collect();

        if outstanding.is_empty() {
            let _ = done.send(());
            return CompletionWaiter {
                id: None,
                receiver,
                table: self.table.clone(),
            };
        }

        let id = table.next_waiter;
        table.next_waiter += 1;
        debug!(
            %correlation_id,
            outstanding = outstanding.len(),
            "Waiting for event handlers"
        );
        table.waiters.insert(
            id,
            Waiter {
                correlation_id,
                outstanding,
                done: Some(done),
            },
        );
        CompletionWaiter {
            id: Some(id),
            receiver,
            table: self.table.clone(),
        }
    }

    /// A handler finished processing an event of `event_type` for `correlation_id`.
    pub fn notify_completed(
        &self,
        correlation_id: CorrelationId,
        handler_id: HandlerId,
        event_type: ArtifactId,
    ) {
        let mut table = self.table.lock();
        let mut finished = Vec::new();
        for (id, waiter) in table.waiters.iter_mut() {
            if waiter.correlation_id != correlation_id {
                continue;
            }
            waiter.outstanding.remove(&(handler_id, event_type));
            if waiter.outstanding.is_empty() {
                if let Some(done) = waiter.done.take() {
                    let _ = done.send(());
                }
                finished.push(*id);
            }
        }
        for id in finished {
            table.waiters.remove(&id);
        }
    }

    /// Number of waiters still outstanding.
    pub fn pending_waiters(&self) -> usize {
        self.table.lock().waiters.len()
    }
}

/// Handle returned by `register_waiter`. Dropping it abandons the wait.
pub struct CompletionWaiter {
    id: Option<u64>,
    receiver: oneshot::Receiver<()>,
    table: Arc<Mutex<Table>>,
}

impl CompletionWaiter {
    pub async fn wait(mut self, timeout: Duration) -> WaitOutcome {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(_) => WaitOutcome::Completed,
            Err(_) => {
                let outstanding = self
                    .id
                    .and_then(|id| {
                        self.table
                            .lock()
                            .waiters
                            .get(&id)
                            .map(|waiter| waiter.outstanding.len())
                    })
                    .unwrap_or(0);
                warn!(outstanding, ?timeout, "Timed out waiting for event handlers");
                WaitOutcome::TimedOut { outstanding }
            }
        }
    }
}

impl Drop for CompletionWaiter {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.table.lock().waiters.remove(&id);
        }
    }
}

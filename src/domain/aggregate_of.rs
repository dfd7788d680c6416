use std::marker::PhantomData;

use crate::commands::CommandContext;
use crate::events::EventSourceId;

use super::{AggregateRoot, Result};

/// Access to aggregates of type `T` within one command context.
///
/// Every aggregate handed out is tracked by the context and committed
/// with it. Asking again for a tracked id returns the tracked instance.
pub struct AggregateOf<'ctx, T> {
    context: &'ctx mut CommandContext,
    _aggregate: PhantomData<fn() -> T>,
}

impl<'ctx, T: AggregateRoot> AggregateOf<'ctx, T> {
    pub(crate) fn new(context: &'ctx mut CommandContext) -> Self {
        Self {
            context,
            _aggregate: PhantomData,
        }
    }

    /// A new aggregate under a freshly generated id. No history is fetched.
    pub fn create(self) -> Result<&'ctx mut T> {
        self.context.track_new::<T>(EventSourceId::new())
    }

    /// The aggregate for `event_source`, replayed from any existing history.
    pub async fn create_with(self, event_source: EventSourceId) -> Result<&'ctx mut T> {
        self.get(event_source).await
    }

    pub async fn rehydrate(self, event_source: EventSourceId) -> Result<&'ctx mut T> {
        self.get(event_source).await
    }

    pub async fn get(self, event_source: EventSourceId) -> Result<&'ctx mut T> {
        self.context.track::<T>(event_source).await
    }
}

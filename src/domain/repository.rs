//! Loading aggregates from the event store.

use std::sync::Arc;

use tracing::debug;

use crate::events::EventSourceId;
use crate::interfaces::EventStore;

use super::aggregate::{create_checked, re_apply};
use super::{AggregateRoot, Result};

/// Builds aggregate instances from their stored history.
#[derive(Clone)]
pub struct AggregateRootRepository {
    store: Arc<dyn EventStore>,
}

impl AggregateRootRepository {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Construct `T` for `event_source` and bring it up to the stored version.
    pub async fn get<T: AggregateRoot>(&self, event_source: EventSourceId) -> Result<T> {
        let mut aggregate = create_checked::<T>(event_source)?;

        if T::STATELESS {
            let version = self.store.version_for(event_source, T::artifact()).await?;
            debug!(%event_source, %version, "Fast-forwarding stateless aggregate");
            aggregate.state_mut().fast_forward(version);
            return Ok(aggregate);
        }

        let stream = self
            .store
            .fetch_for_aggregate(event_source, T::artifact())
            .await?;
        if !stream.is_empty() {
            re_apply(&mut aggregate, &stream)?;
        }
        debug!(
            %event_source,
            version = %aggregate.version(),
            replayed = stream.len(),
            "Rehydrated aggregate"
        );
        Ok(aggregate)
    }
}

//! Event handler and filter processors.
//!
//! Each registered handler or filter runs its own reverse-call loop as an
//! independent task. Handled events are reported to the shared
//! `EventProcessingCompletion` table that command commits wait on.

mod completion;
mod filters;
mod handlers;
pub mod processor;
mod protocols;

pub use completion::{CompletionWaiter, EventProcessingCompletion, WaitOutcome};
pub use filters::{
    FilterProcessor, PartitionedFilter, PartitionedFilterResult, PublicFilterProcessor,
};
pub use handlers::{EventContext, EventHandler, EventHandlerBuilder, EventHandlerProcessor};
pub use protocols::{
    EventHandlerProtocol, EventHandlerRegistration, FilterProtocol, FilterRegistration,
    PublicFilterProtocol, PublicFilterRegistration,
};

use crate::events::{Artifact, EventProcessorId};
use crate::reverse_call::ReverseCallError;

/// Error returned by user handler and filter code.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Processor setup errors. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("Event processor id {0} is reserved")]
    IllegalProcessorId(EventProcessorId),

    #[error("Event handler {0} has no handle methods")]
    NoEventTypes(EventProcessorId),

    #[error("Event handler {processor} has more than one handle method for {event_type}")]
    DuplicateHandlerFor {
        processor: EventProcessorId,
        event_type: Artifact,
    },

    #[error("Gave up reconnecting: {0}")]
    ReconnectExhausted(#[source] ReverseCallError),
}

/// The reason reported to the runtime for a failed event.
pub(crate) fn failure_reason(error: &(dyn std::error::Error + 'static)) -> String {
    let mut trace = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    format!("Failure Message: {error}\nStack Trace: {}", trace.join("\n"))
}

#[cfg(test)]
mod tests;

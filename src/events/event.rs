//! Mapping between Rust event types and event artifacts.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{Artifact, EventsError, Result};

/// A single event type, identified by one artifact.
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn artifact() -> Artifact;

    /// Whether committed instances are published outside the producing microservice.
    fn is_public() -> bool {
        false
    }
}

/// The set of events one aggregate root applies, usually an enum.
pub trait DomainEvent: Sized + Send + Sync + 'static {
    fn artifact(&self) -> Artifact;

    fn to_content(&self) -> Result<Value>;

    fn from_content(artifact: Artifact, content: &Value) -> Result<Self>;

    fn is_public(&self) -> bool {
        false
    }
}

/// Decode `content` as `E`, checking the artifact first.
pub fn decode<E: Event>(artifact: Artifact, content: &Value) -> Result<E> {
    if artifact.id != E::artifact().id {
        return Err(EventsError::UnknownArtifact(artifact));
    }
    serde_json::from_value(content.clone()).map_err(EventsError::from)
}

/// Serialize `event` into event content.
pub fn encode<E: Serialize>(event: &E) -> Result<Value> {
    serde_json::to_value(event).map_err(EventsError::from)
}

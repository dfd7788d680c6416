use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::events::{Artifact, CorrelationId};

/// A command type, identified by one artifact.
pub trait Command: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn artifact() -> Artifact;
}

/// An untyped command as received by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    /// Nil asks the coordinator to generate one.
    pub correlation_id: CorrelationId,
    pub command_type: Artifact,
    pub content: Value,
}

impl CommandRequest {
    pub fn new(command_type: Artifact, content: Value) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            command_type,
            content,
        }
    }

    pub fn for_command<C: Command>(command: &C) -> serde_json::Result<Self> {
        Ok(Self::new(C::artifact(), serde_json::to_value(command)?))
    }

    pub fn with_correlation(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Decode the content as `C`.
    pub fn decode<C: Command>(&self) -> serde_json::Result<C> {
        serde_json::from_value(self.content.clone())
    }

    pub fn is<C: Command>(&self) -> bool {
        self.command_type.id == C::artifact().id
    }
}

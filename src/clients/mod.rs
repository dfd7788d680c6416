//! gRPC collaborators for talking to the runtime.

mod channel;
mod connectors;

pub use channel::{create_channel, is_uds_address};
pub use connectors::{GrpcEventHandlerConnector, GrpcFilterConnector, GrpcPublicFilterConnector};

use std::sync::Arc;

use tonic::transport::Channel;

use crate::config::Config;
use crate::events::ExecutionContext;
use crate::processing::{EventHandlerProcessor, FilterProcessor, PublicFilterProcessor};
use crate::reverse_call::ReverseCallClient;
use crate::storage::GrpcEventStore;

/// Result type for client setup.
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid runtime endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: http::uri::InvalidUri,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// One channel to the runtime and the configured clients over it.
#[derive(Debug, Clone)]
pub struct RuntimeClients {
    channel: Channel,
    config: Config,
}

impl RuntimeClients {
    pub fn new(config: Config) -> Result<Self> {
        let channel = create_channel(&config.runtime.endpoint)?;
        Ok(Self { channel, config })
    }

    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    pub fn event_store(&self, execution_context: ExecutionContext) -> GrpcEventStore {
        GrpcEventStore::new(self.channel(), execution_context)
    }

    pub fn event_handlers(&self, execution_context: ExecutionContext) -> EventHandlerProcessor {
        let client = ReverseCallClient::new(
            Arc::new(GrpcEventHandlerConnector::new(self.channel())),
            self.config.reverse_call.ping_interval(),
        );
        EventHandlerProcessor::new(client, execution_context)
            .with_backoff(self.config.reverse_call.backoff.builder())
    }

    pub fn filters(&self, execution_context: ExecutionContext) -> FilterProcessor {
        let client = ReverseCallClient::new(
            Arc::new(GrpcFilterConnector::new(self.channel())),
            self.config.reverse_call.ping_interval(),
        );
        FilterProcessor::new(client, execution_context)
            .with_backoff(self.config.reverse_call.backoff.builder())
    }

    pub fn public_filters(&self, execution_context: ExecutionContext) -> PublicFilterProcessor {
        let client = ReverseCallClient::new(
            Arc::new(GrpcPublicFilterConnector::new(self.channel())),
            self.config.reverse_call.ping_interval(),
        );
        PublicFilterProcessor::new(client, execution_context)
            .with_backoff(self.config.reverse_call.backoff.builder())
    }
}

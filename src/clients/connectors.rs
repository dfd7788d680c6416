//! tonic-backed duplex connectors for the reverse-call services.

use std::future::Future;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Response, Status, Streaming};

use crate::processing::{EventHandlerProtocol, FilterProtocol, PublicFilterProtocol};
use crate::proto::services::{EventHandlersClient, FiltersClient};
use crate::reverse_call::{
    DuplexStream, ReverseCallConnector, ReverseCallError, ReverseCallProtocol,
};

const OUTBOUND_BUFFER: usize = 16;

/// Start the call and hand back both halves at once.
///
/// The response stream is awaited lazily so the registration message can
/// be queued before the runtime answers with headers.
fn open<P, F, Fut>(call: F) -> DuplexStream<P>
where
    P: ReverseCallProtocol,
    F: FnOnce(ReceiverStream<P::ClientMessage>) -> Fut,
    Fut: Future<Output = Result<Response<Streaming<P::ServerMessage>>, Status>> + Send + 'static,
{
    let (outbound, receiver) = mpsc::channel(OUTBOUND_BUFFER);
    let inbound = stream::once(call(ReceiverStream::new(receiver)))
        .flat_map(|result| match result {
            Ok(response) => response.into_inner().boxed(),
            Err(status) => stream::once(async move { Err(status) }).boxed(),
        })
        .boxed();
    DuplexStream { outbound, inbound }
}

/// Connects event handlers to `EventHandlers/Connect`.
#[derive(Debug, Clone)]
pub struct GrpcEventHandlerConnector {
    client: EventHandlersClient,
}

impl GrpcEventHandlerConnector {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: EventHandlersClient::new(channel),
        }
    }
}

#[async_trait]
impl ReverseCallConnector<EventHandlerProtocol> for GrpcEventHandlerConnector {
    async fn connect(&self) -> Result<DuplexStream<EventHandlerProtocol>, ReverseCallError> {
        let mut client = self.client.clone();
        Ok(open::<EventHandlerProtocol, _, _>(move |requests| async move {
            client.connect(requests).await
        }))
    }
}

/// Connects partitioned filters to `Filters/ConnectPartitioned`.
#[derive(Debug, Clone)]
pub struct GrpcFilterConnector {
    client: FiltersClient,
}

impl GrpcFilterConnector {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: FiltersClient::new(channel),
        }
    }
}

#[async_trait]
impl ReverseCallConnector<FilterProtocol> for GrpcFilterConnector {
    async fn connect(&self) -> Result<DuplexStream<FilterProtocol>, ReverseCallError> {
        let mut client = self.client.clone();
        Ok(open::<FilterProtocol, _, _>(move |requests| async move {
            client.connect_partitioned(requests).await
        }))
    }
}

/// Connects public event filters to `Filters/ConnectPublic`.
#[derive(Debug, Clone)]
pub struct GrpcPublicFilterConnector {
    client: FiltersClient,
}

impl GrpcPublicFilterConnector {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: FiltersClient::new(channel),
        }
    }
}

#[async_trait]
impl ReverseCallConnector<PublicFilterProtocol> for GrpcPublicFilterConnector {
    async fn connect(&self) -> Result<DuplexStream<PublicFilterProtocol>, ReverseCallError> {
        let mut client = self.client.clone();
        Ok(open::<PublicFilterProtocol, _, _>(move |requests| async move {
            client.connect_public(requests).await
        }))
    }
}

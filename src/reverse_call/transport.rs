//! Duplex stream abstraction and an in-memory transport.

use std::marker::PhantomData;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;

use super::{ReverseCallError, ReverseCallProtocol};

/// The two halves of an open connection to the runtime.
pub struct DuplexStream<P: ReverseCallProtocol> {
    pub outbound: mpsc::Sender<P::ClientMessage>,
    pub inbound: BoxStream<'static, Result<P::ServerMessage, Status>>,
}

/// Opens duplex streams to the runtime. Framing and transport retries are
/// the connector's business.
#[async_trait]
pub trait ReverseCallConnector<P: ReverseCallProtocol>: Send + Sync {
    async fn connect(&self) -> Result<DuplexStream<P>, ReverseCallError>;
}

/// The runtime's end of an in-memory connection.
pub struct RuntimeEnd<P: ReverseCallProtocol> {
    pub from_client: mpsc::Receiver<P::ClientMessage>,
    pub to_client: mpsc::Sender<Result<P::ServerMessage, Status>>,
}

impl<P: ReverseCallProtocol> RuntimeEnd<P> {
    /// Send a message to the client. False once the client is gone.
    pub async fn send(&self, message: P::ServerMessage) -> bool {
        self.to_client.send(Ok(message)).await.is_ok()
    }

    pub async fn receive(&mut self) -> Option<P::ClientMessage> {
        self.from_client.recv().await
    }
}

/// Connector whose connections are accepted by in-process code playing the runtime.
pub struct ChannelConnector<P: ReverseCallProtocol> {
    accepted: mpsc::UnboundedSender<RuntimeEnd<P>>,
    buffer: usize,
    _protocol: PhantomData<fn() -> P>,
}

/// A connector and the receiver its connections arrive on.
pub fn channel_connector<P: ReverseCallProtocol>(
    buffer: usize,
) -> (ChannelConnector<P>, mpsc::UnboundedReceiver<RuntimeEnd<P>>) {
    let (accepted, connections) = mpsc::unbounded_channel();
    (
        ChannelConnector {
            accepted,
            buffer,
            _protocol: PhantomData,
        },
        connections,
    )
}

#[async_trait]
impl<P: ReverseCallProtocol> ReverseCallConnector<P> for ChannelConnector<P> {
    async fn connect(&self) -> Result<DuplexStream<P>, ReverseCallError> {
        let (outbound, from_client) = mpsc::channel(self.buffer);
        let (to_client, inbound) = mpsc::channel(self.buffer);
        self.accepted
            .send(RuntimeEnd {
                from_client,
                to_client,
            })
            .map_err(|_| ReverseCallError::Connect("runtime is not accepting connections".into()))?;
        Ok(DuplexStream {
            outbound,
            inbound: ReceiverStream::new(inbound).boxed(),
        })
    }
}

//! Connection state machine for one reverse-call registration.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tonic::Status;
use tracing::{debug, info, warn};

use super::{
    CancellationSignal, ReverseCallConnector, ReverseCallDispatcher, ReverseCallError,
    ReverseCallProtocol, ServerFrame,
};

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingRegistrationResponse,
    Ready,
    Dispatching { call_number: u64 },
}

/// Opens registered connections for one protocol.
pub struct ReverseCallClient<P: ReverseCallProtocol> {
    connector: Arc<dyn ReverseCallConnector<P>>,
    ping_interval: Duration,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl<P: ReverseCallProtocol> ReverseCallClient<P> {
    pub fn new(connector: Arc<dyn ReverseCallConnector<P>>, ping_interval: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            ping_interval,
            state: Arc::new(state),
        }
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    /// Silence after which a connection is considered dead: two missed pings.
    pub fn keep_alive_grace(&self) -> Duration {
        self.ping_interval * 2
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Connect, register and wait for the registration response.
    pub async fn connect(
        &self,
        registration: &P::Registration,
        cancel: &CancellationSignal,
    ) -> Result<ReverseCallConnection<P>, ReverseCallError> {
        if cancel.is_cancelled() {
            return Err(ReverseCallError::Cancelled);
        }
        self.state.send_replace(ConnectionState::Connecting);
        let result = self.register(registration, cancel).await;
        if result.is_err() {
            self.state.send_replace(ConnectionState::Disconnected);
        }
        result
    }

    async fn register(
        &self,
        registration: &P::Registration,
        cancel: &CancellationSignal,
    ) -> Result<ReverseCallConnection<P>, ReverseCallError> {
        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReverseCallError::Cancelled),
            stream = self.connector.connect() => stream?,
        };
        let mut connection = ReverseCallConnection {
            outbound: stream.outbound,
            inbound: stream.inbound,
            grace: self.keep_alive_grace(),
            state: self.state.clone(),
        };

        connection
            .send(P::registration(registration, self.ping_interval))
            .await?;
        self.state
            .send_replace(ConnectionState::AwaitingRegistrationResponse);
        debug!(protocol = P::NAME, "Sent registration, awaiting response");

        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReverseCallError::Cancelled),
                frame = connection.receive() => frame,
            };
            let frame = match frame {
                Ok(frame) => frame,
                Err(ReverseCallError::StreamClosed | ReverseCallError::KeepAliveTimeout(_)) => {
                    return Err(ReverseCallError::DidNotReceiveRegistrationResponse)
                }
                Err(e) => return Err(e),
            };
            match frame {
                ServerFrame::RegistrationResponse(response) => {
                    if let Some(reason) = P::registration_failure(&response) {
                        return Err(ReverseCallError::RegistrationFailed(reason));
                    }
                    self.state.send_replace(ConnectionState::Ready);
                    info!(protocol = P::NAME, "Registered with runtime");
                    return Ok(connection);
                }
                ServerFrame::Ping => connection.send(P::pong()).await?,
                ServerFrame::Request(_) => {
                    return Err(ReverseCallError::DidNotReceiveRegistrationResponse)
                }
                ServerFrame::Unknown => {
                    warn!(protocol = P::NAME, "Ignoring unknown message before registration")
                }
            }
        }
    }
}

/// A registered connection, ready to process requests.
pub struct ReverseCallConnection<P: ReverseCallProtocol> {
    outbound: mpsc::Sender<P::ClientMessage>,
    inbound: BoxStream<'static, Result<P::ServerMessage, Status>>,
    grace: Duration,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl<P: ReverseCallProtocol> ReverseCallConnection<P> {
    async fn send(&mut self, message: P::ClientMessage) -> Result<(), ReverseCallError> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| ReverseCallError::SendFailed)
    }

    /// Next message, or an error once the keep-alive grace window passes in silence.
    async fn receive(
        &mut self,
    ) -> Result<ServerFrame<P::RegistrationResponse, P::Request>, ReverseCallError> {
        match tokio::time::timeout(self.grace, self.inbound.next()).await {
            Err(_) => Err(ReverseCallError::KeepAliveTimeout(self.grace)),
            Ok(None) => Err(ReverseCallError::StreamClosed),
            Ok(Some(Err(status))) => Err(status.into()),
            Ok(Some(Ok(message))) => Ok(P::classify(message)),
        }
    }

    /// Process requests one at a time until cancelled or the connection dies.
    ///
    /// Returns `Ok` only when cancelled. An in-flight dispatch is abandoned
    /// on cancellation.
    pub async fn handle(
        mut self,
        dispatcher: &dyn ReverseCallDispatcher<P>,
        cancel: &CancellationSignal,
    ) -> Result<(), ReverseCallError> {
        let result = self.run(dispatcher, cancel).await;
        self.state.send_replace(ConnectionState::Disconnected);
        result
    }

    async fn run(
        &mut self,
        dispatcher: &dyn ReverseCallDispatcher<P>,
        cancel: &CancellationSignal,
    ) -> Result<(), ReverseCallError> {
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                frame = self.receive() => frame?,
            };
            match frame {
                ServerFrame::Request(request) => {
                    let call_number = P::call_number(&request);
                    self.state
                        .send_replace(ConnectionState::Dispatching { call_number });
                    let mut response = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!(protocol = P::NAME, call_number, "Abandoning dispatch on cancellation");
                            return Ok(());
                        }
                        response = dispatcher.dispatch(request) => response,
                    };
                    P::set_call_number(&mut response, call_number);
                    self.send(P::response(response)).await?;
                    self.state.send_replace(ConnectionState::Ready);
                }
                ServerFrame::Ping => self.send(P::pong()).await?,
                ServerFrame::RegistrationResponse(_) => {
                    warn!(protocol = P::NAME, "Ignoring repeated registration response")
                }
                ServerFrame::Unknown => warn!(protocol = P::NAME, "Ignoring unknown message"),
            }
        }
    }
}

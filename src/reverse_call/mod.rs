//! Reverse-call streaming protocol.
//!
//! The runtime pushes numbered requests over a long-lived duplex stream
//! and the client answers each with a response carrying the same call
//! number.
//!
//! - Registration handshake before any request is accepted
//! - Strictly sequential dispatch per connection
//! - Keep-alive: two missed ping intervals of silence tear the connection down
//!
//! Reconnecting is left to the caller; see `processing::processor`.

mod cancellation;
mod client;
mod protocol;
mod transport;

pub use cancellation::{cancellation, CancellationSignal, CancellationTrigger};
pub use client::{ConnectionState, ReverseCallClient, ReverseCallConnection};
pub use protocol::{ReverseCallDispatcher, ReverseCallProtocol, ServerFrame};
pub use transport::{channel_connector, ChannelConnector, DuplexStream, ReverseCallConnector, RuntimeEnd};

use std::time::Duration;

use tonic::Status;

#[derive(Debug, thiserror::Error)]
pub enum ReverseCallError {
    #[error("Failed to connect to runtime: {0}")]
    Connect(String),

    #[error("Did not receive a registration response")]
    DidNotReceiveRegistrationResponse,

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("No message received from runtime within {0:?}")]
    KeepAliveTimeout(Duration),

    #[error("Stream closed by runtime")]
    StreamClosed,

    #[error("Stream error: {0}")]
    Stream(Box<Status>),

    #[error("Failed to send to runtime")]
    SendFailed,

    #[error("Cancelled")]
    Cancelled,
}

impl From<Status> for ReverseCallError {
    fn from(status: Status) -> Self {
        ReverseCallError::Stream(Box::new(status))
    }
}

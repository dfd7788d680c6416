//! The message shapes one reverse-call service exchanges.

use std::time::Duration;

use async_trait::async_trait;

/// A message from the runtime, as far as the connection loop cares.
#[derive(Debug)]
pub enum ServerFrame<R, Q> {
    RegistrationResponse(R),
    Request(Q),
    Ping,
    /// A message this client does not understand; ignored.
    Unknown,
}

/// Binds a concrete service's envelopes to the generic connection loop.
pub trait ReverseCallProtocol: Send + Sync + 'static {
    type ClientMessage: Send + 'static;
    type ServerMessage: Send + 'static;
    type Registration: Send + Sync + 'static;
    type RegistrationResponse: Send + 'static;
    type Request: Send + 'static;
    type Response: Send + 'static;

    /// Service name used in logs.
    const NAME: &'static str;

    fn registration(registration: &Self::Registration, ping_interval: Duration)
        -> Self::ClientMessage;

    fn response(response: Self::Response) -> Self::ClientMessage;

    fn pong() -> Self::ClientMessage;

    fn classify(
        message: Self::ServerMessage,
    ) -> ServerFrame<Self::RegistrationResponse, Self::Request>;

    /// The failure reason carried by a registration response, if any.
    fn registration_failure(response: &Self::RegistrationResponse) -> Option<String>;

    fn call_number(request: &Self::Request) -> u64;

    fn set_call_number(response: &mut Self::Response, call_number: u64);
}

/// User processing logic invoked once per request.
///
/// Invoked strictly one request at a time per connection. Failures must be
/// expressed in the response; a dispatcher never ends the connection.
#[async_trait]
pub trait ReverseCallDispatcher<P: ReverseCallProtocol>: Send + Sync {
    async fn dispatch(&self, request: P::Request) -> P::Response;
}

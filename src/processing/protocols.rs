//! Reverse-call bindings for the event handler and filter services.

use std::time::Duration;

use crate::events::{Artifact, ExecutionContext, FilterId, HandlerId, ScopeId};
use crate::proto::{
    self, event_handler_client_to_runtime_message as handler_client,
    event_handler_runtime_to_client_message as handler_runtime,
    filter_client_to_runtime_message as filter_client,
    filter_runtime_to_client_message as filter_runtime,
    public_filter_client_to_runtime_message as public_filter_client,
};
use crate::proto_ext::{duration_to_proto, UuidExt};
use crate::reverse_call::{ReverseCallProtocol, ServerFrame};

fn arguments_context(
    execution_context: &ExecutionContext,
    ping_interval: Duration,
) -> proto::ReverseCallArgumentsContext {
    proto::ReverseCallArgumentsContext {
        execution_context: Some((*execution_context).into()),
        ping_interval: Some(duration_to_proto(ping_interval)),
    }
}

fn failure_reason(failure: Option<&proto::Failure>) -> Option<String> {
    failure.map(|failure| failure.reason.clone())
}

/// What an event handler tells the runtime when it connects.
#[derive(Debug, Clone, PartialEq)]
pub struct EventHandlerRegistration {
    pub execution_context: ExecutionContext,
    pub handler_id: HandlerId,
    pub scope: ScopeId,
    pub event_types: Vec<Artifact>,
    pub partitioned: bool,
}

pub struct EventHandlerProtocol;

impl ReverseCallProtocol for EventHandlerProtocol {
    type ClientMessage = proto::EventHandlerClientToRuntimeMessage;
    type ServerMessage = proto::EventHandlerRuntimeToClientMessage;
    type Registration = EventHandlerRegistration;
    type RegistrationResponse = proto::EventHandlerRegistrationResponse;
    type Request = proto::HandleEventRequest;
    type Response = proto::EventHandlerResponse;

    const NAME: &'static str = "event_handler";

    fn registration(
        registration: &EventHandlerRegistration,
        ping_interval: Duration,
    ) -> Self::ClientMessage {
        proto::EventHandlerClientToRuntimeMessage {
            message: Some(handler_client::Message::RegistrationRequest(
                proto::EventHandlerRegistrationRequest {
                    call_context: Some(arguments_context(
                        &registration.execution_context,
                        ping_interval,
                    )),
                    event_handler_id: Some(registration.handler_id.to_proto_uuid()),
                    scope_id: Some(registration.scope.to_proto_uuid()),
                    types: registration
                        .event_types
                        .iter()
                        .copied()
                        .map(Into::into)
                        .collect(),
                    partitioned: registration.partitioned,
                },
            )),
        }
    }

    fn response(response: proto::EventHandlerResponse) -> Self::ClientMessage {
        proto::EventHandlerClientToRuntimeMessage {
            message: Some(handler_client::Message::HandleResult(response)),
        }
    }

    fn pong() -> Self::ClientMessage {
        proto::EventHandlerClientToRuntimeMessage {
            message: Some(handler_client::Message::Pong(proto::Pong {})),
        }
    }

    fn classify(
        message: Self::ServerMessage,
    ) -> ServerFrame<Self::RegistrationResponse, Self::Request> {
        match message.message {
            Some(handler_runtime::Message::RegistrationResponse(response)) => {
                ServerFrame::RegistrationResponse(response)
            }
            Some(handler_runtime::Message::HandleRequest(request)) => ServerFrame::Request(request),
            Some(handler_runtime::Message::Ping(_)) => ServerFrame::Ping,
            None => ServerFrame::Unknown,
        }
    }

    fn registration_failure(response: &Self::RegistrationResponse) -> Option<String> {
        failure_reason(response.failure.as_ref())
    }

    fn call_number(request: &Self::Request) -> u64 {
        request
            .call_context
            .as_ref()
            .map(|context| context.call_number)
            .unwrap_or_default()
    }

    fn set_call_number(response: &mut Self::Response, call_number: u64) {
        response
            .call_context
            .get_or_insert_with(Default::default)
            .call_number = call_number;
    }
}

/// What a partitioned filter tells the runtime when it connects.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRegistration {
    pub execution_context: ExecutionContext,
    pub filter_id: FilterId,
    pub scope: ScopeId,
}

pub struct FilterProtocol;

impl ReverseCallProtocol for FilterProtocol {
    type ClientMessage = proto::FilterClientToRuntimeMessage;
    type ServerMessage = proto::FilterRuntimeToClientMessage;
    type Registration = FilterRegistration;
    type RegistrationResponse = proto::FilterRegistrationResponse;
    type Request = proto::FilterEventRequest;
    type Response = proto::PartitionedFilterResponse;

    const NAME: &'static str = "filter";

    fn registration(registration: &FilterRegistration, ping_interval: Duration) -> Self::ClientMessage {
        proto::FilterClientToRuntimeMessage {
            message: Some(filter_client::Message::RegistrationRequest(
                proto::FilterRegistrationRequest {
                    call_context: Some(arguments_context(
                        &registration.execution_context,
                        ping_interval,
                    )),
                    filter_id: Some(registration.filter_id.to_proto_uuid()),
                    scope_id: Some(registration.scope.to_proto_uuid()),
                },
            )),
        }
    }

    fn response(response: proto::PartitionedFilterResponse) -> Self::ClientMessage {
        proto::FilterClientToRuntimeMessage {
            message: Some(filter_client::Message::FilterResult(response)),
        }
    }

    fn pong() -> Self::ClientMessage {
        proto::FilterClientToRuntimeMessage {
            message: Some(filter_client::Message::Pong(proto::Pong {})),
        }
    }

    fn classify(
        message: Self::ServerMessage,
    ) -> ServerFrame<Self::RegistrationResponse, Self::Request> {
        classify_filter_message(message)
    }

    fn registration_failure(response: &Self::RegistrationResponse) -> Option<String> {
        failure_reason(response.failure.as_ref())
    }

    fn call_number(request: &Self::Request) -> u64 {
        filter_call_number(request)
    }

    fn set_call_number(response: &mut Self::Response, call_number: u64) {
        set_filter_call_number(response, call_number);
    }
}

fn classify_filter_message(
    message: proto::FilterRuntimeToClientMessage,
) -> ServerFrame<proto::FilterRegistrationResponse, proto::FilterEventRequest> {
    match message.message {
        Some(filter_runtime::Message::RegistrationResponse(response)) => {
            ServerFrame::RegistrationResponse(response)
        }
        Some(filter_runtime::Message::FilterRequest(request)) => ServerFrame::Request(request),
        Some(filter_runtime::Message::Ping(_)) => ServerFrame::Ping,
        None => ServerFrame::Unknown,
    }
}

fn filter_call_number(request: &proto::FilterEventRequest) -> u64 {
    request
        .call_context
        .as_ref()
        .map(|context| context.call_number)
        .unwrap_or_default()
}

fn set_filter_call_number(response: &mut proto::PartitionedFilterResponse, call_number: u64) {
    response
        .call_context
        .get_or_insert_with(Default::default)
        .call_number = call_number;
}

/// What a public event filter tells the runtime when it connects.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicFilterRegistration {
    pub execution_context: ExecutionContext,
    pub filter_id: FilterId,
}

/// Filters over public events. Same requests and responses as partitioned
/// filters, registered without a scope.
pub struct PublicFilterProtocol;

impl ReverseCallProtocol for PublicFilterProtocol {
    type ClientMessage = proto::PublicFilterClientToRuntimeMessage;
    type ServerMessage = proto::FilterRuntimeToClientMessage;
    type Registration = PublicFilterRegistration;
    type RegistrationResponse = proto::FilterRegistrationResponse;
    type Request = proto::FilterEventRequest;
    type Response = proto::PartitionedFilterResponse;

    const NAME: &'static str = "public_filter";

    fn registration(
        registration: &PublicFilterRegistration,
        ping_interval: Duration,
    ) -> Self::ClientMessage {
        proto::PublicFilterClientToRuntimeMessage {
            message: Some(public_filter_client::Message::RegistrationRequest(
                proto::PublicFilterRegistrationRequest {
                    call_context: Some(arguments_context(
                        &registration.execution_context,
                        ping_interval,
                    )),
                    filter_id: Some(registration.filter_id.to_proto_uuid()),
                },
            )),
        }
    }

    fn response(response: proto::PartitionedFilterResponse) -> Self::ClientMessage {
        proto::PublicFilterClientToRuntimeMessage {
            message: Some(public_filter_client::Message::FilterResult(response)),
        }
    }

    fn pong() -> Self::ClientMessage {
        proto::PublicFilterClientToRuntimeMessage {
            message: Some(public_filter_client::Message::Pong(proto::Pong {})),
        }
    }

    fn classify(
        message: Self::ServerMessage,
    ) -> ServerFrame<Self::RegistrationResponse, Self::Request> {
        classify_filter_message(message)
    }

    fn registration_failure(response: &Self::RegistrationResponse) -> Option<String> {
        failure_reason(response.failure.as_ref())
    }

    fn call_number(request: &Self::Request) -> u64 {
        filter_call_number(request)
    }

    fn set_call_number(response: &mut Self::Response, call_number: u64) {
        set_filter_call_number(response, call_number);
    }
}

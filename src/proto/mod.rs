//! Wire messages exchanged with the runtime.
//!
//! Messages are declared directly with prost derives; the gRPC stubs that
//! carry them live in `services`.

pub mod services;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Uuid {
    #[prost(bytes = "vec", tag = "1")]
    pub value: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Artifact {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<Uuid>,
    #[prost(uint32, tag = "2")]
    pub generation: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecutionContext {
    #[prost(message, optional, tag = "1")]
    pub microservice_id: ::core::option::Option<Uuid>,
    #[prost(message, optional, tag = "2")]
    pub tenant_id: ::core::option::Option<Uuid>,
    #[prost(message, optional, tag = "3")]
    pub correlation_id: ::core::option::Option<Uuid>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Failure {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<Uuid>,
    #[prost(string, tag = "2")]
    pub reason: ::prost::alloc::string::String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Ping {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Pong {}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommittedEvent {
    #[prost(uint64, tag = "1")]
    pub event_log_sequence_number: u64,
    #[prost(message, optional, tag = "2")]
    pub occurred: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "3")]
    pub event_source_id: ::core::option::Option<Uuid>,
    #[prost(message, optional, tag = "4")]
    pub execution_context: ::core::option::Option<ExecutionContext>,
    #[prost(message, optional, tag = "5")]
    pub r#type: ::core::option::Option<Artifact>,
    /// JSON
    #[prost(string, tag = "6")]
    pub content: ::prost::alloc::string::String,
    #[prost(bool, tag = "7")]
    pub public: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UncommittedEvent {
    #[prost(message, optional, tag = "1")]
    pub r#type: ::core::option::Option<Artifact>,
    #[prost(string, tag = "2")]
    pub content: ::prost::alloc::string::String,
    #[prost(bool, tag = "3")]
    pub public: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UncommittedAggregateEvents {
    #[prost(message, optional, tag = "1")]
    pub event_source_id: ::core::option::Option<Uuid>,
    #[prost(message, optional, tag = "2")]
    pub aggregate_root: ::core::option::Option<Artifact>,
    #[prost(uint64, tag = "3")]
    pub expected_aggregate_root_version: u64,
    #[prost(message, repeated, tag = "4")]
    pub events: ::prost::alloc::vec::Vec<UncommittedEvent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommittedAggregateEvent {
    #[prost(uint64, tag = "1")]
    pub event_log_sequence_number: u64,
    #[prost(message, optional, tag = "2")]
    pub occurred: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "3")]
    pub execution_context: ::core::option::Option<ExecutionContext>,
    #[prost(message, optional, tag = "4")]
    pub r#type: ::core::option::Option<Artifact>,
    #[prost(string, tag = "5")]
    pub content: ::prost::alloc::string::String,
    #[prost(bool, tag = "6")]
    pub public: bool,
    /// Version of the aggregate when the event was applied.
    #[prost(uint64, tag = "7")]
    pub aggregate_root_version: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommittedAggregateEvents {
    #[prost(message, optional, tag = "1")]
    pub event_source_id: ::core::option::Option<Uuid>,
    #[prost(message, optional, tag = "2")]
    pub aggregate_root: ::core::option::Option<Artifact>,
    #[prost(message, repeated, tag = "3")]
    pub events: ::prost::alloc::vec::Vec<CommittedAggregateEvent>,
}

// ---------------------------------------------------------------------------
// Event store
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AggregateRootVersionConflict {
    #[prost(uint64, tag = "1")]
    pub expected_version: u64,
    #[prost(uint64, tag = "2")]
    pub actual_version: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitAggregateEventsRequest {
    #[prost(message, optional, tag = "1")]
    pub call_context: ::core::option::Option<ExecutionContext>,
    #[prost(message, optional, tag = "2")]
    pub events: ::core::option::Option<UncommittedAggregateEvents>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitAggregateEventsResponse {
    #[prost(message, optional, tag = "1")]
    pub failure: ::core::option::Option<Failure>,
    #[prost(message, optional, tag = "2")]
    pub events: ::core::option::Option<CommittedAggregateEvents>,
    #[prost(message, optional, tag = "3")]
    pub conflict: ::core::option::Option<AggregateRootVersionConflict>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchForAggregateRequest {
    #[prost(message, optional, tag = "1")]
    pub call_context: ::core::option::Option<ExecutionContext>,
    #[prost(message, optional, tag = "2")]
    pub event_source_id: ::core::option::Option<Uuid>,
    #[prost(message, optional, tag = "3")]
    pub aggregate_root: ::core::option::Option<Artifact>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchForAggregateResponse {
    #[prost(message, optional, tag = "1")]
    pub failure: ::core::option::Option<Failure>,
    #[prost(message, optional, tag = "2")]
    pub events: ::core::option::Option<CommittedAggregateEvents>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionForAggregateResponse {
    #[prost(message, optional, tag = "1")]
    pub failure: ::core::option::Option<Failure>,
    #[prost(uint64, tag = "2")]
    pub version: u64,
}

// ---------------------------------------------------------------------------
// Reverse calls
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReverseCallArgumentsContext {
    #[prost(message, optional, tag = "1")]
    pub execution_context: ::core::option::Option<ExecutionContext>,
    #[prost(message, optional, tag = "2")]
    pub ping_interval: ::core::option::Option<::prost_types::Duration>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReverseCallRequestContext {
    #[prost(uint64, tag = "1")]
    pub call_number: u64,
    #[prost(message, optional, tag = "2")]
    pub execution_context: ::core::option::Option<ExecutionContext>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReverseCallResponseContext {
    #[prost(uint64, tag = "1")]
    pub call_number: u64,
    #[prost(message, optional, tag = "2")]
    pub execution_context: ::core::option::Option<ExecutionContext>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamEvent {
    #[prost(message, optional, tag = "1")]
    pub event: ::core::option::Option<CommittedEvent>,
    #[prost(message, optional, tag = "2")]
    pub partition_id: ::core::option::Option<Uuid>,
    #[prost(message, optional, tag = "3")]
    pub scope_id: ::core::option::Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Event handlers
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventHandlerRegistrationRequest {
    #[prost(message, optional, tag = "1")]
    pub call_context: ::core::option::Option<ReverseCallArgumentsContext>,
    #[prost(message, optional, tag = "2")]
    pub event_handler_id: ::core::option::Option<Uuid>,
    #[prost(message, optional, tag = "3")]
    pub scope_id: ::core::option::Option<Uuid>,
    #[prost(message, repeated, tag = "4")]
    pub types: ::prost::alloc::vec::Vec<Artifact>,
    #[prost(bool, tag = "5")]
    pub partitioned: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventHandlerRegistrationResponse {
    #[prost(message, optional, tag = "1")]
    pub failure: ::core::option::Option<Failure>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HandleEventRequest {
    #[prost(message, optional, tag = "1")]
    pub call_context: ::core::option::Option<ReverseCallRequestContext>,
    #[prost(message, optional, tag = "2")]
    pub event: ::core::option::Option<StreamEvent>,
    #[prost(uint32, tag = "3")]
    pub retry_count: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventHandlerResponse {
    #[prost(message, optional, tag = "1")]
    pub call_context: ::core::option::Option<ReverseCallResponseContext>,
    #[prost(bool, tag = "2")]
    pub succeeded: bool,
    #[prost(bool, tag = "3")]
    pub retry: bool,
    #[prost(string, tag = "4")]
    pub failure_reason: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventHandlerClientToRuntimeMessage {
    #[prost(oneof = "event_handler_client_to_runtime_message::Message", tags = "1, 2, 3")]
    pub message: ::core::option::Option<event_handler_client_to_runtime_message::Message>,
}

pub mod event_handler_client_to_runtime_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        RegistrationRequest(super::EventHandlerRegistrationRequest),
        #[prost(message, tag = "2")]
        HandleResult(super::EventHandlerResponse),
        #[prost(message, tag = "3")]
        Pong(super::Pong),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventHandlerRuntimeToClientMessage {
    #[prost(oneof = "event_handler_runtime_to_client_message::Message", tags = "1, 2, 3")]
    pub message: ::core::option::Option<event_handler_runtime_to_client_message::Message>,
}

pub mod event_handler_runtime_to_client_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        RegistrationResponse(super::EventHandlerRegistrationResponse),
        #[prost(message, tag = "2")]
        HandleRequest(super::HandleEventRequest),
        #[prost(message, tag = "3")]
        Ping(super::Ping),
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilterRegistrationRequest {
    #[prost(message, optional, tag = "1")]
    pub call_context: ::core::option::Option<ReverseCallArgumentsContext>,
    #[prost(message, optional, tag = "2")]
    pub filter_id: ::core::option::Option<Uuid>,
    #[prost(message, optional, tag = "3")]
    pub scope_id: ::core::option::Option<Uuid>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilterRegistrationResponse {
    #[prost(message, optional, tag = "1")]
    pub failure: ::core::option::Option<Failure>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilterEventRequest {
    #[prost(message, optional, tag = "1")]
    pub call_context: ::core::option::Option<ReverseCallRequestContext>,
    #[prost(message, optional, tag = "2")]
    pub event: ::core::option::Option<CommittedEvent>,
    #[prost(message, optional, tag = "3")]
    pub scope_id: ::core::option::Option<Uuid>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessorFailure {
    #[prost(string, tag = "1")]
    pub reason: ::prost::alloc::string::String,
    #[prost(bool, tag = "2")]
    pub retry: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PartitionedFilterResponse {
    #[prost(message, optional, tag = "1")]
    pub call_context: ::core::option::Option<ReverseCallResponseContext>,
    #[prost(bool, tag = "2")]
    pub is_included: bool,
    #[prost(message, optional, tag = "3")]
    pub partition_id: ::core::option::Option<Uuid>,
    #[prost(message, optional, tag = "4")]
    pub failure: ::core::option::Option<ProcessorFailure>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilterClientToRuntimeMessage {
    #[prost(oneof = "filter_client_to_runtime_message::Message", tags = "1, 2, 3")]
    pub message: ::core::option::Option<filter_client_to_runtime_message::Message>,
}

pub mod filter_client_to_runtime_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        RegistrationRequest(super::FilterRegistrationRequest),
        #[prost(message, tag = "2")]
        FilterResult(super::PartitionedFilterResponse),
        #[prost(message, tag = "3")]
        Pong(super::Pong),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilterRuntimeToClientMessage {
    #[prost(oneof = "filter_runtime_to_client_message::Message", tags = "1, 2, 3")]
    pub message: ::core::option::Option<filter_runtime_to_client_message::Message>,
}

pub mod filter_runtime_to_client_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        RegistrationResponse(super::FilterRegistrationResponse),
        #[prost(message, tag = "2")]
        FilterRequest(super::FilterEventRequest),
        #[prost(message, tag = "3")]
        Ping(super::Ping),
    }
}

/// Registration for a filter over public events. Public streams have no scope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublicFilterRegistrationRequest {
    #[prost(message, optional, tag = "1")]
    pub call_context: ::core::option::Option<ReverseCallArgumentsContext>,
    #[prost(message, optional, tag = "2")]
    pub filter_id: ::core::option::Option<Uuid>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublicFilterClientToRuntimeMessage {
    #[prost(oneof = "public_filter_client_to_runtime_message::Message", tags = "1, 2, 3")]
    pub message: ::core::option::Option<public_filter_client_to_runtime_message::Message>,
}

pub mod public_filter_client_to_runtime_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        RegistrationRequest(super::PublicFilterRegistrationRequest),
        #[prost(message, tag = "2")]
        FilterResult(super::PartitionedFilterResponse),
        #[prost(message, tag = "3")]
        Pong(super::Pong),
    }
}

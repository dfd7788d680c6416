//! gRPC stubs for the runtime services.

use http::uri::PathAndQuery;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::Channel;
use tonic::{IntoRequest, IntoStreamingRequest, Response, Status, Streaming};

use super::{
    CommitAggregateEventsRequest, CommitAggregateEventsResponse,
    EventHandlerClientToRuntimeMessage, EventHandlerRuntimeToClientMessage,
    FetchForAggregateRequest, FetchForAggregateResponse, FilterClientToRuntimeMessage,
    FilterRuntimeToClientMessage, PublicFilterClientToRuntimeMessage, VersionForAggregateResponse,
};

async fn ready(inner: &mut Grpc<Channel>) -> Result<(), Status> {
    inner
        .ready()
        .await
        .map_err(|e| Status::unknown(format!("Service was not ready: {e}")))
}

/// Client for `tributary.runtime.EventStore`.
#[derive(Debug, Clone)]
pub struct EventStoreClient {
    inner: Grpc<Channel>,
}

impl EventStoreClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
        }
    }

    pub async fn commit_for_aggregate(
        &mut self,
        request: impl IntoRequest<CommitAggregateEventsRequest>,
    ) -> Result<Response<CommitAggregateEventsResponse>, Status> {
        ready(&mut self.inner).await?;
        let path = PathAndQuery::from_static("/tributary.runtime.EventStore/CommitForAggregate");
        self.inner
            .unary(request.into_request(), path, ProstCodec::default())
            .await
    }

    pub async fn fetch_for_aggregate(
        &mut self,
        request: impl IntoRequest<FetchForAggregateRequest>,
    ) -> Result<Response<FetchForAggregateResponse>, Status> {
        ready(&mut self.inner).await?;
        let path = PathAndQuery::from_static("/tributary.runtime.EventStore/FetchForAggregate");
        self.inner
            .unary(request.into_request(), path, ProstCodec::default())
            .await
    }

    pub async fn version_for_aggregate(
        &mut self,
        request: impl IntoRequest<FetchForAggregateRequest>,
    ) -> Result<Response<VersionForAggregateResponse>, Status> {
        ready(&mut self.inner).await?;
        let path = PathAndQuery::from_static("/tributary.runtime.EventStore/VersionForAggregate");
        self.inner
            .unary(request.into_request(), path, ProstCodec::default())
            .await
    }
}

/// Client for `tributary.runtime.EventHandlers`.
#[derive(Debug, Clone)]
pub struct EventHandlersClient {
    inner: Grpc<Channel>,
}

impl EventHandlersClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
        }
    }

    pub async fn connect(
        &mut self,
        request: impl IntoStreamingRequest<Message = EventHandlerClientToRuntimeMessage>,
    ) -> Result<Response<Streaming<EventHandlerRuntimeToClientMessage>>, Status> {
        ready(&mut self.inner).await?;
        let path = PathAndQuery::from_static("/tributary.runtime.EventHandlers/Connect");
        self.inner
            .streaming(request.into_streaming_request(), path, ProstCodec::default())
            .await
    }
}

/// Client for `tributary.runtime.Filters`.
#[derive(Debug, Clone)]
pub struct FiltersClient {
    inner: Grpc<Channel>,
}

impl FiltersClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
        }
    }

    pub async fn connect_partitioned(
        &mut self,
        request: impl IntoStreamingRequest<Message = FilterClientToRuntimeMessage>,
    ) -> Result<Response<Streaming<FilterRuntimeToClientMessage>>, Status> {
        ready(&mut self.inner).await?;
        let path = PathAndQuery::from_static("/tributary.runtime.Filters/ConnectPartitioned");
        self.inner
            .streaming(request.into_streaming_request(), path, ProstCodec::default())
            .await
    }

    pub async fn connect_public(
        &mut self,
        request: impl IntoStreamingRequest<Message = PublicFilterClientToRuntimeMessage>,
    ) -> Result<Response<Streaming<FilterRuntimeToClientMessage>>, Status> {
        ready(&mut self.inner).await?;
        let path = PathAndQuery::from_static("/tributary.runtime.Filters/ConnectPublic");
        self.inner
            .streaming(request.into_streaming_request(), path, ProstCodec::default())
            .await
    }
}

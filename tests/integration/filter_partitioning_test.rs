//! A filter that is rejected once, reconnects after backoff and partitions events.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use backon::ExponentialBuilder;
use chrono::Utc;
use serde_json::json;
use tokio::time::Instant;

use tributary::events::{
    CommittedEvent, CorrelationId, EventLogSequenceNumber, EventProcessorId, EventSourceId,
    PartitionId, ScopeId,
};
use tributary::processing::{
    FilterProcessor, FilterProtocol, HandlerError, PartitionedFilterResult,
};
use tributary::proto::{
    self, filter_client_to_runtime_message as client_message,
    filter_runtime_to_client_message as runtime_message,
};
use tributary::proto_ext::ProtoUuidExt;
use tributary::reverse_call::{cancellation, channel_connector, ReverseCallClient, RuntimeEnd};

use crate::bank::{execution_context, OPENED};

const FILTER: EventProcessorId = EventProcessorId::from_u128(0xf17e);
const BACKOFF: Duration = Duration::from_secs(1);

fn by_owner(event: &CommittedEvent) -> Result<PartitionedFilterResult, HandlerError> {
    let owner = event.content["Opened"]["owner"]
        .as_str()
        .ok_or("event has no owner")?;
    let partition = match owner {
        "alice" => PartitionId::from_u128(1),
        _ => PartitionId::from_u128(2),
    };
    Ok(PartitionedFilterResult::included(partition))
}

fn registration_response(failure: Option<&str>) -> proto::FilterRuntimeToClientMessage {
    proto::FilterRuntimeToClientMessage {
        message: Some(runtime_message::Message::RegistrationResponse(
            proto::FilterRegistrationResponse {
                failure: failure.map(|reason| proto::Failure {
                    id: None,
                    reason: reason.to_string(),
                }),
            },
        )),
    }
}

fn opened(call_number: u64, owner: &str) -> proto::FilterRuntimeToClientMessage {
    let event = CommittedEvent {
        event_log_sequence_number: EventLogSequenceNumber::new(call_number),
        occurred: Utc::now(),
        event_source: EventSourceId::new(),
        execution_context: execution_context().with_correlation(CorrelationId::new()),
        artifact: OPENED,
        content: json!({ "Opened": { "owner": owner } }),
        public: false,
    };
    proto::FilterRuntimeToClientMessage {
        message: Some(runtime_message::Message::FilterRequest(
            proto::FilterEventRequest {
                call_context: Some(proto::ReverseCallRequestContext {
                    call_number,
                    execution_context: Some(event.execution_context.into()),
                }),
                event: Some((&event).into()),
                scope_id: None,
            },
        )),
    }
}

async fn expect_registration(end: &mut RuntimeEnd<FilterProtocol>) {
    match end.receive().await.map(|message| message.message) {
        Some(Some(client_message::Message::RegistrationRequest(request))) => {
            assert_eq!(
                request.filter_id.unwrap().to_uuid().unwrap(),
                *FILTER.as_uuid()
            );
        }
        other => panic!("expected registration, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_filter_retries_registration_then_partitions_events() {
    let (connector, mut connections) = channel_connector::<FilterProtocol>(8);
    let client = ReverseCallClient::new(Arc::new(connector), Duration::from_secs(5));
    let processor = FilterProcessor::new(client, execution_context()).with_backoff(
        ExponentialBuilder::default()
            .with_min_delay(BACKOFF)
            .with_max_delay(BACKOFF)
            .with_max_times(usize::MAX),
    );
    let (trigger, cancel) = cancellation();
    let task = tokio::spawn(async move {
        processor
            .register(FILTER, ScopeId::DEFAULT, Arc::new(by_owner), cancel)
            .await
    });

    let mut first = connections.recv().await.unwrap();
    expect_registration(&mut first).await;
    first
        .send(registration_response(Some("filter definition mismatch")))
        .await;
    let rejected_at = Instant::now();

    let mut second = connections.recv().await.unwrap();
    assert!(rejected_at.elapsed() >= BACKOFF);
    expect_registration(&mut second).await;
    second.send(registration_response(None)).await;

    let mut partitions = Vec::new();
    for (call_number, owner) in [(1, "alice"), (2, "bob"), (3, "alice")] {
        second.send(opened(call_number, owner)).await;
        match second.receive().await.map(|message| message.message) {
            Some(Some(client_message::Message::FilterResult(response))) => {
                assert_eq!(response.call_context.unwrap().call_number, call_number);
                assert!(response.is_included);
                assert!(response.failure.is_none());
                partitions.push(response.partition_id.unwrap().to_uuid().unwrap());
            }
            other => panic!("expected filter result, got {other:?}"),
        }
    }

    assert_eq!(partitions[0], partitions[2]);
    assert_ne!(partitions[0], partitions[1]);
    let distinct: HashSet<_> = partitions.into_iter().collect();
    assert_eq!(distinct.len(), 2);

    trigger.cancel();
    task.await.unwrap().unwrap();
}

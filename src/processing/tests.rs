use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backon::ExponentialBuilder;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::*;
use crate::events::{
    encode, Artifact, CommittedEvent, CorrelationId, Event, EventLogSequenceNumber,
    EventProcessorId, EventSourceId, PartitionId, ScopeId, StreamId,
};
use crate::proto::{
    self, event_handler_client_to_runtime_message as handler_client,
    event_handler_runtime_to_client_message as handler_runtime,
    filter_client_to_runtime_message as filter_client,
    filter_runtime_to_client_message as filter_runtime,
    public_filter_client_to_runtime_message as public_filter_client,
};
use crate::proto_ext::{ProtoUuidExt, UuidExt};
use crate::reverse_call::{cancellation, channel_connector, ReverseCallClient, ReverseCallDispatcher};
use crate::test_utils::execution_context;

const DEPOSITED: Artifact = Artifact::from_u128(0xd1);
const WITHDRAWN: Artifact = Artifact::from_u128(0xd2);
const HANDLER: EventProcessorId = EventProcessorId::from_u128(0x4a);
const FILTER: EventProcessorId = EventProcessorId::from_u128(0xf1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Deposited {
    amount: u64,
}

impl Event for Deposited {
    fn artifact() -> Artifact {
        DEPOSITED
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Withdrawn {
    amount: u64,
}

impl Event for Withdrawn {
    fn artifact() -> Artifact {
        WITHDRAWN
    }
}

#[derive(Debug, thiserror::Error)]
#[error("ledger rejected entry")]
struct LedgerRejected(#[source] std::io::Error);

fn committed(artifact: Artifact, content: serde_json::Value, correlation: CorrelationId) -> CommittedEvent {
    CommittedEvent {
        event_log_sequence_number: EventLogSequenceNumber::new(42),
        occurred: Utc::now(),
        event_source: EventSourceId::from_u128(0xacc),
        execution_context: execution_context().with_correlation(correlation),
        artifact,
        content,
        public: false,
    }
}

fn handle_request(call_number: u64, event: &CommittedEvent) -> proto::HandleEventRequest {
    proto::HandleEventRequest {
        call_context: Some(proto::ReverseCallRequestContext {
            call_number,
            execution_context: Some(event.execution_context.into()),
        }),
        event: Some(proto::StreamEvent {
            event: Some(event.into()),
            partition_id: Some(PartitionId::from_u128(9).to_proto_uuid()),
            scope_id: None,
        }),
        retry_count: 0,
    }
}

fn filter_request(call_number: u64, event: &CommittedEvent) -> proto::FilterEventRequest {
    proto::FilterEventRequest {
        call_context: Some(proto::ReverseCallRequestContext {
            call_number,
            execution_context: Some(event.execution_context.into()),
        }),
        event: Some(event.into()),
        scope_id: None,
    }
}

fn fixed_backoff(delay: Duration) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(delay)
        .with_max_delay(delay)
        .with_max_times(usize::MAX)
}

fn ledger_handler(seen: Arc<AtomicUsize>) -> EventHandlerBuilder {
    EventHandlerBuilder::new(HANDLER)
        .handle(move |event: Deposited, context: EventContext| {
            let seen = seen.clone();
            async move {
                assert_eq!(context.partition, PartitionId::from_u128(9));
                seen.fetch_add(event.amount as usize, Ordering::SeqCst);
                Ok(())
            }
        })
        .handle(|_: Withdrawn, _| async {
            Err::<(), HandlerError>(LedgerRejected(std::io::Error::other("account frozen")).into())
        })
}

#[test]
fn test_build_rejects_reserved_handler_ids() {
    for reserved in [StreamId::EVENT_LOG, StreamId::ALL] {
        let id = EventProcessorId::from_uuid(*reserved.as_uuid());
        let err = EventHandlerBuilder::new(id)
            .handle(|_: Deposited, _| async { Ok(()) })
            .build()
            .unwrap_err();
        assert!(matches!(err, ProcessorError::IllegalProcessorId(rejected) if rejected == id));
    }
}

#[test]
fn test_build_rejects_handler_without_methods() {
    let err = EventHandlerBuilder::new(HANDLER).build().unwrap_err();
    assert!(matches!(err, ProcessorError::NoEventTypes(id) if id == HANDLER));
}

#[test]
fn test_build_rejects_two_methods_for_one_event_type() {
    let err = EventHandlerBuilder::new(HANDLER)
        .handle(|_: Deposited, _| async { Ok(()) })
        .handle(|_: Deposited, _| async { Ok(()) })
        .build()
        .unwrap_err();
    match err {
        ProcessorError::DuplicateHandlerFor {
            processor,
            event_type,
        } => {
            assert_eq!(processor, HANDLER);
            assert_eq!(event_type, DEPOSITED);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_built_handler_describes_its_registration() {
    let handler = ledger_handler(Arc::new(AtomicUsize::new(0)))
        .in_scope(ScopeId::from_u128(3))
        .unpartitioned()
        .build()
        .unwrap();
    assert_eq!(handler.event_types(), vec![DEPOSITED, WITHDRAWN]);
    assert_eq!(handler.scope(), ScopeId::from_u128(3));
    assert!(!handler.partitioned());
}

#[tokio::test]
async fn test_handled_event_replies_success_and_notifies_completion() {
    let seen = Arc::new(AtomicUsize::new(0));
    let handler = ledger_handler(seen.clone()).build().unwrap();
    let completion = EventProcessingCompletion::new();
    completion.register_handler(HANDLER, [DEPOSITED.id]);
    let correlation = CorrelationId::new();
    let waiter = completion.register_waiter(correlation, [DEPOSITED.id]);

    let dispatcher = handlers::dispatcher_for(handler, Some(completion.clone()));
    let event = committed(DEPOSITED, encode(&Deposited { amount: 5 }).unwrap(), correlation);
    let response = dispatcher.dispatch(handle_request(3, &event)).await;

    assert!(response.succeeded);
    assert!(!response.retry);
    assert!(response.failure_reason.is_empty());
    let context = response.call_context.unwrap();
    let expected: proto::ExecutionContext = event.execution_context.into();
    assert_eq!(context.call_number, 3);
    assert_eq!(context.execution_context, Some(expected));
    assert_eq!(seen.load(Ordering::SeqCst), 5);
    assert_eq!(waiter.wait(Duration::from_secs(1)).await, WaitOutcome::Completed);
}

#[tokio::test]
async fn test_failed_event_reports_message_and_causes() {
    let handler = ledger_handler(Arc::new(AtomicUsize::new(0))).build().unwrap();
    let completion = EventProcessingCompletion::new();
    completion.register_handler(HANDLER, [WITHDRAWN.id]);
    let correlation = CorrelationId::new();
    let waiter = completion.register_waiter(correlation, [WITHDRAWN.id]);

    let dispatcher = handlers::dispatcher_for(handler, Some(completion.clone()));
    let event = committed(WITHDRAWN, json!({ "amount": 1 }), correlation);
    let response = dispatcher.dispatch(handle_request(4, &event)).await;

    assert!(!response.succeeded);
    assert!(!response.retry);
    assert_eq!(
        response.failure_reason,
        "Failure Message: ledger rejected entry\nStack Trace: caused by: account frozen"
    );
    assert_eq!(response.call_context.unwrap().call_number, 4);
    assert_eq!(
        waiter.wait(Duration::from_millis(10)).await,
        WaitOutcome::TimedOut { outstanding: 1 }
    );
}

#[tokio::test]
async fn test_event_without_method_fails_that_event_only() {
    let handler = ledger_handler(Arc::new(AtomicUsize::new(0))).build().unwrap();
    let dispatcher = handlers::dispatcher_for(handler, None);
    let unknown = committed(Artifact::from_u128(0xee), json!({}), CorrelationId::new());
    let response = dispatcher.dispatch(handle_request(1, &unknown)).await;
    assert!(!response.succeeded);
    assert!(response.failure_reason.contains("No handle method"));

    let deposit = committed(DEPOSITED, json!({ "amount": 1 }), CorrelationId::new());
    assert!(dispatcher.dispatch(handle_request(2, &deposit)).await.succeeded);
}

#[tokio::test]
async fn test_malformed_content_is_a_failed_event() {
    let handler = ledger_handler(Arc::new(AtomicUsize::new(0))).build().unwrap();
    let dispatcher = handlers::dispatcher_for(handler, None);
    let event = committed(DEPOSITED, json!({ "amount": "lots" }), CorrelationId::new());
    let response = dispatcher.dispatch(handle_request(1, &event)).await;
    assert!(!response.succeeded);
    assert!(response.failure_reason.starts_with("Failure Message: "));
}

#[tokio::test]
async fn test_panicking_handler_is_a_failed_event() {
    let handler = EventHandlerBuilder::new(HANDLER)
        .handle(|_: Deposited, _| async { panic!("ledger on fire") })
        .build()
        .unwrap();
    let dispatcher = handlers::dispatcher_for(handler, None);
    let event = committed(DEPOSITED, json!({ "amount": 1 }), CorrelationId::new());
    let response = dispatcher.dispatch(handle_request(1, &event)).await;
    assert!(!response.succeeded);
    assert!(response.failure_reason.contains("ledger on fire"));
}

fn by_parity(event: &CommittedEvent) -> Result<PartitionedFilterResult, HandlerError> {
    let amount = event.content["amount"]
        .as_u64()
        .ok_or("amount missing")?;
    if amount == 0 {
        return Ok(PartitionedFilterResult::excluded());
    }
    Ok(PartitionedFilterResult::included(PartitionId::from_u128(
        (amount % 2) as u128 + 1,
    )))
}

#[tokio::test]
async fn test_filter_reports_inclusion_and_partition() {
    let dispatcher = filters::dispatcher_for(FILTER, Arc::new(by_parity));

    let odd = committed(DEPOSITED, json!({ "amount": 3 }), CorrelationId::new());
    let response = dispatcher.dispatch(filter_request(7, &odd)).await;
    assert!(response.is_included);
    assert!(response.failure.is_none());
    assert_eq!(response.call_context.unwrap().call_number, 7);
    assert_eq!(
        response.partition_id.unwrap().to_uuid().unwrap(),
        *PartitionId::from_u128(2).as_uuid()
    );

    let zero = committed(DEPOSITED, json!({ "amount": 0 }), CorrelationId::new());
    assert!(!dispatcher.dispatch(filter_request(8, &zero)).await.is_included);
}

#[tokio::test]
async fn test_filter_error_is_reported_as_failure() {
    let dispatcher = filters::dispatcher_for(FILTER, Arc::new(by_parity));
    let event = committed(DEPOSITED, json!({}), CorrelationId::new());
    let response = dispatcher.dispatch(filter_request(1, &event)).await;
    assert!(!response.is_included);
    let failure = response.failure.unwrap();
    assert_eq!(failure.reason, "Failure Message: amount missing\nStack Trace: ");
    assert!(!failure.retry);
}

#[tokio::test]
async fn test_filter_processor_rejects_reserved_id() {
    let (connector, _connections) = channel_connector::<FilterProtocol>(4);
    let client = ReverseCallClient::new(Arc::new(connector), Duration::from_secs(1));
    let processor = FilterProcessor::new(client, execution_context());
    let (_trigger, cancel) = cancellation();
    let err = processor
        .register(EventProcessorId::nil(), ScopeId::DEFAULT, Arc::new(by_parity), cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessorError::IllegalProcessorId(_)));
}

fn handler_registration_response(failure: Option<&str>) -> proto::EventHandlerRuntimeToClientMessage {
    proto::EventHandlerRuntimeToClientMessage {
        message: Some(handler_runtime::Message::RegistrationResponse(
            proto::EventHandlerRegistrationResponse {
                failure: failure.map(|reason| proto::Failure {
                    id: None,
                    reason: reason.to_string(),
                }),
            },
        )),
    }
}

#[tokio::test]
async fn test_handler_processor_retries_failed_registration() {
    let seen = Arc::new(AtomicUsize::new(0));
    let handler = ledger_handler(seen.clone()).build().unwrap();
    let completion = EventProcessingCompletion::new();
    let (connector, mut connections) = channel_connector::<EventHandlerProtocol>(8);
    let client = ReverseCallClient::new(Arc::new(connector), Duration::from_secs(1));
    let state = client.state();
    let processor = EventHandlerProcessor::new(client, execution_context())
        .with_completion(completion.clone())
        .with_backoff(fixed_backoff(Duration::from_millis(10)));
    let (trigger, cancel) = cancellation();
    let task = tokio::spawn(async move { processor.register(handler, cancel).await });

    let mut first = connections.recv().await.unwrap();
    match first.receive().await.unwrap().message {
        Some(handler_client::Message::RegistrationRequest(request)) => {
            assert_eq!(request.event_handler_id, Some(HANDLER.to_proto_uuid()));
            assert_eq!(request.types.len(), 2);
            assert!(request.partitioned);
            assert!(request.call_context.unwrap().ping_interval.is_some());
        }
        other => panic!("expected registration, got {other:?}"),
    }
    first
        .send(handler_registration_response(Some("handler already registered")))
        .await;

    let mut second = connections.recv().await.unwrap();
    assert_ne!(*state.borrow(), crate::reverse_call::ConnectionState::Ready);
    second.receive().await.unwrap();
    second.send(handler_registration_response(None)).await;

    let event = committed(DEPOSITED, json!({ "amount": 2 }), CorrelationId::new());
    second
        .send(proto::EventHandlerRuntimeToClientMessage {
            message: Some(handler_runtime::Message::HandleRequest(handle_request(1, &event))),
        })
        .await;
    match second.receive().await.unwrap().message {
        Some(handler_client::Message::HandleResult(response)) => {
            assert!(response.succeeded);
            assert_eq!(response.call_context.unwrap().call_number, 1);
        }
        other => panic!("expected handle result, got {other:?}"),
    }
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    trigger.cancel();
    task.await.unwrap().unwrap();
    let waiter = completion.register_waiter(CorrelationId::new(), [DEPOSITED.id]);
    assert_eq!(waiter.wait(Duration::from_millis(1)).await, WaitOutcome::Completed);
}

#[tokio::test]
async fn test_filter_processor_reconnects_after_stream_drop() {
    let (connector, mut connections) = channel_connector::<FilterProtocol>(8);
    let client = ReverseCallClient::new(Arc::new(connector), Duration::from_secs(1));
    let processor = FilterProcessor::new(client, execution_context())
        .with_backoff(fixed_backoff(Duration::from_millis(10)));
    let (trigger, cancel) = cancellation();
    let task = tokio::spawn(async move {
        processor
            .register(FILTER, ScopeId::DEFAULT, Arc::new(by_parity), cancel)
            .await
    });

    let accepted = proto::FilterRuntimeToClientMessage {
        message: Some(filter_runtime::Message::RegistrationResponse(
            proto::FilterRegistrationResponse { failure: None },
        )),
    };
    let mut first = connections.recv().await.unwrap();
    first.receive().await.unwrap();
    first.send(accepted.clone()).await;
    drop(first);

    let mut second = connections.recv().await.unwrap();
    match second.receive().await.unwrap().message {
        Some(filter_client::Message::RegistrationRequest(request)) => {
            assert_eq!(request.filter_id, Some(FILTER.to_proto_uuid()));
        }
        other => panic!("expected registration, got {other:?}"),
    }
    second.send(accepted).await;

    trigger.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_public_filter_registers_without_scope_and_filters() {
    let (connector, mut connections) = channel_connector::<PublicFilterProtocol>(8);
    let client = ReverseCallClient::new(Arc::new(connector), Duration::from_secs(1));
    let processor = PublicFilterProcessor::new(client, execution_context());
    let (trigger, cancel) = cancellation();
    let task = tokio::spawn(async move {
        processor.register(FILTER, Arc::new(by_parity), cancel).await
    });

    let mut end = connections.recv().await.unwrap();
    match end.receive().await.unwrap().message {
        Some(public_filter_client::Message::RegistrationRequest(request)) => {
            assert_eq!(request.filter_id, Some(FILTER.to_proto_uuid()));
        }
        other => panic!("expected registration, got {other:?}"),
    }
    end.send(proto::FilterRuntimeToClientMessage {
        message: Some(filter_runtime::Message::RegistrationResponse(
            proto::FilterRegistrationResponse { failure: None },
        )),
    })
    .await;

    let event = committed(DEPOSITED, json!({ "amount": 4 }), CorrelationId::new());
    end.send(proto::FilterRuntimeToClientMessage {
        message: Some(filter_runtime::Message::FilterRequest(filter_request(3, &event))),
    })
    .await;
    match end.receive().await.unwrap().message {
        Some(public_filter_client::Message::FilterResult(response)) => {
            assert!(response.is_included);
            assert_eq!(response.call_context.unwrap().call_number, 3);
        }
        other => panic!("expected filter result, got {other:?}"),
    }

    trigger.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_cancelled_processor_never_connects() {
    let handler = ledger_handler(Arc::new(AtomicUsize::new(0))).build().unwrap();
    let (connector, mut connections) = channel_connector::<EventHandlerProtocol>(8);
    let client = ReverseCallClient::new(Arc::new(connector), Duration::from_secs(1));
    let processor = EventHandlerProcessor::new(client, execution_context());
    let (trigger, cancel) = cancellation();
    trigger.cancel();

    processor.register(handler, cancel).await.unwrap();
    assert!(connections.try_recv().is_err());
}

#[test]
fn test_failure_reason_without_causes_has_empty_trace() {
    let error: HandlerError = "boom".into();
    assert_eq!(
        failure_reason(error.as_ref()),
        "Failure Message: boom\nStack Trace: "
    );
}

fn assert_send<T: Send>(_: &T) {}

#[test]
fn test_registration_futures_can_be_spawned() {
    let (handler_connector, _handlers) = channel_connector::<EventHandlerProtocol>(1);
    let (filter_connector, _filters) = channel_connector::<FilterProtocol>(1);
    let (public_connector, _public) = channel_connector::<PublicFilterProtocol>(1);
    let handlers = EventHandlerProcessor::new(
        ReverseCallClient::new(Arc::new(handler_connector), Duration::from_secs(1)),
        execution_context(),
    );
    let filters = FilterProcessor::new(
        ReverseCallClient::new(Arc::new(filter_connector), Duration::from_secs(1)),
        execution_context(),
    );
    let public = PublicFilterProcessor::new(
        ReverseCallClient::new(Arc::new(public_connector), Duration::from_secs(1)),
        execution_context(),
    );
    let (_trigger, cancel) = cancellation();
    let handler = ledger_handler(Arc::new(AtomicUsize::new(0))).build().unwrap();

    let handling = handlers.register(handler, cancel.clone());
    let filtering = filters.register(FILTER, ScopeId::DEFAULT, Arc::new(by_parity), cancel.clone());
    let public_filtering = public.register(FILTER, Arc::new(by_parity), cancel);

    assert_send(&handling);
    assert_send(&filtering);
    assert_send(&public_filtering);
}

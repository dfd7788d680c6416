//! Event and context conversions.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::events::{
    AggregateRootVersion, Artifact, CommittedAggregateEvent, CommittedAggregateEvents,
    CommittedEvent, EventLogSequenceNumber, EventSourceId, ExecutionContext,
    UncommittedAggregateEvents, UncommittedEvent,
};
use crate::proto;

use super::{id_from_proto, required, ConversionError, Result, UuidExt};

impl From<Artifact> for proto::Artifact {
    fn from(artifact: Artifact) -> Self {
        Self {
            id: Some(artifact.id.to_proto_uuid()),
            generation: artifact.generation,
        }
    }
}

impl TryFrom<&proto::Artifact> for Artifact {
    type Error = ConversionError;

    fn try_from(artifact: &proto::Artifact) -> Result<Self> {
        Ok(Artifact::new(
            id_from_proto(artifact.id.as_ref(), "artifact.id")?,
            artifact.generation,
        ))
    }
}

impl From<ExecutionContext> for proto::ExecutionContext {
    fn from(context: ExecutionContext) -> Self {
        Self {
            microservice_id: Some(context.microservice.to_proto_uuid()),
            tenant_id: Some(context.tenant.to_proto_uuid()),
            correlation_id: Some(context.correlation_id.to_proto_uuid()),
        }
    }
}

impl TryFrom<&proto::ExecutionContext> for ExecutionContext {
    type Error = ConversionError;

    fn try_from(context: &proto::ExecutionContext) -> Result<Self> {
        Ok(ExecutionContext {
            microservice: id_from_proto(
                context.microservice_id.as_ref(),
                "execution_context.microservice_id",
            )?,
            tenant: id_from_proto(context.tenant_id.as_ref(), "execution_context.tenant_id")?,
            correlation_id: id_from_proto(
                context.correlation_id.as_ref(),
                "execution_context.correlation_id",
            )?,
        })
    }
}

pub fn timestamp_to_proto(time: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: time.timestamp(),
        nanos: time.timestamp_subsec_nanos() as i32,
    }
}

pub fn timestamp_from_proto(timestamp: Option<&prost_types::Timestamp>) -> Result<DateTime<Utc>> {
    let timestamp = required(timestamp, "occurred")?;
    let nanos = u32::try_from(timestamp.nanos)
        .map_err(|_| ConversionError::InvalidTimestamp(format!("{timestamp:?}")))?;
    DateTime::from_timestamp(timestamp.seconds, nanos)
        .ok_or_else(|| ConversionError::InvalidTimestamp(format!("{timestamp:?}")))
}

pub fn duration_to_proto(duration: Duration) -> prost_types::Duration {
    prost_types::Duration {
        seconds: duration.as_secs() as i64,
        nanos: duration.subsec_nanos() as i32,
    }
}

fn artifact_from_proto(artifact: Option<&proto::Artifact>, field: &'static str) -> Result<Artifact> {
    Artifact::try_from(required(artifact, field)?)
}

fn context_from_proto(context: Option<&proto::ExecutionContext>) -> Result<ExecutionContext> {
    ExecutionContext::try_from(required(context, "execution_context")?)
}

/// Read an event delivered to a handler or filter.
pub fn committed_event_from_proto(event: &proto::CommittedEvent) -> Result<CommittedEvent> {
    Ok(CommittedEvent {
        event_log_sequence_number: EventLogSequenceNumber::new(event.event_log_sequence_number),
        occurred: timestamp_from_proto(event.occurred.as_ref())?,
        event_source: id_from_proto(event.event_source_id.as_ref(), "event_source_id")?,
        execution_context: context_from_proto(event.execution_context.as_ref())?,
        artifact: artifact_from_proto(event.r#type.as_ref(), "type")?,
        content: serde_json::from_str(&event.content)?,
        public: event.public,
    })
}

impl From<&CommittedEvent> for proto::CommittedEvent {
    fn from(event: &CommittedEvent) -> Self {
        Self {
            event_log_sequence_number: event.event_log_sequence_number.value(),
            occurred: Some(timestamp_to_proto(event.occurred)),
            event_source_id: Some(event.event_source.to_proto_uuid()),
            execution_context: Some(event.execution_context.into()),
            r#type: Some(event.artifact.into()),
            content: event.content.to_string(),
            public: event.public,
        }
    }
}

/// Read a fetched or committed aggregate stream.
///
/// Per-event source and aggregate root are taken from the stream header.
pub fn committed_aggregate_events_from_proto(
    events: &proto::CommittedAggregateEvents,
) -> Result<CommittedAggregateEvents> {
    let event_source: EventSourceId =
        id_from_proto(events.event_source_id.as_ref(), "event_source_id")?;
    let aggregate_root = artifact_from_proto(events.aggregate_root.as_ref(), "aggregate_root")?;
    let committed = events
        .events
        .iter()
        .map(|event| {
            Ok(CommittedAggregateEvent {
                event_log_sequence_number: EventLogSequenceNumber::new(
                    event.event_log_sequence_number,
                ),
                occurred: timestamp_from_proto(event.occurred.as_ref())?,
                event_source,
                aggregate_root,
                aggregate_root_version: AggregateRootVersion::new(event.aggregate_root_version),
                execution_context: context_from_proto(event.execution_context.as_ref())?,
                artifact: artifact_from_proto(event.r#type.as_ref(), "type")?,
                content: serde_json::from_str(&event.content)?,
                public: event.public,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CommittedAggregateEvents::new(
        event_source,
        aggregate_root,
        committed,
    )?)
}

impl From<&CommittedAggregateEvents> for proto::CommittedAggregateEvents {
    fn from(events: &CommittedAggregateEvents) -> Self {
        Self {
            event_source_id: Some(events.event_source().to_proto_uuid()),
            aggregate_root: Some(events.aggregate_root().into()),
            events: events
                .events()
                .iter()
                .map(|event| proto::CommittedAggregateEvent {
                    event_log_sequence_number: event.event_log_sequence_number.value(),
                    occurred: Some(timestamp_to_proto(event.occurred)),
                    execution_context: Some(event.execution_context.into()),
                    r#type: Some(event.artifact.into()),
                    content: event.content.to_string(),
                    public: event.public,
                    aggregate_root_version: event.aggregate_root_version.value(),
                })
                .collect(),
        }
    }
}

impl From<&UncommittedEvent> for proto::UncommittedEvent {
    fn from(event: &UncommittedEvent) -> Self {
        Self {
            r#type: Some(event.artifact.into()),
            content: event.content.to_string(),
            public: event.public,
        }
    }
}

impl From<&UncommittedAggregateEvents> for proto::UncommittedAggregateEvents {
    fn from(events: &UncommittedAggregateEvents) -> Self {
        Self {
            event_source_id: Some(events.event_source.to_proto_uuid()),
            aggregate_root: Some(events.aggregate_root.into()),
            expected_aggregate_root_version: events.expected_aggregate_root_version.value(),
            events: events.events.iter().map(Into::into).collect(),
        }
    }
}

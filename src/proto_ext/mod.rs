//! Conversions between wire messages and domain types.

mod events;
mod uuid;

pub use self::events::{
    committed_aggregate_events_from_proto, committed_event_from_proto, duration_to_proto,
    timestamp_from_proto, timestamp_to_proto,
};
pub use self::uuid::{id_from_proto, ProtoUuidExt, UuidExt};

/// A wire message could not be turned into its domain counterpart.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] ::uuid::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid event content: {0}")]
    InvalidContent(#[from] serde_json::Error),

    #[error(transparent)]
    Events(#[from] crate::events::EventsError),
}

pub type Result<T> = std::result::Result<T, ConversionError>;

pub(crate) fn required<T>(field: Option<T>, name: &'static str) -> Result<T> {
    field.ok_or(ConversionError::MissingField(name))
}

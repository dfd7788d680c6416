//! Identity and ordering value types for the event log.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_identifier!(
    /// Identity of the entity whose history is a sequence of events.
    EventSourceId
);
uuid_identifier!(
    /// Identity of an artifact (event type, command type, aggregate type).
    ArtifactId
);
uuid_identifier!(
    /// Ties one command execution to the events it produced and to handler completions.
    CorrelationId
);
uuid_identifier!(TenantId);
uuid_identifier!(MicroserviceId);
uuid_identifier!(
    /// Routing key assigned by a filter.
    PartitionId
);
uuid_identifier!(
    /// Stable identifier of an event handler or filter.
    EventProcessorId
);
uuid_identifier!(
    /// Producer scope events are read from.
    ScopeId
);
uuid_identifier!(StreamId);

/// Event handlers and filters share the processor id space.
pub type HandlerId = EventProcessorId;
pub type FilterId = EventProcessorId;

impl ScopeId {
    /// The scope committed events land in when no scope is specified.
    pub const DEFAULT: ScopeId = ScopeId::nil();
}

impl StreamId {
    /// The event log itself.
    pub const EVENT_LOG: StreamId = StreamId::nil();
    /// The stream of every event in the log.
    pub const ALL: StreamId = StreamId::from_u128(u128::MAX);

    /// Streams maintained by the runtime that no processor may write to.
    pub fn is_non_writeable(&self) -> bool {
        *self == Self::EVENT_LOG || *self == Self::ALL
    }
}

impl EventProcessorId {
    /// A processor writes to the stream named by its own id, so reserved
    /// stream ids are illegal processor ids.
    pub fn is_reserved(&self) -> bool {
        StreamId::from_uuid(self.0).is_non_writeable()
    }
}

/// A versioned artifact identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub generation: u32,
}

impl Artifact {
    pub const FIRST_GENERATION: u32 = 1;

    pub const fn new(id: ArtifactId, generation: u32) -> Self {
        Self { id, generation }
    }

    /// First-generation artifact from a literal id.
    pub const fn from_u128(id: u128) -> Self {
        Self::new(ArtifactId::from_u128(id), Self::FIRST_GENERATION)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.generation)
    }
}

/// Gapless per-aggregate version. A fresh aggregate is at `INITIAL`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AggregateRootVersion(u64);

impl AggregateRootVersion {
    pub const INITIAL: AggregateRootVersion = AggregateRootVersion(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Saturates at `u64::MAX`; use `checked_next` on untrusted versions.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn checked_next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    pub fn advanced_by(&self, count: usize) -> Self {
        Self(self.0.saturating_add(count as u64))
    }

    pub fn is_initial(&self) -> bool {
        *self == Self::INITIAL
    }
}

impl From<u64> for AggregateRootVersion {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for AggregateRootVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Position of an event in the global event log.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventLogSequenceNumber(u64);

impl EventLogSequenceNumber {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventLogSequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Who is executing, on behalf of which tenant, for which command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub microservice: MicroserviceId,
    pub tenant: TenantId,
    pub correlation_id: CorrelationId,
}

impl ExecutionContext {
    pub fn new(microservice: MicroserviceId, tenant: TenantId) -> Self {
        Self {
            microservice,
            tenant,
            correlation_id: CorrelationId::new(),
        }
    }

    /// Same microservice and tenant, a different command.
    pub fn with_correlation(&self, correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            ..*self
        }
    }
}

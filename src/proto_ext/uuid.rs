//! UUID conversion traits.

use crate::proto::Uuid as ProtoUuid;

use super::{required, Result};

/// Extension trait for the wire UUID.
pub trait ProtoUuidExt {
    fn to_uuid(&self) -> Result<::uuid::Uuid>;
}

impl ProtoUuidExt for ProtoUuid {
    fn to_uuid(&self) -> Result<::uuid::Uuid> {
        Ok(::uuid::Uuid::from_slice(&self.value)?)
    }
}

/// Extension trait for anything that is a UUID underneath.
pub trait UuidExt {
    fn to_proto_uuid(&self) -> ProtoUuid;
}

impl<T> UuidExt for T
where
    T: Copy + Into<::uuid::Uuid>,
{
    fn to_proto_uuid(&self) -> ProtoUuid {
        let uuid: ::uuid::Uuid = (*self).into();
        ProtoUuid {
            value: uuid.as_bytes().to_vec(),
        }
    }
}

/// Read a required identifier field.
pub fn id_from_proto<T>(uuid: Option<&ProtoUuid>, field: &'static str) -> Result<T>
where
    T: From<::uuid::Uuid>,
{
    Ok(T::from(required(uuid, field)?.to_uuid()?))
}

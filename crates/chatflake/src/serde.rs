use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::id::ChatId;

/// Errors raised while decoding IDs from their native integer form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum SerdeError {
    /// The decoded integer sets bits outside the ID layout (the reserved
    /// bit, for [`ChatId`]).
    #[error("decoded id {raw} sets reserved bits")]
    DecodeOverflow { raw: u64 },
}

/// Field adapter serializing any Snowflake ID as its raw integer, for use
/// with `#[serde(with = "chatflake::as_native_id")]`.
pub mod as_native_id {
    use super::{Deserialize, Deserializer, Serialize, Serializer};
    use crate::{SerdeError, SnowflakeId};

    /// Serialize an ID as its native integer representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<ID, S>(id: &ID, s: S) -> Result<S::Ok, S::Error>
    where
        ID: SnowflakeId,
        ID::Ty: Serialize,
        S: Serializer,
    {
        id.to_raw().serialize(s)
    }

    /// Deserialize an ID from its native integer representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the deserializer fails or the value sets bits the
    /// layout reserves.
    pub fn deserialize<'de, ID, D>(d: D) -> Result<ID, D::Error>
    where
        ID: SnowflakeId,
        ID::Ty: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let raw = <ID::Ty>::deserialize(d)?;
        let id = ID::from_raw(raw);
        if !id.is_valid() {
            return Err(serde::de::Error::custom(SerdeError::DecodeOverflow {
                raw: raw.into(),
            }));
        }
        Ok(id)
    }
}

impl Serialize for ChatId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        as_native_id::serialize(self, s)
    }
}

impl<'de> Deserialize<'de> for ChatId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        as_native_id::deserialize(d)
    }
}

//! Metadata codec.
//!
//! Metadata is any JSON-representable value stored next to an entry as
//! serialized JSON bytes, or NULL when the caller supplied none.

use serde::Serialize;

use super::limits::KvLimits;
use crate::error::{Error, Result};

/// Converts a serializable value into JSON metadata.
///
/// # Errors
///
/// Returns [`Error::MetadataNotSerializable`] if the value's `Serialize`
/// implementation fails or produces something JSON cannot represent, such
/// as a map with non-string keys.
pub fn to_metadata<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(Error::MetadataNotSerializable)
}

/// Serializes metadata for storage. `None` is stored as NULL.
pub(crate) fn encode(metadata: Option<&serde_json::Value>) -> Result<Option<Vec<u8>>> {
    let Some(metadata) = metadata else {
        return Ok(None);
    };
    let bytes = serde_json::to_vec(metadata).map_err(Error::MetadataNotSerializable)?;
    KvLimits::check_metadata(bytes.len())?;
    Ok(Some(bytes))
}

/// Deserializes stored metadata. NULL decodes to `None`.
pub(crate) fn decode(bytes: Option<Vec<u8>>) -> Result<Option<serde_json::Value>> {
    bytes
        .map(|b| serde_json::from_slice(&b).map_err(Error::InvalidJson))
        .transpose()
}

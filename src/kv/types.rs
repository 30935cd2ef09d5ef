//! Request options and result shapes of the KV contract.

use serde::Serialize;

use super::codec::KvValue;
use super::metadata::to_metadata;
use crate::error::Result;

/// Options for `put`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutOptions {
    /// Seconds from now until the entry expires. Must be positive.
    pub expiration_ttl: Option<i64>,
    /// Absolute expiry in seconds since the Unix epoch. Must be in the future.
    ///
    /// Ignored when `expiration_ttl` is also set.
    pub expiration: Option<i64>,
    /// JSON metadata stored with the entry.
    pub metadata: Option<serde_json::Value>,
}

impl PutOptions {
    /// Empty options: no expiry, no metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire `seconds` after the write.
    #[must_use]
    pub fn expiration_ttl(mut self, seconds: i64) -> Self {
        self.expiration_ttl = Some(seconds);
        self
    }

    /// Expire at an absolute Unix timestamp.
    #[must_use]
    pub fn expiration(mut self, at: i64) -> Self {
        self.expiration = Some(at);
        self
    }

    /// Attach JSON metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attach any serializable value as metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MetadataNotSerializable`](crate::Error::MetadataNotSerializable)
    /// if the value has no JSON representation.
    pub fn with_metadata<T: Serialize + ?Sized>(self, metadata: &T) -> Result<Self> {
        Ok(self.metadata(to_metadata(metadata)?))
    }
}

/// Options for `list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
    /// Page size; clamped to at least 1. Defaults to 1000.
    pub limit: Option<usize>,
    /// Cursor returned by the previous page.
    pub cursor: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// Result of a single-key `get_with_metadata`.
///
/// A missing key yields `value: None, metadata: None`.
#[derive(Debug)]
pub struct GetWithMetadata {
    pub value: Option<KvValue>,
    pub metadata: Option<serde_json::Value>,
    /// Always `None`; no caching layer exists.
    pub cache_status: Option<String>,
}

/// A present entry in a multi-key `get_with_metadata`.
#[derive(Debug)]
pub struct ValueWithMetadata {
    pub value: KvValue,
    pub metadata: Option<serde_json::Value>,
}

/// Multi-key read result keyed by distinct key in first-occurrence order;
/// absent keys map to `None`.
pub type BatchResult<T> = Vec<(String, Option<T>)>;

/// One key on a `list` page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListKey {
    pub name: String,
    /// Expiry in seconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A page of `list` results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResult {
    pub keys: Vec<ListKey>,
    pub list_complete: bool,
    /// Continuation token; present only when `list_complete` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(rename = "cacheStatus")]
    pub cache_status: Option<String>,
}

impl ListResult {
    /// Key names on this page.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.name.as_str())
    }
}

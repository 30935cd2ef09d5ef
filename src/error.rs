//! Error types for the KV adapter.
//!
//! Every failure the adapter can report is a variant of [`Error`]. Variants
//! are grouped by [`ErrorKind`] so callers can tell a misconfiguration from a
//! rejected request, corrupt stored data, or a failing backing store.

use std::path::PathBuf;

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The adapter was configured with values it cannot use.
    Configuration,
    /// The call was rejected before any statement was issued.
    Validation,
    /// Stored bytes could not be decoded into the requested shape.
    Data,
    /// The relational engine failed.
    BackingStore,
}

/// Adapter errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Table identifier contains characters outside `[A-Za-z0-9_]`.
    #[error(
        "invalid table name {name:?}: allowed characters are A-Z, a-z, 0-9 and _; \
         no spaces, punctuation, unicode or special symbols are permitted"
    )]
    InvalidTableName { name: String },

    /// Configuration file could not be read or parsed.
    #[error("configuration error in {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// Key is empty or exceeds the key size limit.
    #[error("invalid key: {reason}")]
    InvalidKey { reason: String },

    /// Value exceeds the value size limit.
    #[error("value of {size} bytes exceeds the {limit} byte limit")]
    ValueTooLarge { size: usize, limit: usize },

    /// Serialized metadata exceeds the metadata size limit.
    #[error("metadata of {size} bytes exceeds the {limit} byte limit")]
    MetadataTooLarge { size: usize, limit: usize },

    /// Requested read type is not one of the known names.
    #[error(
        "unknown response type {name:?}; possible types are \"text\", \"json\", \"arrayBuffer\" and \"stream\""
    )]
    UnknownValueType { name: String },

    /// Multi-key reads only decode text or JSON.
    #[error("\"{name}\" is not a valid type for multi-key reads; use \"json\" or \"text\"")]
    UnsupportedBatchType { name: &'static str },

    /// `expiration_ttl` was not a positive number of seconds.
    #[error("invalid expiration_ttl of {0}; specify an integer greater than 0 whose expiry fits in an i64 timestamp")]
    InvalidExpirationTtl(i64),

    /// `expiration` was not in the future.
    #[error(
        "invalid expiration of {0}; specify an integer greater than the current number of seconds since the UNIX epoch"
    )]
    InvalidExpiration(i64),

    /// Metadata could not be represented as JSON.
    #[error("metadata could not be serialized to JSON: {0}")]
    MetadataNotSerializable(#[source] serde_json::Error),

    /// Pagination cursor is not a value this adapter issued.
    #[error("invalid list cursor {cursor:?}: {reason}")]
    InvalidCursor { cursor: String, reason: String },

    /// A value stream failed while it was being drained.
    #[error("failed to read value stream: {0}")]
    Stream(#[source] std::io::Error),

    /// Stored value or metadata is not valid JSON.
    #[error("stored data is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Relational engine failure, propagated as-is.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid key error.
    pub fn invalid_key(reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            reason: reason.into(),
        }
    }

    /// Create an invalid cursor error.
    pub fn invalid_cursor(cursor: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidCursor {
            cursor: cursor.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTableName { .. } | Self::Config { .. } => ErrorKind::Configuration,
            Self::InvalidKey { .. }
            | Self::ValueTooLarge { .. }
            | Self::MetadataTooLarge { .. }
            | Self::UnknownValueType { .. }
            | Self::UnsupportedBatchType { .. }
            | Self::InvalidExpirationTtl(_)
            | Self::InvalidExpiration(_)
            | Self::MetadataNotSerializable(_)
            | Self::InvalidCursor { .. }
            | Self::Stream(_) => ErrorKind::Validation,
            Self::InvalidJson(_) => ErrorKind::Data,
            Self::Backend(_) => ErrorKind::BackingStore,
        }
    }
}

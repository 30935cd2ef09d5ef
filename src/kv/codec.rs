//! Value codec.
//!
//! Values arrive as text, owned buffers, shared byte views or byte streams
//! and are stored as one canonical byte sequence. On read the bytes are
//! converted into whichever representation the caller asked for.

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::fmt;
use std::io;
use std::str::FromStr;

use super::limits::KvLimits;
use crate::error::{Error, Result};

/// A stream of value chunks.
pub type ValueStream = BoxStream<'static, io::Result<Bytes>>;

/// A value accepted by `put`.
pub enum PutValue {
    /// UTF-8 text, stored as its bytes.
    Text(String),
    /// An owned byte buffer.
    Buffer(Vec<u8>),
    /// A shared view over bytes.
    View(Bytes),
    /// A byte stream, drained completely before anything is written.
    Stream(ValueStream),
}

impl PutValue {
    /// Wraps any chunk stream.
    pub fn stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self::Stream(stream.boxed())
    }
}

impl fmt::Debug for PutValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Buffer(b) => f.debug_tuple("Buffer").field(&b.len()).finish(),
            Self::View(b) => f.debug_tuple("View").field(&b.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<&str> for PutValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PutValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for PutValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Buffer(b)
    }
}

impl From<&[u8]> for PutValue {
    fn from(b: &[u8]) -> Self {
        Self::Buffer(b.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for PutValue {
    fn from(b: &[u8; N]) -> Self {
        Self::Buffer(b.to_vec())
    }
}

impl From<Bytes> for PutValue {
    fn from(b: Bytes) -> Self {
        Self::View(b)
    }
}

impl From<ValueStream> for PutValue {
    fn from(s: ValueStream) -> Self {
        Self::Stream(s)
    }
}

/// Representation requested by a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// UTF-8 text.
    #[default]
    Text,
    /// Text parsed as JSON.
    Json,
    /// Raw bytes.
    ArrayBuffer,
    /// A single-chunk byte stream.
    Stream,
}

impl ValueType {
    /// Name of the type as used by the KV contract.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::ArrayBuffer => "arrayBuffer",
            Self::Stream => "stream",
        }
    }

    /// Whether multi-key reads may decode into this type.
    pub const fn is_batchable(self) -> bool {
        matches!(self, Self::Text | Self::Json)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "arrayBuffer" => Ok(Self::ArrayBuffer),
            "stream" => Ok(Self::Stream),
            other => Err(Error::UnknownValueType {
                name: other.to_string(),
            }),
        }
    }
}

/// A value returned by a read, in the requested representation.
pub enum KvValue {
    Text(String),
    Json(serde_json::Value),
    ArrayBuffer(Bytes),
    Stream(ValueStream),
}

impl KvValue {
    /// Text content, for [`KvValue::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parsed JSON, for [`KvValue::Json`].
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Raw bytes, for [`KvValue::ArrayBuffer`].
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::ArrayBuffer(b) => Some(b),
            _ => None,
        }
    }

    /// The stream, for [`KvValue::Stream`].
    pub fn into_stream(self) -> Option<ValueStream> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for KvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Self::ArrayBuffer(b) => f.debug_tuple("ArrayBuffer").field(b).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Drains a chunk stream into one buffer.
///
/// Stops early once the value limit is exceeded.
///
/// # Errors
///
/// Returns [`Error::Stream`] if a chunk fails and [`Error::ValueTooLarge`]
/// if the stream yields more than [`KvLimits::MAX_VALUE_SIZE`] bytes.
pub async fn read_stream(mut stream: ValueStream) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.try_next().await.map_err(Error::Stream)? {
        KvLimits::check_value(out.len() + chunk.len())?;
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

/// Converts a value into its stored bytes.
pub(crate) async fn encode(value: PutValue) -> Result<Vec<u8>> {
    let bytes = match value {
        PutValue::Text(s) => s.into_bytes(),
        PutValue::Buffer(b) => b,
        PutValue::View(b) => Vec::from(b),
        PutValue::Stream(s) => read_stream(s).await?,
    };
    KvLimits::check_value(bytes.len())?;
    Ok(bytes)
}

/// Converts stored bytes into the requested representation.
pub(crate) fn decode(bytes: Vec<u8>, value_type: ValueType) -> Result<KvValue> {
    Ok(match value_type {
        ValueType::Text => KvValue::Text(decode_text(bytes)),
        ValueType::Json => {
            KvValue::Json(serde_json::from_slice(&bytes).map_err(Error::InvalidJson)?)
        },
        ValueType::ArrayBuffer => KvValue::ArrayBuffer(Bytes::from(bytes)),
        ValueType::Stream => {
            let chunk: io::Result<Bytes> = Ok(Bytes::from(bytes));
            KvValue::Stream(stream::iter([chunk]).boxed())
        },
    })
}

/// Decodes UTF-8, replacing invalid sequences with U+FFFD.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

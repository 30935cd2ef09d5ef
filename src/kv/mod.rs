//! KV namespace contract over a relational table.
//!
//! Emulates an eventually-consistent key-value service on top of one
//! keyed table:
//!
//! - **Values** are stored as bytes and read back as text, JSON, raw bytes
//!   or a single-chunk stream.
//! - **Expiry** is a TTL relative to the write time. Expired rows stay
//!   invisible to reads until a prune sweep removes them.
//! - **Listing** is a byte-ordered range scan with opaque cursors.
//! - **Namespaces** partition one physical table.
//!
//! # Example
//!
//! ```ignore
//! use sqlkv::kv::{KvNamespace, ListOptions, PutOptions, ValueType};
//! use sqlkv::NamespaceOptions;
//!
//! let kv = KvNamespace::file("data/kv.db", NamespaceOptions::namespace("app"))?;
//! kv.put("user:1", "alice", PutOptions::new()).await?;
//! let page = kv.list(ListOptions::new().prefix("user:").limit(100)).await?;
//! ```

mod codec;
pub mod cursor;
mod limits;
mod metadata;
mod namespace;
mod prune;
mod schema;
mod statements;
mod types;


// Re-export the public API
pub use codec::{KvValue, PutValue, ValueStream, ValueType, read_stream};
pub use limits::KvLimits;
pub use metadata::to_metadata;
pub use namespace::KvNamespace;
pub use prune::PrunePolicy;
pub use schema::SchemaState;
pub use types::{
    BatchResult, GetWithMetadata, ListKey, ListOptions, ListResult, PutOptions,
    ValueWithMetadata,
};

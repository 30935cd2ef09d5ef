//! KV namespace contract on top of a relational table.
//!
//! Client code written against an eventually-consistent key-value service
//! (`get`, `get_with_metadata`, `put`, `delete`, `list`) runs unchanged
//! against a relational backend. The crate is organized as:
//!
//! - [`kv`] - The namespace façade and its codecs
//! - [`sql`] - The relational engine seam and the SQLite backend
//! - [`config`] - Namespace options and TOML loading
//! - [`clock`] - Time source for expiration decisions
//! - [`error`] - Typed errors

pub mod clock;
pub mod config;
pub mod error;
pub mod kv;
pub mod sql;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{NamespaceOptions, PruneTrigger, TableName, TableOptions};
pub use error::{Error, ErrorKind, Result};
pub use kv::{
    GetWithMetadata, KvNamespace, KvValue, ListKey, ListOptions, ListResult, PutOptions,
    PutValue, SchemaState, ValueType,
};

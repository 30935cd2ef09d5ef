//! Relational engine seam with pluggable backends.
//!
//! The KV adapter only needs four primitives from an engine: prepare a
//! parameterized statement, execute one bound statement, execute a list of
//! bound statements as one atomic batch, and fetch one row or all rows.
//!
//! # Example
//!
//! ```ignore
//! use sqlkv::sql::{SqlBackend, SqliteBackend};
//!
//! let backend = SqliteBackend::open("data/kv.db")?;
//! let get = backend.prepare("SELECT value FROM kv WHERE key = ?1");
//! let row = backend.first(&get.bind(["greeting"])).await?;
//! ```
//!
//! # Custom Backends
//!
//! Implement the `SqlBackend` trait to run the adapter on another engine:
//!
//! ```ignore
//! use sqlkv::sql::SqlBackend;
//!
//! struct D1Backend { /* ... */ }
//! impl SqlBackend for D1Backend { /* ... */ }
//! ```

mod backend;
mod sqlite;
mod statement;
mod types;

pub use backend::SqlBackend;
pub use sqlite::SqliteBackend;
pub use statement::{PreparedStatement, Statement};
pub use types::{Row, StatementResult, Value};

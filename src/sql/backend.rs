//! Backend trait for the SQL layer.
//!
//! Defines the primitives the KV adapter consumes from a relational engine,
//! enabling pluggable storage (SQLite, D1-style remote engines, etc.).

use super::statement::{PreparedStatement, Statement};
use super::types::{Row, StatementResult};
use anyhow::Result;
use async_trait::async_trait;

/// Backend trait for relational storage.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// Failures are returned as-is; the adapter never retries them.
///
/// # Example
///
/// ```ignore
/// use sqlkv::sql::{SqlBackend, SqliteBackend};
///
/// let backend = SqliteBackend::memory()?;
/// backend.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)").await?;
/// let insert = backend.prepare("INSERT INTO users (name) VALUES (?1)");
/// backend.execute(&insert.bind(["Alice"])).await?;
/// ```
#[async_trait]
pub trait SqlBackend: Send + Sync + 'static {
    /// Prepares a parameterized statement template.
    ///
    /// Preparation is lazy: the engine compiles the SQL on first execution
    /// and caches the compiled form, so templates may reference tables that
    /// do not exist yet.
    fn prepare(&self, sql: &str) -> PreparedStatement {
        PreparedStatement::new(sql)
    }

    /// Executes a statement and returns all rows.
    ///
    /// # Errors
    ///
    /// Returns an error if execution or result fetching fails.
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>>;

    /// Executes a statement and returns the first row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if execution or result fetching fails.
    async fn first(&self, statement: &Statement) -> Result<Option<Row>> {
        Ok(self.query(statement).await?.into_iter().next())
    }

    /// Executes an INSERT, UPDATE or DELETE and returns the change count.
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails (constraint violation, SQL error).
    async fn execute(&self, statement: &Statement) -> Result<usize>;

    /// Executes a semicolon-separated script without parameters.
    ///
    /// Use only with trusted SQL such as schema definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement in the script fails.
    async fn execute_batch(&self, sql: &str) -> Result<()>;

    /// Executes statements atomically in a single transaction.
    ///
    /// Returns one result per statement, in order. All statements succeed
    /// or all are rolled back.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    async fn batch(&self, statements: Vec<Statement>) -> Result<Vec<StatementResult>>;
}

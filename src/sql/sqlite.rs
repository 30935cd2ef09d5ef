//! SQLite-backed SQL storage backend.
//!
//! Provides persistent or in-memory SQL storage using rusqlite.

use super::backend::SqlBackend;
use super::statement::Statement;
use super::types::{Row, StatementResult, Value};
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, params_from_iter};
use std::path::Path;
use std::sync::Arc;

/// Compiled statements kept per connection.
const STATEMENT_CACHE_CAPACITY: usize = 64;

/// SQLite-backed SQL storage backend.
///
/// # Thread Safety
///
/// `SqliteBackend` is `Clone` and can be shared across threads. The single
/// underlying connection is protected by a Mutex and every call runs on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Opens or creates a SQLite database at the given path.
    ///
    /// Creates parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory cannot be created
    /// - Database file cannot be opened (permissions, corruption, etc.)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database: {}", path.display()))?;

        Ok(Self::from_connection(conn))
    }

    /// Creates a new in-memory SQLite database.
    ///
    /// All data is lost when the backend is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory SQLite database")?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn query_sync(&self, statement: &Statement) -> Result<Vec<Row>> {
        let conn = self.conn.lock();
        Ok(run(&conn, statement)?.rows)
    }

    fn execute_sync(&self, statement: &Statement) -> Result<usize> {
        let conn = self.conn.lock();
        Ok(run(&conn, statement)?.changes)
    }

    fn execute_batch_sync(&self, sql: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(sql)
            .with_context(|| format!("Failed to execute batch: {sql}"))
    }

    fn batch_sync(&self, statements: &[Statement]) -> Result<Vec<StatementResult>> {
        let mut conn = self.conn.lock();

        // Dropping the transaction without commit rolls it back.
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let results = statements
            .iter()
            .map(|statement| run(&tx, statement))
            .collect::<Result<Vec<_>>>()?;

        tx.commit().context("Failed to commit transaction")?;

        Ok(results)
    }
}

/// Runs one bound statement, collecting rows for reads and the change count
/// for writes.
fn run(conn: &Connection, statement: &Statement) -> Result<StatementResult> {
    let sql = statement.sql();
    let mut stmt = conn
        .prepare_cached(sql)
        .with_context(|| format!("Failed to prepare statement: {sql}"))?;
    let params = params_from_iter(statement.params().iter());

    let column_count = stmt.column_count();
    if column_count == 0 {
        let changes = stmt
            .execute(params)
            .with_context(|| format!("Failed to execute statement: {sql}"))?;
        return Ok(StatementResult {
            rows: Vec::new(),
            changes,
        });
    }

    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    let mut cursor = stmt
        .query(params)
        .with_context(|| format!("Failed to execute query: {sql}"))?;
    while let Some(row) = cursor.next().context("Failed to fetch query results")? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(Value::from(row.get_ref(i)?));
        }
        rows.push(Row::new(column_names.clone(), values));
    }

    Ok(StatementResult { rows, changes: 0 })
}

#[async_trait]
impl SqlBackend for SqliteBackend {
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>> {
        let backend = self.clone();
        let statement = statement.clone();
        tokio::task::spawn_blocking(move || backend.query_sync(&statement))
            .await
            .context("Task join error")?
    }

    async fn execute(&self, statement: &Statement) -> Result<usize> {
        let backend = self.clone();
        let statement = statement.clone();
        tokio::task::spawn_blocking(move || backend.execute_sync(&statement))
            .await
            .context("Task join error")?
    }

    async fn execute_batch(&self, sql: &str) -> Result<()> {
        let backend = self.clone();
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || backend.execute_batch_sync(&sql))
            .await
            .context("Task join error")?
    }

    async fn batch(&self, statements: Vec<Statement>) -> Result<Vec<StatementResult>> {
        let backend = self.clone();
        tokio::task::spawn_blocking(move || backend.batch_sync(&statements))
            .await
            .context("Task join error")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn users() -> SqliteBackend {
        let backend = SqliteBackend::memory().unwrap();
        backend
            .execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)")
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_execute_and_query() {
        let backend = users().await;
        let insert = backend.prepare("INSERT INTO users (name) VALUES (?1)");
        assert_eq!(backend.execute(&insert.bind(["alice"])).await.unwrap(), 1);
        assert_eq!(backend.execute(&insert.bind(["bob"])).await.unwrap(), 1);

        let select = backend.prepare("SELECT name FROM users ORDER BY name");
        let rows = backend.query(&select.bind_none()).await.unwrap();
        let names: Vec<_> = rows.iter().filter_map(|r| r.text("name")).collect();
        assert_eq!(names, vec!["alice", "bob"]);

        let first = backend.first(&select.bind_none()).await.unwrap().unwrap();
        assert_eq!(first.text("name"), Some("alice"));
    }

    #[tokio::test]
    async fn test_batch_returns_results_in_order() {
        let backend = users().await;
        let insert = backend.prepare("INSERT INTO users (name) VALUES (?1)");
        let select = backend.prepare("SELECT name FROM users WHERE name = ?1");

        let results = backend
            .batch(vec![
                insert.bind(["carol"]),
                select.bind(["carol"]),
                select.bind(["nobody"]),
            ])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].changes, 1);
        assert_eq!(results[1].rows.len(), 1);
        assert!(results[2].rows.is_empty());
    }

    #[tokio::test]
    async fn test_batch_rolls_back_on_error() {
        let backend = users().await;
        let insert = backend.prepare("INSERT INTO users (name) VALUES (?1)");

        let err = backend
            .batch(vec![insert.bind(["dave"]), insert.bind(["dave"])])
            .await;
        assert!(err.is_err());

        let count = backend
            .first(&backend.prepare("SELECT COUNT(*) AS n FROM users").bind_none())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(count.integer("n"), Some(0));
    }

    #[tokio::test]
    async fn test_missing_table_is_engine_error() {
        let backend = SqliteBackend::memory().unwrap();
        let select = backend.prepare("SELECT * FROM nowhere");
        let err = backend.query(&select.bind_none()).await.unwrap_err();
        assert!(format!("{err:#}").contains("no such table"));
    }

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("dir").join("kv.db");
        let backend = SqliteBackend::open(&path).unwrap();
        backend.execute_batch("CREATE TABLE t (x)").await.unwrap();
        assert!(path.exists());
    }
}

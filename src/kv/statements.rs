//! Statement set for one backing table.
//!
//! Every statement is scoped by namespace. Statements that depend on the
//! current time take it as a bound parameter, so one call observes a single
//! instant across all of its statements.
//!
//! Keys compare with `COLLATE BINARY`, which orders UTF-8 text byte-wise
//! regardless of locale.

use crate::config::TableName;
use crate::sql::{PreparedStatement, SqlBackend};

/// Schema for a backing table and its prune index.
///
/// `expires_at` is a generated column, recomputed from `created_at` and
/// `ttl_seconds` whenever either changes.
pub(crate) fn schema_sql(table: &TableName) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            namespace   TEXT    NOT NULL COLLATE BINARY,
            key         TEXT    NOT NULL COLLATE BINARY,
            value       BLOB    NOT NULL,
            ttl_seconds INTEGER,
            created_at  INTEGER NOT NULL,
            expires_at  INTEGER GENERATED ALWAYS AS (
                CASE WHEN ttl_seconds IS NULL THEN NULL ELSE created_at + ttl_seconds END
            ) VIRTUAL,
            metadata    BLOB,
            PRIMARY KEY (namespace, key)
        ) WITHOUT ROWID;

        CREATE INDEX IF NOT EXISTS {table}_ns_exp_idx
            ON {table}(namespace, expires_at);"
    )
}

fn get_sql(table: &TableName) -> String {
    format!(
        "SELECT value
        FROM {table}
        WHERE namespace = ?1
          AND key = ?2
          AND (expires_at IS NULL OR expires_at > ?3)"
    )
}

fn get_with_metadata_sql(table: &TableName) -> String {
    format!(
        "SELECT value, metadata
        FROM {table}
        WHERE namespace = ?1
          AND key = ?2
          AND (expires_at IS NULL OR expires_at > ?3)"
    )
}

fn list_sql(table: &TableName) -> String {
    format!(
        "SELECT key, expires_at, metadata
        FROM {table}
        WHERE namespace = ?1
          AND (expires_at IS NULL OR expires_at > ?2)
          AND key >= ?3
          AND key < ?4
          AND key > ?5
        ORDER BY key COLLATE BINARY
        LIMIT ?6"
    )
}

fn put_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {table} (namespace, key, value, ttl_seconds, created_at, metadata)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(namespace, key) DO UPDATE SET
            value       = excluded.value,
            ttl_seconds = excluded.ttl_seconds,
            created_at  = excluded.created_at,
            metadata    = excluded.metadata"
    )
}

fn delete_sql(table: &TableName) -> String {
    format!(
        "DELETE FROM {table}
        WHERE namespace = ?1
          AND key = ?2"
    )
}

fn prune_expired_sql(table: &TableName) -> String {
    format!(
        "DELETE FROM {table}
        WHERE namespace = ?1
          AND expires_at IS NOT NULL
          AND expires_at <= ?2"
    )
}

/// Prepared statements for one table, built once per namespace.
///
/// Parameters, in order:
///
/// | statement           | parameters                                             |
/// |---------------------|--------------------------------------------------------|
/// | `get`               | namespace, key, now                                    |
/// | `get_with_metadata` | namespace, key, now                                    |
/// | `list`              | namespace, now, lower, upper, start_after, limit       |
/// | `put`               | namespace, key, value, ttl_seconds, created_at, metadata |
/// | `delete`            | namespace, key                                         |
/// | `prune_expired`     | namespace, now                                         |
#[derive(Debug, Clone)]
pub(crate) struct StatementSet {
    pub get: PreparedStatement,
    pub get_with_metadata: PreparedStatement,
    pub list: PreparedStatement,
    pub put: PreparedStatement,
    pub delete: PreparedStatement,
    pub prune_expired: PreparedStatement,
}

impl StatementSet {
    pub fn prepare(backend: &dyn SqlBackend, table: &TableName) -> Self {
        tracing::debug!(table = %table, "Preparing KV statement set");
        Self {
            get: backend.prepare(&get_sql(table)),
            get_with_metadata: backend.prepare(&get_with_metadata_sql(table)),
            list: backend.prepare(&list_sql(table)),
            put: backend.prepare(&put_sql(table)),
            delete: backend.prepare(&delete_sql(table)),
            prune_expired: backend.prepare(&prune_expired_sql(table)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::SqliteBackend;

    #[test]
    fn test_statements_target_table() {
        let backend = SqliteBackend::memory().unwrap();
        let table = TableName::parse("custom_kv").unwrap();
        let set = StatementSet::prepare(&backend, &table);

        for sql in [
            set.get.sql(),
            set.get_with_metadata.sql(),
            set.list.sql(),
            set.delete.sql(),
            set.prune_expired.sql(),
        ] {
            assert!(sql.contains("custom_kv"), "{sql}");
            assert!(sql.contains("namespace = ?1"), "{sql}");
        }

        let upsert = set.put.sql();
        assert!(upsert.contains("INSERT INTO custom_kv"), "{upsert}");
        assert!(upsert.contains("ON CONFLICT(namespace, key)"), "{upsert}");
        assert!(schema_sql(&table).contains("custom_kv_ns_exp_idx"));
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let backend = SqliteBackend::memory().unwrap();
        let table = TableName::parse("kv").unwrap();
        backend.execute_batch(&schema_sql(&table)).await.unwrap();
        backend.execute_batch(&schema_sql(&table)).await.unwrap();
    }

    #[tokio::test]
    async fn test_expires_at_follows_created_at() {
        let backend = SqliteBackend::memory().unwrap();
        let table = TableName::parse("kv").unwrap();
        backend.execute_batch(&schema_sql(&table)).await.unwrap();
        let set = StatementSet::prepare(&backend, &table);
        let read = backend.prepare("SELECT expires_at FROM kv WHERE namespace = ?1 AND key = ?2");

        let put = |ttl: Option<i64>, at: i64| {
            set.put.bind([
                "ns".into(),
                "k".into(),
                crate::sql::Value::Blob(b"v".to_vec()),
                ttl.into(),
                at.into(),
                crate::sql::Value::Null,
            ])
        };

        backend.execute(&put(Some(10), 100)).await.unwrap();
        let row = backend.first(&read.bind(["ns", "k"])).await.unwrap().unwrap();
        assert_eq!(row.integer("expires_at"), Some(110));

        backend.execute(&put(Some(10), 200)).await.unwrap();
        let row = backend.first(&read.bind(["ns", "k"])).await.unwrap().unwrap();
        assert_eq!(row.integer("expires_at"), Some(210));

        backend.execute(&put(None, 300)).await.unwrap();
        let row = backend.first(&read.bind(["ns", "k"])).await.unwrap().unwrap();
        assert!(row.get("expires_at").unwrap().is_null());
    }
}

//! Namespace façade.
//!
//! Each call validates its input, makes sure the schema exists, binds the
//! prepared statements, runs them and reshapes rows into KV results,
//! optionally followed by an expired-row sweep.

use anyhow::anyhow;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use super::codec::{self, KvValue, PutValue, ValueType};
use super::cursor;
use super::limits::KvLimits;
use super::metadata;
use super::prune::PrunePolicy;
use super::schema::{SchemaBootstrapper, SchemaState};
use super::statements::StatementSet;
use super::types::{
    BatchResult, GetWithMetadata, ListKey, ListOptions, ListResult, PutOptions,
    ValueWithMetadata,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{NamespaceOptions, PruneTrigger, TableName};
use crate::error::{Error, Result};
use crate::sql::{Row, SqlBackend, SqliteBackend, Statement, Value};

/// Appended to a prefix to form an exclusive upper bound that sorts after
/// every key starting with the prefix.
const PREFIX_UPPER_BOUND: char = '\u{10FFFF}';

/// A KV namespace stored in one relational table.
///
/// # Thread Safety
///
/// `KvNamespace` is `Clone` and can be shared across tasks. Clones share the
/// prepared statements and the schema bootstrap state.
///
/// # Example
///
/// ```ignore
/// use sqlkv::{KvNamespace, NamespaceOptions, PutOptions, ValueType};
///
/// let kv = KvNamespace::memory(NamespaceOptions::namespace("sessions"))?;
/// kv.put("session:123", "user_data", PutOptions::new().expiration_ttl(3600)).await?;
///
/// if let Some(value) = kv.get("session:123", ValueType::Text).await? {
///     println!("Found: {value:?}");
/// }
/// ```
#[derive(Clone)]
pub struct KvNamespace {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn SqlBackend>,
    options: NamespaceOptions,
    statements: StatementSet,
    schema: SchemaBootstrapper,
    prune: PrunePolicy,
    clock: Arc<dyn Clock>,
}

impl KvNamespace {
    /// Creates a namespace over any backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTableName`] if the configured table name is not
    /// a safe identifier.
    pub fn new<B: SqlBackend>(backend: B, options: NamespaceOptions) -> Result<Self> {
        Self::with_clock(Arc::new(backend), options, Arc::new(SystemClock))
    }

    /// Creates a namespace over an in-memory SQLite database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or the table name
    /// is invalid.
    pub fn memory(options: NamespaceOptions) -> Result<Self> {
        Self::new(SqliteBackend::memory()?, options)
    }

    /// Creates a namespace over a file-backed SQLite database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the table name
    /// is invalid.
    pub fn file<P: AsRef<Path>>(path: P, options: NamespaceOptions) -> Result<Self> {
        Self::new(SqliteBackend::open(path)?, options)
    }

    /// Creates a namespace with an explicit backend handle and clock.
    ///
    /// Several namespaces may share one backend handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTableName`] if the configured table name is not
    /// a safe identifier.
    pub fn with_clock(
        backend: Arc<dyn SqlBackend>,
        options: NamespaceOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let table = TableName::parse(&options.table.name)?;
        let statements = StatementSet::prepare(backend.as_ref(), &table);
        let schema = SchemaBootstrapper::new(Arc::clone(&backend), table, options.table.auto_create);
        let prune = PrunePolicy::new(options.prune_on.iter().copied());

        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                options,
                statements,
                schema,
                prune,
                clock,
            }),
        })
    }

    /// Resolved configuration.
    pub fn options(&self) -> &NamespaceOptions {
        &self.inner.options
    }

    /// Schema bootstrap progress.
    pub fn schema_state(&self) -> SchemaState {
        self.inner.schema.state()
    }

    /// Operations followed by an expired-row sweep.
    pub fn prune_policy(&self) -> PrunePolicy {
        self.inner.prune
    }

    fn namespace(&self) -> Value {
        Value::Text(self.inner.options.namespace.clone())
    }

    /// Reads one key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist or has expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, the stored value cannot be
    /// decoded as `value_type`, or the backing store fails.
    pub async fn get(&self, key: &str, value_type: ValueType) -> Result<Option<KvValue>> {
        KvLimits::check_key(key)?;
        self.inner.schema.ensure().await?;

        let now = self.inner.clock.now_secs();
        let statement = self.point_lookup(false, key, now);
        let value = match self.inner.backend.first(&statement).await? {
            Some(mut row) => Some(codec::decode(take_bytes(&mut row, "value")?, value_type)?),
            None => None,
        };

        self.prune_after(PruneTrigger::Get, now).await?;
        Ok(value)
    }

    /// Reads several keys in one atomic batch.
    ///
    /// The result holds one entry per distinct requested key, in the order
    /// each key first appears, with `None` for keys that don't exist or have
    /// expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedBatchType`] unless `value_type` is text or
    /// JSON, plus the errors of [`get`](Self::get).
    pub async fn get_many<K: AsRef<str>>(
        &self,
        keys: &[K],
        value_type: ValueType,
    ) -> Result<BatchResult<KvValue>> {
        let rows = self
            .batch_lookup(keys, value_type, false, PruneTrigger::Get)
            .await?;

        rows.into_iter()
            .map(|(key, row)| {
                let value = match row {
                    Some(mut row) => Some(codec::decode(take_bytes(&mut row, "value")?, value_type)?),
                    None => None,
                };
                Ok((key, value))
            })
            .collect()
    }

    /// Reads one key together with its metadata.
    ///
    /// A missing key yields a result whose value and metadata are both
    /// `None`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get); corrupt metadata is a data error.
    pub async fn get_with_metadata(
        &self,
        key: &str,
        value_type: ValueType,
    ) -> Result<GetWithMetadata> {
        KvLimits::check_key(key)?;
        self.inner.schema.ensure().await?;

        let now = self.inner.clock.now_secs();
        let statement = self.point_lookup(true, key, now);
        let result = match self.inner.backend.first(&statement).await? {
            Some(row) => {
                let found = decode_with_metadata(row, value_type)?;
                GetWithMetadata {
                    value: Some(found.value),
                    metadata: found.metadata,
                    cache_status: None,
                }
            },
            None => GetWithMetadata {
                value: None,
                metadata: None,
                cache_status: None,
            },
        };

        self.prune_after(PruneTrigger::GetWithMetadata, now).await?;
        Ok(result)
    }

    /// Reads several keys with metadata in one atomic batch.
    ///
    /// # Errors
    ///
    /// Same as [`get_many`](Self::get_many).
    pub async fn get_many_with_metadata<K: AsRef<str>>(
        &self,
        keys: &[K],
        value_type: ValueType,
    ) -> Result<BatchResult<ValueWithMetadata>> {
        let rows = self
            .batch_lookup(keys, value_type, true, PruneTrigger::GetWithMetadata)
            .await?;

        rows.into_iter()
            .map(|(key, row)| {
                let value = row
                    .map(|row| decode_with_metadata(row, value_type))
                    .transpose()?;
                Ok((key, value))
            })
            .collect()
    }

    /// Lists live keys in byte-wise order, one page at a time.
    ///
    /// Pass the returned cursor, with the same prefix and limit, to fetch the
    /// next page. A page that ends the scan has `list_complete` set and no
    /// cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursor`] for a cursor this adapter didn't
    /// issue, a data error for corrupt metadata, or the backing store's
    /// error.
    pub async fn list(&self, options: ListOptions) -> Result<ListResult> {
        let start_after = match options.cursor.as_deref() {
            Some(c) if !c.is_empty() => cursor::decode(c)?,
            _ => String::new(),
        };
        let prefix = options.prefix.unwrap_or_default();
        let upper = format!("{prefix}{PREFIX_UPPER_BOUND}");
        let limit = options.limit.unwrap_or(KvLimits::MAX_LIST_KEYS).max(1);
        let fetch = i64::try_from(limit.saturating_add(1)).unwrap_or(i64::MAX);

        self.inner.schema.ensure().await?;

        let now = self.inner.clock.now_secs();
        let statement = self.inner.statements.list.bind([
            self.namespace(),
            Value::Integer(now),
            Value::Text(prefix),
            Value::Text(upper),
            Value::Text(start_after),
            Value::Integer(fetch),
        ]);
        let mut rows = self.inner.backend.query(&statement).await?;

        let has_more = rows.len() > limit;
        rows.truncate(limit);

        let keys = rows
            .into_iter()
            .map(|mut row| {
                let name = match row.take("key") {
                    Some(Value::Text(name)) => name,
                    _ => return Err(missing_column("key")),
                };
                Ok(ListKey {
                    name,
                    expiration: row.integer("expires_at"),
                    metadata: metadata::decode(row.take_bytes("metadata"))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let cursor = if has_more {
            keys.last().map(|k| cursor::encode(&k.name))
        } else {
            None
        };

        self.prune_after(PruneTrigger::List, now).await?;

        Ok(ListResult {
            keys,
            list_complete: !has_more,
            cursor,
            cache_status: None,
        })
    }

    /// Writes a value, replacing any existing entry for the key.
    ///
    /// Value, expiry and metadata are written together as one row; nothing
    /// is kept from a previous write. Re-putting a key restarts its TTL from
    /// the new write time.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid key, non-positive
    /// `expiration_ttl`, past `expiration`, oversized value or metadata, or
    /// a failing value stream; otherwise the backing store's error.
    pub async fn put(
        &self,
        key: &str,
        value: impl Into<PutValue>,
        options: PutOptions,
    ) -> Result<()> {
        KvLimits::check_key(key)?;
        if let Some(ttl) = options.expiration_ttl
            && ttl <= 0
        {
            return Err(Error::InvalidExpirationTtl(ttl));
        }
        let metadata = metadata::encode(options.metadata.as_ref())?;
        let bytes = codec::encode(value.into()).await?;

        let now = self.inner.clock.now_secs();
        let ttl_seconds = match (options.expiration_ttl, options.expiration) {
            (Some(ttl), _) => Some(ttl),
            (None, Some(at)) if at <= now => return Err(Error::InvalidExpiration(at)),
            (None, Some(at)) => Some(at.checked_sub(now).ok_or(Error::InvalidExpiration(at))?),
            (None, None) => None,
        };
        // expires_at must stay an integer column.
        if let Some(ttl) = ttl_seconds
            && now.checked_add(ttl).is_none()
        {
            return Err(Error::InvalidExpirationTtl(ttl));
        }

        self.inner.schema.ensure().await?;

        let upsert = self.inner.statements.put.bind([
            self.namespace(),
            Value::from(key),
            Value::Blob(bytes),
            Value::from(ttl_seconds),
            Value::Integer(now),
            Value::from(metadata),
        ]);
        self.write_then_prune(upsert, PruneTrigger::Put, now).await
    }

    /// Removes a key. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backing store fails.
    pub async fn delete(&self, key: &str) -> Result<()> {
        KvLimits::check_key(key)?;
        self.inner.schema.ensure().await?;

        let now = self.inner.clock.now_secs();
        let delete = self
            .inner
            .statements
            .delete
            .bind([self.namespace(), Value::from(key)]);
        self.write_then_prune(delete, PruneTrigger::Delete, now)
            .await
    }

    /// Physically removes every expired entry in this namespace.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn prune_expired(&self) -> Result<u64> {
        self.inner.schema.ensure().await?;
        let now = self.inner.clock.now_secs();
        let removed = self
            .inner
            .backend
            .execute(&self.prune_statement(now))
            .await?;
        Ok(log_pruned(removed, now))
    }

    fn point_lookup(&self, with_metadata: bool, key: &str, now: i64) -> Statement {
        let prepared = if with_metadata {
            &self.inner.statements.get_with_metadata
        } else {
            &self.inner.statements.get
        };
        prepared.bind([self.namespace(), Value::from(key), Value::Integer(now)])
    }

    fn prune_statement(&self, now: i64) -> Statement {
        self.inner
            .statements
            .prune_expired
            .bind([self.namespace(), Value::Integer(now)])
    }

    /// Looks up every distinct key in one atomic batch, pairing each key with
    /// its row in first-occurrence order.
    async fn batch_lookup<K: AsRef<str>>(
        &self,
        keys: &[K],
        value_type: ValueType,
        with_metadata: bool,
        trigger: PruneTrigger,
    ) -> Result<Vec<(String, Option<Row>)>> {
        if !value_type.is_batchable() {
            return Err(Error::UnsupportedBatchType {
                name: value_type.as_str(),
            });
        }
        let mut seen = HashSet::with_capacity(keys.len());
        let mut unique = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            KvLimits::check_key(key)?;
            if seen.insert(key) {
                unique.push(key);
            }
        }
        self.inner.schema.ensure().await?;

        let now = self.inner.clock.now_secs();
        let statements = unique
            .iter()
            .map(|k| self.point_lookup(with_metadata, k, now))
            .collect();
        let results = if unique.is_empty() {
            Vec::new()
        } else {
            self.inner.backend.batch(statements).await?
        };

        let rows = unique
            .into_iter()
            .zip(results.into_iter().map(|r| r.first()).chain(std::iter::repeat(None)))
            .map(|(key, row)| (key.to_string(), row))
            .collect();

        self.prune_after(trigger, now).await?;
        Ok(rows)
    }

    /// Runs a write, adding the expired-row sweep to the same atomic batch
    /// when the policy asks for it.
    async fn write_then_prune(
        &self,
        write: Statement,
        trigger: PruneTrigger,
        now: i64,
    ) -> Result<()> {
        if !self.inner.prune.prunes_after(trigger) {
            self.inner.backend.execute(&write).await?;
            return Ok(());
        }

        let results = self
            .inner
            .backend
            .batch(vec![write, self.prune_statement(now)])
            .await?;
        if let Some(sweep) = results.get(1) {
            log_pruned(sweep.changes, now);
        }
        Ok(())
    }

    /// Sweeps expired rows after a read when the policy asks for it.
    async fn prune_after(&self, trigger: PruneTrigger, now: i64) -> Result<()> {
        if self.inner.prune.prunes_after(trigger) {
            let removed = self
                .inner
                .backend
                .execute(&self.prune_statement(now))
                .await?;
            log_pruned(removed, now);
        }
        Ok(())
    }
}

fn log_pruned(removed: usize, now: i64) -> u64 {
    if removed > 0 {
        tracing::info!(removed, now, "Pruned expired KV entries");
    } else {
        tracing::debug!(now, "No expired KV entries to prune");
    }
    removed as u64
}

fn missing_column(column: &str) -> Error {
    Error::Backend(anyhow!("KV row is missing the {column} column"))
}

fn take_bytes(row: &mut Row, column: &str) -> Result<Vec<u8>> {
    row.take_bytes(column).ok_or_else(|| missing_column(column))
}

fn decode_with_metadata(mut row: Row, value_type: ValueType) -> Result<ValueWithMetadata> {
    let value = codec::decode(take_bytes(&mut row, "value")?, value_type)?;
    let metadata = metadata::decode(row.take_bytes("metadata"))?;
    Ok(ValueWithMetadata { value, metadata })
}

//! Schema bootstrapper.
//!
//! Creates the backing table and its index at most once per namespace
//! instance. Concurrent first callers share one in-flight bootstrap.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::OnceCell;

use super::statements::schema_sql;
use crate::config::TableName;
use crate::error::Result;
use crate::sql::SqlBackend;

/// Bootstrap progress of a namespace instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// No caller has needed the table yet.
    NotStarted,
    /// The DDL is running.
    Bootstrapping,
    /// The table exists, or bootstrap is disabled.
    Ready,
}

const NOT_STARTED: u8 = 0;
const BOOTSTRAPPING: u8 = 1;
const READY: u8 = 2;

/// Runs the schema DDL exactly once.
///
/// Failed attempts leave the state at [`SchemaState::NotStarted`] so a later
/// call can try again.
pub(crate) struct SchemaBootstrapper {
    backend: Arc<dyn SqlBackend>,
    table: TableName,
    enabled: bool,
    ready: OnceCell<()>,
    state: AtomicU8,
}

impl SchemaBootstrapper {
    pub fn new(backend: Arc<dyn SqlBackend>, table: TableName, enabled: bool) -> Self {
        let state = if enabled { NOT_STARTED } else { READY };
        Self {
            backend,
            table,
            enabled,
            ready: OnceCell::new(),
            state: AtomicU8::new(state),
        }
    }

    /// Current bootstrap state.
    pub fn state(&self) -> SchemaState {
        match self.state.load(Ordering::Acquire) {
            NOT_STARTED => SchemaState::NotStarted,
            BOOTSTRAPPING => SchemaState::Bootstrapping,
            _ => SchemaState::Ready,
        }
    }

    /// Ensures the table exists, waiting on any bootstrap already running.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the DDL fails.
    pub async fn ensure(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        self.ready
            .get_or_try_init(|| async {
                self.state.store(BOOTSTRAPPING, Ordering::Release);
                let mut reset = ResetOnDrop {
                    state: &self.state,
                    armed: true,
                };
                tracing::debug!(table = %self.table, "Bootstrapping KV schema");

                self.backend
                    .execute_batch(&schema_sql(&self.table))
                    .await?;

                reset.armed = false;
                self.state.store(READY, Ordering::Release);
                tracing::info!(table = %self.table, "KV schema ready");
                Ok::<(), anyhow::Error>(())
            })
            .await?;

        Ok(())
    }
}

/// Returns the state to `NotStarted` when a bootstrap fails or its caller
/// is cancelled mid-flight.
struct ResetOnDrop<'a> {
    state: &'a AtomicU8,
    armed: bool,
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.store(NOT_STARTED, Ordering::Release);
        }
    }
}

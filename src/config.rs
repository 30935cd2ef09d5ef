//! Configuration types for a KV namespace.
//!
//! This module provides:
//!
//! - [`NamespaceOptions`] - Root configuration struct
//! - [`TableOptions`] - Backing table identity and bootstrap toggle
//! - [`TableName`] - A table identifier proven safe to interpolate into SQL
//! - [`PruneTrigger`] - Operations that may be followed by an expired-row sweep
//!
//! Options deserialize from TOML with sensible defaults:
//!
//! ```toml
//! namespace = "sessions"
//! prune_on = ["put", "delete"]
//!
//! [table]
//! name = "kv_entries"
//! auto_create = true
//! ```

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Default backing table name.
pub const DEFAULT_TABLE_NAME: &str = "kv_entries";

/// Operations after which expired rows may be swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum PruneTrigger {
    #[serde(rename = "put")]
    Put,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "get")]
    Get,
    #[serde(rename = "getWithMetadata", alias = "get_with_metadata")]
    GetWithMetadata,
    #[serde(rename = "list")]
    List,
}

impl PruneTrigger {
    /// Every trigger, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Put,
        Self::Delete,
        Self::Get,
        Self::GetWithMetadata,
        Self::List,
    ];

    /// Operation name as used in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Get => "get",
            Self::GetWithMetadata => "getWithMetadata",
            Self::List => "list",
        }
    }
}

impl fmt::Display for PruneTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backing table settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Table identifier, restricted to `[A-Za-z0-9_]+`.
    pub name: String,
    /// Create the table and its index on first use.
    ///
    /// Disable for deployments that manage schema externally; a missing
    /// table then surfaces as the engine's own error.
    #[serde(alias = "autoCreate")]
    pub auto_create: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_TABLE_NAME.to_string(),
            auto_create: true,
        }
    }
}

/// Options for a [`KvNamespace`](crate::KvNamespace).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NamespaceOptions {
    /// Logical partition; keys are unique within a namespace.
    pub namespace: String,
    /// Backing table settings.
    pub table: TableOptions,
    /// Operations followed by an expired-row sweep.
    #[serde(alias = "pruneExpiredKeysOn")]
    pub prune_on: Vec<PruneTrigger>,
}

impl Default for NamespaceOptions {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            table: TableOptions::default(),
            prune_on: vec![PruneTrigger::Put, PruneTrigger::Delete],
        }
    }
}

impl NamespaceOptions {
    /// Options for the given namespace with every other field defaulted.
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Replaces the backing table name.
    #[must_use]
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table.name = name.into();
        self
    }

    /// Enables or disables schema bootstrap.
    #[must_use]
    pub fn auto_create(mut self, enabled: bool) -> Self {
        self.table.auto_create = enabled;
        self
    }

    /// Replaces the prune trigger set.
    #[must_use]
    pub fn prune_on(mut self, triggers: impl IntoIterator<Item = PruneTrigger>) -> Self {
        self.prune_on = triggers.into_iter().collect();
        self
    }

    /// Parses options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid TOML or a field has
    /// the wrong type.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            path: "<inline>".into(),
            reason: e.to_string(),
        })
    }

    /// Loads options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - A field has an invalid type or an unknown prune trigger
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: format!("failed to read config file: {e}"),
        })?;

        toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: format!("failed to parse config file: {e}"),
        })
    }
}

/// A table identifier that is safe to interpolate into SQL.
///
/// Only ASCII letters, digits and underscores are accepted, so the name can
/// be used as an identifier without quoting or escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Validates `name` as a table identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTableName`] if `name` is empty or contains any
    /// character outside `[A-Za-z0-9_]`.
    pub fn parse(name: &str) -> Result<Self> {
        let valid = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_');
        if !valid {
            return Err(Error::InvalidTableName {
                name: name.to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// The validated identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

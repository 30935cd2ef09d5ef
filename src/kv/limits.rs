//! Size limits of the KV contract.
//!
//! Checked before any statement is issued so a rejected call has no side
//! effect.

use crate::error::{Error, Result};

/// Limits enforced on keys, values and metadata.
pub struct KvLimits;

impl KvLimits {
    /// Largest accepted key, in UTF-8 bytes.
    pub const MAX_KEY_SIZE: usize = 512;
    /// Largest accepted value, in bytes.
    pub const MAX_VALUE_SIZE: usize = 25 * 1024 * 1024;
    /// Largest accepted serialized metadata, in bytes.
    pub const MAX_METADATA_SIZE: usize = 1024;
    /// Default page size for `list`.
    pub const MAX_LIST_KEYS: usize = 1000;

    /// Validates a key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is empty or too long.
    pub fn check_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::invalid_key("key names may not be empty"));
        }
        if key.len() > Self::MAX_KEY_SIZE {
            return Err(Error::invalid_key(format!(
                "key of {} bytes exceeds the {} byte limit",
                key.len(),
                Self::MAX_KEY_SIZE
            )));
        }
        Ok(())
    }

    /// Validates a value size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueTooLarge`] above [`Self::MAX_VALUE_SIZE`].
    pub fn check_value(size: usize) -> Result<()> {
        if size > Self::MAX_VALUE_SIZE {
            return Err(Error::ValueTooLarge {
                size,
                limit: Self::MAX_VALUE_SIZE,
            });
        }
        Ok(())
    }

    /// Validates a serialized metadata size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MetadataTooLarge`] above [`Self::MAX_METADATA_SIZE`].
    pub fn check_metadata(size: usize) -> Result<()> {
        if size > Self::MAX_METADATA_SIZE {
            return Err(Error::MetadataTooLarge {
                size,
                limit: Self::MAX_METADATA_SIZE,
            });
        }
        Ok(())
    }
}

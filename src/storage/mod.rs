//! Durable key-value storage.
//!
//! Every store in the crate persists through the [`KeyValueStore`] trait, so
//! the backing medium is injected at construction time. Two backends ship:
//!
//! - [`MemoryStore`]: a map held in process memory (tests, ephemeral sessions)
//! - [`FileStore`]: one JSON file per key under a directory (the CLI)
//!
//! Both enforce an optional byte quota over the sum of all stored values,
//! mirroring the size limit of browser-local storage.
//!
//! # Key Layout
//!
//! ```text
//! personal-library                       # array of Book
//! uploaded-documents                     # array of stored upload records
//! uploaded-audio                         # same shape, audio only
//! last-opened-id                         # plain string id
//! reading-position:<kind>-<filename>     # {fileName, position, timestamp}
//! ```

pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key holding the personal library list
pub const PERSONAL_LIBRARY_KEY: &str = "personal-library";

/// Key holding uploaded documents
pub const UPLOADED_DOCUMENTS_KEY: &str = "uploaded-documents";

/// Key holding uploaded audio
pub const UPLOADED_AUDIO_KEY: &str = "uploaded-audio";

/// Key holding the most recently opened upload id
pub const LAST_OPENED_KEY: &str = "last-opened-id";

/// Prefix for per-file reading positions
pub const READING_POSITION_PREFIX: &str = "reading-position:";

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// String-keyed durable storage with string values
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key (absent keys are not an error)
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Check a pending write against a quota.
///
/// `current_total` is the byte total of all stored values and `replaced` the
/// size of the value being overwritten, if any.
pub(crate) fn check_quota(
    key: &str,
    quota: Option<usize>,
    current_total: usize,
    replaced: usize,
    incoming: usize,
) -> Result<(), StorageError> {
    if let Some(quota) = quota {
        let needed = current_total.saturating_sub(replaced) + incoming;
        if needed > quota {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                needed,
                quota,
            });
        }
    }
    Ok(())
}

//! File-backed storage: one JSON document per key.
//!
//! Keys are percent-encoded into file names so that keys such as
//! `reading-position:epub-My Book.epub` map to a single flat file.
//! Writes go through a temp file plus rename while holding an exclusive
//! lock on `.lock`, so concurrent processes never interleave a value.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tokio::fs;

use super::{check_quota, KeyValueStore, StorageError};

const VALUE_EXTENSION: &str = "json";
const LOCK_FILE: &str = ".lock";

/// Directory of key files
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>, quota: Option<usize>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir, quota })
    }

    /// Root directory of the store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path used for a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        let encoded: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.dir.join(format!("{}.{}", encoded, VALUE_EXTENSION))
    }
}

/// Sum the sizes of all value files in `dir`
fn stored_bytes(dir: &Path) -> std::io::Result<usize> {
    let mut total = 0usize;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(VALUE_EXTENSION) {
            total += entry.metadata()?.len() as usize;
        }
    }
    Ok(total)
}

fn write_value(
    dir: &Path,
    path: &Path,
    key: &str,
    value: &str,
    quota: Option<usize>,
) -> Result<(), StorageError> {
    let replaced = match std::fs::metadata(path) {
        Ok(meta) => meta.len() as usize,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };
    check_quota(key, quota, stored_bytes(dir)?, replaced, value.len())?;

    let tmp = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn write_locked(
    dir: &Path,
    path: &Path,
    key: &str,
    value: &str,
    quota: Option<usize>,
) -> Result<(), StorageError> {
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join(LOCK_FILE))?;
    lock.lock_exclusive()?;

    let result = write_value(dir, path, key, value, quota);

    FileExt::unlock(&lock)?;
    result
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let dir = self.dir.clone();
        let path = self.path_for(key);
        let key = key.to_string();
        let value = value.to_string();
        let quota = self.quota;

        tokio::task::spawn_blocking(move || write_locked(&dir, &path, &key, &value, quota))
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_through_files() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path().join("storage"), None).await.unwrap();

        store.set("personal-library", "[]").await.unwrap();
        assert_eq!(
            store.get("personal-library").await.unwrap(),
            Some("[]".to_string())
        );
        assert!(store.path_for("personal-library").exists());

        store.remove("personal-library").await.unwrap();
        assert_eq!(store.get("personal-library").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_with_separators_stay_flat() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path(), None).await.unwrap();

        let key = "reading-position:epub-some/dir name.epub";
        store.set(key, "{}").await.unwrap();

        let path = store.path_for(key);
        assert_eq!(path.parent().unwrap(), temp.path());
        assert_eq!(store.get(key).await.unwrap(), Some("{}".to_string()));
    }

    #[tokio::test]
    async fn test_quota_counts_existing_files() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path(), Some(8)).await.unwrap();

        store.set("a", "12345").await.unwrap();
        let result = store.set("b", "12345").await;
        assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));
        assert_eq!(store.get("b").await.unwrap(), None);

        // Replacing "a" frees its old bytes
        store.set("a", "12345678").await.unwrap();
    }
}

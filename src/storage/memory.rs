//! In-process storage backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{check_quota, KeyValueStore, StorageError};

/// Key-value store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create an empty store without a quota
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects writes past `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Seed a value directly, bypassing the quota
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().insert(key.into(), value.into());
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Read a value synchronously
    pub fn peek(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Total bytes of all stored values
    pub fn used_bytes(&self) -> usize {
        self.lock().values().map(String::len).sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still structurally valid; keep serving it.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        let total: usize = entries.values().map(String::len).sum();
        let replaced = entries.get(key).map(String::len).unwrap_or(0);
        check_quota(key, self.quota, total, replaced, value.len())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "one").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("one".to_string()));

        store.set("a", "two").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("two".to_string()));

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);

        // Removing again is fine
        store.remove("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_quota_rejects_without_changing_value() {
        let store = MemoryStore::with_quota(10);
        store.set("a", "12345").await.unwrap();

        let result = store.set("b", "1234567").await;
        assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));
        assert!(!store.contains_key("b"));
        assert_eq!(store.used_bytes(), 5);

        // Overwriting "a" with a larger value still fits
        store.set("a", "1234567890").await.unwrap();
        assert_eq!(store.used_bytes(), 10);
    }
}

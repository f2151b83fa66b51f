//! Durable reading positions, one key per viewer kind and file name.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{Position, PositionKind, ReadingPosition};
use crate::storage::{KeyValueStore, StorageError, READING_POSITION_PREFIX};

#[derive(Clone)]
pub struct ReadingPositionStore {
    storage: Arc<dyn KeyValueStore>,
}

impl ReadingPositionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// `reading-position:<kind>-<filename>`
    pub fn key(kind: PositionKind, file_name: &str) -> String {
        format!("{}{}-{}", READING_POSITION_PREFIX, kind, file_name)
    }

    /// Saved position, if one exists and parses
    pub async fn load(&self, kind: PositionKind, file_name: &str) -> Option<ReadingPosition> {
        let key = Self::key(kind, file_name);
        match self.storage.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(position) => Some(position),
                Err(e) => {
                    warn!(%key, "Ignoring unreadable reading position: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(%key, "Failed to read reading position: {}", e);
                None
            }
        }
    }

    pub async fn save(
        &self,
        kind: PositionKind,
        file_name: &str,
        position: Position,
    ) -> Result<(), StorageError> {
        let key = Self::key(kind, file_name);
        let value = ReadingPosition::new(file_name, position);
        let json = serde_json::to_string(&value)
            .map_err(|e| StorageError::Unavailable(format!("serialize position: {}", e)))?;

        self.storage.set(&key, &json).await?;
        debug!(%key, "Reading position saved");
        Ok(())
    }

    pub async fn forget(&self, kind: PositionKind, file_name: &str) -> Result<(), StorageError> {
        self.storage.remove(&Self::key(kind, file_name)).await
    }
}

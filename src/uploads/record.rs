//! Durable representation of an upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::UploadedItem;

use super::collection::CollectionKind;

/// One element of the `uploaded-documents` / `uploaded-audio` arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub mime_type: String,

    pub size: u64,

    pub upload_date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read: Option<DateTime<Utc>>,

    /// Base64 content; absent when encoding failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_audiobook: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl StoredRecord {
    /// Metadata plus whatever encoding the item has cached
    pub fn from_item(item: &UploadedItem, kind: CollectionKind) -> Self {
        let is_audio = kind == CollectionKind::Audio;
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            mime_type: item.mime_type.clone(),
            size: item.size_bytes,
            upload_date: item.uploaded_at,
            last_read: item.last_opened_at,
            file_content: item.encoded_content().map(str::to_string),
            is_audiobook: is_audio,
            duration: if is_audio { item.duration.clone() } else { None },
        }
    }

    /// Rebuild the in-memory item from decoded content
    pub fn into_item(self, kind: CollectionKind, content: Vec<u8>, encoded: String) -> UploadedItem {
        UploadedItem::restored(
            self.id,
            self.name,
            self.mime_type,
            self.size,
            self.upload_date,
            self.last_read,
            kind == CollectionKind::Audio,
            self.duration,
            content,
            encoded,
        )
    }
}

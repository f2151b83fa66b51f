//! User-uploaded files.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::uploads::media;

/// A file handed to the upload store (the equivalent of a dropped file)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring its MIME type from the extension
    /// unless one is given
    pub async fn from_path(path: &Path, mime_type: Option<&str>) -> Result<Self> {
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("Failed to read upload: {}", path.display()))?;

        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let mime_type = match mime_type {
            Some(m) => m.to_string(),
            None => media::mime_for_name(&name)
                .unwrap_or("application/octet-stream")
                .to_string(),
        };

        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Audio is decided by declared MIME type alone
    pub fn is_audio(&self) -> bool {
        media::is_audio_mime(&self.mime_type)
    }
}

/// An upload held by the store
#[derive(Debug, Clone)]
pub struct UploadedItem {
    /// `<name>-<unix millis>`
    pub id: String,

    pub name: String,

    pub mime_type: String,

    pub size_bytes: u64,

    pub uploaded_at: DateTime<Utc>,

    /// Set every time a viewer is opened for this item
    pub last_opened_at: Option<DateTime<Utc>>,

    pub is_audio: bool,

    /// Display duration for audio
    pub duration: Option<String>,

    content: Arc<[u8]>,

    /// Base64 of `content`, cached after the first successful persist
    encoded: Option<Arc<str>>,
}

impl UploadedItem {
    /// Build a fresh item from an incoming file
    pub fn from_file(file: UploadedFile, id: String, uploaded_at: DateTime<Utc>) -> Self {
        let is_audio = file.is_audio();
        let size_bytes = file.size_bytes();
        Self {
            id,
            name: file.name,
            mime_type: file.mime_type,
            size_bytes,
            uploaded_at,
            last_opened_at: None,
            is_audio,
            duration: None,
            content: file.bytes.into(),
            encoded: None,
        }
    }

    /// Rebuild an item from durable storage; `encoded` is the text `content`
    /// was decoded from, so it stays cached
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restored(
        id: String,
        name: String,
        mime_type: String,
        size_bytes: u64,
        uploaded_at: DateTime<Utc>,
        last_opened_at: Option<DateTime<Utc>>,
        is_audio: bool,
        duration: Option<String>,
        content: Vec<u8>,
        encoded: String,
    ) -> Self {
        Self {
            id,
            name,
            mime_type,
            size_bytes,
            uploaded_at,
            last_opened_at,
            is_audio,
            duration,
            content: content.into(),
            encoded: Some(encoded.into()),
        }
    }

    /// Raw file bytes for this session
    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    pub(crate) fn content_handle(&self) -> Arc<[u8]> {
        Arc::clone(&self.content)
    }

    /// Cached durable encoding, if computed
    pub fn encoded_content(&self) -> Option<&str> {
        self.encoded.as_deref()
    }

    pub(crate) fn cache_encoded(&mut self, encoded: String) {
        self.encoded = Some(encoded.into());
    }

    /// Lowercased extension of the file name
    pub fn extension(&self) -> Option<String> {
        media::extension_of(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_from_file() {
        let file = UploadedFile::new("song.mp3", "audio/mpeg", vec![1, 2, 3]);
        let now = Utc::now();
        let item = UploadedItem::from_file(file, "song.mp3-1".to_string(), now);

        assert!(item.is_audio);
        assert_eq!(item.size_bytes, 3);
        assert_eq!(item.bytes(), &[1, 2, 3]);
        assert_eq!(item.encoded_content(), None);
        assert_eq!(item.extension().as_deref(), Some("mp3"));
    }

    #[test]
    fn test_non_audio_mime() {
        let file = UploadedFile::new("book.pdf", "application/pdf", Vec::new());
        assert!(!file.is_audio());
    }

    #[tokio::test]
    async fn test_from_path_infers_mime() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("Novel.EPUB");
        tokio::fs::write(&path, b"PK\x03\x04").await.unwrap();

        let file = UploadedFile::from_path(&path, None).await.unwrap();
        assert_eq!(file.name, "Novel.EPUB");
        assert_eq!(file.mime_type, "application/epub+zip");
        assert_eq!(file.size_bytes(), 4);

        let forced = UploadedFile::from_path(&path, Some("text/plain")).await.unwrap();
        assert_eq!(forced.mime_type, "text/plain");
    }
}

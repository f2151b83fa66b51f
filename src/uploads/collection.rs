//! One typed collection type for both documents and audio.

use tracing::warn;

use crate::domain::UploadedItem;
use crate::storage::{UPLOADED_AUDIO_KEY, UPLOADED_DOCUMENTS_KEY};

use super::codec;
use super::record::StoredRecord;

/// Discriminator partitioning uploads into collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Documents,
    Audio,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 2] = [CollectionKind::Documents, CollectionKind::Audio];

    pub fn for_audio(is_audio: bool) -> Self {
        if is_audio {
            CollectionKind::Audio
        } else {
            CollectionKind::Documents
        }
    }

    /// Whether an item belongs to this collection
    pub fn accepts(self, item: &UploadedItem) -> bool {
        Self::for_audio(item.is_audio) == self
    }

    pub fn storage_key(self) -> &'static str {
        match self {
            CollectionKind::Documents => UPLOADED_DOCUMENTS_KEY,
            CollectionKind::Audio => UPLOADED_AUDIO_KEY,
        }
    }

    /// Singular noun for messages
    pub fn noun(self) -> &'static str {
        match self {
            CollectionKind::Documents => "book",
            CollectionKind::Audio => "audiobook",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionKind::Documents => write!(f, "documents"),
            CollectionKind::Audio => write!(f, "audio"),
        }
    }
}

/// Ordered uploads of a single kind
#[derive(Debug, Clone)]
pub struct TypedCollection {
    kind: CollectionKind,
    items: Vec<UploadedItem>,
}

impl TypedCollection {
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn items(&self) -> &[UploadedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&UploadedItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut UploadedItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn push(&mut self, item: UploadedItem) {
        debug_assert!(self.kind.accepts(&item));
        self.items.push(item);
    }

    /// Replace the whole contents (used by restore)
    pub fn replace(&mut self, items: Vec<UploadedItem>) {
        self.items = items;
    }

    pub fn remove(&mut self, id: &str) -> Option<UploadedItem> {
        let pos = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(pos))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Encode every item lacking cached content, concurrently on the
    /// blocking pool. Returns the names of items whose encoding failed;
    /// those stay without content and the rest are unaffected.
    pub async fn encode_pending(&mut self) -> Vec<String> {
        let handles: Vec<_> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.encoded_content().is_none())
            .map(|(idx, item)| {
                let bytes = item.content_handle();
                (idx, tokio::spawn(codec::encode_off_thread(bytes)))
            })
            .collect();

        for (idx, handle) in handles {
            match handle.await {
                Ok(Ok(encoded)) => self.items[idx].cache_encoded(encoded),
                Ok(Err(e)) => warn!(collection = %self.kind, "Encoding failed: {}", e),
                Err(e) => warn!(collection = %self.kind, "Encoding task failed: {}", e),
            }
        }

        // Anything still unencoded failed above
        self.items
            .iter()
            .filter(|i| i.encoded_content().is_none())
            .map(|i| {
                warn!(name = %i.name, "Upload will not survive a reload: content not encoded");
                i.name.clone()
            })
            .collect()
    }

    /// Durable snapshot of the current contents
    pub fn records(&self) -> Vec<StoredRecord> {
        self.items
            .iter()
            .map(|i| StoredRecord::from_item(i, self.kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UploadedFile;
    use chrono::Utc;

    fn item(name: &str, mime: &str) -> UploadedItem {
        let file = UploadedFile::new(name, mime, name.as_bytes().to_vec());
        UploadedItem::from_file(file, format!("{}-1", name), Utc::now())
    }

    #[test]
    fn test_discriminator() {
        let doc = item("a.pdf", "application/pdf");
        let song = item("a.mp3", "audio/mpeg");

        assert!(CollectionKind::Documents.accepts(&doc));
        assert!(!CollectionKind::Documents.accepts(&song));
        assert!(CollectionKind::Audio.accepts(&song));
    }

    #[test]
    fn test_push_get_remove() {
        let mut col = TypedCollection::new(CollectionKind::Documents);
        col.push(item("a.pdf", "application/pdf"));
        col.push(item("b.epub", "application/epub+zip"));

        assert_eq!(col.len(), 2);
        assert!(col.contains("b.epub-1"));

        let removed = col.remove("a.pdf-1").unwrap();
        assert_eq!(removed.name, "a.pdf");
        assert!(col.remove("a.pdf-1").is_none());
        assert_eq!(col.items()[0].name, "b.epub");
    }

    #[tokio::test]
    async fn test_encode_pending_caches_content() {
        let mut col = TypedCollection::new(CollectionKind::Audio);
        col.push(item("a.mp3", "audio/mpeg"));
        col.push(item("b.mp3", "audio/mpeg"));

        let failed = col.encode_pending().await;
        assert!(failed.is_empty());

        for i in col.items() {
            let encoded = i.encoded_content().unwrap();
            assert_eq!(codec::decode(encoded).unwrap(), i.bytes());
        }

        let records = col.records();
        assert!(records.iter().all(|r| r.file_content.is_some() && r.is_audiobook));
    }

    #[tokio::test]
    async fn test_encode_pending_skips_cached_items() {
        let mut col = TypedCollection::new(CollectionKind::Documents);
        col.push(item("a.pdf", "application/pdf"));
        assert!(col.encode_pending().await.is_empty());
        let first = col.items()[0].encoded_content().map(str::to_string);

        col.push(item("b.epub", "application/epub+zip"));
        assert!(col.encode_pending().await.is_empty());

        assert_eq!(col.items()[0].encoded_content().map(str::to_string), first);
        let second = col.items()[1].encoded_content().unwrap();
        assert_eq!(codec::decode(second).unwrap(), b"b.epub");
    }
}

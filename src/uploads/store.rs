//! The uploaded-content store.
//!
//! Holds the authoritative in-session list of uploads, split into a document
//! and an audio collection, and mirrors each collection to its durable key.
//!
//! Every mutation is applied in memory first and is visible immediately.
//! Persistence follows and is best-effort: a failed write is logged and
//! reported as a notice but never rolls back memory and never becomes an
//! `Err` for the caller. Each write is the whole current snapshot, so a
//! later write always carries earlier mutations.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::LimitSettings;
use crate::domain::{UploadedFile, UploadedItem};
use crate::notify::Notifier;
use crate::storage::{KeyValueStore, LAST_OPENED_KEY};

use super::codec;
use super::collection::{CollectionKind, TypedCollection};
use super::record::StoredRecord;
use super::UploadError;

const MIB: f64 = 1024.0 * 1024.0;

/// Outcome of accepting a file
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub id: String,
    pub kind: CollectionKind,
    /// The file is over the per-upload warning threshold
    pub size_warning: bool,
    pub persist: PersistReport,
}

/// What a persist pass managed to do
#[derive(Debug, Clone)]
pub struct PersistReport {
    pub kind: CollectionKind,
    /// The storage backend accepted the write
    pub written: bool,
    /// Size of the serialized collection
    pub bytes: usize,
    /// Serialized size exceeded the soft cap
    pub over_soft_cap: bool,
    /// Items persisted without content
    pub unencoded: Vec<String>,
}

/// Documents + audio uploads with durable mirroring
pub struct UploadStore {
    storage: Arc<dyn KeyValueStore>,
    notifier: Notifier,
    limits: LimitSettings,
    documents: TypedCollection,
    audio: TypedCollection,
    last_opened: Option<String>,
}

impl UploadStore {
    /// Create the store and restore whatever durable state survives.
    ///
    /// Never fails: unreadable state degrades to empty collections.
    pub async fn open(
        storage: Arc<dyn KeyValueStore>,
        notifier: Notifier,
        limits: LimitSettings,
    ) -> Self {
        let mut store = Self {
            storage,
            notifier,
            limits,
            documents: TypedCollection::new(CollectionKind::Documents),
            audio: TypedCollection::new(CollectionKind::Audio),
            last_opened: None,
        };
        store.restore().await;
        store
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn documents(&self) -> &[UploadedItem] {
        self.documents.items()
    }

    pub fn audio(&self) -> &[UploadedItem] {
        self.audio.items()
    }

    pub fn collection(&self, kind: CollectionKind) -> &TypedCollection {
        match kind {
            CollectionKind::Documents => &self.documents,
            CollectionKind::Audio => &self.audio,
        }
    }

    fn collection_mut(&mut self, kind: CollectionKind) -> &mut TypedCollection {
        match kind {
            CollectionKind::Documents => &mut self.documents,
            CollectionKind::Audio => &mut self.audio,
        }
    }

    /// Which collection holds an id
    pub fn kind_of(&self, id: &str) -> Option<CollectionKind> {
        CollectionKind::ALL
            .into_iter()
            .find(|k| self.collection(*k).contains(id))
    }

    pub fn get(&self, id: &str) -> Option<&UploadedItem> {
        let kind = self.kind_of(id)?;
        self.collection(kind).get(id)
    }

    /// Id of the most recently opened upload
    pub fn last_opened_id(&self) -> Option<&str> {
        self.last_opened.as_deref()
    }

    /// The most recently opened upload, if it is still present
    pub fn most_recent(&self) -> Option<&UploadedItem> {
        self.get(self.last_opened.as_deref()?)
    }

    /// Every upload except the most recent one: documents, then audio
    pub fn others(&self) -> Vec<&UploadedItem> {
        let recent = self.last_opened.as_deref();
        self.documents
            .items()
            .iter()
            .chain(self.audio.items())
            .filter(|i| Some(i.id.as_str()) != recent)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len() + self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Accept a file. No format validation happens here; uploaders filter
    /// with [`super::media::accept_upload`] first.
    #[instrument(skip(self, file), fields(name = %file.name, size = file.bytes.len()))]
    pub async fn add(&mut self, file: UploadedFile) -> UploadReceipt {
        let size_warning = file.size_bytes() > self.limits.upload_warn_bytes;
        if size_warning {
            self.notifier.warning(
                "File too large",
                format!(
                    "Files larger than {:.0}MB may not survive a reload.",
                    self.limits.upload_warn_bytes as f64 / MIB
                ),
            );
        }

        let kind = CollectionKind::for_audio(file.is_audio());
        let id = self.next_id(&file.name);
        let name = file.name.clone();
        let item = UploadedItem::from_file(file, id.clone(), Utc::now());

        self.collection_mut(kind).push(item);
        info!(%id, collection = %kind, "Upload added");

        let persist = self.persist(kind).await;

        let title = match kind {
            CollectionKind::Documents => "Book added",
            CollectionKind::Audio => "Audiobook added",
        };
        self.notifier
            .info(title, format!("\"{}\" was added to your personal library.", name));

        UploadReceipt {
            id,
            kind,
            size_warning,
            persist,
        }
    }

    /// Record that a viewer was opened for `id`
    #[instrument(skip(self))]
    pub async fn mark_opened(&mut self, id: &str) -> Result<(), UploadError> {
        let kind = self
            .kind_of(id)
            .ok_or_else(|| UploadError::NotFound(id.to_string()))?;

        self.last_opened = Some(id.to_string());
        if let Some(item) = self.collection_mut(kind).get_mut(id) {
            item.last_opened_at = Some(Utc::now());
        }

        if let Err(e) = self.storage.set(LAST_OPENED_KEY, id).await {
            error!("Failed to save last opened id: {}", e);
            self.notifier
                .error("Could not save to cache", "Your reading progress may not persist.");
        }

        self.persist(kind).await;
        Ok(())
    }

    /// Remove one upload; returns it if it existed
    #[instrument(skip(self))]
    pub async fn remove(&mut self, id: &str) -> Option<UploadedItem> {
        let kind = self.kind_of(id)?;
        let removed = self.collection_mut(kind).remove(id)?;

        if self.last_opened.as_deref() == Some(id) {
            self.last_opened = None;
            if let Err(e) = self.storage.remove(LAST_OPENED_KEY).await {
                error!("Failed to clear last opened id: {}", e);
            }
        }

        self.persist(kind).await;

        let title = match kind {
            CollectionKind::Documents => "Book removed",
            CollectionKind::Audio => "Audiobook removed",
        };
        self.notifier.info(
            title,
            format!("The {} was removed from your personal library.", kind.noun()),
        );

        Some(removed)
    }

    /// Drop every upload and the last-opened pointer
    #[instrument(skip(self))]
    pub async fn clear_all(&mut self) {
        self.documents.clear();
        self.audio.clear();
        self.last_opened = None;

        for key in [
            CollectionKind::Documents.storage_key(),
            CollectionKind::Audio.storage_key(),
            LAST_OPENED_KEY,
        ] {
            if let Err(e) = self.storage.remove(key).await {
                error!(key, "Failed to erase key: {}", e);
            }
        }

        self.notifier.info(
            "Library cleared",
            "All books and audiobooks were removed from your personal library.",
        );
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write one whole collection to its durable key
    #[instrument(skip(self))]
    pub async fn persist(&mut self, kind: CollectionKind) -> PersistReport {
        let unencoded = self.collection_mut(kind).encode_pending().await;
        let records = self.collection(kind).records();

        let mut report = PersistReport {
            kind,
            written: false,
            bytes: 0,
            over_soft_cap: false,
            unencoded,
        };

        let json = match serde_json::to_string(&records) {
            Ok(json) => json,
            Err(e) => {
                error!(collection = %kind, "Failed to serialize uploads: {}", e);
                self.notifier.error(
                    "Could not save to cache",
                    "Your uploads may not persist after a reload.",
                );
                return report;
            }
        };

        report.bytes = json.len();
        if report.bytes > self.limits.collection_soft_cap_bytes {
            report.over_soft_cap = true;
            self.notifier.warning(
                "Cache too large",
                "Some items may not be saved because of the storage limit.",
            );
        }

        match self.storage.set(kind.storage_key(), &json).await {
            Ok(()) => {
                report.written = true;
                debug!(collection = %kind, bytes = report.bytes, "Uploads persisted");
            }
            Err(e) => {
                error!(collection = %kind, "Failed to persist uploads: {}", e);
                self.notifier.error(
                    "Could not save to cache",
                    "Your uploads may not persist after a reload.",
                );
            }
        }

        report
    }

    async fn restore(&mut self) {
        for kind in CollectionKind::ALL {
            let items = self.restore_collection(kind).await;
            if !items.is_empty() {
                let (title, noun) = match kind {
                    CollectionKind::Documents => ("Library restored", "book(s)"),
                    CollectionKind::Audio => ("Audiobooks restored", "audiobook(s)"),
                };
                self.notifier.info(
                    title,
                    format!("{} {} loaded from the local cache.", items.len(), noun),
                );
            }
            self.collection_mut(kind).replace(items);
        }

        match self.storage.get(LAST_OPENED_KEY).await {
            Ok(Some(id)) if !id.is_empty() => self.last_opened = Some(id),
            Ok(_) => {}
            Err(e) => error!("Failed to read last opened id: {}", e),
        }
    }

    /// Decode one durable key. Records without content or with bad content
    /// are dropped; an unparseable value erases the key.
    async fn restore_collection(&self, kind: CollectionKind) -> Vec<UploadedItem> {
        let key = kind.storage_key();

        let raw = match self.storage.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!(key, "Failed to read stored uploads: {}", e);
                return Vec::new();
            }
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                error!(key, "Stored uploads are corrupt, erasing: {}", e);
                if let Err(e) = self.storage.remove(key).await {
                    error!(key, "Failed to erase corrupt key: {}", e);
                }
                return Vec::new();
            }
        };

        let mut items = Vec::with_capacity(values.len());
        for value in values {
            let record: StoredRecord = match serde_json::from_value(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!(key, "Skipping malformed upload record: {}", e);
                    continue;
                }
            };

            let encoded = match record.file_content.clone() {
                Some(c) if !c.is_empty() => c,
                _ => {
                    debug!(name = %record.name, "Dropping upload without stored content");
                    continue;
                }
            };

            match codec::decode_off_thread(encoded.clone()).await {
                Ok(bytes) => items.push(record.into_item(kind, bytes, encoded)),
                Err(e) => warn!(name = %record.name, "Failed to rebuild upload: {}", e),
            }
        }

        items
    }

    /// `<name>-<millis>`, bumped until unique within this session
    fn next_id(&self, name: &str) -> String {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let id = format!("{}-{}", name, millis);
            if self.kind_of(&id).is_none() {
                return id;
            }
            millis += 1;
        }
    }
}

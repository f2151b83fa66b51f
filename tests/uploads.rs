//! Uploaded-Content Store Integration Tests
//!
//! Uploading, reopening and removing files against real storage backends,
//! including backends that fail.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use readshelf::config::LimitSettings;
use readshelf::domain::UploadedFile;
use readshelf::notify::{drain, Notice, NoticeLevel, Notifier};
use readshelf::storage::{
    FileStore, KeyValueStore, MemoryStore, StorageError, LAST_OPENED_KEY, UPLOADED_AUDIO_KEY,
    UPLOADED_DOCUMENTS_KEY,
};
use readshelf::uploads::{accept_upload, codec, UploadError, UploadStore, UploadTarget};
use readshelf::viewer::{dispatch_item, ViewerMode};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

/// Memory store whose writes can be switched off
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn fail(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("disk full".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

async fn open(storage: Arc<dyn KeyValueStore>) -> (UploadStore, UnboundedReceiver<Notice>) {
    let (notifier, rx) = Notifier::channel();
    let store = UploadStore::open(storage, notifier, LimitSettings::default()).await;
    (store, rx)
}

fn epub(name: &str, len: usize) -> UploadedFile {
    let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    UploadedFile::new(name, "application/epub+zip", bytes)
}

#[test]
fn test_base64_round_trip() {
    let samples: Vec<Vec<u8>> = vec![
        Vec::new(),
        vec![0],
        vec![0xff; 3],
        (0..=255u8).collect(),
        (0..10_000).map(|i| (i * 31 % 256) as u8).collect(),
    ];
    for bytes in samples {
        assert_eq!(codec::decode(&codec::encode(&bytes)).unwrap(), bytes);
    }
}

#[tokio::test]
async fn test_upload_epub_scenario() {
    let (mut store, _rx) = open(Arc::new(MemoryStore::new())).await;

    let receipt = store.add(epub("test.epub", 10 * 1024)).await;
    assert!(receipt.persist.written);
    assert!(!receipt.size_warning);

    assert_eq!(store.documents().len(), 1);
    assert_eq!(store.documents()[0].name, "test.epub");
    assert!(store.audio().is_empty());

    let mode = dispatch_item(&store.documents()[0]).unwrap();
    assert_eq!(mode, ViewerMode::Reflowable);
}

#[tokio::test]
async fn test_upload_mp3_scenario() {
    let (mut store, _rx) = open(Arc::new(MemoryStore::new())).await;

    store
        .add(UploadedFile::new("audio.mp3", "audio/mpeg", vec![0x49, 0x44, 0x33]))
        .await;

    assert!(store.documents().is_empty());
    assert_eq!(store.audio().len(), 1);
    assert!(store.audio()[0].is_audio);
    assert_eq!(dispatch_item(&store.audio()[0]).unwrap(), ViewerMode::Playback);
}

#[tokio::test]
async fn test_failing_write_keeps_item_and_warns() {
    let storage = Arc::new(FlakyStore::new());
    storage.fail(true);
    let (mut store, mut rx) = open(storage.clone()).await;

    let receipt = store.add(epub("kept.epub", 64)).await;

    assert!(!receipt.persist.written);
    assert_eq!(store.documents().len(), 1);
    assert_eq!(store.documents()[0].name, "kept.epub");

    let notices = drain(&mut rx);
    assert!(notices.iter().any(|n| n.level == NoticeLevel::Error));

    // A later successful write carries the earlier item too
    storage.fail(false);
    store.add(epub("second.epub", 64)).await;
    let (reopened, _rx) = open(storage).await;
    assert_eq!(reopened.documents().len(), 2);
}

#[tokio::test]
async fn test_corrupt_documents_json_on_init() {
    let memory = Arc::new(MemoryStore::new());
    memory.insert_raw(UPLOADED_DOCUMENTS_KEY, "[{\"id\": \"broken\"");
    memory.insert_raw(UPLOADED_AUDIO_KEY, "[]");

    let (store, _rx) = open(memory.clone()).await;

    assert!(store.documents().is_empty());
    assert!(!memory.contains_key(UPLOADED_DOCUMENTS_KEY));
    // The other collection is untouched
    assert!(memory.contains_key(UPLOADED_AUDIO_KEY));
}

#[tokio::test]
async fn test_bad_base64_record_is_dropped() {
    let memory = Arc::new(MemoryStore::new());
    let records = serde_json::json!([
        {
            "id": "good.pdf-1",
            "name": "good.pdf",
            "type": "application/pdf",
            "size": 3,
            "uploadDate": "2024-05-01T12:00:00Z",
            "fileContent": "YWJj"
        },
        {
            "id": "bad.pdf-2",
            "name": "bad.pdf",
            "type": "application/pdf",
            "size": 3,
            "uploadDate": "2024-05-01T12:00:00Z",
            "fileContent": "%%% not base64 %%%"
        }
    ]);
    memory.insert_raw(UPLOADED_DOCUMENTS_KEY, records.to_string());

    let (store, mut rx) = open(memory).await;

    assert_eq!(store.documents().len(), 1);
    assert_eq!(store.documents()[0].bytes(), b"abc");

    let notices = drain(&mut rx);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Library restored");
}

#[tokio::test]
async fn test_removing_pointer_target_clears_pointer() {
    let memory = Arc::new(MemoryStore::new());
    let (mut store, _rx) = open(memory.clone()).await;

    let a = store.add(epub("a.epub", 16)).await.id;
    let b = store.add(epub("b.epub", 16)).await.id;

    store.mark_opened(&a).await.unwrap();
    assert_eq!(memory.peek(LAST_OPENED_KEY).as_deref(), Some(a.as_str()));

    // Removing another id leaves the pointer alone
    store.remove(&b).await.unwrap();
    assert_eq!(store.last_opened_id(), Some(a.as_str()));

    store.remove(&a).await.unwrap();
    assert_eq!(store.last_opened_id(), None);
    assert!(!memory.contains_key(LAST_OPENED_KEY));
}

#[tokio::test]
async fn test_mark_opened_unknown_id_changes_nothing() {
    let memory = Arc::new(MemoryStore::new());
    let (mut store, _rx) = open(memory.clone()).await;
    store.add(epub("a.epub", 16)).await;

    let err = store.mark_opened("ghost").await.unwrap_err();
    assert!(matches!(err, UploadError::NotFound(id) if id == "ghost"));
    assert_eq!(store.last_opened_id(), None);
    assert!(!memory.contains_key(LAST_OPENED_KEY));
}

#[tokio::test]
async fn test_state_survives_reopen_on_disk() {
    let temp = TempDir::new().unwrap();
    let storage: Arc<dyn KeyValueStore> =
        Arc::new(FileStore::open(temp.path().join("kv"), None).await.unwrap());

    let (mut store, _rx) = open(storage.clone()).await;
    let doc = store.add(epub("novel.epub", 2048)).await.id;
    store
        .add(UploadedFile::new("talk.mp3", "audio/mpeg", vec![1, 2, 3, 4]))
        .await;
    store.mark_opened(&doc).await.unwrap();
    drop(store);

    let storage: Arc<dyn KeyValueStore> =
        Arc::new(FileStore::open(temp.path().join("kv"), None).await.unwrap());
    let (reopened, mut rx) = open(storage).await;

    assert_eq!(reopened.documents().len(), 1);
    assert_eq!(reopened.audio().len(), 1);
    assert_eq!(reopened.documents()[0].bytes(), epub("novel.epub", 2048).bytes.as_slice());
    assert!(reopened.documents()[0].last_opened_at.is_some());
    assert_eq!(reopened.most_recent().map(|i| i.id.as_str()), Some(doc.as_str()));
    assert!(reopened.others().iter().all(|i| i.id != doc));

    let titles: Vec<String> = drain(&mut rx).into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["Library restored", "Audiobooks restored"]);
}

#[tokio::test]
async fn test_clear_all_erases_every_key() {
    let memory = Arc::new(MemoryStore::new());
    let (mut store, _rx) = open(memory.clone()).await;

    let id = store.add(epub("a.epub", 16)).await.id;
    store.add(UploadedFile::new("b.mp3", "audio/mpeg", vec![9])).await;
    store.mark_opened(&id).await.unwrap();

    store.clear_all().await;

    assert!(store.is_empty());
    assert_eq!(store.last_opened_id(), None);
    for key in [UPLOADED_DOCUMENTS_KEY, UPLOADED_AUDIO_KEY, LAST_OPENED_KEY] {
        assert!(!memory.contains_key(key), "{} should be erased", key);
    }
}

#[tokio::test]
async fn test_quota_rejection_is_reported() {
    let memory = Arc::new(MemoryStore::with_quota(256));
    let (mut store, mut rx) = open(memory.clone()).await;

    let receipt = store.add(epub("big.epub", 4096)).await;

    assert!(!receipt.persist.written);
    assert_eq!(store.len(), 1);
    assert!(!memory.contains_key(UPLOADED_DOCUMENTS_KEY));

    let notices = drain(&mut rx);
    assert!(notices
        .iter()
        .any(|n| n.level == NoticeLevel::Error && n.title == "Could not save to cache"));
}

#[test]
fn test_uploader_prefilter() {
    assert!(accept_upload("novel.EPUB", UploadTarget::Documents).is_ok());
    assert!(accept_upload("talk.m4a", UploadTarget::Audio).is_ok());

    let err = accept_upload("notes.txt", UploadTarget::Documents).unwrap_err();
    assert!(matches!(err, UploadError::UnsupportedFormat { .. }));
    assert!(accept_upload("talk.mp3", UploadTarget::Documents).is_err());
    assert!(accept_upload("novel.pdf", UploadTarget::Audio).is_err());
}

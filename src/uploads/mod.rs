//! The user's own uploaded files.
//!
//! Uploads live in two collections (documents and audio) that share one
//! implementation, [`TypedCollection`], partitioned by [`CollectionKind`].
//! Each collection is mirrored to its own durable key as an array of
//! [`StoredRecord`]s carrying base64 content.

pub mod codec;
pub mod collection;
pub mod media;
pub mod record;
pub mod store;

use thiserror::Error;

pub use collection::{CollectionKind, TypedCollection};
pub use media::{accept_upload, UploadTarget};
pub use record::StoredRecord;
pub use store::{PersistReport, UploadReceipt, UploadStore};

/// Errors surfaced to callers of the upload layer
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Unsupported format for '{name}': expected one of {expected}")]
    UnsupportedFormat { name: String, expected: String },

    #[error("Upload not found: {0}")]
    NotFound(String),
}

//! readshelf - book catalog and personal library engine
//!
//! Holds a curated catalog of books and audiobooks, a personal list of kept
//! catalog books, and the user's own uploaded files. Uploads are persisted
//! as metadata plus base64 content in an injected key-value store and are
//! rebuilt from it on the next start.
//!
//! # Modules
//!
//! - `storage`: Durable key-value backends (memory, file)
//! - `domain`: Data structures (Book, Section, UploadedItem, ReadingPosition)
//! - `library`: Catalog, search index and personal library
//! - `uploads`: Uploaded-content store with size budgets
//! - `viewer`: Viewer dispatch, text extraction and viewer sessions
//! - `notify`: User-visible notices
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Find a book and keep it
//! readshelf search tolkien
//! readshelf keep the-hobbit-j.r.r.-tolkien
//!
//! # Upload your own file and open it
//! readshelf upload ~/books/novel.epub
//! readshelf open novel.epub-1718000000000
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod library;
pub mod notify;
pub mod storage;
pub mod uploads;
pub mod viewer;

// Re-export main types at crate root for convenience
pub use domain::{Book, Section, UploadedFile, UploadedItem};
pub use library::{Catalog, PersonalLibrary, SearchIndex};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use uploads::{UploadError, UploadStore};
pub use viewer::{dispatch, ViewerError, ViewerMode};

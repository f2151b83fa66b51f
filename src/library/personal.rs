//! The personal library: catalog books the user chose to keep.
//!
//! Membership is by book id. Every mutation rewrites the whole list under
//! [`PERSONAL_LIBRARY_KEY`] immediately; a failed write is a notice, not an
//! error, and memory keeps the change.

use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use crate::domain::Book;
use crate::notify::Notifier;
use crate::storage::{KeyValueStore, PERSONAL_LIBRARY_KEY};

/// Result of adding a book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

pub struct PersonalLibrary {
    storage: Arc<dyn KeyValueStore>,
    notifier: Notifier,
    books: Vec<Book>,
}

impl PersonalLibrary {
    /// Load the stored list. A corrupt value is erased and the library
    /// starts empty.
    pub async fn open(storage: Arc<dyn KeyValueStore>, notifier: Notifier) -> Self {
        let books = match storage.get(PERSONAL_LIBRARY_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Book>>(&raw) {
                Ok(books) => books,
                Err(e) => {
                    warn!("Stored personal library is corrupt, erasing: {}", e);
                    if let Err(e) = storage.remove(PERSONAL_LIBRARY_KEY).await {
                        error!("Failed to erase corrupt personal library: {}", e);
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("Failed to read personal library: {}", e);
                Vec::new()
            }
        };
        debug!(count = books.len(), "Personal library loaded");

        Self {
            storage,
            notifier,
            books,
        }
    }

    /// Books in the order they were added
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn contains(&self, id: &str) -> bool {
        self.books.iter().any(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Keep a book. Adding an id that is already present changes nothing.
    #[instrument(skip(self, book), fields(id = %book.id))]
    pub async fn add(&mut self, book: Book) -> AddOutcome {
        if self.contains(&book.id) {
            self.notifier.info(
                "Already in your library",
                format!("\"{}\" is already in your library.", book.title),
            );
            return AddOutcome::AlreadyPresent;
        }

        let title = book.title.clone();
        self.books.push(book);
        self.save().await;

        self.notifier
            .info("Added to library", format!("\"{}\" was added to your library.", title));
        AddOutcome::Added
    }

    /// Drop a book; returns it if it was present
    #[instrument(skip(self))]
    pub async fn remove(&mut self, id: &str) -> Option<Book> {
        let pos = self.books.iter().position(|b| b.id == id)?;
        let removed = self.books.remove(pos);
        self.save().await;

        self.notifier.info(
            "Removed from library",
            format!("\"{}\" was removed from your library.", removed.title),
        );
        Some(removed)
    }

    /// Empty the library and erase its key
    #[instrument(skip(self))]
    pub async fn clear(&mut self) {
        self.books.clear();
        if let Err(e) = self.storage.remove(PERSONAL_LIBRARY_KEY).await {
            error!("Failed to erase personal library: {}", e);
        }
        self.notifier
            .info("Library cleared", "All books were removed from your library.");
    }

    async fn save(&self) {
        let json = match serde_json::to_string(&self.books) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize personal library: {}", e);
                return;
            }
        };

        if let Err(e) = self.storage.set(PERSONAL_LIBRARY_KEY, &json).await {
            error!("Failed to save personal library: {}", e);
            self.notifier.error(
                "Could not save library",
                "Your changes may not persist after a reload.",
            );
        }
    }
}

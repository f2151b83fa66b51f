//! Domain types for readshelf.
//!
//! This module contains the core data structures:
//! - Book / Section: Static catalog entries
//! - UploadedFile / UploadedItem: The user's own files
//! - ReadingPosition: Where a viewer left off

pub mod book;
pub mod position;
pub mod upload;

// Re-export commonly used types
pub use book::{book_id, placeholder_cover, Book, Section, NO_LINK};
pub use position::{Position, PositionKind, ReadingPosition};
pub use upload::{UploadedFile, UploadedItem};

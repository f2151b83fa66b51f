//! The curated catalog and the user's personal library.
//!
//! # Durable State
//!
//! ```text
//! personal-library    # JSON array of Book, rewritten on every change
//! ```
//!
//! The catalog itself is bundled with the binary and never written.

pub mod catalog;
pub mod personal;
pub mod search;

pub use catalog::Catalog;
pub use personal::{AddOutcome, PersonalLibrary};
pub use search::SearchIndex;

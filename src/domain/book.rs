//! Catalog books and sections.

use serde::{Deserialize, Serialize};

/// Sentinel drive link meaning "no link available"
pub const NO_LINK: &str = "#";

const PLACEHOLDER_BASE: &str = "https://placehold.co/400x600";

/// A catalog book (or audiobook)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Stable key derived from title + author
    pub id: String,

    pub title: String,

    pub author: String,

    pub summary: String,

    /// Cover URL or bundled asset reference
    pub cover: String,

    /// External download link, or [`NO_LINK`]
    pub drive_link: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_audiobook: bool,

    /// Display duration, e.g. "11h 20min"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl Book {
    /// Create a book whose id is derived from title and author
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        summary: impl Into<String>,
        cover: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let author = author.into();
        Self {
            id: book_id(&title, &author),
            title,
            author,
            summary: summary.into(),
            cover: cover.into(),
            drive_link: NO_LINK.to_string(),
            category: None,
            is_audiobook: false,
            duration: None,
            audio_url: None,
        }
    }

    /// Override the derived id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_drive_link(mut self, link: impl Into<String>) -> Self {
        self.drive_link = link.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Mark as an audiobook with optional duration and stream URL
    pub fn as_audiobook(mut self, duration: Option<String>, audio_url: Option<String>) -> Self {
        self.is_audiobook = true;
        self.duration = duration;
        self.audio_url = audio_url;
        self
    }

    /// The download link, unless it is the "no link" sentinel
    pub fn download_link(&self) -> Option<&str> {
        let link = self.drive_link.trim();
        if link.is_empty() || link == NO_LINK {
            None
        } else {
            Some(link)
        }
    }

    /// Cover to show after the primary cover failed to load
    pub fn fallback_cover(&self) -> String {
        placeholder_cover(&self.title)
    }
}

/// Derive a book id: lowercase title and author, whitespace runs become `-`.
///
/// `("Dune", "Frank Herbert")` → `dune-frank-herbert`
pub fn book_id(title: &str, author: &str) -> String {
    format!("{}-{}", slug(title), slug(author))
}

fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Generated placeholder image keyed by title
pub fn placeholder_cover(title: &str) -> String {
    placeholder_with_colour(title, "181818")
}

/// Generated placeholder image with a given background colour (hex, no `#`)
pub fn placeholder_with_colour(text: &str, colour: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
    format!("{}/{}/FFFFFF?text={}", PLACEHOLDER_BASE, colour, encoded)
}

/// A named, ordered group of books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,

    pub title: String,

    /// Books in display order
    #[serde(default)]
    pub books: Vec<Book>,

    /// Rendered as a letter-filtered A–Z browser instead of a list
    #[serde(default, rename = "isAZ")]
    pub is_az: bool,

    /// Rendered with upload support for the user's own audio
    #[serde(default)]
    pub is_audiobooks: bool,
}

impl Section {
    /// Whether the section shows a plain list of its books
    pub fn is_plain(&self) -> bool {
        !self.is_az && !self.is_audiobooks
    }
}

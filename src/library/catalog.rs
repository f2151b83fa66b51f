//! The bundled catalog.
//!
//! Static data compiled into the binary: a featured book plus an ordered list
//! of sections. The A–Z section carries no books in the data file; its stubs
//! are generated at load time, fifteen per letter.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::domain::book::{book_id, placeholder_cover, placeholder_with_colour};
use crate::domain::{Book, Section, NO_LINK};

const BUNDLED_CATALOG: &str = include_str!("../../data/catalog.json");

/// Generated stubs per letter
pub const BOOKS_PER_LETTER: usize = 15;

/// Letter book ids look like `a-1` ... `z-15`
fn stub_id(letter: char, n: usize) -> String {
    format!("{}-{}", letter.to_ascii_lowercase(), n)
}

/// Placeholder background derived from the stub id
fn stub_colour(id: &str) -> String {
    let digest = Sha256::digest(id.as_bytes());
    hex::encode(&digest[..3])
}

/// Generated A–Z stubs, letter by letter
pub fn az_books() -> Vec<Book> {
    ('A'..='Z')
        .flat_map(|letter| {
            (1..=BOOKS_PER_LETTER).map(move |n| {
                let id = stub_id(letter, n);
                let title = format!("Book {}{}", letter, n);
                let cover = placeholder_with_colour(&title, &stub_colour(&id));
                Book::new(
                    title,
                    format!("Author {}", letter),
                    format!("A title starting with the letter {}.", letter),
                    cover,
                )
                .with_id(id)
                .with_category(letter.to_string())
            })
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Raw data file schema
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalog {
    featured: RawBook,
    #[serde(default)]
    sections: Vec<RawSection>,
    #[serde(default)]
    letter_links: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSection {
    id: String,
    title: String,
    #[serde(default)]
    books: Vec<RawBook>,
    #[serde(default, rename = "isAZ")]
    is_az: bool,
    #[serde(default)]
    is_audiobooks: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBook {
    id: Option<String>,
    title: String,
    author: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    cover: Option<String>,
    #[serde(default)]
    drive_link: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    is_audiobook: bool,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    audio_url: Option<String>,
}

impl RawBook {
    fn into_book(self) -> Book {
        let cover = self
            .cover
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| placeholder_cover(&self.title));
        let id = self
            .id
            .unwrap_or_else(|| book_id(&self.title, &self.author));

        let mut book = Book::new(self.title, self.author, self.summary, cover)
            .with_id(id)
            .with_drive_link(self.drive_link.unwrap_or_else(|| NO_LINK.to_string()));
        if let Some(category) = self.category {
            book = book.with_category(category);
        }
        if self.is_audiobook {
            book = book.as_audiobook(self.duration, self.audio_url);
        }
        book
    }
}

// ----------------------------------------------------------------------------
// Catalog
// ----------------------------------------------------------------------------

/// Read-only catalog: featured book, sections and the A–Z index
#[derive(Debug, Clone)]
pub struct Catalog {
    featured: Book,
    sections: Vec<Section>,
    letter_links: BTreeMap<char, String>,
}

impl Catalog {
    /// The catalog compiled into the binary
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CATALOG).context("Bundled catalog is invalid")
    }

    /// Parse a catalog data file
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_str(json).context("Failed to parse catalog JSON")?;

        let sections = raw
            .sections
            .into_iter()
            .map(|s| {
                let books = if s.is_az {
                    az_books()
                } else {
                    s.books.into_iter().map(RawBook::into_book).collect()
                };
                Section {
                    id: s.id,
                    title: s.title,
                    books,
                    is_az: s.is_az,
                    is_audiobooks: s.is_audiobooks,
                }
            })
            .collect();

        let letter_links = raw
            .letter_links
            .into_iter()
            .filter_map(|(letter, link)| {
                let c = letter.chars().next()?.to_ascii_uppercase();
                let link = link.filter(|l| !l.trim().is_empty() && l != NO_LINK)?;
                Some((c, link))
            })
            .collect();

        Ok(Self {
            featured: raw.featured.into_book(),
            sections,
            letter_links,
        })
    }

    pub fn featured(&self) -> &Book {
        &self.featured
    }

    /// Sections in display order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    fn az_section(&self) -> Option<&Section> {
        self.sections.iter().find(|s| s.is_az)
    }

    /// The stubs filed under one letter (case-insensitive)
    pub fn letter(&self, letter: char) -> Vec<&Book> {
        let letter = letter.to_ascii_uppercase();
        if !letter.is_ascii_uppercase() {
            return Vec::new();
        }
        let prefix = format!("{}-", letter.to_ascii_lowercase());
        self.az_section()
            .map(|s| s.books.iter().filter(|b| b.id.starts_with(&prefix)).collect())
            .unwrap_or_default()
    }

    /// External folder for a letter, if it has one
    pub fn letter_link(&self, letter: char) -> Option<&str> {
        self.letter_links
            .get(&letter.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Every book in natural order: featured, named sections, then the A–Z
    /// stubs letter by letter. Duplicates are kept.
    pub fn all_books(&self) -> Vec<&Book> {
        let named = self
            .sections
            .iter()
            .filter(|s| !s.is_az)
            .flat_map(|s| s.books.iter());
        let az = self.az_section().into_iter().flat_map(|s| s.books.iter());

        std::iter::once(&self.featured).chain(named).chain(az).collect()
    }

    /// First book with this id in natural order
    pub fn find(&self, id: &str) -> Option<&Book> {
        self.all_books().into_iter().find(|b| b.id == id)
    }
}

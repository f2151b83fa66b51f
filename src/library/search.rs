//! Title/author search over the catalog.

use crate::domain::Book;

use super::catalog::Catalog;

/// Linear substring index over the flattened catalog
#[derive(Debug, Clone)]
pub struct SearchIndex {
    books: Vec<Book>,
    max_results: usize,
}

impl SearchIndex {
    /// Index every catalog book in natural order
    pub fn new(catalog: &Catalog, max_results: usize) -> Self {
        Self {
            books: catalog.all_books().into_iter().cloned().collect(),
            max_results,
        }
    }

    /// Case-insensitive substring match on title or author.
    ///
    /// A blank query matches nothing. Otherwise the query is matched as
    /// given, surrounding spaces included. Results keep catalog order and are
    /// cut at `max_results`.
    pub fn search(&self, query: &str) -> Vec<&Book> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let query = query.to_lowercase();

        self.books
            .iter()
            .filter(|b| {
                b.title.to_lowercase().contains(&query) || b.author.to_lowercase().contains(&query)
            })
            .take(self.max_results)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

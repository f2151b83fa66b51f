//! Search Index Integration Tests
//!
//! Matching, ordering and limits over the bundled catalog.

use readshelf::library::{Catalog, SearchIndex};

fn index() -> SearchIndex {
    SearchIndex::new(&Catalog::bundled().unwrap(), 20)
}

#[test]
fn test_blank_queries_return_nothing() {
    let index = index();
    for q in ["", " ", "\t", "\n  \n"] {
        assert!(index.search(q).is_empty(), "query {:?} should match nothing", q);
    }
}

#[test]
fn test_results_match_and_respect_limit() {
    let index = index();
    let queries = [
        "a", "E", "tolkien", "Colleen", "book", "x", "the", "zz", "Author Q", " dune ", "the ",
        " tolkien", "k h",
    ];
    for q in queries {
        let needle = q.to_lowercase();
        let results = index.search(q);

        assert!(results.len() <= 20);
        for book in results {
            assert!(
                book.title.to_lowercase().contains(&needle)
                    || book.author.to_lowercase().contains(&needle),
                "{} / {} does not match {:?}",
                book.title,
                book.author,
                q
            );
        }
    }
}

#[test]
fn test_results_follow_catalog_order() {
    let catalog = Catalog::bundled().unwrap();
    let index = SearchIndex::new(&catalog, 1000);

    let order: Vec<&str> = catalog.all_books().iter().map(|b| b.id.as_str()).collect();
    let results = index.search("o");
    let positions: Vec<usize> = results
        .iter()
        .map(|b| order.iter().position(|id| *id == b.id).unwrap())
        .collect();

    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_letter_stubs_are_searchable() {
    let index = index();
    let results = index.search("Author Q");
    assert_eq!(results.len(), 15);
    assert_eq!(results[0].id, "q-1");
}

#[test]
fn test_padded_query_is_not_trimmed() {
    let index = index();
    assert!(index.search(" dune ").is_empty());
    assert_eq!(index.search("dune").len(), 1);

    // Only titles with a word ending in "the" followed by a space
    let results = index.search("the ");
    assert!(!results.is_empty());
    assert!(results.iter().all(|b| {
        b.title.to_lowercase().contains("the ") || b.author.to_lowercase().contains("the ")
    }));
    assert!(results.len() <= index.search("the").len());
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type UserId = String;
pub type BookId = String;

/// One ingested rating record. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub book_id: BookId,
    pub rating: f64,
}

/// Sparse rating vector for one book: rater -> score.
pub type ItemVector = HashMap<UserId, f64>;

/// Per-user rating maps keyed by book, restricted to one side of the split.
pub type UserProfiles = HashMap<UserId, HashMap<BookId, f64>>;

/// Catalog entry with resolved author countries.
///
/// `countries[i]` aligns positionally with the i-th comma-separated author
/// in `authors`; an unresolved author keeps its `None` slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMetadata {
    pub id: BookId,
    pub authors: String,
    pub title: String,
    pub image_url: String,
    pub countries: Vec<Option<String>>,
}

impl BookMetadata {
    /// Countries that actually resolved, in author order.
    pub fn known_countries(&self) -> Vec<&str> {
        self.countries
            .iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Books enter recommendation output only with at least one resolved country.
    pub fn has_known_country(&self) -> bool {
        self.countries.iter().any(Option::is_some)
    }
}

/// Output of the per-user train/test split.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitOutput {
    pub train: Vec<Rating>,
    pub test: Vec<Rating>,
    pub user_train: UserProfiles,
    pub user_test: UserProfiles,
}

/// Precomputed neighbor relation: book -> neighbors sorted by descending score.
///
/// Only strictly positive scores are stored, so every entry is usable as
/// prediction evidence without re-filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityMatrix(HashMap<BookId, Vec<(BookId, f64)>>);

impl SimilarityMatrix {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, book_id: BookId, neighbors: Vec<(BookId, f64)>) {
        self.0.insert(book_id, neighbors);
    }

    pub fn neighbors(&self, book_id: &str) -> Option<&[(BookId, f64)]> {
        self.0.get(book_id).map(Vec::as_slice)
    }

    pub fn books(&self) -> impl Iterator<Item = &BookId> {
        self.0.keys()
    }

    /// Key-wise union with another partial matrix. Callers are responsible
    /// for keeping the key sets disjoint.
    pub fn merge(&mut self, other: SimilarityMatrix) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

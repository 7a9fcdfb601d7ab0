use std::collections::HashMap;

use crate::models::{BookId, ItemVector, Rating};

/// Group train ratings into one sparse rating vector per book.
///
/// Books with zero train ratings simply do not appear in the result, so
/// they are never compared by the similarity engine.
pub fn build_item_vectors(train: &[Rating]) -> HashMap<BookId, ItemVector> {
    let mut vectors: HashMap<BookId, ItemVector> = HashMap::new();

    for rating in train {
        vectors
            .entry(rating.book_id.clone())
            .or_default()
            .insert(rating.user_id.clone(), rating.rating);
    }

    vectors
}

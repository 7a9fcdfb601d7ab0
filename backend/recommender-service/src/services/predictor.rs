use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::models::{BookId, BookMetadata, SimilarityMatrix, UserProfiles};

#[derive(Debug, Clone)]
pub struct PredictorConfig {
    pub k_neighbors: usize,
    pub min_neighbors: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 20,
            min_neighbors: 3,
        }
    }
}

/// Predict a user's rating for a book from the most similar books the user
/// has rated in the train split.
///
/// Neighbor evidence is ranked by absolute similarity so strong negative
/// relations participate and can pull the prediction down. Returns `None`
/// for an unknown user, an unknown book, or fewer than `min_neighbors`
/// surviving neighbors — insufficient evidence is not a guess. The result
/// is the similarity-weighted average, unclamped.
pub fn predict(
    profiles: &UserProfiles,
    user_id: &str,
    book_id: &str,
    matrix: &SimilarityMatrix,
    config: &PredictorConfig,
) -> Option<f64> {
    let profile = profiles.get(user_id)?;
    let neighbors = matrix.neighbors(book_id)?;

    let mut evidence: Vec<(f64, f64)> = neighbors
        .iter()
        .filter_map(|(neighbor_id, sim)| profile.get(neighbor_id).map(|rating| (*sim, *rating)))
        .collect();

    evidence.sort_by(|a, b| {
        b.0.abs()
            .partial_cmp(&a.0.abs())
            .unwrap_or(Ordering::Equal)
    });
    evidence.truncate(config.k_neighbors);

    if evidence.len() < config.min_neighbors {
        return None;
    }

    let weighted: f64 = evidence.iter().map(|(sim, rating)| sim * rating).sum();
    let denominator: f64 = evidence.iter().map(|(sim, _)| sim.abs()).sum();

    // Unreachable through the >0 retention filter, but a hand-built matrix
    // could produce it; None beats NaN.
    if denominator == 0.0 {
        return None;
    }

    Some(weighted / denominator)
}

/// Rank every eligible unseen book by predicted rating, descending, and
/// keep the top `top_n`. Eligibility requires at least one resolved
/// country; books the prediction fails for are simply dropped.
pub fn recommend_top_n(
    profiles: &UserProfiles,
    user_id: &str,
    seen_books: &HashSet<BookId>,
    matrix: &SimilarityMatrix,
    metadata: &HashMap<BookId, BookMetadata>,
    config: &PredictorConfig,
    top_n: usize,
) -> Vec<(BookId, f64)> {
    let mut ranked: Vec<(BookId, f64)> = matrix
        .books()
        .filter(|book_id| !seen_books.contains(*book_id))
        .filter(|book_id| {
            metadata
                .get(*book_id)
                .is_some_and(BookMetadata::has_known_country)
        })
        .filter_map(|book_id| {
            predict(profiles, user_id, book_id, matrix, config)
                .map(|predicted| (book_id.clone(), predicted))
        })
        .collect();

    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(top_n);
    ranked
}

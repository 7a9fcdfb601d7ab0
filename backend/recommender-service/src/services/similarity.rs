use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{BookId, BookMetadata, ItemVector, SimilarityMatrix};

/// Cosine similarity over the union of raters; a rater absent from one
/// vector contributes an explicit zero for that book, so only shared
/// raters can move the dot product. Zero-norm vectors score 0 against
/// anything.
pub fn cosine_similarity(v1: &ItemVector, v2: &ItemVector) -> f64 {
    let dot: f64 = v1
        .iter()
        .map(|(rater, a)| a * v2.get(rater).copied().unwrap_or(0.0))
        .sum();
    let norm1: f64 = v1.values().map(|a| a * a).sum::<f64>().sqrt();
    let norm2: f64 = v2.values().map(|b| b * b).sum::<f64>().sqrt();

    if norm1 == 0.0 || norm2 == 0.0 {
        0.0
    } else {
        dot / (norm1 * norm2)
    }
}

/// Binary cross-country diversity term.
///
/// 1 when both books have resolved countries and the sets are disjoint —
/// the term rewards cross-cultural pairing, not shared origin. Books with
/// no resolved country are neutral (0).
fn country_diversity(m1: Option<&BookMetadata>, m2: Option<&BookMetadata>) -> f64 {
    let c1 = m1.map(BookMetadata::known_countries).unwrap_or_default();
    let c2 = m2.map(BookMetadata::known_countries).unwrap_or_default();

    if c1.is_empty() || c2.is_empty() {
        return 0.0;
    }

    let has_common = c1.iter().any(|c| c2.contains(c));
    if has_common {
        0.0
    } else {
        1.0
    }
}

/// Convex blend of rating-pattern similarity and country diversity.
/// `alpha = 1.0` disables the diversity term entirely.
pub fn hybrid_similarity(
    v1: &ItemVector,
    v2: &ItemVector,
    m1: Option<&BookMetadata>,
    m2: Option<&BookMetadata>,
    alpha: f64,
) -> f64 {
    alpha * cosine_similarity(v1, v2) + (1.0 - alpha) * country_diversity(m1, m2)
}

/// Parallel pairwise similarity computation over the whole catalog.
pub struct SimilarityEngine {
    workers: usize,
    deadline: Option<Duration>,
}

impl SimilarityEngine {
    /// `workers = 0` means available hardware parallelism.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            workers
        };
        Self {
            workers,
            deadline: None,
        }
    }

    /// Bound the whole computation; pair counts grow quadratically with the
    /// catalog, so an unbounded batch can run away.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Compute the neighbor relation for every book with train ratings.
    ///
    /// The sorted book-id list is cut into contiguous chunks, one blocking
    /// task per chunk, each holding read-only snapshots of the inputs and
    /// scoring its chunk against the full catalog. Any task failure rejects
    /// the whole computation; a partial matrix is never returned.
    pub async fn compute(
        &self,
        vectors: Arc<HashMap<BookId, ItemVector>>,
        metadata: Arc<HashMap<BookId, BookMetadata>>,
        alpha: f64,
    ) -> Result<SimilarityMatrix> {
        let mut book_ids: Vec<BookId> = vectors.keys().cloned().collect();
        book_ids.sort_unstable();
        let book_ids = Arc::new(book_ids);

        if book_ids.is_empty() {
            return Ok(SimilarityMatrix::new());
        }

        let workers = self.workers.min(book_ids.len());
        let chunk_size = book_ids.len().div_ceil(workers);

        let mut handles = Vec::with_capacity(workers);
        for worker_idx in 0..workers {
            let start = worker_idx * chunk_size;
            let end = (start + chunk_size).min(book_ids.len());
            if start >= end {
                break;
            }

            let book_ids = Arc::clone(&book_ids);
            let vectors = Arc::clone(&vectors);
            let metadata = Arc::clone(&metadata);

            handles.push(tokio::task::spawn_blocking(move || {
                compute_chunk(&book_ids, start..end, &vectors, &metadata, alpha)
            }));
        }

        let join_all = async {
            let mut matrix = SimilarityMatrix::new();
            for partial in futures::future::join_all(handles).await {
                // Any panicked worker rejects the whole relation; a matrix
                // with a missing partition is never merged.
                let partial = partial.map_err(|e| AppError::WorkerFailure(e.to_string()))?;
                matrix.merge(partial);
            }
            Ok::<_, AppError>(matrix)
        };

        let matrix = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, join_all)
                .await
                .map_err(|_| {
                    AppError::WorkerFailure(format!("Deadline of {deadline:?} exceeded"))
                })??,
            None => join_all.await?,
        };

        info!(
            books = matrix.len(),
            alpha,
            workers,
            "Similarity computation finished"
        );

        Ok(matrix)
    }
}

/// Score one contiguous chunk of source books against the full catalog.
/// Chunks partition the id space, so merged results never collide.
fn compute_chunk(
    book_ids: &[BookId],
    chunk: Range<usize>,
    vectors: &HashMap<BookId, ItemVector>,
    metadata: &HashMap<BookId, BookMetadata>,
    alpha: f64,
) -> SimilarityMatrix {
    let mut partial = SimilarityMatrix::new();

    for b1 in &book_ids[chunk] {
        let v1 = &vectors[b1];
        let m1 = metadata.get(b1);

        let mut neighbors = Vec::new();
        for b2 in book_ids {
            if b1 == b2 {
                continue;
            }

            let score = hybrid_similarity(v1, &vectors[b2], m1, metadata.get(b2), alpha);
            if score > 0.0 {
                neighbors.push((b2.clone(), score));
            }
        }

        neighbors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        debug!(book_id = %b1, neighbors = neighbors.len(), "Scored book");
        partial.insert(b1.clone(), neighbors);
    }

    partial
}

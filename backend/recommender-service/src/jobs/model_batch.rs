// ============================================
// Model Batch Job
// ============================================
//
// Offline job that rebuilds every persisted model artifact from the raw
// ratings CSV. Designed to run as a CronJob or standalone process.
//
// Workflow:
// 1. Ingest ratings and split them per user into train/test
// 2. Persist the split artifacts (lists + per-user maps)
// 3. Build per-book rating vectors from the train split
// 4. Compute and persist one similarity artifact per configured variant
//
// Usage:
//   recommender-service --mode model-batch

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::ingest::load_ratings;
use crate::models::{BookId, BookMetadata};
use crate::repository::{
    similarity_artifact_name, ArtifactRepository, ARTIFACT_BOOK_METADATA, ARTIFACT_TEST_RATINGS,
    ARTIFACT_TRAIN_RATINGS, ARTIFACT_USER_TEST, ARTIFACT_USER_TRAIN,
};
use crate::services::similarity::SimilarityEngine;
use crate::services::splitter::split_ratings;
use crate::services::vectors::build_item_vectors;

/// Model batch job statistics
#[derive(Debug, Clone, Default)]
pub struct ModelBatchStats {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ratings_loaded: usize,
    pub train_ratings: usize,
    pub test_ratings: usize,
    pub users: usize,
    pub books_vectorized: usize,
    pub variants_computed: u32,
    pub total_duration_ms: u64,
}

/// Run one full model rebuild pass.
pub async fn run_model_batch(
    config: &Config,
    repo: &impl ArtifactRepository,
) -> Result<ModelBatchStats> {
    let start_time = Instant::now();
    let mut stats = ModelBatchStats {
        started_at: Some(Utc::now()),
        ..Default::default()
    };

    info!(
        ratings_csv = %config.data.ratings_csv,
        train_fraction = config.model.train_fraction,
        seed = ?config.model.split_seed,
        "Starting model batch pass"
    );

    let ratings = load_ratings(Path::new(&config.data.ratings_csv))?;
    stats.ratings_loaded = ratings.len();

    let mut rng = match config.model.split_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let split = split_ratings(&ratings, config.model.train_fraction, &mut rng);

    repo.save(ARTIFACT_TRAIN_RATINGS, &split.train)?;
    repo.save(ARTIFACT_TEST_RATINGS, &split.test)?;
    repo.save(ARTIFACT_USER_TRAIN, &split.user_train)?;
    repo.save(ARTIFACT_USER_TEST, &split.user_test)?;

    stats.train_ratings = split.train.len();
    stats.test_ratings = split.test.len();
    stats.users = split.user_train.len();

    let vectors = Arc::new(build_item_vectors(&split.train));
    stats.books_vectorized = vectors.len();

    // The diversity term degrades to neutral when the enrichment batch has
    // not run yet; the computation itself still succeeds.
    let metadata: HashMap<BookId, BookMetadata> = if repo.exists(ARTIFACT_BOOK_METADATA) {
        let books: Vec<BookMetadata> = repo.load(ARTIFACT_BOOK_METADATA)?;
        books.into_iter().map(|book| (book.id.clone(), book)).collect()
    } else {
        warn!("No enriched book metadata artifact; diversity terms will be neutral");
        HashMap::new()
    };
    let metadata = Arc::new(metadata);

    let deadline = match config.model.similarity_deadline_secs {
        0 => None,
        secs => Some(std::time::Duration::from_secs(secs)),
    };
    let engine = SimilarityEngine::new(config.model.similarity_workers).with_deadline(deadline);
    for variant in &config.model.variants {
        let matrix = engine
            .compute(Arc::clone(&vectors), Arc::clone(&metadata), variant.alpha)
            .await?;
        repo.save(&similarity_artifact_name(&variant.name), &matrix)?;
        stats.variants_computed += 1;

        info!(
            variant = %variant.name,
            alpha = variant.alpha,
            books = matrix.len(),
            "Persisted similarity artifact"
        );
    }

    stats.completed_at = Some(Utc::now());
    stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

    info!(
        ratings = stats.ratings_loaded,
        train = stats.train_ratings,
        test = stats.test_ratings,
        users = stats.users,
        books = stats.books_vectorized,
        variants = stats.variants_computed,
        duration_ms = stats.total_duration_ms,
        "Model batch pass completed"
    );

    Ok(stats)
}

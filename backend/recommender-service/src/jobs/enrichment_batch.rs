// ============================================
// Enrichment Batch Job
// ============================================
//
// Offline job that resolves the country of every author in the book
// catalog and persists the enriched metadata artifact. One author's
// failed lookup never fails the batch; the slot stays unresolved.
//
// Usage:
//   recommender-service --mode enrich

use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::ingest::load_books;
use crate::repository::{ArtifactRepository, ARTIFACT_BOOK_METADATA};
use crate::services::enrichment::AuthorCountryResolver;

/// Enrichment batch job statistics
#[derive(Debug, Clone, Default)]
pub struct EnrichmentBatchStats {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub books_processed: usize,
    pub authors_resolved: usize,
    pub authors_unresolved: usize,
    pub total_duration_ms: u64,
}

/// Run one full enrichment pass over the catalog.
pub async fn run_enrichment_batch(
    config: &Config,
    repo: &impl ArtifactRepository,
) -> Result<EnrichmentBatchStats> {
    let start_time = Instant::now();
    let mut stats = EnrichmentBatchStats {
        started_at: Some(Utc::now()),
        ..Default::default()
    };

    info!(books_csv = %config.data.books_csv, "Starting enrichment batch pass");

    let mut books = load_books(Path::new(&config.data.books_csv))?;
    let resolver = AuthorCountryResolver::new(config.enrichment.clone());

    for book in &mut books {
        let countries = resolver.resolve_countries(&book.authors).await;

        stats.authors_resolved += countries.iter().filter(|c| c.is_some()).count();
        stats.authors_unresolved += countries.iter().filter(|c| c.is_none()).count();
        stats.books_processed += 1;

        debug!(
            book_id = %book.id,
            authors = %book.authors,
            resolved = countries.iter().filter(|c| c.is_some()).count(),
            "Enriched book"
        );

        book.countries = countries;
    }

    repo.save(ARTIFACT_BOOK_METADATA, &books)?;

    stats.completed_at = Some(Utc::now());
    stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

    info!(
        books = stats.books_processed,
        resolved = stats.authors_resolved,
        unresolved = stats.authors_unresolved,
        duration_ms = stats.total_duration_ms,
        "Enrichment batch pass completed"
    );

    Ok(stats)
}

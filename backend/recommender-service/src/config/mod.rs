use serde::Deserialize;
use std::env;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub data: DataConfig,
    pub model: ModelConfig,
    pub enrichment: EnrichmentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub http_port: u16,
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Directory holding the persisted JSON artifacts.
    pub artifacts_dir: String,
    pub ratings_csv: String,
    pub books_csv: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub train_fraction: f64,
    /// Seed for the split shuffle. Unset means fresh entropy per run.
    pub split_seed: Option<u64>,
    /// Worker count for the similarity computation. 0 = available parallelism.
    pub similarity_workers: usize,
    /// Wall-clock bound on one similarity computation. 0 = unbounded.
    pub similarity_deadline_secs: u64,
    pub k_neighbors: usize,
    pub min_neighbors: usize,
    pub top_n: usize,
    /// Named relation variants, one persisted artifact each.
    pub variants: Vec<SimilarityVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityVariant {
    pub name: String,
    /// Weight of the rating-similarity term; 1.0 disables the diversity term.
    pub alpha: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    pub openlibrary_url: String,
    pub wikidata_sparql_url: String,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

const DEFAULT_VARIANTS: &str = "diversity-07:0.7,diversity-08:0.8,without-diversity:1.0";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            service: ServiceConfig {
                http_port: env::var("HTTP_PORT")
                    .unwrap_or_else(|_| "3001".to_string())
                    .parse()
                    .expect("HTTP_PORT must be a valid u16"),
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "recommender-service".to_string()),
            },
            data: DataConfig {
                artifacts_dir: env::var("ARTIFACTS_DIR").unwrap_or_else(|_| "data".to_string()),
                ratings_csv: env::var("RATINGS_CSV")
                    .unwrap_or_else(|_| "data/ratings.csv".to_string()),
                books_csv: env::var("BOOKS_CSV").unwrap_or_else(|_| "data/books.csv".to_string()),
            },
            model: ModelConfig {
                train_fraction: env::var("TRAIN_FRACTION")
                    .unwrap_or_else(|_| "0.8".to_string())
                    .parse()
                    .expect("TRAIN_FRACTION must be a valid f64"),
                split_seed: env::var("SPLIT_SEED")
                    .ok()
                    .map(|v| v.parse().expect("SPLIT_SEED must be a valid u64")),
                similarity_workers: env::var("SIMILARITY_WORKERS")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()
                    .expect("SIMILARITY_WORKERS must be a valid usize"),
                similarity_deadline_secs: env::var("SIMILARITY_DEADLINE_SECS")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()
                    .expect("SIMILARITY_DEADLINE_SECS must be a valid u64"),
                k_neighbors: env::var("K_NEIGHBORS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("K_NEIGHBORS must be a valid usize"),
                min_neighbors: env::var("MIN_NEIGHBORS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("MIN_NEIGHBORS must be a valid usize"),
                top_n: env::var("TOP_N")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("TOP_N must be a valid usize"),
                variants: parse_variants(
                    &env::var("SIMILARITY_VARIANTS").unwrap_or_else(|_| DEFAULT_VARIANTS.to_string()),
                )?,
            },
            enrichment: EnrichmentConfig {
                openlibrary_url: env::var("OPENLIBRARY_URL")
                    .unwrap_or_else(|_| "https://openlibrary.org".to_string()),
                wikidata_sparql_url: env::var("WIKIDATA_SPARQL_URL")
                    .unwrap_or_else(|_| "https://query.wikidata.org/sparql".to_string()),
                max_attempts: env::var("ENRICHMENT_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "4".to_string())
                    .parse()
                    .expect("ENRICHMENT_MAX_ATTEMPTS must be a valid u32"),
                initial_backoff_ms: env::var("ENRICHMENT_INITIAL_BACKOFF_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .expect("ENRICHMENT_INITIAL_BACKOFF_MS must be a valid u64"),
            },
        })
    }
}

/// Parse `name:alpha,name:alpha,...` into relation variants.
fn parse_variants(raw: &str) -> Result<Vec<SimilarityVariant>> {
    let mut variants = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, alpha) = entry
            .split_once(':')
            .ok_or_else(|| AppError::Config(format!("Invalid variant entry: {entry}")))?;
        let alpha: f64 = alpha
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid variant alpha: {entry}")))?;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(AppError::Config(format!(
                "Variant alpha must be within [0, 1]: {entry}"
            )));
        }
        variants.push(SimilarityVariant {
            name: name.trim().to_string(),
            alpha,
        });
    }

    if variants.is_empty() {
        return Err(AppError::Config("No similarity variants configured".to_string()));
    }

    Ok(variants)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_variants() {
        let variants = parse_variants(DEFAULT_VARIANTS).unwrap();
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].name, "diversity-07");
        assert!((variants[0].alpha - 0.7).abs() < f64::EPSILON);
        assert_eq!(variants[2].name, "without-diversity");
        assert!((variants[2].alpha - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_variants_rejects_malformed() {
        assert!(parse_variants("no-alpha").is_err());
        assert!(parse_variants("bad:not-a-number").is_err());
        assert!(parse_variants("out-of-range:1.5").is_err());
        assert!(parse_variants("").is_err());
    }
}

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use resilience::{with_retry, RetryConfig};

use crate::config::EnrichmentConfig;
use crate::error::{AppError, Result};

/// Resolves each author of a comma-separated author string to a country.
///
/// Lookup chain per author: OpenLibrary author search (best candidate by
/// popularity), OpenLibrary author detail for the Wikidata id, Wikidata
/// SPARQL for the citizenship label. Every HTTP call goes through the
/// retry helper; when the budget runs out the author resolves to `None`
/// and the batch continues.
pub struct AuthorCountryResolver {
    http: Client,
    config: EnrichmentConfig,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct AuthorSearchResponse {
    #[serde(default)]
    docs: Vec<AuthorDoc>,
}

#[derive(Debug, Deserialize)]
struct AuthorDoc {
    key: String,
    #[serde(default)]
    ratings_count: u64,
    #[serde(default)]
    work_count: u64,
    #[serde(default)]
    readinglog_count: u64,
}

#[derive(Debug, Deserialize)]
struct AuthorDetail {
    remote_ids: Option<RemoteIds>,
}

#[derive(Debug, Deserialize)]
struct RemoteIds {
    wikidata: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<SparqlBinding>,
}

#[derive(Debug, Deserialize)]
struct SparqlBinding {
    #[serde(rename = "countryLabel")]
    country_label: Option<SparqlValue>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

impl AuthorCountryResolver {
    pub fn new(config: EnrichmentConfig) -> Self {
        let retry = RetryConfig {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            ..RetryConfig::default()
        };

        Self {
            http: Client::new(),
            config,
            retry,
        }
    }

    /// One country slot per comma-separated author, positionally aligned.
    pub async fn resolve_countries(&self, authors_raw: &str) -> Vec<Option<String>> {
        let mut countries = Vec::new();

        for name in authors_raw.split(',').map(str::trim) {
            match self.resolve_author(name).await {
                Ok(country) => countries.push(country),
                Err(e) => {
                    warn!(author = name, error = %e, "Failed to resolve author country");
                    countries.push(None);
                }
            }
        }

        countries
    }

    async fn resolve_author(&self, name: &str) -> Result<Option<String>> {
        if name.is_empty() {
            return Ok(None);
        }

        let Some(doc) = self.search_author(name).await? else {
            warn!(author = name, "Author not found");
            return Ok(None);
        };

        let Some(wikidata_id) = self.author_wikidata_id(&doc.key).await? else {
            return Ok(None);
        };

        self.country_from_wikidata(&wikidata_id).await
    }

    async fn search_author(&self, name: &str) -> Result<Option<AuthorDoc>> {
        let url = format!(
            "{}/search/authors.json?q={}",
            self.config.openlibrary_url,
            urlencoding::encode(name)
        );
        let response: AuthorSearchResponse = self.get_json(&url, None).await?;
        Ok(best_candidate(response.docs))
    }

    async fn author_wikidata_id(&self, author_key: &str) -> Result<Option<String>> {
        let url = format!("{}/authors/{author_key}.json", self.config.openlibrary_url);
        let detail: AuthorDetail = self.get_json(&url, None).await?;
        Ok(detail.remote_ids.and_then(|ids| ids.wikidata))
    }

    async fn country_from_wikidata(&self, wikidata_id: &str) -> Result<Option<String>> {
        let url = format!(
            "{}?query={}",
            self.config.wikidata_sparql_url,
            urlencoding::encode(&citizenship_query(wikidata_id))
        );
        let response: SparqlResponse = self
            .get_json(&url, Some("application/sparql-results+json"))
            .await?;

        Ok(response
            .results
            .bindings
            .into_iter()
            .next()
            .and_then(|binding| binding.country_label)
            .map(|label| label.value))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, accept: Option<&str>) -> Result<T> {
        let response = with_retry(&self.retry, || async move {
            let mut request = self.http.get(url);
            if let Some(accept) = accept {
                request = request.header("Accept", accept);
            }
            request.send().await?.error_for_status()
        })
        .await
        .map_err(|e| AppError::Enrichment(e.to_string()))?;

        Ok(response.json::<T>().await?)
    }
}

/// The most popular search candidate: ratings count, then work count, then
/// reading-log count, all descending.
fn best_candidate(mut docs: Vec<AuthorDoc>) -> Option<AuthorDoc> {
    docs.sort_by(|a, b| {
        b.ratings_count
            .cmp(&a.ratings_count)
            .then(b.work_count.cmp(&a.work_count))
            .then(b.readinglog_count.cmp(&a.readinglog_count))
    });
    docs.into_iter().next()
}

fn citizenship_query(wikidata_id: &str) -> String {
    format!(
        "SELECT ?countryLabel WHERE {{ \
           wd:{wikidata_id} wdt:P27 ?country . \
           SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"[AUTO_LANGUAGE],en\". }} \
         }} LIMIT 1"
    )
}

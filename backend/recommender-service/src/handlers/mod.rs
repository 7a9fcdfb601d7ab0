/// Recommendation API Handlers
///
/// Thin HTTP layer over the core contracts; every endpoint reads the
/// immutable context only.
use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::models::BookMetadata;
use crate::services::evaluator::{evaluate, EvaluationReport};
use crate::services::predictor::{predict, recommend_top_n};

/// Query parameters for GET /users/top
#[derive(Debug, Deserialize)]
pub struct TopUsersQuery {
    /// Number of users to return (default: 20, max: 100)
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
pub struct TopUserEntry {
    pub user_id: String,
    pub ratings: usize,
}

#[derive(Debug, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub books: usize,
}

#[derive(Debug, Serialize)]
pub struct PredictedBook {
    pub book_id: String,
    pub title: String,
    pub image_url: String,
    pub countries: Vec<String>,
    pub actual_rating: f64,
    pub predicted_rating: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RecommendedBook {
    pub book_id: String,
    pub title: String,
    pub image_url: String,
    pub countries: Vec<String>,
    pub predicted_rating: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub user_id: String,
    /// The user's held-out books with actual and predicted ratings.
    pub predictions: Vec<PredictedBook>,
    /// Top recommendations per relation variant.
    pub recommendations: HashMap<String, Vec<RecommendedBook>>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub variants: HashMap<String, EvaluationReport>,
}

/// GET /api/v1/users/top
/// Users ranked by how many ratings they contributed to the splits.
#[get("/api/v1/users/top")]
pub async fn get_top_users(
    query: web::Query<TopUsersQuery>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse> {
    let limit = query.limit.clamp(1, 100);

    let mut users: Vec<TopUserEntry> = ctx
        .user_train
        .iter()
        .map(|(user_id, train)| {
            let tested = ctx.user_test.get(user_id).map_or(0, HashMap::len);
            TopUserEntry {
                user_id: user_id.clone(),
                ratings: train.len() + tested,
            }
        })
        .collect();

    users.sort_by(|a, b| b.ratings.cmp(&a.ratings).then(a.user_id.cmp(&b.user_id)));
    users.truncate(limit);

    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/v1/countries
/// How many catalog books resolve to each country.
#[get("/api/v1/countries")]
pub async fn get_country_distribution(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for book in ctx.metadata.values() {
        // A book counts once per distinct country, even with co-authors
        // from the same place.
        let distinct: HashSet<&str> = book.known_countries().into_iter().collect();
        for country in distinct {
            *counts.entry(country).or_insert(0) += 1;
        }
    }

    let mut distribution: Vec<CountryCount> = counts
        .into_iter()
        .map(|(country, books)| CountryCount {
            country: country.to_string(),
            books,
        })
        .collect();
    distribution.sort_by(|a, b| b.books.cmp(&a.books).then(a.country.cmp(&b.country)));

    Ok(HttpResponse::Ok().json(distribution))
}

/// GET /api/v1/predict/{user_id}
/// The user's held-out books with predicted ratings, plus top
/// recommendations for every relation variant side by side.
#[get("/api/v1/predict/{user_id}")]
pub async fn predict_for_user(
    path: web::Path<String>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    if !ctx.user_train.contains_key(&user_id) {
        return Err(AppError::NotFound(format!("Unknown user: {user_id}")));
    }

    let primary = ctx
        .relations
        .first()
        .ok_or_else(|| AppError::Internal("No relation variants loaded".to_string()))?;
    let predictor = ctx.predictor_config();

    let mut predictions: Vec<PredictedBook> = ctx
        .user_test
        .get(&user_id)
        .map(|test| {
            test.iter()
                .map(|(book_id, actual)| {
                    let predicted =
                        predict(&ctx.user_train, &user_id, book_id, &primary.matrix, &predictor);
                    let (title, image_url, countries) = decorate(ctx.metadata.get(book_id), book_id);
                    PredictedBook {
                        book_id: book_id.clone(),
                        title,
                        image_url,
                        countries,
                        actual_rating: *actual,
                        predicted_rating: predicted,
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    predictions.sort_by(|a, b| a.book_id.cmp(&b.book_id));

    let seen = ctx.seen_books(&user_id);
    let recommendations: HashMap<String, Vec<RecommendedBook>> = ctx
        .relations
        .iter()
        .map(|variant| {
            let ranked = recommend_top_n(
                &ctx.user_train,
                &user_id,
                &seen,
                &variant.matrix,
                &ctx.metadata,
                &predictor,
                ctx.config.model.top_n,
            );

            let books = ranked
                .into_iter()
                .map(|(book_id, predicted_rating)| {
                    let (title, image_url, countries) =
                        decorate(ctx.metadata.get(&book_id), &book_id);
                    RecommendedBook {
                        book_id,
                        title,
                        image_url,
                        countries,
                        predicted_rating,
                    }
                })
                .collect();

            (variant.name.clone(), books)
        })
        .collect();

    debug!(
        user_id = %user_id,
        predictions = predictions.len(),
        variants = recommendations.len(),
        "Served predictions"
    );

    Ok(HttpResponse::Ok().json(PredictResponse {
        user_id,
        predictions,
        recommendations,
    }))
}

/// GET /api/v1/evaluate
/// Error and coverage over the held-out split, per relation variant.
#[get("/api/v1/evaluate")]
pub async fn evaluate_model(ctx: web::Data<AppContext>) -> Result<HttpResponse> {
    let predictor = ctx.predictor_config();

    let variants: HashMap<String, EvaluationReport> = ctx
        .relations
        .iter()
        .map(|variant| {
            (
                variant.name.clone(),
                evaluate(&ctx.test_ratings, &ctx.user_train, &variant.matrix, &predictor),
            )
        })
        .collect();

    Ok(HttpResponse::Ok().json(EvaluateResponse { variants }))
}

/// Response decoration from catalog metadata; unknown books fall back to
/// their id so a thin catalog never breaks the endpoint.
fn decorate(metadata: Option<&BookMetadata>, book_id: &str) -> (String, String, Vec<String>) {
    match metadata {
        Some(book) => {
            let mut countries: Vec<String> = Vec::new();
            for country in book.known_countries() {
                if !countries.iter().any(|c| c == country) {
                    countries.push(country.to_string());
                }
            }
            (book.title.clone(), book.image_url.clone(), countries)
        }
        None => (book_id.to_string(), String::new(), Vec::new()),
    }
}

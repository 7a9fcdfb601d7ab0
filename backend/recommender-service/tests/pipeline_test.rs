use actix_web::{test, web, App};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use recommender_service::config::{
    Config, DataConfig, EnrichmentConfig, ModelConfig, ServiceConfig, SimilarityVariant,
};
use recommender_service::context::AppContext;
use recommender_service::handlers::{evaluate_model, get_top_users, predict_for_user};
use recommender_service::jobs::run_model_batch;
use recommender_service::models::{BookMetadata, Rating, UserProfiles};
use recommender_service::repository::{
    similarity_artifact_name, ArtifactRepository, FileArtifactRepository, ARTIFACT_BOOK_METADATA,
    ARTIFACT_TEST_RATINGS, ARTIFACT_USER_TEST, ARTIFACT_USER_TRAIN,
};
use recommender_service::services::evaluator::evaluate;
use recommender_service::services::predictor::PredictorConfig;
use recommender_service::services::similarity::SimilarityEngine;
use recommender_service::services::vectors::build_item_vectors;

fn rating(user_id: &str, book_id: &str, value: f64) -> Rating {
    Rating {
        user_id: user_id.to_string(),
        book_id: book_id.to_string(),
        rating: value,
    }
}

fn test_config(artifacts_dir: &str, ratings_csv: &str) -> Config {
    Config {
        service: ServiceConfig {
            http_port: 0,
            service_name: "recommender-service".to_string(),
        },
        data: DataConfig {
            artifacts_dir: artifacts_dir.to_string(),
            ratings_csv: ratings_csv.to_string(),
            books_csv: String::new(),
        },
        model: ModelConfig {
            train_fraction: 0.8,
            split_seed: Some(42),
            similarity_workers: 2,
            similarity_deadline_secs: 0,
            k_neighbors: 20,
            min_neighbors: 3,
            top_n: 20,
            variants: vec![
                SimilarityVariant {
                    name: "diversity-07".to_string(),
                    alpha: 0.7,
                },
                SimilarityVariant {
                    name: "without-diversity".to_string(),
                    alpha: 1.0,
                },
            ],
        },
        enrichment: EnrichmentConfig {
            openlibrary_url: "http://localhost:0".to_string(),
            wikidata_sparql_url: "http://localhost:0".to_string(),
            max_attempts: 1,
            initial_backoff_ms: 1,
        },
    }
}

fn book(id: &str, country: Option<&str>) -> BookMetadata {
    BookMetadata {
        id: id.to_string(),
        authors: "Test Author".to_string(),
        title: format!("Book {id}"),
        image_url: String::new(),
        countries: vec![country.map(str::to_string)],
    }
}

/// A user whose rated books never overlap a target's neighborhood cannot
/// be predicted for: the failure is silent, excluded from the error
/// metrics, and still counted in the totals.
#[tokio::test]
async fn insufficient_evidence_is_counted_but_not_accumulated() {
    let train = vec![
        rating("u1", "b1", 5.0),
        rating("u1", "b2", 4.0),
        rating("u2", "b1", 5.0),
        rating("u2", "b2", 1.0),
    ];
    let test_split = vec![rating("u1", "b3", 1.0)];

    let vectors = Arc::new(build_item_vectors(&train));
    let matrix = SimilarityEngine::new(2)
        .compute(vectors, Arc::new(HashMap::new()), 0.7)
        .await
        .unwrap();

    let mut profiles = UserProfiles::new();
    for r in &train {
        profiles
            .entry(r.user_id.clone())
            .or_default()
            .insert(r.book_id.clone(), r.rating);
    }

    let report = evaluate(&test_split, &profiles, &matrix, &PredictorConfig::default());

    assert_eq!(report.total_tested, 1);
    assert_eq!(report.count, 0);
    assert_eq!(report.coverage, 0.0);
    assert!(report.mae.is_none());
    assert!(report.rmse.is_none());
}

fn write_ratings_csv(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("ratings.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "user_id,book_id,rating").unwrap();

    // Five users with heavy overlap on six books, plus one user with a
    // single rating that the splitter must drop.
    let rows = [
        ("u1", vec![("b1", 5.0), ("b2", 4.0), ("b3", 4.5), ("b4", 2.0), ("b5", 3.0)]),
        ("u2", vec![("b1", 4.0), ("b2", 5.0), ("b3", 3.5), ("b4", 1.0), ("b6", 4.0)]),
        ("u3", vec![("b1", 3.0), ("b2", 2.0), ("b3", 5.0), ("b5", 4.0), ("b6", 2.5)]),
        ("u4", vec![("b2", 4.5), ("b3", 4.0), ("b4", 3.0), ("b5", 5.0), ("b6", 1.0)]),
        ("u5", vec![("b1", 2.0), ("b3", 3.0), ("b4", 4.0), ("b5", 2.5), ("b6", 5.0)]),
        ("u6", vec![("b1", 5.0)]),
    ];
    for (user, ratings) in rows {
        for (book, value) in ratings {
            writeln!(file, "{user},{book},{value}").unwrap();
        }
    }

    path
}

#[tokio::test]
async fn model_batch_persists_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let ratings_csv = write_ratings_csv(dir.path());
    let config = test_config(dir.path().to_str().unwrap(), ratings_csv.to_str().unwrap());
    let repo = FileArtifactRepository::new(dir.path());

    let books: Vec<BookMetadata> = vec![
        book("b1", Some("United Kingdom")),
        book("b2", Some("Japan")),
        book("b3", Some("France")),
        book("b4", Some("Japan")),
        book("b5", None),
        book("b6", Some("Nigeria")),
    ];
    repo.save(ARTIFACT_BOOK_METADATA, &books).unwrap();

    let stats = run_model_batch(&config, &repo).await.unwrap();

    assert_eq!(stats.ratings_loaded, 26);
    assert_eq!(stats.users, 5); // u6 dropped
    assert_eq!(stats.train_ratings + stats.test_ratings, 25);
    assert_eq!(stats.variants_computed, 2);

    for name in ["diversity-07", "without-diversity"] {
        assert!(repo.exists(&similarity_artifact_name(name)));
    }

    // Per-user conservation: train + test adds back up to the raw counts.
    let user_train: UserProfiles = repo.load(ARTIFACT_USER_TRAIN).unwrap();
    let user_test: UserProfiles = repo.load(ARTIFACT_USER_TEST).unwrap();
    for user in ["u1", "u2", "u3", "u4", "u5"] {
        let train = user_train.get(user).map_or(0, HashMap::len);
        let test = user_test.get(user).map_or(0, HashMap::len);
        assert_eq!(train + test, 5, "user {user}");
        assert_eq!(train, 4, "user {user}");
    }
    assert!(!user_train.contains_key("u6"));

    let test_ratings: Vec<Rating> = repo.load(ARTIFACT_TEST_RATINGS).unwrap();
    assert_eq!(test_ratings.len(), 5);
}

#[actix_web::test]
async fn serving_surface_answers_from_batch_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let ratings_csv = write_ratings_csv(dir.path());
    let config = test_config(dir.path().to_str().unwrap(), ratings_csv.to_str().unwrap());
    let repo = FileArtifactRepository::new(dir.path());

    let books: Vec<BookMetadata> = vec![
        book("b1", Some("United Kingdom")),
        book("b2", Some("Japan")),
        book("b3", Some("France")),
        book("b4", Some("Japan")),
        book("b5", None),
        book("b6", Some("Nigeria")),
    ];
    repo.save(ARTIFACT_BOOK_METADATA, &books).unwrap();

    run_model_batch(&config, &repo).await.unwrap();

    let context = web::Data::new(AppContext::load(config, &repo).unwrap());
    let app = test::init_service(
        App::new()
            .app_data(context)
            .service(get_top_users)
            .service(predict_for_user)
            .service(evaluate_model),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/users/top").to_request();
    let users: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(users.len(), 5);
    assert_eq!(users[0]["ratings"], 5);

    let req = test::TestRequest::get().uri("/api/v1/predict/u1").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["predictions"].as_array().unwrap().len(), 1);
    assert!(body["recommendations"]["diversity-07"].is_array());
    assert!(body["recommendations"]["without-diversity"].is_array());

    let req = test::TestRequest::get()
        .uri("/api/v1/predict/nobody")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/api/v1/evaluate").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let variants = body["variants"].as_object().unwrap();
    assert_eq!(variants.len(), 2);
    for report in variants.values() {
        assert_eq!(report["total_tested"], 5);
    }
}

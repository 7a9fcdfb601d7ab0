use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recommender_service::config::Config;
use recommender_service::context::AppContext;
use recommender_service::handlers::{
    evaluate_model, get_country_distribution, get_top_users, predict_for_user,
};
use recommender_service::jobs::{run_enrichment_batch, run_model_batch};
use recommender_service::repository::FileArtifactRepository;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let repo = FileArtifactRepository::new(&config.data.artifacts_dir);

    match parse_mode(std::env::args()).as_str() {
        "model-batch" => {
            run_model_batch(&config, &repo).await?;
        }
        "enrich" => {
            run_enrichment_batch(&config, &repo).await?;
        }
        "serve" => serve(config, repo).await?,
        other => anyhow::bail!("Unknown mode: {other} (expected serve, model-batch or enrich)"),
    }

    Ok(())
}

async fn serve(config: Config, repo: FileArtifactRepository) -> anyhow::Result<()> {
    tracing::info!(
        "Starting {} v{} on port {}",
        config.service.service_name,
        env!("CARGO_PKG_VERSION"),
        config.service.http_port
    );

    let port = config.service.http_port;
    let context = web::Data::new(AppContext::load(config, &repo)?);

    HttpServer::new(move || {
        App::new()
            .app_data(context.clone())
            .wrap(Cors::permissive())
            .route("/health", web::get().to(|| async { "OK" }))
            .service(get_top_users)
            .service(get_country_distribution)
            .service(predict_for_user)
            .service(evaluate_model)
    })
    .bind(format!("0.0.0.0:{port}"))?
    .run()
    .await?;

    Ok(())
}

/// `--mode <name>` from the command line; serving is the default.
fn parse_mode(args: impl Iterator<Item = String>) -> String {
    let args: Vec<String> = args.collect();
    args.iter()
        .position(|arg| arg == "--mode")
        .and_then(|idx| args.get(idx + 1))
        .cloned()
        .unwrap_or_else(|| "serve".to_string())
}

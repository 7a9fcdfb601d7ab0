pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod jobs;
pub mod models;
pub mod repository;
pub mod services;

pub use config::Config;
pub use context::AppContext;
pub use error::{AppError, Result};
pub use services::{SimilarityEngine, PredictorConfig};

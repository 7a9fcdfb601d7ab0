pub mod enrichment;
pub mod evaluator;
pub mod predictor;
pub mod similarity;
pub mod splitter;
pub mod vectors;

pub use enrichment::AuthorCountryResolver;
pub use evaluator::{evaluate, EvaluationReport};
pub use predictor::{predict, recommend_top_n, PredictorConfig};
pub use similarity::SimilarityEngine;
pub use splitter::split_ratings;
pub use vectors::build_item_vectors;

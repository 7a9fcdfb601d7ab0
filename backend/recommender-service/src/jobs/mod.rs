pub mod enrichment_batch;
pub mod model_batch;

pub use enrichment_batch::{run_enrichment_batch, EnrichmentBatchStats};
pub use model_batch::{run_model_batch, ModelBatchStats};

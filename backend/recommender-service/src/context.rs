use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::models::{BookId, BookMetadata, Rating, SimilarityMatrix, UserProfiles};
use crate::repository::{
    similarity_artifact_name, ArtifactRepository, ARTIFACT_BOOK_METADATA, ARTIFACT_TEST_RATINGS,
    ARTIFACT_USER_TEST, ARTIFACT_USER_TRAIN,
};
use crate::services::predictor::PredictorConfig;

/// One loaded relation artifact.
pub struct RelationVariant {
    pub name: String,
    pub alpha: f64,
    pub matrix: SimilarityMatrix,
}

/// Everything the serving surface needs, loaded once at startup and passed
/// to every operation immutably. Never a process-wide singleton.
pub struct AppContext {
    pub config: Config,
    pub user_train: UserProfiles,
    pub user_test: UserProfiles,
    pub test_ratings: Vec<Rating>,
    pub metadata: HashMap<BookId, BookMetadata>,
    pub relations: Vec<RelationVariant>,
}

impl AppContext {
    pub fn load(config: Config, repo: &impl ArtifactRepository) -> Result<Self> {
        let user_train: UserProfiles = repo.load(ARTIFACT_USER_TRAIN)?;
        let user_test: UserProfiles = repo.load(ARTIFACT_USER_TEST)?;
        let test_ratings: Vec<Rating> = repo.load(ARTIFACT_TEST_RATINGS)?;

        let books: Vec<BookMetadata> = repo.load(ARTIFACT_BOOK_METADATA)?;
        let metadata: HashMap<BookId, BookMetadata> = books
            .into_iter()
            .map(|book| (book.id.clone(), book))
            .collect();

        let mut relations = Vec::new();
        for variant in &config.model.variants {
            let matrix: SimilarityMatrix =
                repo.load(&similarity_artifact_name(&variant.name))?;
            relations.push(RelationVariant {
                name: variant.name.clone(),
                alpha: variant.alpha,
                matrix,
            });
        }

        info!(
            users = user_train.len(),
            test_ratings = test_ratings.len(),
            books = metadata.len(),
            relations = relations.len(),
            "Loaded serving context"
        );

        Ok(Self {
            config,
            user_train,
            user_test,
            test_ratings,
            metadata,
            relations,
        })
    }

    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            k_neighbors: self.config.model.k_neighbors,
            min_neighbors: self.config.model.min_neighbors,
        }
    }

    /// Books the user has rated in either split; recommendation candidates
    /// exclude all of them.
    pub fn seen_books(&self, user_id: &str) -> HashSet<BookId> {
        let mut seen = HashSet::new();
        if let Some(train) = self.user_train.get(user_id) {
            seen.extend(train.keys().cloned());
        }
        if let Some(test) = self.user_test.get(user_id) {
            seen.extend(test.keys().cloned());
        }
        seen
    }
}

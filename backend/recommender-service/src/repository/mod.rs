use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{create_dir_all, rename, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use crate::error::{AppError, Result};

/// Names of the persisted artifacts written by the batch jobs and read at
/// process start. Relation variants are stored under their configured name
/// with the `similarity-` prefix.
pub const ARTIFACT_TRAIN_RATINGS: &str = "train-ratings";
pub const ARTIFACT_TEST_RATINGS: &str = "test-ratings";
pub const ARTIFACT_USER_TRAIN: &str = "user-train";
pub const ARTIFACT_USER_TEST: &str = "user-test";
pub const ARTIFACT_BOOK_METADATA: &str = "book-metadata";

pub fn similarity_artifact_name(variant: &str) -> String {
    format!("similarity-{variant}")
}

/// Store for named model artifacts. The engine only ever loads and saves
/// whole artifacts, so the storage medium stays swappable.
pub trait ArtifactRepository {
    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T>;
    fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()>;
    fn exists(&self, name: &str) -> bool;
}

/// Flat-file JSON implementation, one `<name>.json` per artifact.
#[derive(Debug, Clone)]
pub struct FileArtifactRepository {
    dir: PathBuf,
}

impl FileArtifactRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl ArtifactRepository for FileArtifactRepository {
    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        let file = File::open(&path)
            .map_err(|e| AppError::Artifact(format!("{}: {e}", path.display())))?;
        let value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AppError::Artifact(format!("{}: {e}", path.display())))?;
        Ok(value)
    }

    fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        if !self.dir.exists() {
            create_dir_all(&self.dir)?;
        }

        // Write to a sibling temp file first so readers never observe a
        // half-written artifact.
        let path = self.path(name);
        let tmp_path = self.dir.join(format!("{name}.json.tmp"));

        let file = File::create(&tmp_path)
            .map_err(|e| AppError::Artifact(format!("{}: {e}", tmp_path.display())))?;
        serde_json::to_writer(BufWriter::new(file), value)
            .map_err(|e| AppError::Artifact(format!("{}: {e}", tmp_path.display())))?;
        rename(&tmp_path, &path)
            .map_err(|e| AppError::Artifact(format!("{}: {e}", path.display())))?;

        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }
}

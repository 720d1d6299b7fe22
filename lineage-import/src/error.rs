//! Error types for the import crate.

use lineage_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("archive error: {0}")]
    Archive(#[from] lineage_archive::ArchiveError),

    #[error("store error: {0}")]
    Store(#[from] lineage_store::StoreError),

    #[error("import validation failed: {0}")]
    Validation(String),
}

impl From<ModelError> for ImportError {
    fn from(err: ModelError) -> Self {
        Self::Validation(err.to_string())
    }
}

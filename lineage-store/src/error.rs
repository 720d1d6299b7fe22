//! Error types for store collaborators.

use lineage_types::EntityId;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    #[error("entity already exists: {0}")]
    AlreadyExists(EntityId),

    #[error("link endpoint does not exist: {0}")]
    MissingEndpoint(EntityId),

    #[error("conflicting link: {0}")]
    LinkConflict(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

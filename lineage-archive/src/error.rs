//! Error types for the archive crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("repository error: {0}")]
    Store(#[from] lineage_store::StoreError),

    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("blob not found in archive: {0}")]
    BlobNotFound(String),

    #[error("no migration pathway from version {from} to {to}")]
    IncompatibleVersion { from: String, to: String },

    #[error("archive migration failed: {0}")]
    MigrationFailed(String),

    #[error("dangling link reference: {0}")]
    DanglingLink(String),

    #[error("destination already exists: {0}")]
    AlreadyExists(PathBuf),
}

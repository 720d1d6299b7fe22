//! Error types for the export crate.

use lineage_types::{EntityId, EntityKind};
use thiserror::Error;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("store error: {0}")]
    Store(#[from] lineage_store::StoreError),

    #[error("archive error: {0}")]
    Archive(#[from] lineage_archive::ArchiveError),

    #[error("seed entity {0} not found in the store")]
    SeedNotFound(EntityId),

    #[error("seed entity {id} has kind {kind}, expected node, group, computer, or code")]
    InvalidSeed { id: EntityId, kind: EntityKind },
}

//! Blob-store collaborator for node repository payloads.
//!
//! Nodes reference binary payloads through their opaque repository
//! metadata; the actual bytes live in a blob store. Export reads payloads
//! through a [`RepositorySource`], import writes them through a
//! [`RepositorySink`].

use crate::StoreResult;
use lineage_types::EntityId;
use std::collections::BTreeMap;

/// Read side of the blob store.
pub trait RepositorySource {
    /// Repository-relative paths stored for a node, in stable order.
    fn paths(&self, node: EntityId) -> StoreResult<Vec<String>>;

    /// The payload bytes at one path.
    fn read(&self, node: EntityId, path: &str) -> StoreResult<Vec<u8>>;
}

/// Write side of the blob store.
pub trait RepositorySink {
    fn write(&mut self, node: EntityId, path: &str, data: &[u8]) -> StoreResult<()>;
}

/// In-memory blob store for tests and small deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    blobs: BTreeMap<(EntityId, String), Vec<u8>>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a payload directly (fixture setup).
    pub fn put(&mut self, node: EntityId, path: impl Into<String>, data: Vec<u8>) {
        self.blobs.insert((node, path.into()), data);
    }

    #[must_use]
    pub fn get(&self, node: EntityId, path: &str) -> Option<&[u8]> {
        self.blobs
            .get(&(node, path.to_string()))
            .map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl RepositorySource for MemoryRepository {
    fn paths(&self, node: EntityId) -> StoreResult<Vec<String>> {
        Ok(self
            .blobs
            .keys()
            .filter(|(id, _)| *id == node)
            .map(|(_, path)| path.clone())
            .collect())
    }

    fn read(&self, node: EntityId, path: &str) -> StoreResult<Vec<u8>> {
        self.blobs
            .get(&(node, path.to_string()))
            .cloned()
            .ok_or_else(|| crate::StoreError::NotFound(node))
    }
}

impl RepositorySink for MemoryRepository {
    fn write(&mut self, node: EntityId, path: &str, data: &[u8]) -> StoreResult<()> {
        self.blobs.insert((node, path.to_string()), data.to_vec());
        Ok(())
    }
}

//! Archive writer.

use crate::data::{DATA_ENTRY, MANIFEST_ENTRY, METADATA_ENTRY, REPO_PREFIX};
use crate::{container, ArchiveData, ArchiveError, ArchiveFormat, ArchiveResult, BlobManifest, ManifestEntry};
use lineage_model::ArchiveMetadata;
use lineage_store::RepositorySource;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// Serializes a data record, its metadata, and the repository payloads of
/// every contained node into a single container file.
pub struct ArchiveWriter;

impl ArchiveWriter {
    /// Writes the archive at `dest` in the chosen encoding.
    ///
    /// Refuses to overwrite an existing file unless `force`. The write is
    /// atomic: the destination either holds the complete archive or
    /// whatever was there before.
    pub fn write(
        data: &ArchiveData,
        metadata: &ArchiveMetadata,
        repo: &dyn RepositorySource,
        dest: &Path,
        format: ArchiveFormat,
        force: bool,
    ) -> ArchiveResult<()> {
        if dest.exists() && !force {
            return Err(ArchiveError::AlreadyExists(dest.to_path_buf()));
        }

        let mut entries = Vec::new();
        entries.push((METADATA_ENTRY.to_string(), serde_json::to_vec_pretty(metadata)?));
        entries.push((DATA_ENTRY.to_string(), serde_json::to_vec_pretty(data)?));

        let mut manifest = BlobManifest::default();
        for uuid in data.nodes.keys() {
            for path in repo.paths(*uuid)? {
                let bytes = repo.read(*uuid, &path)?;
                let entry_name = format!("{REPO_PREFIX}{uuid}/{path}");
                manifest.nodes.entry(*uuid).or_default().insert(
                    path.clone(),
                    ManifestEntry {
                        entry: entry_name.clone(),
                        sha256: hex::encode(Sha256::digest(&bytes)),
                    },
                );
                entries.push((entry_name, bytes));
            }
        }
        entries.push((MANIFEST_ENTRY.to_string(), serde_json::to_vec_pretty(&manifest)?));

        container::write_entries(dest, format, &entries)?;
        info!(
            dest = %dest.display(),
            %format,
            nodes = data.nodes.len(),
            links = data.links.len(),
            "archive written"
        );
        Ok(())
    }
}

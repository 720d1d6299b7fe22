//! Archive reader.
//!
//! An [`ArchiveReader`] is a released-on-close handle: the underlying
//! container is fully validated and loaded at `open`, and every accessor
//! fails with an invalid-operation error once the handle has been closed.
//! [`with_archive`] scopes a handle to a closure and guarantees the close
//! on every path.

use crate::data::{DATA_ENTRY, MANIFEST_ENTRY, METADATA_ENTRY};
use crate::{container, ArchiveData, ArchiveError, ArchiveFormat, ArchiveResult, BlobManifest};
use lineage_model::ArchiveMetadata;
use lineage_types::{EntityId, EntityKind};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::Path;

struct Inner {
    format: ArchiveFormat,
    metadata: ArchiveMetadata,
    raw_data: Vec<u8>,
    /// Parsed lazily on first access to the data record.
    data: OnceCell<ArchiveData>,
    manifest: BlobManifest,
    blobs: BTreeMap<String, Vec<u8>>,
}

/// Read handle over one archive file.
pub struct ArchiveReader {
    inner: Option<Inner>,
}

impl ArchiveReader {
    /// Opens and validates the archive at `path`.
    ///
    /// The container must be readable and the metadata record must carry
    /// the version field; anything else fails with
    /// [`ArchiveError::Corrupt`] before the handle exists.
    pub fn open(path: &Path) -> ArchiveResult<Self> {
        let (format, entries) = container::read_entries(path)?;

        let mut raw_metadata = None;
        let mut raw_data = None;
        let mut raw_manifest = None;
        let mut blobs = BTreeMap::new();
        for (name, data) in entries {
            match name.as_str() {
                METADATA_ENTRY => raw_metadata = Some(data),
                DATA_ENTRY => raw_data = Some(data),
                MANIFEST_ENTRY => raw_manifest = Some(data),
                _ => {
                    blobs.insert(name, data);
                }
            }
        }

        let raw_metadata = raw_metadata
            .ok_or_else(|| ArchiveError::Corrupt("missing metadata record".into()))?;
        let metadata_value: Value = serde_json::from_slice(&raw_metadata)
            .map_err(|e| ArchiveError::Corrupt(format!("invalid metadata record: {e}")))?;
        if metadata_value.get("export_version").and_then(Value::as_str).is_none() {
            return Err(ArchiveError::Corrupt(
                "metadata record lacks the export_version field".into(),
            ));
        }
        let metadata: ArchiveMetadata = serde_json::from_value(metadata_value)
            .map_err(|e| ArchiveError::Corrupt(format!("invalid metadata record: {e}")))?;

        let raw_data =
            raw_data.ok_or_else(|| ArchiveError::Corrupt("missing data record".into()))?;

        // Archives from before the manifest era simply have no payloads.
        let manifest = match raw_manifest {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ArchiveError::Corrupt(format!("invalid blob manifest: {e}")))?,
            None => BlobManifest::default(),
        };

        Ok(Self {
            inner: Some(Inner {
                format,
                metadata,
                raw_data,
                data: OnceCell::new(),
                manifest,
                blobs,
            }),
        })
    }

    fn inner(&self) -> ArchiveResult<&Inner> {
        self.inner
            .as_ref()
            .ok_or_else(|| ArchiveError::InvalidOperation("archive handle is closed".into()))
    }

    /// Releases the handle. Further accessor calls fail with an
    /// invalid-operation error.
    pub fn close(&mut self) {
        self.inner = None;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// The detected container encoding.
    pub fn format(&self) -> ArchiveResult<ArchiveFormat> {
        Ok(self.inner()?.format)
    }

    /// The archive metadata record.
    pub fn metadata(&self) -> ArchiveResult<&ArchiveMetadata> {
        Ok(&self.inner()?.metadata)
    }

    /// The data record, parsed on first access and cached.
    pub fn data(&self) -> ArchiveResult<&ArchiveData> {
        let inner = self.inner()?;
        if let Some(parsed) = inner.data.get() {
            return Ok(parsed);
        }
        let parsed: ArchiveData = serde_json::from_slice(&inner.raw_data)
            .map_err(|e| ArchiveError::Corrupt(format!("invalid data record: {e}")))?;
        Ok(inner.data.get_or_init(|| parsed))
    }

    pub fn entity_count(&self, kind: EntityKind) -> ArchiveResult<usize> {
        Ok(self.data()?.entity_count(kind))
    }

    pub fn link_count(&self) -> ArchiveResult<usize> {
        Ok(self.data()?.link_count())
    }

    /// The blob manifest.
    pub fn manifest(&self) -> ArchiveResult<&BlobManifest> {
        Ok(&self.inner()?.manifest)
    }

    /// One repository payload, verified against its manifest hash.
    pub fn blob(&self, node: EntityId, path: &str) -> ArchiveResult<&[u8]> {
        let inner = self.inner()?;
        let entry = inner
            .manifest
            .entry(node, path)
            .ok_or_else(|| ArchiveError::BlobNotFound(format!("{node}/{path}")))?;
        let bytes = inner
            .blobs
            .get(&entry.entry)
            .ok_or_else(|| {
                ArchiveError::Corrupt(format!("manifest references missing entry {:?}", entry.entry))
            })?;
        let actual = hex::encode(Sha256::digest(bytes));
        if actual != entry.sha256 {
            return Err(ArchiveError::Corrupt(format!(
                "payload hash mismatch for {:?}: expected {}, got {actual}",
                entry.entry, entry.sha256
            )));
        }
        Ok(bytes)
    }
}

/// Opens the archive, runs `f` on the handle, and closes it on every path.
pub fn with_archive<T>(
    path: &Path,
    f: impl FnOnce(&mut ArchiveReader) -> ArchiveResult<T>,
) -> ArchiveResult<T> {
    let mut reader = ArchiveReader::open(path)?;
    let result = f(&mut reader);
    reader.close();
    result
}

/// Read-only statistics about an archive.
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    pub metadata: ArchiveMetadata,
    pub format: ArchiveFormat,
    pub entity_counts: BTreeMap<EntityKind, usize>,
    pub link_count: usize,
}

/// Reads metadata and per-kind statistics without touching any store.
pub fn inspect(path: &Path) -> ArchiveResult<ArchiveInfo> {
    with_archive(path, |reader| {
        let kinds = [
            EntityKind::Node,
            EntityKind::Group,
            EntityKind::Computer,
            EntityKind::Code,
            EntityKind::User,
            EntityKind::Comment,
            EntityKind::Log,
        ];
        let mut entity_counts = BTreeMap::new();
        for kind in kinds {
            entity_counts.insert(kind, reader.entity_count(kind)?);
        }
        Ok(ArchiveInfo {
            metadata: reader.metadata()?.clone(),
            format: reader.format()?,
            entity_counts,
            link_count: reader.link_count()?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArchiveWriter;
    use lineage_model::NodeRecord;
    use lineage_store::MemoryRepository;
    use pretty_assertions::assert_eq;

    fn sample_archive(dir: &Path, format: ArchiveFormat) -> std::path::PathBuf {
        let mut data = ArchiveData::new();
        let node = NodeRecord::new(EntityId::new(), "n1", "data.core.int");
        let node_id = node.uuid;
        data.nodes.insert(node_id, node);

        let mut repo = MemoryRepository::new();
        repo.put(node_id, "source/input.txt", b"payload bytes".to_vec());

        let metadata = ArchiveMetadata::new("1.0", "lineage-core test");
        let dest = dir.join(format!("sample-{format}.lineage"));
        ArchiveWriter::write(&data, &metadata, &repo, &dest, format, false).unwrap();
        dest
    }

    #[test]
    fn open_reads_back_written_archive() {
        for format in [
            ArchiveFormat::Zip,
            ArchiveFormat::ZipUncompressed,
            ArchiveFormat::TarGz,
        ] {
            let dir = tempfile::tempdir().unwrap();
            let dest = sample_archive(dir.path(), format);

            let reader = ArchiveReader::open(&dest).unwrap();
            assert_eq!(reader.format().unwrap(), format);
            assert_eq!(reader.metadata().unwrap().export_version, "1.0");
            assert_eq!(reader.entity_count(EntityKind::Node).unwrap(), 1);
            assert_eq!(reader.link_count().unwrap(), 0);

            let data = reader.data().unwrap();
            let (node_id, node) = data.nodes.iter().next().unwrap();
            assert_eq!(node.label, "n1");
            assert_eq!(
                reader.blob(*node_id, "source/input.txt").unwrap(),
                b"payload bytes"
            );
        }
    }

    #[test]
    fn closed_handle_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let dest = sample_archive(dir.path(), ArchiveFormat::Zip);

        let mut reader = ArchiveReader::open(&dest).unwrap();
        reader.close();
        assert!(reader.is_closed());
        assert!(matches!(
            reader.metadata(),
            Err(ArchiveError::InvalidOperation(_))
        ));
        assert!(matches!(
            reader.data(),
            Err(ArchiveError::InvalidOperation(_))
        ));
    }

    #[test]
    fn with_archive_closes_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = sample_archive(dir.path(), ArchiveFormat::Zip);

        let result: ArchiveResult<()> = with_archive(&dest, |_| {
            Err(ArchiveError::InvalidOperation("boom".into()))
        });
        assert!(result.is_err());
    }

    #[test]
    fn missing_version_field_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("noversion.lineage");
        let entries = vec![
            (
                METADATA_ENTRY.to_string(),
                b"{\"originating_system_version\":\"x\"}".to_vec(),
            ),
            (DATA_ENTRY.to_string(), b"{}".to_vec()),
        ];
        container::write_entries(&dest, ArchiveFormat::Zip, &entries).unwrap();
        assert!(matches!(
            ArchiveReader::open(&dest),
            Err(ArchiveError::Corrupt(_))
        ));
    }

    #[test]
    fn tampered_blob_fails_hash_check() {
        let dir = tempfile::tempdir().unwrap();
        let dest = sample_archive(dir.path(), ArchiveFormat::ZipUncompressed);

        // Rewrite the container with the payload flipped but the manifest
        // untouched.
        let (format, mut entries) = container::read_entries(&dest).unwrap();
        for (name, data) in &mut entries {
            if name.starts_with("repo/") {
                *data = b"tampered".to_vec();
            }
        }
        container::write_entries(&dest, format, &entries).unwrap();

        let reader = ArchiveReader::open(&dest).unwrap();
        let data = reader.data().unwrap();
        let node_id = *data.nodes.keys().next().unwrap();
        assert!(matches!(
            reader.blob(node_id, "source/input.txt"),
            Err(ArchiveError::Corrupt(_))
        ));
    }

    #[test]
    fn writer_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = sample_archive(dir.path(), ArchiveFormat::Zip);

        let err = ArchiveWriter::write(
            &ArchiveData::new(),
            &ArchiveMetadata::new("1.0", "test"),
            &MemoryRepository::new(),
            &dest,
            ArchiveFormat::Zip,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ArchiveError::AlreadyExists(_)));

        // With force the destination is replaced.
        ArchiveWriter::write(
            &ArchiveData::new(),
            &ArchiveMetadata::new("1.0", "test"),
            &MemoryRepository::new(),
            &dest,
            ArchiveFormat::Zip,
            true,
        )
        .unwrap();
        let reader = ArchiveReader::open(&dest).unwrap();
        assert_eq!(reader.entity_count(EntityKind::Node).unwrap(), 0);
    }

    #[test]
    fn inspect_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        let dest = sample_archive(dir.path(), ArchiveFormat::TarGz);
        let info = inspect(&dest).unwrap();
        assert_eq!(info.entity_counts[&EntityKind::Node], 1);
        assert_eq!(info.entity_counts[&EntityKind::Group], 0);
        assert_eq!(info.link_count, 0);
        assert_eq!(info.format, ArchiveFormat::TarGz);
    }
}

//! Archive container codec and schema migrations.
//!
//! An archive is one file holding a metadata record, a data record (entity
//! field mappings keyed by identifier, the link list, and group-membership
//! pairs), and the binary payloads of the contained nodes together with a
//! hashed manifest. Three container encodings are supported: deflated zip,
//! stored (uncompressed) zip, and a streaming tar.gz.
//!
//! Archives written at an older schema version are upgraded through a
//! registered chain of migration steps; the pathway planner resolves the
//! chain and fails on unreachable targets or (malformed-registry) cycles
//! before anything is extracted.

pub mod container;
mod data;
mod error;
mod format;
mod migrations;
mod reader;
mod writer;

pub use data::{
    ArchiveData, BlobManifest, ManifestEntry, DATA_ENTRY, MANIFEST_ENTRY, METADATA_ENTRY,
    REPO_PREFIX,
};
pub use error::{ArchiveError, ArchiveResult};
pub use format::ArchiveFormat;
pub use migrations::{
    migrate, MigrationCache, MigrationFn, MigrationRegistry, EXPORT_VERSION,
};
pub use reader::{inspect, with_archive, ArchiveInfo, ArchiveReader};
pub use writer::ArchiveWriter;

//! Container encodings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the single archive file is encoded on disk.
///
/// Readers never trust file extensions; the encoding is detected from the
/// leading magic bytes (`PK` for both zip variants, `1f 8b` for gzip).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// Deflate-compressed zip container (the default).
    Zip,
    /// Stored (uncompressed) zip container.
    ZipUncompressed,
    /// Gzip-compressed streaming tar container.
    TarGz,
}

impl Default for ArchiveFormat {
    fn default() -> Self {
        Self::Zip
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Zip => "zip",
            Self::ZipUncompressed => "zip-uncompressed",
            Self::TarGz => "tar.gz",
        };
        write!(f, "{name}")
    }
}

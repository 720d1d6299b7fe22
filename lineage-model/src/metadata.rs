//! Archive metadata record.

use serde::{Deserialize, Serialize};

/// Written once per archive; read-mostly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// Schema version of the archive container format.
    pub export_version: String,
    /// Version string of the system that wrote the archive.
    pub originating_system_version: String,
    /// One line per migration step the archive has been through, oldest
    /// first.
    #[serde(default)]
    pub conversion_info: Vec<String>,
}

impl ArchiveMetadata {
    #[must_use]
    pub fn new(export_version: impl Into<String>, originating: impl Into<String>) -> Self {
        Self {
            export_version: export_version.into(),
            originating_system_version: originating.into(),
            conversion_info: Vec::new(),
        }
    }
}

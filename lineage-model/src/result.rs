//! Outcome of an import run.

use lineage_types::{EntityId, EntityKind, LinkType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A link dropped during import because an endpoint could not be resolved.
///
/// Preserves the original link tuple plus the endpoint that was missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLink {
    pub input: EntityId,
    pub output: EntityId,
    pub link_type: LinkType,
    pub label: String,
    pub missing: EntityId,
}

/// Per-kind counts of what an import did, plus the unresolved-link report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportResult {
    /// Records inserted because no entity with the identifier existed.
    pub inserted: BTreeMap<EntityKind, u64>,
    /// Records reconciled against an existing entity with the same
    /// identifier.
    pub merged: BTreeMap<EntityKind, u64>,
    /// Links skipped under `ignore_unknown_nodes`, in archive order.
    pub skipped_links: Vec<SkippedLink>,
    /// The group every touched node was added to.
    pub group: Option<EntityId>,
}

impl ImportResult {
    pub fn record_inserted(&mut self, kind: EntityKind) {
        *self.inserted.entry(kind).or_insert(0) += 1;
    }

    pub fn record_merged(&mut self, kind: EntityKind) {
        *self.merged.entry(kind).or_insert(0) += 1;
    }

    /// Total inserted count for one kind (0 when absent).
    #[must_use]
    pub fn inserted_of(&self, kind: EntityKind) -> u64 {
        self.inserted.get(&kind).copied().unwrap_or(0)
    }

    /// Total merged count for one kind (0 when absent).
    #[must_use]
    pub fn merged_of(&self, kind: EntityKind) -> u64 {
        self.merged.get(&kind).copied().unwrap_or(0)
    }
}

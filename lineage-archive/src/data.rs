//! The archive data record and blob manifest.

use lineage_model::{
    CodeRecord, CommentRecord, ComputerRecord, Entity, GroupRecord, Link, LogRecord, NodeRecord,
    UserRecord,
};
use lineage_types::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known entry names inside the container.
pub const METADATA_ENTRY: &str = "metadata.json";
pub const DATA_ENTRY: &str = "data.json";
pub const MANIFEST_ENTRY: &str = "manifest.json";
pub const REPO_PREFIX: &str = "repo/";

/// Everything the data record holds: per-kind entity mappings keyed by
/// identifier, the link list, and group-membership pairs.
///
/// Sections absent from the record (older archives predate some of them)
/// deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveData {
    pub nodes: BTreeMap<EntityId, NodeRecord>,
    pub groups: BTreeMap<EntityId, GroupRecord>,
    pub computers: BTreeMap<EntityId, ComputerRecord>,
    pub codes: BTreeMap<EntityId, CodeRecord>,
    pub users: BTreeMap<EntityId, UserRecord>,
    pub comments: BTreeMap<EntityId, CommentRecord>,
    pub logs: BTreeMap<EntityId, LogRecord>,
    pub links: Vec<Link>,
    /// `(group, node)` pairs.
    pub group_membership: Vec<(EntityId, EntityId)>,
}

impl ArchiveData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files a record into the mapping for its kind.
    pub fn insert_entity(&mut self, entity: Entity) {
        match entity {
            Entity::Node(r) => {
                self.nodes.insert(r.uuid, r);
            }
            Entity::Group(r) => {
                self.groups.insert(r.uuid, r);
            }
            Entity::Computer(r) => {
                self.computers.insert(r.uuid, r);
            }
            Entity::Code(r) => {
                self.codes.insert(r.uuid, r);
            }
            Entity::User(r) => {
                self.users.insert(r.uuid, r);
            }
            Entity::Comment(r) => {
                self.comments.insert(r.uuid, r);
            }
            Entity::Log(r) => {
                self.logs.insert(r.uuid, r);
            }
        }
    }

    #[must_use]
    pub fn entity_count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Node => self.nodes.len(),
            EntityKind::Group => self.groups.len(),
            EntityKind::Computer => self.computers.len(),
            EntityKind::Code => self.codes.len(),
            EntityKind::User => self.users.len(),
            EntityKind::Comment => self.comments.len(),
            EntityKind::Log => self.logs.len(),
        }
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// All records as tagged entities, nodes first, in identifier order
    /// within each kind.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        let nodes = self.nodes.values().cloned().map(Entity::Node);
        let groups = self.groups.values().cloned().map(Entity::Group);
        let computers = self.computers.values().cloned().map(Entity::Computer);
        let codes = self.codes.values().cloned().map(Entity::Code);
        let users = self.users.values().cloned().map(Entity::User);
        let comments = self.comments.values().cloned().map(Entity::Comment);
        let logs = self.logs.values().cloned().map(Entity::Log);
        nodes
            .chain(groups)
            .chain(computers)
            .chain(codes)
            .chain(users)
            .chain(comments)
            .chain(logs)
    }
}

/// One payload entry: where the bytes live inside the container and what
/// they must hash to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Container entry name.
    pub entry: String,
    /// Hex-encoded sha256 of the payload.
    pub sha256: String,
}

/// Maps each node's repository-relative paths to container entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobManifest {
    pub nodes: BTreeMap<EntityId, BTreeMap<String, ManifestEntry>>,
}

impl BlobManifest {
    #[must_use]
    pub fn entry(&self, node: EntityId, path: &str) -> Option<&ManifestEntry> {
        self.nodes.get(&node).and_then(|paths| paths.get(path))
    }
}

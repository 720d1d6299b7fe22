//! Collaborator traits for the entity store.

use crate::StoreResult;
use chrono::{DateTime, Utc};
use lineage_model::{CommentRecord, Entity, GroupRecord, Link, LogRecord};
use lineage_types::{EntityId, EntityKind};
use serde_json::Value;
use std::collections::BTreeMap;

/// Selection criteria for batched scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityFilter {
    /// Every entity of one kind.
    OfKind(EntityKind),
    /// Nodes whose computer reference matches.
    ReferencesComputer(EntityId),
    /// Nodes whose code reference matches.
    ReferencesCode(EntityId),
}

/// Read capability the engines consume.
pub trait QueryStore {
    /// Resolves an identifier, `None` when absent.
    fn lookup(&self, id: EntityId) -> StoreResult<Option<Entity>>;

    /// Batched scan over entities matching a filter.
    fn scan(&self, filter: &EntityFilter) -> StoreResult<Vec<Entity>>;

    /// All links touching `id`, in either direction.
    fn incident_links(&self, id: EntityId) -> StoreResult<Vec<Link>>;

    /// Node members of a group.
    fn group_members(&self, group: EntityId) -> StoreResult<Vec<EntityId>>;

    /// Comments attached to a node.
    fn comments_for(&self, node: EntityId) -> StoreResult<Vec<CommentRecord>>;

    /// Log records attached to a node.
    fn logs_for(&self, node: EntityId) -> StoreResult<Vec<LogRecord>>;
}

/// One staged mutation.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert a new entity; fails if the identifier exists.
    Insert(Entity),
    /// Replace the extras mapping of an existing node.
    UpdateExtras {
        id: EntityId,
        extras: BTreeMap<String, Value>,
    },
    /// Replace content and modification time of an existing comment.
    ReplaceComment {
        id: EntityId,
        content: String,
        mtime: DateTime<Utc>,
    },
    /// Add a link; an identical existing link is a no-op.
    AddLink(Link),
    /// Insert a group if absent; a no-op when it already exists.
    EnsureGroup(GroupRecord),
    /// Add a node to a group (idempotent).
    AddToGroup { group: EntityId, member: EntityId },
}

/// An ordered sequence of mutations applied atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WriteOp> {
        self.ops.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Write capability the import engine consumes.
///
/// `apply` is the transaction boundary: implementations must commit the
/// whole batch or leave the store untouched.
pub trait WriteStore {
    fn apply(&mut self, batch: WriteBatch) -> StoreResult<()>;
}

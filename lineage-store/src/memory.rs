//! In-memory reference store.
//!
//! Semantics, not performance: this is the executable definition of the
//! store contract the engines are written against. `apply` stages every
//! mutation on a clone and swaps the whole state on success, so a failing
//! batch can never leave a partial write behind.

use crate::traits::{EntityFilter, QueryStore, WriteBatch, WriteOp, WriteStore};
use crate::{StoreError, StoreResult};
use lineage_model::{CommentRecord, Entity, Link, LogRecord};
use lineage_types::{EntityId, EntityKind};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entities: HashMap<EntityId, Entity>,
    links: Vec<Link>,
    /// `(input, output, label)` uniqueness index.
    link_index: HashSet<(EntityId, EntityId, String)>,
    /// `(label-scope node, link type as display, label)` uniqueness index.
    label_index: HashSet<(EntityId, String, String)>,
    /// `(group, member)` pairs.
    membership: BTreeSet<(EntityId, EntityId)>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct insert for store construction and fixtures; same rules as
    /// the batched [`WriteOp::Insert`].
    pub fn insert_entity(&mut self, entity: Entity) -> StoreResult<()> {
        let id = entity.uuid();
        if self.entities.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        self.entities.insert(id, entity);
        Ok(())
    }

    /// Direct link insert; same rules as the batched [`WriteOp::AddLink`].
    pub fn add_link(&mut self, link: Link) -> StoreResult<()> {
        Self::add_link_inner(
            &self.entities,
            &mut self.links,
            &mut self.link_index,
            &mut self.label_index,
            link,
        )
    }

    /// Direct membership insert; both entities must exist and the left
    /// side must be a group.
    pub fn add_to_group(&mut self, group: EntityId, member: EntityId) -> StoreResult<()> {
        match self.entities.get(&group) {
            None => return Err(StoreError::NotFound(group)),
            Some(Entity::Group(_)) => {}
            Some(other) => {
                return Err(StoreError::InvalidData(format!(
                    "membership target {group} is a {}, not a group",
                    other.kind()
                )));
            }
        }
        if !self.entities.contains_key(&member) {
            return Err(StoreError::NotFound(member));
        }
        self.membership.insert((group, member));
        Ok(())
    }

    #[must_use]
    pub fn entity_count(&self, kind: EntityKind) -> usize {
        self.entities.values().filter(|e| e.kind() == kind).count()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    fn add_link_inner(
        entities: &HashMap<EntityId, Entity>,
        links: &mut Vec<Link>,
        link_index: &mut HashSet<(EntityId, EntityId, String)>,
        label_index: &mut HashSet<(EntityId, String, String)>,
        link: Link,
    ) -> StoreResult<()> {
        if !entities.contains_key(&link.input) {
            return Err(StoreError::MissingEndpoint(link.input));
        }
        if !entities.contains_key(&link.output) {
            return Err(StoreError::MissingEndpoint(link.output));
        }
        let triple = (link.input, link.output, link.label.clone());
        if link_index.contains(&triple) {
            // Re-adding the identical link is an idempotent no-op; the
            // same triple with a different type is a conflict.
            if links.iter().any(|l| *l == link) {
                return Ok(());
            }
            return Err(StoreError::LinkConflict(format!(
                "link {} -> {} with label {:?} already exists with a different type",
                link.input, link.output, link.label
            )));
        }
        let label_key = (
            link.label_scope_node(),
            link.link_type.to_string(),
            link.label.clone(),
        );
        if label_index.contains(&label_key) {
            return Err(StoreError::LinkConflict(format!(
                "label {:?} already used by another {} link at {}",
                link.label, link.link_type, label_key.0
            )));
        }
        link_index.insert(triple);
        label_index.insert(label_key);
        links.push(link);
        Ok(())
    }

    fn apply_op(&mut self, op: WriteOp) -> StoreResult<()> {
        match op {
            WriteOp::Insert(entity) => self.insert_entity(entity),
            WriteOp::UpdateExtras { id, extras } => match self.entities.get_mut(&id) {
                Some(Entity::Node(node)) => {
                    node.extras = extras;
                    Ok(())
                }
                Some(_) => Err(StoreError::InvalidData(format!(
                    "entity {id} is not a node"
                ))),
                None => Err(StoreError::NotFound(id)),
            },
            WriteOp::ReplaceComment { id, content, mtime } => {
                match self.entities.get_mut(&id) {
                    Some(Entity::Comment(comment)) => {
                        comment.content = content;
                        comment.mtime = mtime;
                        Ok(())
                    }
                    Some(_) => Err(StoreError::InvalidData(format!(
                        "entity {id} is not a comment"
                    ))),
                    None => Err(StoreError::NotFound(id)),
                }
            }
            WriteOp::AddLink(link) => self.add_link(link),
            WriteOp::EnsureGroup(group) => match self.entities.get(&group.uuid) {
                None => self.insert_entity(Entity::Group(group)),
                Some(Entity::Group(_)) => Ok(()),
                Some(other) => Err(StoreError::InvalidData(format!(
                    "entity {} exists as a {}, not a group",
                    group.uuid,
                    other.kind()
                ))),
            },
            WriteOp::AddToGroup { group, member } => self.add_to_group(group, member),
        }
    }
}

impl QueryStore for MemoryStore {
    fn lookup(&self, id: EntityId) -> StoreResult<Option<Entity>> {
        Ok(self.entities.get(&id).cloned())
    }

    fn scan(&self, filter: &EntityFilter) -> StoreResult<Vec<Entity>> {
        let mut matched: Vec<Entity> = self
            .entities
            .values()
            .filter(|entity| match filter {
                EntityFilter::OfKind(kind) => entity.kind() == *kind,
                EntityFilter::ReferencesComputer(id) => {
                    matches!(entity, Entity::Node(n) if n.computer == Some(*id))
                }
                EntityFilter::ReferencesCode(id) => {
                    matches!(entity, Entity::Node(n) if n.code == Some(*id))
                }
            })
            .cloned()
            .collect();
        matched.sort_by_key(Entity::uuid);
        Ok(matched)
    }

    fn incident_links(&self, id: EntityId) -> StoreResult<Vec<Link>> {
        Ok(self
            .links
            .iter()
            .filter(|l| l.input == id || l.output == id)
            .cloned()
            .collect())
    }

    fn group_members(&self, group: EntityId) -> StoreResult<Vec<EntityId>> {
        if !self.entities.contains_key(&group) {
            return Err(StoreError::NotFound(group));
        }
        Ok(self
            .membership
            .iter()
            .filter(|(g, _)| *g == group)
            .map(|(_, m)| *m)
            .collect())
    }

    fn comments_for(&self, node: EntityId) -> StoreResult<Vec<CommentRecord>> {
        let mut comments: Vec<CommentRecord> = self
            .entities
            .values()
            .filter_map(|e| match e {
                Entity::Comment(c) if c.node == node => Some(c.clone()),
                _ => None,
            })
            .collect();
        comments.sort_by_key(|c| c.uuid);
        Ok(comments)
    }

    fn logs_for(&self, node: EntityId) -> StoreResult<Vec<LogRecord>> {
        let mut logs: Vec<LogRecord> = self
            .entities
            .values()
            .filter_map(|e| match e {
                Entity::Log(l) if l.node == node => Some(l.clone()),
                _ => None,
            })
            .collect();
        logs.sort_by_key(|l| l.uuid);
        Ok(logs)
    }
}

impl WriteStore for MemoryStore {
    fn apply(&mut self, batch: WriteBatch) -> StoreResult<()> {
        let op_count = batch.len();
        let mut staged = self.clone();
        for op in batch {
            staged.apply_op(op)?;
        }
        *self = staged;
        debug!(ops = op_count, "write batch committed");
        Ok(())
    }
}

//! Entity records.
//!
//! One record type per entity kind, all `deny_unknown_fields`: an archive
//! written by a newer, unknown schema fails loudly at read time instead of
//! silently losing data. Records are immutable snapshots once placed in an
//! archive; only the target store mutates during import.

use chrono::{DateTime, Utc};
use lineage_types::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A computed or stored data/process record, the primary unit of the
/// provenance graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeRecord {
    pub uuid: EntityId,
    pub label: String,
    /// Domain type tag (e.g. `"data.core.int"`). Opaque to the engines.
    pub node_type: String,
    pub attributes: BTreeMap<String, Value>,
    pub extras: BTreeMap<String, Value>,
    /// Opaque description of the node's binary payload locations.
    pub repository_metadata: Value,
    #[serde(default)]
    pub computer: Option<EntityId>,
    #[serde(default)]
    pub code: Option<EntityId>,
    #[serde(default)]
    pub user: Option<EntityId>,
    pub ctime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
}

impl NodeRecord {
    /// A minimal node with the given identity, empty mappings, and the
    /// current time. Convenient for building stores and fixtures.
    #[must_use]
    pub fn new(uuid: EntityId, label: impl Into<String>, node_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uuid,
            label: label.into(),
            node_type: node_type.into(),
            attributes: BTreeMap::new(),
            extras: BTreeMap::new(),
            repository_metadata: Value::Null,
            computer: None,
            code: None,
            user: None,
            ctime: now,
            mtime: now,
        }
    }
}

/// A named collection of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupRecord {
    pub uuid: EntityId,
    pub label: String,
    pub group_type: String,
}

/// A compute resource referenced by nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputerRecord {
    pub uuid: EntityId,
    pub label: String,
    pub hostname: String,
    pub attributes: BTreeMap<String, Value>,
}

/// An executable referenced by calculation nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeRecord {
    pub uuid: EntityId,
    pub label: String,
    #[serde(default)]
    pub computer: Option<EntityId>,
    pub attributes: BTreeMap<String, Value>,
}

/// An owning user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserRecord {
    pub uuid: EntityId,
    pub email: String,
}

/// A free-form comment attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentRecord {
    pub uuid: EntityId,
    pub node: EntityId,
    #[serde(default)]
    pub user: Option<EntityId>,
    pub content: String,
    pub ctime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
}

/// A log record attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogRecord {
    pub uuid: EntityId,
    pub node: EntityId,
    pub level: String,
    pub message: String,
    pub time: DateTime<Utc>,
}

/// Any archivable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Node(NodeRecord),
    Group(GroupRecord),
    Computer(ComputerRecord),
    Code(CodeRecord),
    User(UserRecord),
    Comment(CommentRecord),
    Log(LogRecord),
}

impl Entity {
    /// The kind tag of this record.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Node(_) => EntityKind::Node,
            Self::Group(_) => EntityKind::Group,
            Self::Computer(_) => EntityKind::Computer,
            Self::Code(_) => EntityKind::Code,
            Self::User(_) => EntityKind::User,
            Self::Comment(_) => EntityKind::Comment,
            Self::Log(_) => EntityKind::Log,
        }
    }

    /// The globally unique identifier of this record.
    #[must_use]
    pub fn uuid(&self) -> EntityId {
        match self {
            Self::Node(r) => r.uuid,
            Self::Group(r) => r.uuid,
            Self::Computer(r) => r.uuid,
            Self::Code(r) => r.uuid,
            Self::User(r) => r.uuid,
            Self::Comment(r) => r.uuid,
            Self::Log(r) => r.uuid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn node_record_roundtrip() {
        let mut node = NodeRecord::new(EntityId::new(), "pw", "process.calculation");
        node.attributes.insert("exit_status".into(), Value::from(0));
        node.extras.insert("tag".into(), Value::from("prod"));

        let json = serde_json::to_string(&node).unwrap();
        let back: NodeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }

    #[test]
    fn unknown_fields_rejected() {
        let mut value = serde_json::to_value(NodeRecord::new(EntityId::new(), "n", "data")).unwrap();
        value["surprise"] = Value::from(1);
        let result: Result<NodeRecord, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn missing_required_field_rejected() {
        let mut value = serde_json::to_value(NodeRecord::new(EntityId::new(), "n", "data")).unwrap();
        value.as_object_mut().unwrap().remove("attributes");
        let result: Result<NodeRecord, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn entity_kind_dispatch() {
        let id = EntityId::new();
        let entity = Entity::Group(GroupRecord {
            uuid: id,
            label: "runs".into(),
            group_type: "core".into(),
        });
        assert_eq!(entity.kind(), EntityKind::Group);
        assert_eq!(entity.uuid(), id);
    }
}

//! Directed, typed, labeled links between nodes.

use lineage_types::{EntityId, LinkEnd, LinkType};
use serde::{Deserialize, Serialize};

/// A directed edge `input -> output`.
///
/// Invariants enforced by the store, not by this type:
/// the tuple `(input, output, label)` is unique, and `label` is unique per
/// `(label-scope endpoint, link_type)` (see [`LinkType::label_scope`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Link {
    pub input: EntityId,
    pub output: EntityId,
    pub link_type: LinkType,
    pub label: String,
}

impl Link {
    #[must_use]
    pub fn new(
        input: EntityId,
        output: EntityId,
        link_type: LinkType,
        label: impl Into<String>,
    ) -> Self {
        Self {
            input,
            output,
            link_type,
            label: label.into(),
        }
    }

    /// The endpoint that owns this link's label.
    #[must_use]
    pub fn label_scope_node(&self) -> EntityId {
        match self.link_type.label_scope() {
            LinkEnd::Input => self.input,
            LinkEnd::Output => self.output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_scope_node_follows_type() {
        let a = EntityId::new();
        let b = EntityId::new();
        // a (data) feeds b (calc): the calc owns the port label.
        let input = Link::new(a, b, LinkType::InputCalc, "structure");
        assert_eq!(input.label_scope_node(), b);
        // a (calc) creates b (data): the calc owns the output label.
        let create = Link::new(a, b, LinkType::Create, "result");
        assert_eq!(create.label_scope_node(), a);
    }
}

//! The fixed enumerations of the provenance data model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The type of a directed link between two nodes.
///
/// CALL, CREATE, and RETURN edges encode the calculation/workflow
/// hierarchy; INPUT edges encode data consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// A data node consumed by a calculation.
    InputCalc,
    /// A data node consumed by a workflow.
    InputWork,
    /// A calculation producing a data node.
    Create,
    /// A workflow returning a data node.
    Return,
    /// A workflow calling a calculation.
    CallCalc,
    /// A workflow calling a sub-workflow.
    CallWork,
}

/// Which endpoint of a link a rule or invariant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEnd {
    Input,
    Output,
}

impl LinkType {
    /// The endpoint that owns the link label.
    ///
    /// A process names its input ports (so INPUT labels are scoped to the
    /// consuming `output` endpoint) and names its outputs and calls (so
    /// CREATE/RETURN/CALL labels are scoped to the `input` endpoint).
    #[must_use]
    pub fn label_scope(&self) -> LinkEnd {
        match self {
            Self::InputCalc | Self::InputWork => LinkEnd::Output,
            Self::Create | Self::Return | Self::CallCalc | Self::CallWork => LinkEnd::Input,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InputCalc => "input_calc",
            Self::InputWork => "input_work",
            Self::Create => "create",
            Self::Return => "return",
            Self::CallCalc => "call_calc",
            Self::CallWork => "call_work",
        };
        write!(f, "{name}")
    }
}

/// The closed set of archivable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Node,
    Group,
    Computer,
    Code,
    User,
    Comment,
    Log,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Node => "node",
            Self::Group => "group",
            Self::Computer => "computer",
            Self::Code => "code",
            Self::User => "user",
            Self::Comment => "comment",
            Self::Log => "log",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_type_serde_names() {
        assert_eq!(serde_json::to_string(&LinkType::InputCalc).unwrap(), "\"input_calc\"");
        assert_eq!(serde_json::to_string(&LinkType::CallWork).unwrap(), "\"call_work\"");
        let back: LinkType = serde_json::from_str("\"return\"").unwrap();
        assert_eq!(back, LinkType::Return);
    }

    #[test]
    fn label_scope_table() {
        assert_eq!(LinkType::InputCalc.label_scope(), LinkEnd::Output);
        assert_eq!(LinkType::InputWork.label_scope(), LinkEnd::Output);
        assert_eq!(LinkType::Create.label_scope(), LinkEnd::Input);
        assert_eq!(LinkType::Return.label_scope(), LinkEnd::Input);
        assert_eq!(LinkType::CallCalc.label_scope(), LinkEnd::Input);
        assert_eq!(LinkType::CallWork.label_scope(), LinkEnd::Input);
    }
}

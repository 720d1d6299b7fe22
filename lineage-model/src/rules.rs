//! Traversal rule set for export closure computation.

use serde::{Deserialize, Serialize};

/// Six independent flags, one per link type, each enabling the "unusual"
/// traversal direction for that type.
///
/// The usual directions are always followed and not rule-controlled: a
/// process pulls in its data inputs, a process pulls in what it created or
/// returned, and a caller pulls in its callees. The flags add the reverse
/// readings: a data artifact pulling in its creator (`create_backward`, the
/// only flag on by default), a data artifact pulling in the workflow that
/// returned it, a callee pulling in its caller, and a data artifact pulling
/// in its consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalRules {
    pub create_backward: bool,
    pub return_backward: bool,
    pub call_calc_backward: bool,
    pub call_work_backward: bool,
    pub input_calc_forward: bool,
    pub input_work_forward: bool,
}

impl Default for TraversalRules {
    fn default() -> Self {
        Self {
            create_backward: true,
            return_backward: false,
            call_calc_backward: false,
            call_work_backward: false,
            input_calc_forward: false,
            input_work_forward: false,
        }
    }
}

impl TraversalRules {
    /// Rules that follow every direction of every link type.
    #[must_use]
    pub fn follow_all() -> Self {
        Self {
            create_backward: true,
            return_backward: true,
            call_calc_backward: true,
            call_work_backward: true,
            input_calc_forward: true,
            input_work_forward: true,
        }
    }
}

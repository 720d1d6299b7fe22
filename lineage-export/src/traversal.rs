//! Export closure computation.
//!
//! Iterative fixpoint over a work queue of node identifiers. The usual
//! traversal directions are always followed: a process carries its data
//! inputs, its created and returned outputs, and its callees. The rule
//! flags add the reverse readings, of which only "a data artifact carries
//! its creator" is on by default.

use crate::{ExportError, ExportResult};
use lineage_model::{Entity, Link, TraversalRules};
use lineage_store::{EntityFilter, QueryStore, StoreError};
use lineage_types::{EntityId, LinkType};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// The result of a traversal: everything that belongs in the archive.
#[derive(Debug, Clone, Default)]
pub struct Closure {
    pub nodes: BTreeSet<EntityId>,
    /// Every link whose both endpoints made it into `nodes`, in a stable
    /// order.
    pub links: Vec<Link>,
    pub groups: BTreeSet<EntityId>,
    pub computers: BTreeSet<EntityId>,
    pub codes: BTreeSet<EntityId>,
}

/// Whether to follow `link` away from the already-included node `at`, and
/// toward which neighbor.
fn follow(link: &Link, at: EntityId, rules: &TraversalRules) -> (bool, EntityId) {
    if link.input == at {
        // Forward: CREATE/RETURN outputs and CALL callees always come
        // along; INPUT consumers only on request.
        let go = match link.link_type {
            LinkType::InputCalc => rules.input_calc_forward,
            LinkType::InputWork => rules.input_work_forward,
            _ => true,
        };
        (go, link.output)
    } else {
        // Backward: INPUT data always comes along; the producing or
        // calling process only on request.
        let go = match link.link_type {
            LinkType::InputCalc | LinkType::InputWork => true,
            LinkType::Create => rules.create_backward,
            LinkType::Return => rules.return_backward,
            LinkType::CallCalc => rules.call_calc_backward,
            LinkType::CallWork => rules.call_work_backward,
        };
        (go, link.input)
    }
}

/// Computes the export closure of `seeds` under `rules`.
///
/// Seeds may be heterogeneous: a group expands to its member nodes (and is
/// itself included), a computer or code is included directly and pulls in
/// every node referencing it, and a node is enqueued as-is. Duplicate
/// seeds are deduplicated; an unknown seed fails the whole traversal.
pub fn compute_closure(
    store: &dyn QueryStore,
    seeds: &[EntityId],
    rules: &TraversalRules,
) -> ExportResult<Closure> {
    let mut closure = Closure::default();
    let mut queue: VecDeque<EntityId> = VecDeque::new();

    let mut seen_seeds = HashSet::new();
    for &seed in seeds {
        if !seen_seeds.insert(seed) {
            continue;
        }
        let entity = store
            .lookup(seed)?
            .ok_or(ExportError::SeedNotFound(seed))?;
        match entity {
            Entity::Node(_) => queue.push_back(seed),
            Entity::Group(_) => {
                closure.groups.insert(seed);
                queue.extend(store.group_members(seed)?);
            }
            Entity::Computer(_) => {
                closure.computers.insert(seed);
                for entity in store.scan(&EntityFilter::ReferencesComputer(seed))? {
                    queue.push_back(entity.uuid());
                }
            }
            Entity::Code(_) => {
                closure.codes.insert(seed);
                for entity in store.scan(&EntityFilter::ReferencesCode(seed))? {
                    queue.push_back(entity.uuid());
                }
            }
            other => {
                return Err(ExportError::InvalidSeed {
                    id: seed,
                    kind: other.kind(),
                });
            }
        }
    }

    let mut visited: HashSet<EntityId> = HashSet::new();
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let entity = store.lookup(id)?.ok_or(StoreError::NotFound(id))?;
        let Entity::Node(record) = entity else {
            tracing::warn!(%id, "skipping non-node reference reached during traversal");
            continue;
        };
        closure.nodes.insert(id);
        if let Some(computer) = record.computer {
            closure.computers.insert(computer);
        }
        if let Some(code) = record.code {
            closure.codes.insert(code);
        }

        for link in store.incident_links(id)? {
            let (go, neighbor) = follow(&link, id, rules);
            if go && !visited.contains(&neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    // The archive carries every link internal to the node set, followed or
    // not, so re-importing reproduces the subgraph faithfully.
    let mut links: HashSet<Link> = HashSet::new();
    for &id in &closure.nodes {
        for link in store.incident_links(id)? {
            if closure.nodes.contains(&link.input) && closure.nodes.contains(&link.output) {
                links.insert(link);
            }
        }
    }
    closure.links = links.into_iter().collect();
    closure.links.sort_by(|a, b| {
        (a.input, a.output, a.link_type, &a.label).cmp(&(b.input, b.output, b.link_type, &b.label))
    });

    tracing::debug!(
        nodes = closure.nodes.len(),
        links = closure.links.len(),
        groups = closure.groups.len(),
        "computed export closure"
    );
    Ok(closure)
}

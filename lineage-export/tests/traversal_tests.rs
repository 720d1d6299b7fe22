//! Closure computation over a reference provenance graph.
//!
//! The fixture wires all six link types:
//!
//! ```text
//! data1, data2 --input_work--> work1 --call_work--> work2
//! data1 --input_work--> work2; work2 --call_calc--> calc1
//! data1 --input_calc--> calc1 --create--> data3, data4
//! work1, work2 --return--> data4
//! data4 --input_calc--> calc2 --create--> data5, data6
//! ```

use lineage_export::{compute_closure, ExportError};
use lineage_model::{ComputerRecord, Entity, GroupRecord, Link, NodeRecord, TraversalRules, UserRecord};
use lineage_store::MemoryStore;
use lineage_types::{EntityId, LinkType};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

struct Graph {
    store: MemoryStore,
    data: [EntityId; 6],
    work: [EntityId; 2],
    calc: [EntityId; 2],
}

fn node(store: &mut MemoryStore, label: &str, node_type: &str) -> EntityId {
    let record = NodeRecord::new(EntityId::new(), label, node_type);
    let id = record.uuid;
    store.insert_entity(Entity::Node(record)).unwrap();
    id
}

fn link(store: &mut MemoryStore, input: EntityId, output: EntityId, lt: LinkType, label: &str) {
    store.add_link(Link::new(input, output, lt, label)).unwrap();
}

fn graph() -> Graph {
    let mut store = MemoryStore::new();
    let data = std::array::from_fn(|i| {
        node(&mut store, &format!("data{}", i + 1), "data.core.int")
    });
    let work = std::array::from_fn(|i| {
        node(&mut store, &format!("work{}", i + 1), "process.workflow")
    });
    let calc = std::array::from_fn(|i| {
        node(&mut store, &format!("calc{}", i + 1), "process.calculation")
    });
    let [d1, d2, _d3, d4, _d5, _d6] = data;
    let [w1, w2] = work;
    let [c1, c2] = calc;

    link(&mut store, d1, w1, LinkType::InputWork, "a");
    link(&mut store, d2, w1, LinkType::InputWork, "b");
    link(&mut store, w1, w2, LinkType::CallWork, "sub");
    link(&mut store, d1, w2, LinkType::InputWork, "a");
    link(&mut store, w2, c1, LinkType::CallCalc, "step");
    link(&mut store, d1, c1, LinkType::InputCalc, "x");
    link(&mut store, c1, data[2], LinkType::Create, "out_a");
    link(&mut store, c1, d4, LinkType::Create, "out_b");
    link(&mut store, w2, d4, LinkType::Return, "result");
    link(&mut store, w1, d4, LinkType::Return, "result");
    link(&mut store, d4, c2, LinkType::InputCalc, "y");
    link(&mut store, c2, data[4], LinkType::Create, "out_a");
    link(&mut store, c2, data[5], LinkType::Create, "out_b");

    Graph {
        store,
        data,
        work,
        calc,
    }
}

fn ids(items: &[EntityId]) -> BTreeSet<EntityId> {
    items.iter().copied().collect()
}

// ── Default rules ──

#[test]
fn created_artifact_pulls_its_provenance() {
    let g = graph();
    let closure =
        compute_closure(&g.store, &[g.data[4]], &TraversalRules::default()).unwrap();
    // data5's creator calc2, its input data4, data4's creator calc1 with
    // its input data1, and every created sibling.
    assert_eq!(
        closure.nodes,
        ids(&[g.data[0], g.data[2], g.data[3], g.data[4], g.data[5], g.calc[0], g.calc[1]])
    );
}

#[test]
fn plain_input_artifact_stays_alone() {
    let g = graph();
    let closure =
        compute_closure(&g.store, &[g.data[0]], &TraversalRules::default()).unwrap();
    assert_eq!(closure.nodes, ids(&[g.data[0]]));
}

#[test]
fn workflow_seed_carries_inputs_callees_and_outputs() {
    let g = graph();
    let closure =
        compute_closure(&g.store, &[g.work[0]], &TraversalRules::default()).unwrap();
    // work1 pulls its inputs, its callee chain, the called calculation,
    // and everything they created or returned. calc2 only consumes data4
    // and stays out: inputs are not followed forward by default.
    assert_eq!(
        closure.nodes,
        ids(&[
            g.data[0], g.data[1], g.data[2], g.data[3], g.work[0], g.work[1], g.calc[0],
        ])
    );
}

#[test]
fn internal_links_are_archived_even_when_not_followed() {
    let g = graph();
    let closure =
        compute_closure(&g.store, &[g.data[4]], &TraversalRules::default()).unwrap();
    // work2 --return--> data4 crosses the boundary: excluded. But the
    // data1 --input_calc--> calc1 edge sits entirely inside the closure
    // although it was reached backward.
    assert!(closure
        .links
        .iter()
        .all(|l| closure.nodes.contains(&l.input) && closure.nodes.contains(&l.output)));
    assert!(closure
        .links
        .iter()
        .any(|l| l.input == g.data[0] && l.output == g.calc[0]));
    assert!(!closure.links.iter().any(|l| l.input == g.work[1]));
}

// ── Rule overrides ──

#[test]
fn disabling_create_backward_isolates_the_artifact() {
    let g = graph();
    let rules = TraversalRules {
        create_backward: false,
        ..TraversalRules::default()
    };
    let closure = compute_closure(&g.store, &[g.data[4]], &rules).unwrap();
    assert_eq!(closure.nodes, ids(&[g.data[4]]));
}

#[test]
fn input_forward_pulls_consumers() {
    let g = graph();
    let rules = TraversalRules {
        input_calc_forward: true,
        input_work_forward: true,
        ..TraversalRules::default()
    };
    let closure = compute_closure(&g.store, &[g.data[1]], &rules).unwrap();
    // data2 feeds work1, which carries everything downstream, including
    // the second calculation consuming data4.
    assert!(closure.nodes.contains(&g.work[0]));
    assert!(closure.nodes.contains(&g.calc[1]));
    assert!(closure.nodes.contains(&g.data[5]));
}

#[test]
fn follow_all_reaches_the_whole_graph() {
    let g = graph();
    let closure =
        compute_closure(&g.store, &[g.data[4]], &TraversalRules::follow_all()).unwrap();
    assert_eq!(closure.nodes.len(), 10);
    assert_eq!(closure.links.len(), 13);
}

// ── Heterogeneous seeds ──

#[test]
fn group_seed_expands_to_members() {
    let mut g = graph();
    let group = GroupRecord {
        uuid: EntityId::new(),
        label: "inputs".into(),
        group_type: "core".into(),
    };
    let group_id = group.uuid;
    g.store.insert_entity(Entity::Group(group)).unwrap();
    g.store.add_to_group(group_id, g.data[0]).unwrap();
    g.store.add_to_group(group_id, g.data[4]).unwrap();

    let closure =
        compute_closure(&g.store, &[group_id], &TraversalRules::default()).unwrap();
    assert!(closure.groups.contains(&group_id));
    assert!(closure.nodes.contains(&g.data[0]));
    // data5 expands as if seeded directly.
    assert!(closure.nodes.contains(&g.calc[1]));
}

#[test]
fn computer_seed_pulls_referencing_nodes() {
    let mut store = MemoryStore::new();
    let computer = ComputerRecord {
        uuid: EntityId::new(),
        label: "hpc".into(),
        hostname: "hpc.example.org".into(),
        attributes: Default::default(),
    };
    let computer_id = computer.uuid;
    store.insert_entity(Entity::Computer(computer)).unwrap();

    let mut calc = NodeRecord::new(EntityId::new(), "calc", "process.calculation");
    calc.computer = Some(computer_id);
    let calc_id = calc.uuid;
    store.insert_entity(Entity::Node(calc)).unwrap();
    let other = node(&mut store, "unrelated", "data.core.int");

    let closure =
        compute_closure(&store, &[computer_id], &TraversalRules::default()).unwrap();
    assert!(closure.computers.contains(&computer_id));
    assert!(closure.nodes.contains(&calc_id));
    assert!(!closure.nodes.contains(&other));
}

#[test]
fn duplicate_seeds_are_deduplicated() {
    let g = graph();
    let once = compute_closure(&g.store, &[g.data[4]], &TraversalRules::default()).unwrap();
    let twice = compute_closure(
        &g.store,
        &[g.data[4], g.data[4]],
        &TraversalRules::default(),
    )
    .unwrap();
    assert_eq!(once.nodes, twice.nodes);
    assert_eq!(once.links, twice.links);
}

#[test]
fn unknown_seed_fails() {
    let g = graph();
    let missing = EntityId::new();
    let err = compute_closure(&g.store, &[missing], &TraversalRules::default()).unwrap_err();
    assert!(matches!(err, ExportError::SeedNotFound(id) if id == missing));
}

#[test]
fn user_seed_is_rejected() {
    let mut g = graph();
    let user = UserRecord {
        uuid: EntityId::new(),
        email: "someone@example.org".into(),
    };
    let user_id = user.uuid;
    g.store.insert_entity(Entity::User(user)).unwrap();

    let err = compute_closure(&g.store, &[user_id], &TraversalRules::default()).unwrap_err();
    assert!(matches!(err, ExportError::InvalidSeed { id, .. } if id == user_id));
}

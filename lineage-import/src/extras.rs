//! Per-key reconciliation of extras mappings.

use lineage_model::{AddNew, ExtrasMergePolicy, OnCollision, RetainUnmatched};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reconciles the extras of an existing entity with the archive's version
/// under `policy`, returning the mapping the entity should end up with.
///
/// Keys only on the existing side are kept or discarded, keys only in the
/// archive are added or skipped, and keys on both sides are left,
/// overwritten, or removed outright.
#[must_use]
pub fn merge_extras(
    existing: &BTreeMap<String, Value>,
    incoming: &BTreeMap<String, Value>,
    policy: &ExtrasMergePolicy,
) -> BTreeMap<String, Value> {
    let mut merged = BTreeMap::new();

    for (key, value) in existing {
        match incoming.get(key) {
            None => {
                if policy.retain_unmatched == RetainUnmatched::Keep {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Some(incoming_value) => match policy.on_collision {
                OnCollision::Leave => {
                    merged.insert(key.clone(), value.clone());
                }
                OnCollision::Update => {
                    merged.insert(key.clone(), incoming_value.clone());
                }
                OnCollision::Delete => {}
            },
        }
    }

    if policy.add_new == AddNew::Create {
        for (key, value) in incoming {
            if !existing.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fixture() -> (BTreeMap<String, Value>, BTreeMap<String, Value>) {
        let existing = BTreeMap::from([
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!(1000)),
        ]);
        let incoming = BTreeMap::from([
            ("b".to_string(), json!(2)),
            ("c".to_string(), json!(3)),
        ]);
        (existing, incoming)
    }

    #[test]
    fn keep_existing_adds_only_new_keys() {
        let (existing, incoming) = fixture();
        let merged = merge_extras(&existing, &incoming, &ExtrasMergePolicy::keep_existing());
        assert_eq!(
            merged,
            BTreeMap::from([
                ("a".to_string(), json!(1)),
                ("b".to_string(), json!(1000)),
                ("c".to_string(), json!(3)),
            ])
        );
    }

    #[test]
    fn update_existing_lets_archive_win_collisions() {
        let (existing, incoming) = fixture();
        let merged = merge_extras(&existing, &incoming, &ExtrasMergePolicy::update_existing());
        assert_eq!(
            merged,
            BTreeMap::from([
                ("a".to_string(), json!(1)),
                ("b".to_string(), json!(2)),
                ("c".to_string(), json!(3)),
            ])
        );
    }

    #[test]
    fn mirror_matches_the_archive() {
        let (existing, incoming) = fixture();
        let merged = merge_extras(&existing, &incoming, &ExtrasMergePolicy::mirror());
        assert_eq!(merged, incoming);
    }

    #[test]
    fn none_leaves_existing_untouched() {
        let (existing, incoming) = fixture();
        let merged = merge_extras(&existing, &incoming, &ExtrasMergePolicy::none());
        assert_eq!(merged, existing);
    }

    #[test]
    fn delete_collision_removes_shared_keys() {
        let (existing, incoming) = fixture();
        let policy = ExtrasMergePolicy::parse("kcd").unwrap();
        let merged = merge_extras(&existing, &incoming, &policy);
        assert_eq!(
            merged,
            BTreeMap::from([("a".to_string(), json!(1)), ("c".to_string(), json!(3))])
        );
    }
}

//! Mapping-level diff: compare two optional dynamic attribute mappings.
//!
//! Keys present only in `new` are `Added`, keys present only in `old` are
//! `Removed`, and keys present in both with unequal values are `Modified`.
//! A missing mapping behaves like an empty one.

use std::collections::BTreeSet;

use dynattr_types::{AttrValue, Mapping};

/// How a key's lookup changed between two mappings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One key whose lookup differs. At least one side is present, and the two
/// sides are never equal.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingChange {
    pub key: String,
    pub old: Option<AttrValue>,
    pub new: Option<AttrValue>,
}

impl MappingChange {
    pub fn kind(&self) -> ChangeKind {
        match (&self.old, &self.new) {
            (None, _) => ChangeKind::Added,
            (_, None) => ChangeKind::Removed,
            _ => ChangeKind::Modified,
        }
    }
}

/// Per-key changes between two mappings, in key order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingDiff {
    pub changes: Vec<MappingChange>,
}

impl MappingDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Number of changes of one kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind() == kind).count()
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.changes.iter().map(|c| c.key.clone()).collect()
    }
}

impl IntoIterator for MappingDiff {
    type Item = MappingChange;
    type IntoIter = std::vec::IntoIter<MappingChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// The keys from [`changed_keys`], each with its value on both sides.
pub fn diff_mappings(old: Option<&Mapping>, new: Option<&Mapping>) -> MappingDiff {
    let lookup = |side: Option<&Mapping>, key: &str| side.and_then(|m| m.get(key)).cloned();
    let changes = changed_keys(old, new)
        .into_iter()
        .map(|key| MappingChange {
            old: lookup(old, &key),
            new: lookup(new, &key),
            key,
        })
        .collect();
    MappingDiff { changes }
}

/// The set of keys whose lookups differ between `a` and `b`.
///
/// Clones no values.
pub fn changed_keys(a: Option<&Mapping>, b: Option<&Mapping>) -> BTreeSet<String> {
    match (a, b) {
        (None, None) => BTreeSet::new(),
        (None, Some(b)) => b.keys().cloned().collect(),
        (Some(a), None) => a.keys().cloned().collect(),
        (Some(a), Some(b)) => a
            .keys()
            .chain(b.keys())
            .filter(|key| a.get(*key) != b.get(*key))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynattr_types::mapping_from_pairs;
    use proptest::prelude::*;

    fn keys(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn arb_mapping() -> impl Strategy<Value = Mapping> {
        let value = prop_oneof![
            Just(AttrValue::Null),
            any::<bool>().prop_map(AttrValue::Bool),
            (0i64..4).prop_map(AttrValue::Int),
            "[ab]{0,2}".prop_map(AttrValue::Text),
        ];
        proptest::collection::btree_map("[a-e]", value, 0..5)
    }

    #[test]
    fn identical_mappings_no_diff() {
        let m = mapping_from_pairs([("a", 1), ("b", 2)]);
        assert!(diff_mappings(Some(&m), Some(&m)).is_empty());
        assert!(changed_keys(Some(&m), Some(&m)).is_empty());
    }

    #[test]
    fn absent_to_absent_is_empty() {
        assert!(diff_mappings(None, None).is_empty());
        assert!(changed_keys(None, None).is_empty());
    }

    #[test]
    fn absent_side_yields_all_keys_of_other() {
        let m = mapping_from_pairs([("x", 42), ("y", 7)]);

        let forward = diff_mappings(None, Some(&m));
        assert_eq!(forward.count(ChangeKind::Added), 2);
        assert_eq!(changed_keys(None, Some(&m)), keys(&["x", "y"]));

        let backward = diff_mappings(Some(&m), None);
        assert_eq!(backward.count(ChangeKind::Removed), 2);
        assert_eq!(changed_keys(Some(&m), None), keys(&["x", "y"]));
    }

    #[test]
    fn absent_differs_from_empty_only_when_other_side_has_keys() {
        let empty = Mapping::new();
        assert!(changed_keys(None, Some(&empty)).is_empty());
        assert!(changed_keys(Some(&empty), None).is_empty());
    }

    #[test]
    fn mixed_changes() {
        let old = mapping_from_pairs([("a", 1), ("b", 2)]);
        let new = mapping_from_pairs([("a", 1), ("c", 3)]);

        let diff = diff_mappings(Some(&old), Some(&new));
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.count(ChangeKind::Removed), 1);
        assert_eq!(diff.count(ChangeKind::Added), 1);
        assert_eq!(diff.count(ChangeKind::Modified), 0);
        assert_eq!(diff.keys(), keys(&["b", "c"]));
        assert_eq!(changed_keys(Some(&old), Some(&new)), keys(&["b", "c"]));
    }

    #[test]
    fn modification_carries_both_values() {
        let old = mapping_from_pairs([("count", 1)]);
        let new = mapping_from_pairs([("count", 2)]);

        let diff = diff_mappings(Some(&old), Some(&new));
        assert_eq!(
            diff.changes,
            vec![MappingChange {
                key: "count".into(),
                old: Some(AttrValue::Int(1)),
                new: Some(AttrValue::Int(2)),
            }]
        );
        assert_eq!(diff.changes[0].kind(), ChangeKind::Modified);
    }

    #[test]
    fn null_differs_from_missing() {
        let old = mapping_from_pairs([("k", AttrValue::Null)]);
        let new = Mapping::new();
        assert_eq!(changed_keys(Some(&old), Some(&new)), keys(&["k"]));
        let diff = diff_mappings(Some(&old), Some(&new));
        assert_eq!(diff.changes[0].kind(), ChangeKind::Removed);
        assert_eq!(diff.changes[0].old, Some(AttrValue::Null));
    }

    #[test]
    fn type_change_detected() {
        let old = mapping_from_pairs([("v", AttrValue::Int(42))]);
        let new = mapping_from_pairs([("v", AttrValue::from("forty-two"))]);
        assert_eq!(diff_mappings(Some(&old), Some(&new)).count(ChangeKind::Modified), 1);
    }

    #[test]
    fn changes_are_key_ordered() {
        let old = mapping_from_pairs([("d", 1), ("b", 1)]);
        let new = mapping_from_pairs([("a", 1), ("c", 1), ("b", 2)]);
        let diff = diff_mappings(Some(&old), Some(&new));
        let order: Vec<&str> = diff.changes.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    proptest! {
        #[test]
        fn diff_is_symmetric(a in arb_mapping(), b in arb_mapping()) {
            prop_assert_eq!(changed_keys(Some(&a), Some(&b)), changed_keys(Some(&b), Some(&a)));
        }

        #[test]
        fn diff_is_reflexive(a in arb_mapping()) {
            prop_assert!(changed_keys(Some(&a), Some(&a)).is_empty());
        }

        #[test]
        fn structured_and_key_diffs_agree(a in arb_mapping(), b in arb_mapping()) {
            prop_assert_eq!(diff_mappings(Some(&a), Some(&b)).keys(), changed_keys(Some(&a), Some(&b)));
        }

        #[test]
        fn changes_rebuild_the_new_side(a in arb_mapping(), b in arb_mapping()) {
            let mut rebuilt = a.clone();
            for change in diff_mappings(Some(&a), Some(&b)) {
                match change.new {
                    Some(value) => rebuilt.insert(change.key, value),
                    None => rebuilt.remove(&change.key),
                };
            }
            prop_assert_eq!(rebuilt, b);
        }

        #[test]
        fn absent_side_yields_other_keys(a in arb_mapping()) {
            let all: BTreeSet<String> = a.keys().cloned().collect();
            prop_assert_eq!(changed_keys(None, Some(&a)), all.clone());
            prop_assert_eq!(changed_keys(Some(&a), None), all);
        }
    }
}

//! Property tests: the tree against an in-memory `BTreeSet` model.

use pagetree::{BTree, SyncPolicy, TreeConfig, TreeError};
use proptest::prelude::*;
use std::collections::BTreeSet;
use tempfile::tempdir;

#[derive(Debug, Clone)]
enum Op {
    Insert(i32),
    Delete(i32),
    Search(i32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // narrow key range so deletes and duplicates actually hit
    let key = -200i32..200;
    prop_oneof![
        4 => key.clone().prop_map(Op::Insert),
        3 => key.clone().prop_map(Op::Delete),
        1 => key.prop_map(Op::Search),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_matches_model(degree in 2u32..=6, ops in prop::collection::vec(op_strategy(), 1..400)) {
        let dir = tempdir().unwrap();
        let config = TreeConfig::new(degree).with_sync(SyncPolicy::OsBuffered);
        let mut tree = BTree::init_with(dir.path().join("tree.db"), config).unwrap();
        let mut model = BTreeSet::new();

        for op in &ops {
            match *op {
                Op::Insert(key) => {
                    let result = tree.insert(key);
                    if model.insert(key) {
                        prop_assert!(result.is_ok());
                    } else {
                        prop_assert!(matches!(result, Err(TreeError::DuplicateKey(k)) if k == key));
                    }
                }
                Op::Delete(key) => {
                    let result = tree.delete(key);
                    if model.remove(&key) {
                        prop_assert!(result.is_ok());
                    } else {
                        prop_assert!(matches!(result, Err(TreeError::NotFound(k)) if k == key));
                    }
                }
                Op::Search(key) => {
                    prop_assert_eq!(tree.search(key).unwrap().is_some(), model.contains(&key));
                }
            }
        }

        let stats = tree.validate().unwrap();
        prop_assert_eq!(stats.keys, model.len());
        prop_assert_eq!(tree.traverse().unwrap(), model.iter().copied().collect::<Vec<_>>());
        prop_assert_eq!(tree.min().unwrap(), model.first().copied());
        prop_assert_eq!(tree.max().unwrap(), model.last().copied());
    }

    #[test]
    fn prop_survives_reopen(degree in 2u32..=8, keys in prop::collection::btree_set(any::<i32>(), 0..200)) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");
        let config = TreeConfig::new(degree).with_sync(SyncPolicy::OsBuffered);

        let mut tree = BTree::init_with(&path, config).unwrap();
        for &key in &keys {
            tree.insert(key).unwrap();
        }
        tree.close().unwrap();

        let mut tree = BTree::open_with(&path, SyncPolicy::OsBuffered).unwrap();
        prop_assert_eq!(tree.degree(), degree);
        prop_assert_eq!(tree.traverse().unwrap(), keys.iter().copied().collect::<Vec<_>>());
        tree.validate().unwrap();
    }

    #[test]
    fn prop_search_cost_bounded_by_height(keys in prop::collection::btree_set(0i32..10_000, 1..300)) {
        let dir = tempdir().unwrap();
        let config = TreeConfig::new(3).with_sync(SyncPolicy::OsBuffered);
        let mut tree = BTree::init_with(dir.path().join("tree.db"), config).unwrap();
        for &key in &keys {
            tree.insert(key).unwrap();
        }
        let height = tree.height().unwrap() as u64;

        for key in [0, 5_000, 9_999, 10_001] {
            let before = tree.io_stats();
            tree.search(key).unwrap();
            let cost = tree.io_stats().since(&before);
            // one page per level
            prop_assert!(cost.pages_read <= height);
            prop_assert_eq!(cost.pages_written, 0);
        }
    }
}

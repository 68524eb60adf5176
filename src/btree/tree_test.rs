// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Tests for the disk-backed B+-Tree.

#[cfg(test)]
mod tests {
    use crate::btree::node::{Node, NodeKind};
    use crate::btree::tree::{BPlusTree, ROOT_BLOCK};
    use crate::btree::Entry;
    use crate::storage::StorageManager;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn tree_at(dir: &TempDir) -> (BPlusTree<i64, u64>, PathBuf) {
        let path = dir.path().join("test.index");
        (BPlusTree::open(&path, 5).unwrap(), path)
    }

    #[test]
    fn test_search_on_empty_tree_is_empty() {
        let dir = TempDir::new().unwrap();
        let (tree, _) = tree_at(&dir);

        assert!(tree.exact_search(&42).unwrap().is_empty());
        assert!(tree.gt_search(&0, true).unwrap().is_empty());
        assert!(tree.lt_search(&100, true).unwrap().is_empty());
        assert!(tree.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_exact_search() {
        let dir = TempDir::new().unwrap();
        let (mut tree, _) = tree_at(&dir);

        tree.insert(Entry { index: 10, value: 100 }).unwrap();
        tree.insert(Entry { index: 20, value: 200 }).unwrap();

        let found = tree.exact_search(&10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, 100);
        assert!(tree.exact_search(&15).unwrap().is_empty());
    }

    #[test]
    fn test_duplicates_are_preserved_across_splits() {
        let dir = TempDir::new().unwrap();
        let (mut tree, _) = tree_at(&dir);

        for (sequence, key) in [3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5].into_iter().enumerate() {
            tree.insert(Entry {
                index: key,
                value: sequence as u64,
            })
            .unwrap();
        }

        assert_eq!(tree.exact_search(&5).unwrap().len(), 3);
        assert!(tree.exact_search(&7).unwrap().is_empty());

        let keys: Vec<i64> = tree.get_all().unwrap().iter().map(|e| e.index).collect();
        assert_eq!(keys, vec![1, 1, 2, 3, 3, 4, 5, 5, 5, 6, 9]);
    }

    #[test]
    fn test_newest_duplicate_sorts_first() {
        let dir = TempDir::new().unwrap();
        let (mut tree, _) = tree_at(&dir);

        tree.insert(Entry { index: 7, value: 1 }).unwrap();
        tree.insert(Entry { index: 7, value: 2 }).unwrap();

        let found = tree.exact_search(&7).unwrap();
        assert_eq!(found[0].value, 2);
        assert_eq!(found[1].value, 1);
    }

    #[test]
    fn test_range_searches_follow_leaf_chain() {
        let dir = TempDir::new().unwrap();
        let (mut tree, _) = tree_at(&dir);

        for key in 1..=9 {
            tree.insert(Entry {
                index: key,
                value: key as u64,
            })
            .unwrap();
        }

        let gt: Vec<i64> = tree.gt_search(&6, false).unwrap().iter().map(|e| e.index).collect();
        assert_eq!(gt, vec![7, 8, 9]);

        let gte: Vec<i64> = tree.gt_search(&6, true).unwrap().iter().map(|e| e.index).collect();
        assert_eq!(gte, vec![6, 7, 8, 9]);

        let lt: Vec<i64> = tree.lt_search(&4, false).unwrap().iter().map(|e| e.index).collect();
        assert_eq!(lt, vec![1, 2, 3]);

        let lte: Vec<i64> = tree.lt_search(&4, true).unwrap().iter().map(|e| e.index).collect();
        assert_eq!(lte, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_root_stays_at_block_one_across_splits() {
        let dir = TempDir::new().unwrap();
        let (mut tree, path) = tree_at(&dir);

        for key in 1..=9 {
            tree.insert(Entry {
                index: key,
                value: key as u64,
            })
            .unwrap();
        }
        drop(tree);

        let storage = StorageManager::open(&path).unwrap();
        let root: Node<i64, u64> = Node::decode(&storage.read_data(ROOT_BLOCK).unwrap()).unwrap();
        assert_eq!(root.kind, NodeKind::Reference);
        assert!(!root.entries.is_empty());
    }

    #[test]
    fn test_leaf_chain_yields_sorted_keys() {
        let dir = TempDir::new().unwrap();
        let (mut tree, _) = tree_at(&dir);

        // Insert in a scrambled order and confirm the chain sorts it out.
        for key in [13, 2, 8, 5, 1, 11, 3, 9, 7, 4, 12, 6, 10] {
            tree.insert(Entry {
                index: key,
                value: key as u64,
            })
            .unwrap();
        }

        let keys: Vec<i64> = tree.get_all().unwrap().iter().map(|e| e.index).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 13);
    }

    #[test]
    fn test_reopen_preserves_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.index");

        {
            let mut tree: BPlusTree<i64, u64> = BPlusTree::open(&path, 5).unwrap();
            for key in 1..=6 {
                tree.insert(Entry {
                    index: key,
                    value: key as u64 * 10,
                })
                .unwrap();
            }
        }

        let mut tree: BPlusTree<i64, u64> = BPlusTree::open(&path, 5).unwrap();
        assert_eq!(tree.exact_search(&4).unwrap()[0].value, 40);

        tree.insert(Entry { index: 7, value: 70 }).unwrap();
        let keys: Vec<i64> = tree.get_all().unwrap().iter().map(|e| e.index).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_string_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("names.index");
        let mut tree: BPlusTree<String, u64> = BPlusTree::open(&path, 5).unwrap();

        for (position, name) in ["delta", "alpha", "echo", "bravo", "charlie"].iter().enumerate() {
            tree.insert(Entry {
                index: name.to_string(),
                value: position as u64,
            })
            .unwrap();
        }

        let found = tree.exact_search(&"bravo".to_string()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, 3);

        let keys: Vec<String> = tree.get_all().unwrap().into_iter().map(|e| e.index).collect();
        assert_eq!(keys, vec!["alpha", "bravo", "charlie", "delta", "echo"]);
    }

    #[test]
    fn test_rejects_fanout_below_three() {
        let dir = TempDir::new().unwrap();
        let result: Result<BPlusTree<i64, u64>, _> =
            BPlusTree::open(dir.path().join("tiny.index"), 2);
        assert!(result.is_err());
    }
}

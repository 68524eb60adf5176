// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! B+-Tree over block storage.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ BPlusTree<K, V>                             │
//! ├─────────────────────────────────────────────┤
//! │ - node_size: fanout (default 5)             │
//! │ - storage: StorageManager (node chains)     │
//! │ - root: always block 1                      │
//! └─────────────────────────────────────────────┘
//!          │
//!          ▼ one chain per node
//! ┌──────────────────┐
//! │ <name>.index     │
//! │ [block 1] root   │
//! │ [block 2..] rest │
//! └──────────────────┘
//! ```
//!
//! Duplicate keys are permitted and preserved; equal keys may straddle a
//! leaf boundary, so searches that reach the end of a leaf continue along
//! the sibling chain. Every node mutation deletes the chain backing the
//! block and rewrites the serialised node at the same block number, which
//! keeps the root resident at block 1 across all tree heights.

use crate::btree::node::{Entry, Node, NodeKind, NodeValue, Reference};
use crate::error::{FlowError, FlowResult};
use crate::storage::StorageManager;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::path::Path;

/// Block number the root node always occupies.
pub const ROOT_BLOCK: u64 = 1;

/// Default fanout.
pub const DEFAULT_NODE_SIZE: usize = 5;

/// Disk-backed B+-Tree index.
///
/// ## Type Parameters
/// - `K`: key type (totally ordered, serialisable)
/// - `V`: value type (opaque to the tree)
///
/// ## Thread Safety
/// - Searches take `&self`; mutation takes `&mut self`. Callers needing
///   concurrency synchronise externally (the datastore holds the lock).
#[derive(Debug)]
pub struct BPlusTree<K, V>
where
    K: Clone + Ord + Serialize + for<'de> Deserialize<'de>,
    V: Clone + Serialize + for<'de> Deserialize<'de>,
{
    /// Fanout: a node is full at `node_size − 1` slots.
    node_size: usize,

    /// Node chains live here.
    storage: StorageManager,

    /// Phantom data for type parameters.
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> BPlusTree<K, V>
where
    K: Clone + Ord + Serialize + for<'de> Deserialize<'de>,
    V: Clone + Serialize + for<'de> Deserialize<'de>,
{
    /// Open or create a B+-Tree index file.
    ///
    /// ## Input
    /// - `path`: index file location
    /// - `node_size`: fanout (must be at least 3 so a split has two sides)
    ///
    /// ## Output
    /// - `Ok(BPlusTree)`: ready for inserts and searches
    /// - `Err(FlowError)`: I/O failure, or fanout below 3
    ///
    /// ## Side Effects
    /// - An empty index file gets a fresh empty leaf written at block 1
    pub fn open<P: AsRef<Path>>(path: P, node_size: usize) -> FlowResult<Self> {
        if node_size < 3 {
            return Err(FlowError::ParseError {
                reason: format!("B+-Tree fanout must be >= 3, got {}", node_size),
            });
        }

        let mut storage = StorageManager::open(&path)?;
        if storage.block_count() == 0 {
            let root: Node<K, V> = Node::new(node_size, NodeKind::Leaf);
            storage.write_data(&root.encode()?, Some(ROOT_BLOCK))?;
        }

        Ok(Self {
            node_size,
            storage,
            _phantom: PhantomData,
        })
    }

    /// Insert an entry, preserving duplicates on its key.
    ///
    /// ## Input
    /// - `entry`: key and opaque value
    ///
    /// ## Output
    /// - `Ok(())`: entry is durable
    /// - `Err(FlowError)`: I/O or corruption failure; the index may have
    ///   applied part of the structural change
    ///
    /// ## Side Effects
    /// - May split nodes up the descent path. When the root itself splits
    ///   it is first relocated to a fresh block and block 1 is rewritten
    ///   with a single promoted reference, so the root stays at block 1.
    pub fn insert(&mut self, entry: Entry<K, V>) -> FlowResult<()> {
        let promoted = self.insert_at(ROOT_BLOCK, entry)?;
        if let Some(mut promoted) = promoted {
            if promoted.left == ROOT_BLOCK {
                let old_root = self.read_node(ROOT_BLOCK)?;
                let relocated = self.storage.write_data(&old_root.encode()?, None)?;
                promoted.left = relocated;
            }
            let mut root = Node::new(self.node_size, NodeKind::Reference);
            root.insert(NodeValue::Reference(promoted));
            self.rewrite_node(ROOT_BLOCK, &root)?;
        }
        Ok(())
    }

    /// Return every entry whose key equals `index`.
    pub fn exact_search(&self, index: &K) -> FlowResult<Vec<Entry<K, V>>> {
        self.exact_at(ROOT_BLOCK, index)
    }

    /// Return every entry whose key is greater than `index`
    /// (or equal, if `equals`).
    pub fn gt_search(&self, index: &K, equals: bool) -> FlowResult<Vec<Entry<K, V>>> {
        self.gt_at(ROOT_BLOCK, index, equals)
    }

    /// Return every entry whose key is less than `index`
    /// (or equal, if `equals`).
    ///
    /// Descends to the leftmost leaf and walks the sibling chain,
    /// filtering as it goes.
    pub fn lt_search(&self, index: &K, equals: bool) -> FlowResult<Vec<Entry<K, V>>> {
        self.lt_at(ROOT_BLOCK, index, equals)
    }

    /// Return every entry in key order via the leaf chain.
    pub fn get_all(&self) -> FlowResult<Vec<Entry<K, V>>> {
        let mut node = self.read_node(ROOT_BLOCK)?;
        while !node.is_leaf() {
            let first = node.entries.first().ok_or_else(|| {
                FlowError::DeserializationError {
                    reason: "reference node without entries".to_string(),
                }
            })?;
            node = self.read_node(first.as_reference()?.left)?;
        }

        let mut output = Vec::new();
        loop {
            for value in &node.entries {
                output.push(value.as_entry()?.clone());
            }
            if node.next == -1 {
                break;
            }
            node = self.read_node(node.next as u64)?;
        }
        Ok(output)
    }

    /// Recursive insert. Returns the reference promoted by a split, if any.
    fn insert_at(&mut self, node_ref: u64, entry: Entry<K, V>) -> FlowResult<Option<Reference<K>>> {
        let mut node = self.read_node(node_ref)?;

        if node.is_leaf() {
            if node.is_full() {
                return self.split_leaf(node_ref, node, entry).map(Some);
            }
            node.insert(NodeValue::Entry(entry));
            self.rewrite_node(node_ref, &node)?;
            return Ok(None);
        }

        let child = self.descend_target(&node, &entry.index)?;
        let promoted = match self.insert_at(child, entry)? {
            Some(promoted) => promoted,
            None => return Ok(None),
        };

        if node.is_full() {
            return self.split_reference(node_ref, node).map(Some);
        }

        let position = node.insert(NodeValue::Reference(promoted.clone()));
        if position + 1 < node.entries.len() {
            node.patch_left(position + 1, promoted.right)?;
        }
        self.rewrite_node(node_ref, &node)?;
        Ok(None)
    }

    /// Split a full leaf around the median and place the new entry on the
    /// side its key belongs to. Fixes the doubly-linked sibling chain.
    fn split_leaf(
        &mut self,
        node_ref: u64,
        mut node: Node<K, V>,
        entry: Entry<K, V>,
    ) -> FlowResult<Reference<K>> {
        let (right, median_index) = node.split();
        let next_ptr = self.allocate_node_block();

        let mut next_node = Node::new(node.size, NodeKind::Leaf);
        next_node.entries = right;

        if median_index <= entry.index {
            next_node.insert(NodeValue::Entry(entry));
        } else {
            node.insert(NodeValue::Entry(entry));
        }

        if node.next != -1 {
            let sibling_ref = node.next as u64;
            let mut sibling: Node<K, V> = self.read_node(sibling_ref)?;
            sibling.last = Some(next_ptr);
            self.rewrite_node(sibling_ref, &sibling)?;
            next_node.next = node.next;
        }

        let node_ref = if node_ref == ROOT_BLOCK {
            self.allocate_node_block()
        } else {
            node_ref
        };

        node.next = next_ptr as i64;
        next_node.last = Some(node_ref);
        self.rewrite_node(node_ref, &node)?;
        self.rewrite_node(next_ptr, &next_node)?;

        Ok(Reference {
            index: median_index,
            left: node_ref,
            right: next_ptr,
        })
    }

    /// Split a full reference node around the median; the median propagates
    /// upward without being re-inserted into either side.
    fn split_reference(&mut self, node_ref: u64, mut node: Node<K, V>) -> FlowResult<Reference<K>> {
        let (right, median_index) = node.split();

        let mut next_node = Node::new(self.node_size, NodeKind::Reference);
        next_node.entries = right;

        let next_ptr = self.allocate_node_block();
        self.rewrite_node(next_ptr, &next_node)?;

        let node_ref = if node_ref == ROOT_BLOCK {
            self.allocate_node_block()
        } else {
            node_ref
        };
        self.rewrite_node(node_ref, &node)?;

        Ok(Reference {
            index: median_index,
            left: node_ref,
            right: next_ptr,
        })
    }

    fn exact_at(&self, node_ref: u64, index: &K) -> FlowResult<Vec<Entry<K, V>>> {
        let node = self.read_node(node_ref)?;
        if node.is_leaf() {
            let (mut matches, reached_end) = node.entries_exact(index)?;
            if reached_end && node.next != -1 {
                matches.extend(self.exact_at(node.next as u64, index)?);
            }
            return Ok(matches);
        }
        self.exact_at(self.descend_target(&node, index)?, index)
    }

    fn gt_at(&self, node_ref: u64, index: &K, equals: bool) -> FlowResult<Vec<Entry<K, V>>> {
        let node = self.read_node(node_ref)?;
        if node.is_leaf() {
            let (mut matches, reached_end) = node.entries_gt(index, equals)?;
            if reached_end && node.next != -1 {
                matches.extend(self.gt_at(node.next as u64, index, equals)?);
            }
            return Ok(matches);
        }
        self.gt_at(self.descend_target(&node, index)?, index, equals)
    }

    fn lt_at(&self, node_ref: u64, index: &K, equals: bool) -> FlowResult<Vec<Entry<K, V>>> {
        let node = self.read_node(node_ref)?;
        if node.is_leaf() {
            let (mut matches, reached_end) = node.entries_lt(index, equals)?;
            if reached_end && node.next != -1 {
                matches.extend(self.lt_at(node.next as u64, index, equals)?);
            }
            return Ok(matches);
        }
        let first = node.entries.first().ok_or_else(|| FlowError::DeserializationError {
            reason: "reference node without entries".to_string(),
        })?;
        self.lt_at(first.as_reference()?.left, index, equals)
    }

    /// Pick the child to descend into: the first reference whose key is
    /// not less than `index`, going right when `index` is not strictly
    /// below it.
    fn descend_target(&self, node: &Node<K, V>, index: &K) -> FlowResult<u64> {
        if node.entries.is_empty() {
            return Err(FlowError::DeserializationError {
                reason: "reference node without entries".to_string(),
            });
        }
        let mut position = node.position_of(index);
        if position >= node.entries.len() {
            position = node.entries.len() - 1;
        }
        let reference = node.entries[position].as_reference()?;
        if index >= &reference.index {
            Ok(reference.right)
        } else {
            Ok(reference.left)
        }
    }

    /// Allocate a block for a node, skipping block 1: an empty-file
    /// bootstrap writes the root there without moving the high-water mark,
    /// so allocation can hand it out again.
    fn allocate_node_block(&mut self) -> u64 {
        let block = self.storage.allocate_block();
        if block == ROOT_BLOCK {
            self.storage.allocate_block()
        } else {
            block
        }
    }

    fn read_node(&self, block: u64) -> FlowResult<Node<K, V>> {
        Node::decode(&self.storage.read_data(block)?)
    }

    /// Delete the chain backing `block` and rewrite the node there.
    fn rewrite_node(&mut self, block: u64, node: &Node<K, V>) -> FlowResult<()> {
        self.storage.delete_data(block)?;
        self.storage.write_data(&node.encode()?, Some(block))?;
        Ok(())
    }
}

// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! B+-Tree node structure and serialisation.
//!
//! A node is either a leaf (ordered `Entry { index, value }` pairs plus a
//! doubly-linked sibling chain) or a reference node (ordered
//! `Reference { index, left, right }` triples whose adjacent references
//! share children: `r[i].right == r[i+1].left`).
//!
//! ## Serialisation
//!
//! Nodes are encoded as self-describing CBOR maps with the keys `type`
//! (`"leaf"` or `"reference"`), `entries`, `next` (block number or −1),
//! `last` (block number or null) and `size` (fanout). Entry maps are
//! distinguished by the presence of the `left` key. CBOR maps begin with a
//! non-zero header byte, which the block storage layer requires of every
//! payload chunk.

use crate::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};

/// Node variant discriminator, serialised as `"leaf"` / `"reference"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Leaf node: entries carry values, siblings are chained.
    Leaf,
    /// Reference node: entries carry child block pointers.
    Reference,
}

/// Leaf entry: a key and its opaque value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<K, V> {
    pub index: K,
    pub value: V,
}

/// Reference entry: a key and the child blocks either side of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference<K> {
    pub index: K,
    pub left: u64,
    pub right: u64,
}

/// A node slot: either a leaf entry or a child reference.
///
/// Untagged on the wire: a map with `left`/`right` keys decodes as a
/// reference, anything else as an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeValue<K, V> {
    Reference(Reference<K>),
    Entry(Entry<K, V>),
}

impl<K, V> NodeValue<K, V> {
    /// Key of this slot, regardless of variant.
    pub fn index(&self) -> &K {
        match self {
            NodeValue::Reference(reference) => &reference.index,
            NodeValue::Entry(entry) => &entry.index,
        }
    }

    /// Borrow as a leaf entry, or fail as corruption.
    pub fn as_entry(&self) -> FlowResult<&Entry<K, V>> {
        match self {
            NodeValue::Entry(entry) => Ok(entry),
            NodeValue::Reference(_) => Err(FlowError::DeserializationError {
                reason: "reference slot in leaf node".to_string(),
            }),
        }
    }

    /// Borrow as a child reference, or fail as corruption.
    pub fn as_reference(&self) -> FlowResult<&Reference<K>> {
        match self {
            NodeValue::Reference(reference) => Ok(reference),
            NodeValue::Entry(_) => Err(FlowError::DeserializationError {
                reason: "entry slot in reference node".to_string(),
            }),
        }
    }
}

/// A B+-Tree node.
///
/// `next`/`last` are sibling block numbers (−1 / null for none); `size` is
/// the fanout the node was built with. A node is full once it holds
/// `size − 1` slots; insertion into a full node splits it at the median.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<K, V> {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub entries: Vec<NodeValue<K, V>>,
    pub next: i64,
    pub last: Option<u64>,
    pub size: usize,
}

impl<K, V> Node<K, V>
where
    K: Clone + Ord + Serialize + for<'de> Deserialize<'de>,
    V: Clone + Serialize + for<'de> Deserialize<'de>,
{
    /// Create an empty node of the given fanout.
    pub fn new(size: usize, kind: NodeKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            next: -1,
            last: None,
            size,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    /// A node is full when it has reached `size − 1` slots.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.size.saturating_sub(1)
    }

    /// First position whose key is not less than `index`.
    ///
    /// Fanouts are small, so a linear scan is as fast as binary search and
    /// keeps equal keys in insertion-shadowing order.
    pub fn position_of(&self, index: &K) -> usize {
        let mut pos = 0;
        while pos < self.entries.len() && index > self.entries[pos].index() {
            pos += 1;
        }
        pos
    }

    /// Insert a slot in sorted order, before any equal keys, and return
    /// its position.
    pub fn insert(&mut self, value: NodeValue<K, V>) -> usize {
        let pos = self.position_of(value.index());
        self.entries.insert(pos, value);
        pos
    }

    /// Split at the median: this node keeps `[0, median)`, the returned
    /// vector takes `[median, len)`, and the returned key is the median
    /// slot's key (the minimum of the right side).
    pub fn split(&mut self) -> (Vec<NodeValue<K, V>>, K) {
        let median = self.entries.len() / 2;
        let right = self.entries.split_off(median);
        let median_index = right[0].index().clone();
        (right, median_index)
    }

    /// Rewrite the `left` child of the slot at `position`, preserving the
    /// shared-child invariant after a promoted reference is inserted.
    pub fn patch_left(&mut self, position: usize, left: u64) -> FlowResult<()> {
        match &mut self.entries[position] {
            NodeValue::Reference(reference) => {
                reference.left = left;
                Ok(())
            }
            NodeValue::Entry(_) => Err(FlowError::DeserializationError {
                reason: "entry slot in reference node".to_string(),
            }),
        }
    }

    /// Collect leaf entries equal to `index`.
    ///
    /// The boolean reports whether the scan ran off the end of this node,
    /// in which case equal keys may continue in the right sibling.
    pub fn entries_exact(&self, index: &K) -> FlowResult<(Vec<Entry<K, V>>, bool)> {
        let mut outputs = Vec::new();
        let mut pos = 0;
        while pos < self.entries.len() && self.entries[pos].index() <= index {
            let entry = self.entries[pos].as_entry()?;
            if &entry.index == index {
                outputs.push(entry.clone());
            }
            pos += 1;
        }
        Ok((outputs, pos == self.entries.len()))
    }

    /// Collect leaf entries greater than `index` (or equal, if `equals`).
    pub fn entries_gt(&self, index: &K, equals: bool) -> FlowResult<(Vec<Entry<K, V>>, bool)> {
        let mut outputs = Vec::new();
        let mut pos = 0;
        while pos < self.entries.len() {
            let entry = self.entries[pos].as_entry()?;
            if equals && &entry.index == index {
                outputs.push(entry.clone());
            }
            if &entry.index > index {
                outputs.push(entry.clone());
            }
            pos += 1;
        }
        Ok((outputs, pos == self.entries.len()))
    }

    /// Collect leaf entries less than `index` (or equal, if `equals`).
    pub fn entries_lt(&self, index: &K, equals: bool) -> FlowResult<(Vec<Entry<K, V>>, bool)> {
        let mut outputs = Vec::new();
        let mut pos = 0;
        while pos < self.entries.len() && self.entries[pos].index() <= index {
            let entry = self.entries[pos].as_entry()?;
            if equals && &entry.index == index {
                outputs.push(entry.clone());
            }
            if &entry.index < index {
                outputs.push(entry.clone());
            }
            pos += 1;
        }
        Ok((outputs, pos == self.entries.len()))
    }

    /// Encode to the self-describing node map.
    pub fn encode(&self) -> FlowResult<Vec<u8>> {
        let mut buffer = Vec::new();
        ciborium::ser::into_writer(self, &mut buffer).map_err(|e| {
            FlowError::SerializationError {
                reason: e.to_string(),
            }
        })?;
        Ok(buffer)
    }

    /// Decode from the self-describing node map.
    pub fn decode(bytes: &[u8]) -> FlowResult<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| FlowError::DeserializationError {
            reason: e.to_string(),
        })
    }
}

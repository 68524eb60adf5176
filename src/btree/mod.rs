// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Disk-backed B+-Tree index for ReedFlow.
//!
//! Nodes are stored as block chains in a [`crate::storage::StorageManager`]
//! file, with the root pinned at block 1. Keys are totally ordered and may
//! repeat; values are opaque (in practice, payload block pointers).

pub mod node;
pub mod tree;

#[cfg(test)]
mod tree_test;

// Re-export public API
pub use node::{Entry, Node, NodeKind, NodeValue, Reference};
pub use tree::{BPlusTree, DEFAULT_NODE_SIZE, ROOT_BLOCK};

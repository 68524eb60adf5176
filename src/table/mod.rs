// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Persistent tables for ReedFlow.
//!
//! Every table, source or derived, uses identical storage:
//!
//! ```text
//! {data_dir}/
//! ├── {table_name}.index   # primary B+-Tree, key → payload block
//! └── {table_name}.table   # payload block chains (CBOR records)
//! ```
//!
//! Source tables hold data written directly by clients; a derived table's
//! contents are fully determined by the transform registered with it.

pub mod table;
pub mod types;

#[cfg(test)]
mod table_test;

// Re-export public API
pub use table::PersistentTable;
pub use types::{DerivedSettings, TableKind};

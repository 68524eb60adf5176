// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! ReedFlow - reactive database with derived tables.
//!
//! A small server that stores keyed records in named tables and keeps
//! *derived tables* up to date automatically: when a record is written to
//! a source table, every dependent derived table is recomputed
//! synchronously, cascading through the dependency graph.
//!
//! ## Features
//!
//! - **Paged block storage**: variable-length records on fixed-size
//!   chained blocks with free-list reuse
//! - **Disk B+-Tree**: duplicate-preserving primary index, root pinned at
//!   block 1
//! - **Transforms**: filter, function and union derivations
//! - **Synchronous cascade**: a write and all its consequences are
//!   durable before the call returns
//! - **Declarative configuration**: tables and transforms from a TOML
//!   document
//! - **Line protocol**: length-prefixed JSON with change subscriptions
//!
//! ## Quick Start
//!
//! ```no_run
//! use reedflow::datastore::Datastore;
//! use reedflow::record::{FieldValue, Record};
//! use reedflow::transform::{Filter, Transform};
//! use reedflow::config::parse_filter_expression;
//!
//! let mut db = Datastore::open(".flow")?;
//! db.add_source_table("people")?;
//!
//! let adults = Filter::new(parse_filter_expression("age >= 18")?, "people", "adults");
//! db.add_derived_table("adults", Transform::Filter(adults))?;
//!
//! let mut row = Record::new();
//! row.insert("age".to_string(), FieldValue::Integer(21));
//! db.add_data("people", FieldValue::from("ada"), row)?;
//!
//! assert!(db.get_data("adults", &FieldValue::from("ada"))?.is_some());
//! # Ok::<(), reedflow::FlowError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ server    TCP, length-prefixed JSON, subscriptions  │
//! ├─────────────────────────────────────────────────────┤
//! │ config    TOML document → datastore                 │
//! ├─────────────────────────────────────────────────────┤
//! │ datastore registry · dependency graph · cascade     │
//! │ transform filter / function / union · expressions   │
//! ├─────────────────────────────────────────────────────┤
//! │ table     <name>.index + <name>.table               │
//! ├─────────────────────────────────────────────────────┤
//! │ btree     B+-Tree over block chains, root at 1      │
//! │ storage   532-byte blocks, free list, chains        │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod btree;
pub mod config;
pub mod datastore;
pub mod record;
pub mod server;
pub mod storage;
pub mod table;
pub mod transform;

pub mod error;


// Re-export commonly used types
pub use btree::BPlusTree;
pub use datastore::{Datastore, Transaction, TransactionMethod};
pub use error::{FlowError, FlowResult};
pub use record::{FieldValue, Record};
pub use server::Server;
pub use storage::StorageManager;
pub use table::PersistentTable;
pub use transform::Transform;

/// ReedFlow version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

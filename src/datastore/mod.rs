// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The reactive datastore: table registry, dependency graph and cascade.
//!
//! ```text
//! add_data(table, key, value)
//!   │
//!   ├─ write into table storage
//!   └─ for each output table (back-references on the written table):
//!        run its transform with the transaction
//!          │
//!          └─ transform calls add_data(destination, ...)  ← recursion
//! ```
//!
//! A mutation and its transitive cascade run to completion on the calling
//! thread; the server wraps the datastore in a reader-writer lock so one
//! cascade excludes all other access. Errors inside a cascade abort the
//! transaction where they occur and leave whatever intermediate state the
//! cascade reached — there is no rollback.

pub mod datastore;
pub mod lock;
pub mod transaction;


// Re-export public API
pub use datastore::Datastore;
pub use lock::{acquire_lock, DirectoryLock};
pub use transaction::{Transaction, TransactionMethod};

// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Declarative datastore configuration.
//!
//! A TOML document enumerates the tables of a datastore:
//!
//! ```toml
//! [tables.people]
//! type = "source"
//!
//! [tables.adults]
//! type = "derived"
//! operation = "filter"
//! source-table = "people"
//! expression = "age >= 18"
//!
//! [tables.next_year]
//! type = "derived"
//! operation = "function"
//! source-table = "people"
//! expressions = ["incremented = age + 1"]
//!
//! [tables.everything]
//! type = "derived"
//! operation = "union"
//! input-tables = ["adults", "next_year"]
//! ```
//!
//! Filter expressions use infix comparison/boolean syntax with
//! parentheses; function expressions use `dest = left OP right` form.
//! Configuration errors (unknown operator, unparseable token, reference
//! to an unknown table) are surfaced at load time; the server does not
//! start on a broken document.

pub mod loader;
pub mod parser;
pub mod types;


// Re-export public API
pub use loader::{build_datastore, load_datastore};
pub use parser::{parse_filter_expression, parse_function_expression};
pub use types::{ConfigDocument, TableDef};

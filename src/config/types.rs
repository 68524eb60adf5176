// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Configuration document structure.

use crate::table::TableKind;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigDocument {
    /// Table name → definition.
    pub tables: BTreeMap<String, TableDef>,
}

/// One table definition.
///
/// Source tables carry only `type = "source"`. Derived tables name their
/// operation and its operation-specific fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDef {
    /// `source` or `derived`.
    #[serde(rename = "type")]
    pub kind: TableKind,

    /// `union`, `filter` or `function` (derived tables only).
    pub operation: Option<String>,

    /// Input table of a filter or function.
    #[serde(rename = "source-table")]
    pub source_table: Option<String>,

    /// Input tables of a union.
    #[serde(rename = "input-tables")]
    pub input_tables: Option<Vec<String>>,

    /// Filter expression, e.g. `(age >= 18) AND (score > 2)`.
    pub expression: Option<String>,

    /// Function expressions, e.g. `doubled = score * 2`.
    pub expressions: Option<Vec<String>>,
}

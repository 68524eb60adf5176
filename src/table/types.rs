// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Data structures for table registration.

use crate::transform::Transform;
use serde::{Deserialize, Serialize};

/// How a table gets its contents.
///
/// Serialises as `"source"` / `"derived"`, the spelling the
/// configuration document uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Written directly by clients.
    Source,
    /// Maintained by a transform over its input tables.
    Derived,
}

/// Derivation wiring attached to every table.
///
/// `inputs` lists the tables the transform reads (empty for sources).
/// `outputs` is the back-reference maintained on every input table: the
/// names of derived tables to run when this table changes. Names only —
/// the datastore owns the tables themselves.
#[derive(Debug, Clone, Default)]
pub struct DerivedSettings {
    /// Tables this table's transform reads.
    pub inputs: Vec<String>,

    /// Derived tables to cascade into when this table changes.
    pub outputs: Vec<String>,

    /// The derivation itself. `None` for source tables.
    pub transform: Option<Transform>,
}

impl DerivedSettings {
    /// Settings for a source table: no inputs, no transform.
    pub fn source() -> Self {
        Self::default()
    }

    /// Settings for a derived table.
    pub fn derived(inputs: Vec<String>, transform: Transform) -> Self {
        Self {
            inputs,
            outputs: Vec::new(),
            transform: Some(transform),
        }
    }
}

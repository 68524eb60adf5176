// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Field values and records.
//!
//! A record is a dynamically-keyed map of field name to tagged scalar.
//! Records are heterogeneous: two rows of the same table may carry
//! different fields. On the wire a scalar serialises with its tag
//! (`{"Integer": 5}`, `{"Str": "x"}`, `{"Bool": true}`); on disk records
//! are self-describing CBOR maps.

pub mod value;

#[cfg(test)]
mod value_test;

// Re-export public API
pub use value::{decode, encode, FieldValue, Record};

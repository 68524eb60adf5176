// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Persistent table: a primary index plus a payload store.

use crate::btree::{BPlusTree, Entry, DEFAULT_NODE_SIZE};
use crate::error::{FlowError, FlowResult};
use crate::record::{self, FieldValue, Record};
use crate::storage::StorageManager;
use crate::table::types::{DerivedSettings, TableKind};
use crate::transform::Transform;
use std::path::Path;

/// A table mapping key → record, persisted as `<name>.index` and
/// `<name>.table` under the datastore directory.
///
/// Re-adding a key layers a new index entry that shadows older ones;
/// `get_data` reads the newest. Old payload chains are never reclaimed
/// here — compaction is a job for tooling, not the write path.
#[derive(Debug)]
pub struct PersistentTable {
    name: String,
    kind: TableKind,
    derived: DerivedSettings,
    index: BPlusTree<FieldValue, u64>,
    store: StorageManager,
}

impl PersistentTable {
    /// Open or create a table's backing files.
    ///
    /// ## Input
    /// - `dir`: datastore directory
    /// - `name`: table name (also the file stem)
    /// - `kind`: source or derived
    /// - `derived`: derivation wiring (empty for sources)
    ///
    /// ## Output
    /// - `Ok(PersistentTable)`: files opened, index bootstrapped
    /// - `Err(FlowError)`: I/O failure
    pub fn open(
        dir: &Path,
        name: &str,
        kind: TableKind,
        derived: DerivedSettings,
    ) -> FlowResult<Self> {
        let index = BPlusTree::open(dir.join(format!("{}.index", name)), DEFAULT_NODE_SIZE)?;
        let store = StorageManager::open(dir.join(format!("{}.table", name)))?;

        Ok(Self {
            name: name.to_string(),
            kind,
            derived,
            index,
            store,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Tables this table's transform reads.
    pub fn inputs(&self) -> &[String] {
        &self.derived.inputs
    }

    /// Derived tables to cascade into when this table changes.
    pub fn outputs(&self) -> &[String] {
        &self.derived.outputs
    }

    /// The transform maintaining this table, if it is derived.
    pub fn transform(&self) -> Option<&Transform> {
        self.derived.transform.as_ref()
    }

    /// Register a derived table as an output of this one.
    pub fn add_output_table(&mut self, table_name: &str) {
        self.derived.outputs.push(table_name.to_string());
    }

    /// Write a record under `key`.
    ///
    /// Encodes the record, lays it down as a payload chain and indexes the
    /// chain's root block under the key.
    pub fn add_data(&mut self, key: FieldValue, value: &Record) -> FlowResult<()> {
        let block = self.store.write_data(&record::encode(value)?, None)?;
        self.index.insert(Entry {
            index: key,
            value: block,
        })
    }

    /// Read the newest record under `key`, or `None` when the key has
    /// never been written.
    pub fn get_data(&self, key: &FieldValue) -> FlowResult<Option<Record>> {
        let entries = self.index.exact_search(key)?;
        match entries.first() {
            None => Ok(None),
            Some(entry) => Ok(Some(record::decode(&self.store.read_data(entry.value)?)?)),
        }
    }

    /// Removal is intentionally unsupported on persistent tables.
    pub fn remove_data(&mut self, _key: &FieldValue) -> FlowResult<()> {
        Err(FlowError::NotImplemented {
            operation: "remove_data".to_string(),
        })
    }

    /// Rows whose key is greater than `key` (or equal, if `equals`).
    pub fn search_greater_than(
        &self,
        key: &FieldValue,
        equals: bool,
    ) -> FlowResult<Vec<(FieldValue, Record)>> {
        self.resolve_entries(self.index.gt_search(key, equals)?)
    }

    /// Rows whose key is less than `key` (or equal, if `equals`).
    pub fn search_less_than(
        &self,
        key: &FieldValue,
        equals: bool,
    ) -> FlowResult<Vec<(FieldValue, Record)>> {
        self.resolve_entries(self.index.lt_search(key, equals)?)
    }

    /// Every row in key order, shadowed versions included.
    pub fn all_rows(&self) -> FlowResult<Vec<(FieldValue, Record)>> {
        self.resolve_entries(self.index.get_all()?)
    }

    /// Read the payload chain behind each index entry.
    fn resolve_entries(
        &self,
        entries: Vec<Entry<FieldValue, u64>>,
    ) -> FlowResult<Vec<(FieldValue, Record)>> {
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            let row = record::decode(&self.store.read_data(entry.value)?)?;
            rows.push((entry.index, row));
        }
        Ok(rows)
    }
}

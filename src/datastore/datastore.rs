// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Datastore implementation.

use crate::datastore::lock::{acquire_lock, DirectoryLock};
use crate::datastore::transaction::Transaction;
use crate::error::{FlowError, FlowResult};
use crate::record::{FieldValue, Record};
use crate::table::{DerivedSettings, PersistentTable, TableKind};
use crate::transform::Transform;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The process-wide collection of tables.
///
/// Owns every table exclusively; a table owns its index and payload
/// store. The datastore also records every applied transaction in an
/// event log, which the server drains to feed change listeners.
#[derive(Debug)]
pub struct Datastore {
    dir: PathBuf,
    tables: HashMap<String, PersistentTable>,
    events: Vec<Transaction>,
    _lock: DirectoryLock,
}

impl Datastore {
    /// Open a datastore directory, creating it if needed.
    ///
    /// ## Input
    /// - `dir`: directory for table files and the lock file
    ///
    /// ## Output
    /// - `Ok(Datastore)`: directory locked, registry empty
    /// - `Err(FlowError::LockFailed)`: another process owns the directory
    ///
    /// ## Side Effects
    /// - Creates the directory
    /// - Holds an exclusive advisory lock until the datastore drops
    pub fn open<P: AsRef<Path>>(dir: P) -> FlowResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| FlowError::IoError {
            operation: "create_datastore_dir".to_string(),
            reason: e.to_string(),
        })?;
        let lock = acquire_lock(&dir)?;

        Ok(Self {
            dir,
            tables: HashMap::new(),
            events: Vec::new(),
            _lock: lock,
        })
    }

    /// Register a source table and create its storage.
    pub fn add_source_table(&mut self, name: &str) -> FlowResult<()> {
        self.ensure_absent(name)?;
        let table =
            PersistentTable::open(&self.dir, name, TableKind::Source, DerivedSettings::source())?;
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Register a derived table maintained by `transform`.
    ///
    /// Every input table must already be registered; the new table is
    /// added as an output back-reference on each of them. Because edges
    /// can only point at pre-existing tables, the dependency graph stays
    /// acyclic by construction — a table can never end up downstream of
    /// itself.
    ///
    /// ## Error Conditions
    /// - `TableExists`: the name is taken
    /// - `TableNotFound`: an input is unknown (including self-reference)
    pub fn add_derived_table(&mut self, name: &str, transform: Transform) -> FlowResult<()> {
        self.ensure_absent(name)?;

        let inputs = transform.source_tables();
        for input in &inputs {
            if !self.tables.contains_key(input) {
                return Err(FlowError::TableNotFound {
                    table: input.clone(),
                });
            }
        }
        for input in &inputs {
            if let Some(table) = self.tables.get_mut(input) {
                table.add_output_table(name);
            }
        }

        let table = PersistentTable::open(
            &self.dir,
            name,
            TableKind::Derived,
            DerivedSettings::derived(inputs, transform),
        )?;
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Write `value` under `key` and cascade through every dependent
    /// derived table.
    ///
    /// ## Side Effects
    /// - The record and all derived consequences are durable when this
    ///   returns. Cascade depth is unbounded: derived-of-derived tables
    ///   trigger transitively.
    /// - On error the cascade stops where it failed; earlier writes stay.
    pub fn add_data(&mut self, table_name: &str, key: FieldValue, value: Record) -> FlowResult<()> {
        let transaction = Transaction::add(table_name, key, value);

        let outputs = {
            let table = self.table_mut(table_name)?;
            if let Some(value) = &transaction.value {
                table.add_data(transaction.key.clone(), value)?;
            }
            table.outputs().to_vec()
        };
        self.events.push(transaction.clone());

        for output in outputs {
            let transform = self.transform_of(&output)?;
            transform.run(self, &transaction)?;
        }
        Ok(())
    }

    /// Remove `key`, cascading to dependents *first* so their transforms
    /// can still read the outgoing row, then deleting locally.
    ///
    /// The local delete on a persistent table is intentionally
    /// unsupported and surfaces `NotImplemented` after the downstream
    /// half of the cascade has run.
    pub fn remove_data(&mut self, table_name: &str, key: &FieldValue) -> FlowResult<()> {
        let transaction = Transaction::remove(table_name, key.clone());

        let outputs = self.get_table(table_name)?.outputs().to_vec();
        for output in outputs {
            let transform = self.transform_of(&output)?;
            transform.run(self, &transaction)?;
        }

        let result = self.table_mut(table_name)?.remove_data(key);
        if result.is_ok() {
            self.events.push(transaction);
        }
        result
    }

    /// Look up a table by name.
    pub fn get_table(&self, name: &str) -> FlowResult<&PersistentTable> {
        self.tables.get(name).ok_or_else(|| FlowError::TableNotFound {
            table: name.to_string(),
        })
    }

    /// Read the stored row for `key`, or `None` when absent.
    pub fn get_data(&self, table_name: &str, key: &FieldValue) -> FlowResult<Option<Record>> {
        self.get_table(table_name)?.get_data(key)
    }

    /// Registered table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Take the transactions applied since the last drain, in
    /// application order.
    pub fn drain_events(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.events)
    }

    fn ensure_absent(&self, name: &str) -> FlowResult<()> {
        if self.tables.contains_key(name) {
            return Err(FlowError::TableExists {
                table: name.to_string(),
            });
        }
        Ok(())
    }

    fn table_mut(&mut self, name: &str) -> FlowResult<&mut PersistentTable> {
        self.tables.get_mut(name).ok_or_else(|| FlowError::TableNotFound {
            table: name.to_string(),
        })
    }

    /// Clone the transform of a derived table so it can run against
    /// `&mut self` without holding a borrow into the registry.
    fn transform_of(&self, name: &str) -> FlowResult<Transform> {
        self.get_table(name)?
            .transform()
            .cloned()
            .ok_or_else(|| FlowError::TableNotFound {
                table: name.to_string(),
            })
    }
}

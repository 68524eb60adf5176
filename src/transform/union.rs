// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Union transform.

use crate::datastore::{Datastore, Transaction, TransactionMethod};
use crate::error::FlowResult;

/// Merges rows from several input tables into one destination row per key.
///
/// On ADD the incoming fields are merged over the destination's existing
/// row, later values winning. On REMOVE every field the source row
/// carries is deleted from the destination row — a field-level
/// subtraction; the destination row itself is rewritten, never removed.
#[derive(Debug, Clone)]
pub struct Union {
    pub tables: Vec<String>,
    pub destination_table: String,
}

impl Union {
    pub fn new(tables: Vec<String>, destination_table: &str) -> Self {
        Self {
            tables,
            destination_table: destination_table.to_string(),
        }
    }

    pub fn run(&self, datastore: &mut Datastore, transaction: &Transaction) -> FlowResult<()> {
        let mut existing = datastore
            .get_data(&self.destination_table, &transaction.key)?
            .unwrap_or_default();

        match transaction.method {
            TransactionMethod::Add => {
                let Some(value) = &transaction.value else {
                    return Ok(());
                };
                for (field, field_value) in value {
                    existing.insert(field.clone(), field_value.clone());
                }
            }
            TransactionMethod::Remove => {
                // The source row is still readable: removals cascade
                // before the source table deletes locally.
                if let Some(source_row) =
                    datastore.get_data(&transaction.table, &transaction.key)?
                {
                    for field in source_row.keys() {
                        existing.remove(field);
                    }
                }
            }
        }

        datastore.add_data(&self.destination_table, transaction.key.clone(), existing)
    }
}

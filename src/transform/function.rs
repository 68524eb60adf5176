// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Function transform.

use crate::datastore::{Datastore, Transaction, TransactionMethod};
use crate::error::FlowResult;
use crate::record::Record;
use crate::transform::expression::FunctionExpression;

/// Computes new fields from a row and stores only those.
///
/// On ADD the transaction value is copied into a working buffer and the
/// expressions run left to right, each writing its destination field on
/// the buffer. The final record keeps only the destination fields the
/// expression list touched — untouched input fields are dropped. A later
/// expression sees an earlier one's result only through the datastore
/// round trip, which still shows the previously stored row.
#[derive(Debug, Clone)]
pub struct Function {
    pub expressions: Vec<FunctionExpression>,
    pub source_table: String,
    pub destination_table: String,
}

impl Function {
    pub fn new(
        expressions: Vec<FunctionExpression>,
        source_table: &str,
        destination_table: &str,
    ) -> Self {
        Self {
            expressions,
            source_table: source_table.to_string(),
            destination_table: destination_table.to_string(),
        }
    }

    pub fn run(&self, datastore: &mut Datastore, transaction: &Transaction) -> FlowResult<()> {
        match transaction.method {
            TransactionMethod::Add => {
                let Some(value) = &transaction.value else {
                    return Ok(());
                };
                let mut buffer = value.clone();
                let mut final_entry = Record::new();
                for expression in &self.expressions {
                    expression.evaluate(
                        datastore,
                        &transaction.table,
                        &transaction.key,
                        &mut buffer,
                    )?;
                    if let Some(computed) = buffer.get(&expression.dest_field) {
                        final_entry.insert(expression.dest_field.clone(), computed.clone());
                    }
                }
                datastore.add_data(
                    &self.destination_table,
                    transaction.key.clone(),
                    final_entry,
                )
            }
            TransactionMethod::Remove => {
                datastore.remove_data(&self.destination_table, &transaction.key)
            }
        }
    }
}

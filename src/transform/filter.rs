// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Filter transform.

use crate::datastore::{Datastore, Transaction, TransactionMethod};
use crate::error::FlowResult;
use crate::transform::expression::ComparisonExpression;

/// Copies rows into the destination table when the expression holds.
///
/// On ADD the expression is evaluated against the stored row for the
/// transaction key; a passing row is written through to the destination
/// unchanged. On REMOVE the destination row is removed unconditionally.
#[derive(Debug, Clone)]
pub struct Filter {
    pub expression: ComparisonExpression,
    pub source_table: String,
    pub destination_table: String,
}

impl Filter {
    pub fn new(
        expression: ComparisonExpression,
        source_table: &str,
        destination_table: &str,
    ) -> Self {
        Self {
            expression,
            source_table: source_table.to_string(),
            destination_table: destination_table.to_string(),
        }
    }

    pub fn run(&self, datastore: &mut Datastore, transaction: &Transaction) -> FlowResult<()> {
        match transaction.method {
            TransactionMethod::Add => {
                let passes =
                    self.expression
                        .evaluate(datastore, &transaction.table, &transaction.key)?;
                if !passes {
                    return Ok(());
                }
                if let Some(value) = &transaction.value {
                    datastore.add_data(
                        &self.destination_table,
                        transaction.key.clone(),
                        value.clone(),
                    )?;
                }
                Ok(())
            }
            TransactionMethod::Remove => {
                datastore.remove_data(&self.destination_table, &transaction.key)
            }
        }
    }
}

// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Transforms: the derivations that maintain derived tables.
//!
//! Three operations are supported:
//!
//! - **Filter**: copy a row into the destination when a comparison
//!   expression holds.
//! - **Function**: compute new fields from the row and keep only those.
//! - **Union**: merge rows from several input tables field by field.
//!
//! A transform is run by the datastore's cascade with the transaction that
//! triggered it, and calls back into the datastore to write its
//! destination — which may itself trigger further cascades. Dispatch is a
//! tagged variant rather than trait objects: three cases, known up front.

pub mod expression;
pub mod filter;
pub mod function;
pub mod union;


// Re-export public API
pub use expression::{
    ComparisonExpression, ComparisonOperator, ExpressionValue, FunctionExpression,
    FunctionOperator,
};
pub use filter::Filter;
pub use function::Function;
pub use union::Union;

use crate::datastore::{Datastore, Transaction};
use crate::error::FlowResult;

/// A derivation attached to a derived table.
#[derive(Debug, Clone)]
pub enum Transform {
    Filter(Filter),
    Function(Function),
    Union(Union),
}

impl Transform {
    /// Tables this transform reads; the datastore registers the owning
    /// table as an output on each of them.
    pub fn source_tables(&self) -> Vec<String> {
        match self {
            Transform::Filter(filter) => vec![filter.source_table.clone()],
            Transform::Function(function) => vec![function.source_table.clone()],
            Transform::Union(union) => union.tables.clone(),
        }
    }

    /// Table this transform writes.
    pub fn destination_table(&self) -> &str {
        match self {
            Transform::Filter(filter) => &filter.destination_table,
            Transform::Function(function) => &function.destination_table,
            Transform::Union(union) => &union.destination_table,
        }
    }

    /// Apply this transform to a transaction, writing into the
    /// destination table through the datastore.
    pub fn run(&self, datastore: &mut Datastore, transaction: &Transaction) -> FlowResult<()> {
        match self {
            Transform::Filter(filter) => filter.run(datastore, transaction),
            Transform::Function(function) => function.run(datastore, transaction),
            Transform::Union(union) => union.run(datastore, transaction),
        }
    }
}

impl From<Filter> for Transform {
    fn from(filter: Filter) -> Self {
        Transform::Filter(filter)
    }
}

impl From<Function> for Transform {
    fn from(function: Function) -> Self {
        Transform::Function(function)
    }
}

impl From<Union> for Transform {
    fn from(union: Union) -> Self {
        Transform::Union(union)
    }
}

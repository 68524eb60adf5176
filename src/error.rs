// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Error types for ReedFlow.
//!
//! Every fallible operation in the crate returns `FlowResult<T>`. Variants
//! carry the operation name and reason so failures can be reported without
//! a backtrace.

use std::fmt;

/// ReedFlow result type.
pub type FlowResult<T> = Result<T, FlowError>;

/// ReedFlow error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Read, write, seek or open failure against a storage file.
    IoError { operation: String, reason: String },

    /// Value could not be encoded to its on-disk or wire form.
    SerializationError { reason: String },

    /// On-disk or wire bytes could not be decoded. Treated as corruption.
    DeserializationError { reason: String },

    /// Configuration document or expression string could not be parsed.
    ParseError { reason: String },

    /// An expression operand had the wrong type for its operator.
    TypeMismatch { expected: String, found: String },

    /// Named table is not registered in the datastore.
    TableNotFound { table: String },

    /// A table with this name is already registered.
    TableExists { table: String },

    /// A field reference resolved against a row that does not carry it.
    UnknownField { table: String, field: String },

    /// Operation is intentionally unsupported.
    NotImplemented { operation: String },

    /// Exclusive lock on the datastore directory could not be acquired.
    LockFailed { path: String, reason: String },
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::IoError { operation, reason } => {
                write!(f, "I/O error during {}: {}", operation, reason)
            }
            FlowError::SerializationError { reason } => {
                write!(f, "Serialisation failed: {}", reason)
            }
            FlowError::DeserializationError { reason } => {
                write!(f, "Deserialisation failed: {}", reason)
            }
            FlowError::ParseError { reason } => write!(f, "Parse error: {}", reason),
            FlowError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            FlowError::TableNotFound { table } => write!(f, "Table not found: {}", table),
            FlowError::TableExists { table } => write!(f, "Table already exists: {}", table),
            FlowError::UnknownField { table, field } => {
                write!(f, "Unknown field {} in table {}", field, table)
            }
            FlowError::NotImplemented { operation } => {
                write!(f, "Not implemented: {}", operation)
            }
            FlowError::LockFailed { path, reason } => {
                write!(f, "Could not lock {}: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for FlowError {}

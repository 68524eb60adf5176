// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Datastore construction from a configuration document.

use crate::config::parser::{parse_filter_expression, parse_function_expression};
use crate::config::types::{ConfigDocument, TableDef};
use crate::datastore::Datastore;
use crate::error::{FlowError, FlowResult};
use crate::table::TableKind;
use crate::transform::{Filter, Function, Transform, Union};
use std::path::Path;

/// Read a configuration file and build the datastore it describes.
///
/// ## Input
/// - `config_path`: TOML document
/// - `data_dir`: directory for table files
///
/// ## Output
/// - `Ok(Datastore)`: every table registered, transforms wired
/// - `Err(FlowError::ParseError)`: broken document or expression
/// - `Err(FlowError::LockFailed)`: data directory owned by another process
pub fn load_datastore<P: AsRef<Path>, Q: AsRef<Path>>(
    config_path: P,
    data_dir: Q,
) -> FlowResult<Datastore> {
    let document =
        std::fs::read_to_string(config_path.as_ref()).map_err(|e| FlowError::IoError {
            operation: "read_config".to_string(),
            reason: e.to_string(),
        })?;
    build_datastore(&document, data_dir)
}

/// Build a datastore from configuration text.
///
/// Source tables register first. Derived tables register in dependency
/// order: the document's table map is sorted by name, so a pass that
/// makes no progress means the remaining tables reference inputs that do
/// not exist — a configuration error.
pub fn build_datastore<Q: AsRef<Path>>(document: &str, data_dir: Q) -> FlowResult<Datastore> {
    let config: ConfigDocument = toml::from_str(document).map_err(|e| FlowError::ParseError {
        reason: e.to_string(),
    })?;

    let mut datastore = Datastore::open(data_dir)?;

    let mut pending: Vec<(String, TableDef)> = Vec::new();
    for (name, def) in config.tables {
        match def.kind {
            TableKind::Source => datastore.add_source_table(&name)?,
            TableKind::Derived => pending.push((name, def)),
        }
    }

    while !pending.is_empty() {
        let before = pending.len();
        let mut remaining = Vec::new();

        for (name, def) in pending {
            let transform = build_transform(&name, &def)?;
            match datastore.add_derived_table(&name, transform) {
                Ok(()) => {}
                Err(FlowError::TableNotFound { .. }) => remaining.push((name, def)),
                Err(e) => return Err(e),
            }
        }

        if remaining.len() == before {
            let names: Vec<String> = remaining.into_iter().map(|(name, _)| name).collect();
            return Err(FlowError::ParseError {
                reason: format!(
                    "derived tables reference unknown input tables: {}",
                    names.join(", ")
                ),
            });
        }
        pending = remaining;
    }

    Ok(datastore)
}

/// Build the transform a derived table definition describes.
fn build_transform(name: &str, def: &TableDef) -> FlowResult<Transform> {
    let operation = def.operation.as_deref().ok_or_else(|| FlowError::ParseError {
        reason: format!("derived table {} has no operation", name),
    })?;

    match operation {
        "union" => {
            let inputs = def.input_tables.clone().ok_or_else(|| missing(name, "input-tables"))?;
            Ok(Union::new(inputs, name).into())
        }
        "filter" => {
            let source = def.source_table.as_deref().ok_or_else(|| missing(name, "source-table"))?;
            let text = def.expression.as_deref().ok_or_else(|| missing(name, "expression"))?;
            let expression = parse_filter_expression(text)?;
            Ok(Filter::new(expression, source, name).into())
        }
        "function" => {
            let source = def.source_table.as_deref().ok_or_else(|| missing(name, "source-table"))?;
            let texts = def.expressions.as_ref().ok_or_else(|| missing(name, "expressions"))?;
            let mut expressions = Vec::with_capacity(texts.len());
            for text in texts {
                expressions.push(parse_function_expression(text)?);
            }
            Ok(Function::new(expressions, source, name).into())
        }
        other => Err(FlowError::ParseError {
            reason: format!("unknown operation {} on table {}", other, name),
        }),
    }
}

fn missing(table: &str, field: &str) -> FlowError {
    FlowError::ParseError {
        reason: format!("derived table {} is missing {}", table, field),
    }
}

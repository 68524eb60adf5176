// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Expression model for filter and function transforms.
//!
//! Operands resolve against the *stored* row for the transaction key —
//! a field reference reads `datastore.get_data(table, key)`, never the
//! in-transit transaction payload. Transforms therefore compose through
//! the datastore rather than through the transaction envelope.

use crate::datastore::Datastore;
use crate::error::{FlowError, FlowResult};
use crate::record::{FieldValue, Record};

/// Comparison and boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
}

/// Arithmetic operators. `Abs` is unary and ignores its right operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionOperator {
    Add,
    Subtract,
    Mult,
    Div,
    Abs,
}

/// An operand: a constant, a field of the current row, or a nested
/// comparison evaluated to a boolean.
#[derive(Debug, Clone)]
pub enum ExpressionValue {
    Scalar(FieldValue),
    Field(String),
    Expression(Box<ComparisonExpression>),
}

impl ExpressionValue {
    /// Resolve against the stored row for `key` in `table`.
    ///
    /// ## Error Conditions
    /// - `UnknownField`: the row is absent, or does not carry the field
    pub fn resolve(
        &self,
        datastore: &Datastore,
        table: &str,
        key: &FieldValue,
    ) -> FlowResult<FieldValue> {
        match self {
            ExpressionValue::Scalar(value) => Ok(value.clone()),
            ExpressionValue::Field(name) => {
                let row = datastore.get_data(table, key)?.ok_or_else(|| {
                    FlowError::UnknownField {
                        table: table.to_string(),
                        field: name.clone(),
                    }
                })?;
                row.get(name).cloned().ok_or_else(|| FlowError::UnknownField {
                    table: table.to_string(),
                    field: name.clone(),
                })
            }
            ExpressionValue::Expression(expression) => {
                Ok(FieldValue::Bool(expression.evaluate(datastore, table, key)?))
            }
        }
    }
}

/// A boolean-valued comparison tree.
#[derive(Debug, Clone)]
pub struct ComparisonExpression {
    pub operator: ComparisonOperator,
    pub left: ExpressionValue,
    pub right: ExpressionValue,
}

impl ComparisonExpression {
    pub fn new(operator: ComparisonOperator, left: ExpressionValue, right: ExpressionValue) -> Self {
        Self {
            operator,
            left,
            right,
        }
    }

    /// Evaluate both operands and apply the operator.
    ///
    /// Ordering operators use the total order on field values; `And`/`Or`
    /// demand boolean operands (usually nested expressions).
    pub fn evaluate(
        &self,
        datastore: &Datastore,
        table: &str,
        key: &FieldValue,
    ) -> FlowResult<bool> {
        let left = self.left.resolve(datastore, table, key)?;
        let right = self.right.resolve(datastore, table, key)?;

        match self.operator {
            ComparisonOperator::Eq => Ok(left == right),
            ComparisonOperator::Lt => Ok(left < right),
            ComparisonOperator::Gt => Ok(left > right),
            ComparisonOperator::Lte => Ok(left <= right),
            ComparisonOperator::Gte => Ok(left >= right),
            ComparisonOperator::And => Ok(boolean(&left)? && boolean(&right)?),
            ComparisonOperator::Or => Ok(boolean(&left)? || boolean(&right)?),
        }
    }
}

/// A numeric expression writing its result to a destination field.
#[derive(Debug, Clone)]
pub struct FunctionExpression {
    pub operator: FunctionOperator,
    pub left: ExpressionValue,
    pub right: ExpressionValue,
    pub dest_field: String,
}

impl FunctionExpression {
    pub fn new(
        operator: FunctionOperator,
        left: ExpressionValue,
        right: ExpressionValue,
        dest_field: &str,
    ) -> Self {
        Self {
            operator,
            left,
            right,
            dest_field: dest_field.to_string(),
        }
    }

    /// Evaluate and write the result to `dest_field` on `entry`.
    ///
    /// Integer operands stay Integer except under `Div`, which always
    /// produces a Float; any Float operand makes the result Float.
    pub fn evaluate(
        &self,
        datastore: &Datastore,
        table: &str,
        key: &FieldValue,
        entry: &mut Record,
    ) -> FlowResult<()> {
        let left = self.left.resolve(datastore, table, key)?;

        let result = match self.operator {
            FunctionOperator::Abs => match left {
                FieldValue::Integer(n) => FieldValue::Integer(n.abs()),
                FieldValue::Float(n) => FieldValue::Float(n.abs()),
                other => return Err(numeric_mismatch(&other)),
            },
            FunctionOperator::Div => {
                let right = self.right.resolve(datastore, table, key)?;
                let (l, r) = numeric_pair(&left, &right)?;
                FieldValue::Float(l / r)
            }
            operator => {
                let right = self.right.resolve(datastore, table, key)?;
                apply_arithmetic(operator, &left, &right)?
            }
        };

        entry.insert(self.dest_field.clone(), result);
        Ok(())
    }
}

/// Add, subtract or multiply, keeping Integer when both sides are.
fn apply_arithmetic(
    operator: FunctionOperator,
    left: &FieldValue,
    right: &FieldValue,
) -> FlowResult<FieldValue> {
    if let (FieldValue::Integer(l), FieldValue::Integer(r)) = (left, right) {
        let result = match operator {
            FunctionOperator::Add => l + r,
            FunctionOperator::Subtract => l - r,
            FunctionOperator::Mult => l * r,
            _ => unreachable!("handled by caller"),
        };
        return Ok(FieldValue::Integer(result));
    }

    let (l, r) = numeric_pair(left, right)?;
    let result = match operator {
        FunctionOperator::Add => l + r,
        FunctionOperator::Subtract => l - r,
        FunctionOperator::Mult => l * r,
        _ => unreachable!("handled by caller"),
    };
    Ok(FieldValue::Float(result))
}

fn numeric_pair(left: &FieldValue, right: &FieldValue) -> FlowResult<(f64, f64)> {
    let l = left.as_number().ok_or_else(|| numeric_mismatch(left))?;
    let r = right.as_number().ok_or_else(|| numeric_mismatch(right))?;
    Ok((l, r))
}

fn numeric_mismatch(value: &FieldValue) -> FlowError {
    FlowError::TypeMismatch {
        expected: "number".to_string(),
        found: value.type_name().to_string(),
    }
}

fn boolean(value: &FieldValue) -> FlowResult<bool> {
    value.as_bool().ok_or_else(|| FlowError::TypeMismatch {
        expected: "boolean".to_string(),
        found: value.type_name().to_string(),
    })
}

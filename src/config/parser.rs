// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Expression string parsing.
//!
//! Filter expressions are infix comparisons joined by `AND`/`OR`, with
//! parentheses for grouping: `(age >= 18) AND (score > 2)`. Function
//! expressions assign one arithmetic operation to a destination field:
//! `doubled = score * 2`.
//!
//! Token classification: double-quoted tokens are string scalars, tokens
//! starting with a letter are field references, numeric tokens are
//! Integer (no decimal point) or Float scalars.

use crate::error::{FlowError, FlowResult};
use crate::record::FieldValue;
use crate::transform::{
    ComparisonExpression, ComparisonOperator, ExpressionValue, FunctionExpression,
    FunctionOperator,
};
use regex::Regex;

/// One lexed token of a filter expression.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    LeftParen,
    RightParen,
    Operator(ComparisonOperator),
    Value(ExpressionValueToken),
}

#[derive(Debug, Clone, PartialEq)]
enum ExpressionValueToken {
    Str(String),
    Number(FieldValue),
    Field(String),
}

/// Parse a filter expression string into a comparison tree.
///
/// ## Input
/// - `expression`: infix source text
///
/// ## Output
/// - `Ok(ComparisonExpression)`: the parsed tree
/// - `Err(FlowError::ParseError)`: unknown operator, unparseable token,
///   unbalanced parentheses, or a bare operand with nothing to compare
///
/// ## Example
/// ```rust
/// use reedflow::config::parse_filter_expression;
///
/// let expression = parse_filter_expression("(age >= 18) AND (score > 2)")?;
/// # Ok::<(), reedflow::FlowError>(())
/// ```
pub fn parse_filter_expression(expression: &str) -> FlowResult<ComparisonExpression> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser { tokens, cursor: 0 };
    let value = parser.parse_or()?;
    if parser.cursor != parser.tokens.len() {
        return Err(FlowError::ParseError {
            reason: format!("trailing tokens in expression: {}", expression),
        });
    }
    match value {
        ExpressionValue::Expression(expression) => Ok(*expression),
        _ => Err(FlowError::ParseError {
            reason: format!("expected a comparison, got a bare operand: {}", expression),
        }),
    }
}

/// Parse a function expression string of the form `dest = left OP right`.
///
/// The operator is one of `+ - * /`; `abs` is only constructible
/// programmatically, mirroring the configuration surface.
pub fn parse_function_expression(expression: &str) -> FlowResult<FunctionExpression> {
    let (dest, rhs) = expression.split_once('=').ok_or_else(|| FlowError::ParseError {
        reason: format!("function expression has no '=': {}", expression),
    })?;
    let dest = dest.trim();
    if dest.is_empty() {
        return Err(FlowError::ParseError {
            reason: format!("function expression has no destination field: {}", expression),
        });
    }

    let operator_pattern = Regex::new(r"[+\-*/]").map_err(|e| FlowError::ParseError {
        reason: e.to_string(),
    })?;
    let found = operator_pattern
        .find(rhs)
        .ok_or_else(|| FlowError::ParseError {
            reason: format!("function expression has no operator: {}", expression),
        })?;

    let left = operand_from_token(rhs[..found.start()].trim())?;
    let right = operand_from_token(rhs[found.end()..].trim())?;
    let operator = match found.as_str() {
        "+" => FunctionOperator::Add,
        "-" => FunctionOperator::Subtract,
        "*" => FunctionOperator::Mult,
        "/" => FunctionOperator::Div,
        other => {
            return Err(FlowError::ParseError {
                reason: format!("unknown function operator: {}", other),
            })
        }
    };

    Ok(FunctionExpression::new(operator, left, right, dest))
}

/// Lex a filter expression into tokens, rejecting anything the grammar
/// does not know.
fn tokenize(expression: &str) -> FlowResult<Vec<Token>> {
    let pattern = Regex::new(
        r#"\(|\)|>=|<=|==|<|>|\bAND\b|\bOR\b|"[^"]*"|[A-Za-z_][A-Za-z0-9_]*|-?[0-9]+(\.[0-9]+)?"#,
    )
    .map_err(|e| FlowError::ParseError {
        reason: e.to_string(),
    })?;

    let mut tokens = Vec::new();
    let mut cursor = 0;
    for found in pattern.find_iter(expression) {
        if expression[cursor..found.start()].trim() != "" {
            return Err(FlowError::ParseError {
                reason: format!(
                    "unparseable token: {}",
                    expression[cursor..found.start()].trim()
                ),
            });
        }
        cursor = found.end();

        let text = found.as_str();
        let token = match text {
            "(" => Token::LeftParen,
            ")" => Token::RightParen,
            "==" => Token::Operator(ComparisonOperator::Eq),
            "<" => Token::Operator(ComparisonOperator::Lt),
            ">" => Token::Operator(ComparisonOperator::Gt),
            "<=" => Token::Operator(ComparisonOperator::Lte),
            ">=" => Token::Operator(ComparisonOperator::Gte),
            "AND" => Token::Operator(ComparisonOperator::And),
            "OR" => Token::Operator(ComparisonOperator::Or),
            _ => Token::Value(classify_value(text)?),
        };
        tokens.push(token);
    }
    if expression[cursor..].trim() != "" {
        return Err(FlowError::ParseError {
            reason: format!("unparseable token: {}", expression[cursor..].trim()),
        });
    }

    Ok(tokens)
}

fn classify_value(text: &str) -> FlowResult<ExpressionValueToken> {
    if let Some(stripped) = text.strip_prefix('"') {
        let inner = stripped.strip_suffix('"').unwrap_or(stripped);
        return Ok(ExpressionValueToken::Str(inner.to_string()));
    }
    if text.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_') {
        return Ok(ExpressionValueToken::Field(text.to_string()));
    }
    number_from_token(text).map(ExpressionValueToken::Number)
}

fn number_from_token(text: &str) -> FlowResult<FieldValue> {
    if text.contains('.') {
        text.parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| unparseable(text))
    } else {
        text.parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| unparseable(text))
    }
}

/// Classify a bare operand token of a function expression.
fn operand_from_token(text: &str) -> FlowResult<ExpressionValue> {
    if text.is_empty() {
        return Err(FlowError::ParseError {
            reason: "empty operand".to_string(),
        });
    }
    if let Some(stripped) = text.strip_prefix('"') {
        let inner = stripped.strip_suffix('"').unwrap_or(stripped);
        return Ok(ExpressionValue::Scalar(FieldValue::Str(inner.to_string())));
    }
    if text.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_') {
        return Ok(ExpressionValue::Field(text.to_string()));
    }
    number_from_token(text).map(ExpressionValue::Scalar)
}

fn unparseable(text: &str) -> FlowError {
    FlowError::ParseError {
        reason: format!("unparseable token: {}", text),
    }
}

/// Recursive-descent parser with OR below AND below comparison.
struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    fn parse_or(&mut self) -> FlowResult<ExpressionValue> {
        let mut left = self.parse_and()?;
        while self.eat_operator(ComparisonOperator::Or) {
            let right = self.parse_and()?;
            left = combine(ComparisonOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> FlowResult<ExpressionValue> {
        let mut left = self.parse_comparison()?;
        while self.eat_operator(ComparisonOperator::And) {
            let right = self.parse_comparison()?;
            left = combine(ComparisonOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> FlowResult<ExpressionValue> {
        let left = self.parse_operand()?;
        if let Some(operator) = self.peek_comparison() {
            self.cursor += 1;
            let right = self.parse_operand()?;
            return Ok(combine(operator, left, right));
        }
        Ok(left)
    }

    fn parse_operand(&mut self) -> FlowResult<ExpressionValue> {
        match self.tokens.get(self.cursor).cloned() {
            Some(Token::LeftParen) => {
                self.cursor += 1;
                let inner = self.parse_or()?;
                match self.tokens.get(self.cursor) {
                    Some(Token::RightParen) => {
                        self.cursor += 1;
                        Ok(inner)
                    }
                    _ => Err(FlowError::ParseError {
                        reason: "unbalanced parentheses".to_string(),
                    }),
                }
            }
            Some(Token::Value(value)) => {
                self.cursor += 1;
                Ok(match value {
                    ExpressionValueToken::Str(s) => ExpressionValue::Scalar(FieldValue::Str(s)),
                    ExpressionValueToken::Number(n) => ExpressionValue::Scalar(n),
                    ExpressionValueToken::Field(name) => ExpressionValue::Field(name),
                })
            }
            other => Err(FlowError::ParseError {
                reason: format!("expected an operand, found {:?}", other),
            }),
        }
    }

    /// Consume the next token if it is the given AND/OR operator.
    fn eat_operator(&mut self, operator: ComparisonOperator) -> bool {
        if self.tokens.get(self.cursor) == Some(&Token::Operator(operator)) {
            self.cursor += 1;
            return true;
        }
        false
    }

    /// Peek a comparison operator (not AND/OR).
    fn peek_comparison(&self) -> Option<ComparisonOperator> {
        match self.tokens.get(self.cursor) {
            Some(Token::Operator(operator))
                if !matches!(operator, ComparisonOperator::And | ComparisonOperator::Or) =>
            {
                Some(*operator)
            }
            _ => None,
        }
    }
}

fn combine(
    operator: ComparisonOperator,
    left: ExpressionValue,
    right: ExpressionValue,
) -> ExpressionValue {
    ExpressionValue::Expression(Box::new(ComparisonExpression::new(operator, left, right)))
}

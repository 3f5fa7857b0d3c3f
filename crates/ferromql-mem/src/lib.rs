//! In-memory query emitter for FerroMQL compiled filters.
//!
//! Evaluates predicate trees against `serde_json::Value` documents, with
//! relationships embedded in the document: a to-one relationship is a
//! nested object, a to-many relationship an array of objects. Useful for
//! tests, prototypes, and filtering already-materialized rows; it is also
//! the reference semantics for the emitter seam.

use serde_json::Value;
use thiserror::Error;

use ferromql_core::error::{Error as CoreError, Result as CoreResult};
use ferromql_core::{
    Cardinality, CompareOp, CompiledFilter, Hop, Predicate, QueryEmitter, Terminal,
};

/// Maximum predicate tree depth the evaluator will walk.
///
/// Compiled trees are already depth-bounded by the compiler; this guard
/// protects against hand-built or deserialized trees.
pub const MAX_EVAL_DEPTH: usize = 64;

/// Evaluation failures over in-memory documents.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("predicate tree depth exceeds maximum of {max}")]
    TooDeep { max: usize },
}

/// Emitter over `Vec<serde_json::Value>`: applying a filter retains the
/// documents the predicate matches, preserving order.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryEmitter;

impl QueryEmitter for MemoryEmitter {
    type Query = Vec<Value>;

    fn apply(&self, query: Vec<Value>, filter: &CompiledFilter) -> CoreResult<Vec<Value>> {
        let mut kept = Vec::with_capacity(query.len());
        for doc in query {
            if matches(filter, &doc).map_err(|e| CoreError::Emitter(e.to_string()))? {
                kept.push(doc);
            }
        }
        Ok(kept)
    }
}

/// Evaluate a compiled filter against one document.
pub fn matches(filter: &CompiledFilter, doc: &Value) -> Result<bool, EvalError> {
    eval(&filter.predicate, doc, 0)
}

fn eval(predicate: &Predicate, doc: &Value, depth: usize) -> Result<bool, EvalError> {
    if depth > MAX_EVAL_DEPTH {
        return Err(EvalError::TooDeep {
            max: MAX_EVAL_DEPTH,
        });
    }

    match predicate {
        Predicate::Always(b) => Ok(*b),
        Predicate::And(children) => {
            for child in children {
                if !eval(child, doc, depth + 1)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Predicate::Or(children) => {
            for child in children {
                if eval(child, doc, depth + 1)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Predicate::Nor(children) => {
            for child in children {
                if eval(child, doc, depth + 1)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Predicate::Not(child) => Ok(!eval(child, doc, depth + 1)?),
        Predicate::Compare { path, op, value } => {
            Ok(eval_compare(&path.hops, &path.terminal, *op, value, doc))
        }
    }
}

/// Walk the relationship hops, then test the terminal.
///
/// A to-one hop follows a nested object (missing or null never matches); a
/// to-many hop matches if *some* element of the nested array satisfies the
/// rest of the path, the existential semantics a relational backend gets
/// from a join.
fn eval_compare(
    hops: &[Hop],
    terminal: &Terminal,
    op: CompareOp,
    operand: &Value,
    doc: &Value,
) -> bool {
    match hops {
        [] => eval_terminal(terminal, op, operand, doc),
        [hop, rest @ ..] => {
            let Some(related) = doc.get(&hop.field) else {
                return false;
            };
            match hop.cardinality {
                Cardinality::ToOne => {
                    related.is_object() && eval_compare(rest, terminal, op, operand, related)
                }
                Cardinality::ToMany => related.as_array().is_some_and(|rows| {
                    rows.iter()
                        .any(|row| eval_compare(rest, terminal, op, operand, row))
                }),
            }
        }
    }
}

fn eval_terminal(terminal: &Terminal, op: CompareOp, operand: &Value, doc: &Value) -> bool {
    match terminal {
        Terminal::Relationship {
            field, cardinality, ..
        } => {
            // Only $exists compiles against a relationship terminal.
            let expect = operand.as_bool().unwrap_or(true);
            let present = match cardinality {
                Cardinality::ToOne => doc.get(field).is_some_and(Value::is_object),
                Cardinality::ToMany => doc
                    .get(field)
                    .and_then(Value::as_array)
                    .is_some_and(|rows| !rows.is_empty()),
            };
            present == expect
        }
        Terminal::Scalar { field, .. } => {
            let actual = doc.get(field).unwrap_or(&Value::Null);
            match op {
                CompareOp::Eq => values_equal(actual, operand),
                CompareOp::Ne => !values_equal(actual, operand),
                CompareOp::Gt => {
                    compare_values(actual, operand) == Some(std::cmp::Ordering::Greater)
                }
                CompareOp::Gte => matches!(
                    compare_values(actual, operand),
                    Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
                ),
                CompareOp::Lt => compare_values(actual, operand) == Some(std::cmp::Ordering::Less),
                CompareOp::Lte => matches!(
                    compare_values(actual, operand),
                    Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                ),
                CompareOp::In => operand
                    .as_array()
                    .is_some_and(|items| items.iter().any(|item| values_equal(actual, item))),
                CompareOp::Nin => !operand
                    .as_array()
                    .is_some_and(|items| items.iter().any(|item| values_equal(actual, item))),
                CompareOp::Mod => eval_mod(actual, operand),
                CompareOp::Exists => {
                    let expect = operand.as_bool().unwrap_or(true);
                    !actual.is_null() == expect
                }
                CompareOp::Like => match (actual.as_str(), operand.as_str()) {
                    (Some(haystack), Some(needle)) => haystack.contains(needle),
                    _ => false,
                },
            }
        }
    }
}

fn eval_mod(actual: &Value, operand: &Value) -> bool {
    let Some([divisor, remainder]) = operand
        .as_array()
        .and_then(|items| <&[Value; 2]>::try_from(items.as_slice()).ok())
    else {
        return false;
    };
    match (actual.as_i64(), divisor.as_i64(), remainder.as_i64()) {
        (Some(a), Some(d), Some(r)) if d != 0 => a % d == r,
        _ => false,
    }
}

/// Type-aware equality: numbers compare numerically (so `1` equals `1.0`),
/// everything else falls back to structural equality.
fn values_equal(left: &Value, right: &Value) -> bool {
    match compare_values(left, right) {
        Some(ordering) => ordering == std::cmp::Ordering::Equal,
        None => left == right,
    }
}

/// Compare two JSON values, returning an ordering if the runtime types are
/// comparable.
///
/// - Numbers: compared as f64
/// - Strings: compared lexicographically (canonical date/time strings sort
///   chronologically)
/// - Booleans: false < true
/// - Null == Null
/// - Mismatched types: `None`
fn compare_values(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    use std::cmp::Ordering;

    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(a), Value::Number(b)) => {
            let fa = a.as_f64()?;
            let fb = b.as_f64()?;
            fa.partial_cmp(&fb)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

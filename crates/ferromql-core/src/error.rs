//! Error types for filter compilation.

use thiserror::Error;

use crate::model::AttrType;
use crate::predicate::CompareOp;

/// Top-level error type for FerroMQL operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("emitter error: {0}")]
    Emitter(String),
}

/// Structural violations of the filter document itself.
#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("filter document must be an object, got {actual}")]
    NotADocument { actual: &'static str },

    #[error("{op} expects an array of filter documents")]
    ExpectedArray { op: String },

    #[error("{op} expects a single filter document")]
    ExpectedDocument { op: String },

    #[error("unknown operator at document level: {0}")]
    UnknownOperator(String),

    #[error("filter exceeds the maximum nesting depth of {max}")]
    TooDeep { max: usize },

    #[error("filter exceeds the maximum node count of {max}")]
    TooComplex { max: usize },
}

/// Errors scoped to a specific dotted field path.
///
/// Each variant carries the user-facing path (before key-name conversion)
/// so callers can report the offending field back to the client.
#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("unknown field: {path} (no attribute '{segment}')")]
    UnknownField { path: String, segment: String },

    #[error("field is not queryable: {path}")]
    Forbidden { path: String },

    #[error("unknown comparison operator {op} on {path}")]
    UnknownOperator { path: String, op: String },

    #[error("{op} cannot be applied to relationship {path}")]
    RelationshipComparison { path: String, op: CompareOp },

    #[error("field {path} cannot be compared to an empty object")]
    EmptyComparison { path: String },

    #[error("cannot convert {op} value for {path} to {expected:?}")]
    TypeMismatch {
        path: String,
        op: CompareOp,
        expected: AttrType,
    },

    #[error("{op} requires an orderable attribute, {path} is {attr_type:?}")]
    NotOrderable {
        path: String,
        op: CompareOp,
        attr_type: AttrType,
    },

    #[error("invalid {op} value for {path}: {message}")]
    InvalidOperand {
        path: String,
        op: CompareOp,
        message: String,
    },
}

impl FieldError {
    /// The user-facing dotted path this error applies to.
    pub fn path(&self) -> &str {
        match self {
            FieldError::UnknownField { path, .. }
            | FieldError::Forbidden { path }
            | FieldError::UnknownOperator { path, .. }
            | FieldError::RelationshipComparison { path, .. }
            | FieldError::EmptyComparison { path }
            | FieldError::TypeMismatch { path, .. }
            | FieldError::NotOrderable { path, .. }
            | FieldError::InvalidOperand { path, .. } => path,
        }
    }

    /// A stable machine-readable code for external reporting.
    pub fn code(&self) -> &'static str {
        match self {
            FieldError::UnknownField { .. } => "invalid_field",
            FieldError::Forbidden { .. } => "invalid_permission",
            FieldError::UnknownOperator { .. } => "invalid_op",
            FieldError::RelationshipComparison { .. } => "invalid_relation_comp",
            FieldError::EmptyComparison { .. } => "invalid_empty_comp",
            FieldError::TypeMismatch { .. } => "data_conversion_error",
            FieldError::NotOrderable { .. } => "invalid_op",
            FieldError::InvalidOperand { .. } => "invalid_operand",
        }
    }
}

/// Errors in the model graph definition itself.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("relationship {entity}.{field} targets unknown entity '{target}'")]
    UnknownRelationshipTarget {
        entity: String,
        field: String,
        target: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

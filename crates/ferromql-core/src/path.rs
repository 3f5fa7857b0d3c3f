//! Dotted attribute path resolution against the model graph.
//!
//! A path like `tracks.playlists.name` resolves to an ordered sequence of
//! relationship hops followed by one terminal, advancing the entity context
//! at every hop. Resolution is total: it either fully resolves or fails
//! with an unknown-field error naming the failing segment.

use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::model::{AttrType, Cardinality, FieldKind, ModelGraph};

/// Converts a user-facing path segment (e.g. `albumId`) into the model's
/// native field name (e.g. `album_id`). Applied to every segment before
/// lookup; whitelist checks see the converted names, error messages keep
/// the raw ones.
pub type KeyConverterFn = dyn Fn(&str) -> String + Send + Sync;

/// One relationship traversal step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    /// Field name on the entity being left (converted form).
    pub field: String,
    /// Entity type the hop lands on.
    pub target: String,
    pub cardinality: Cardinality,
}

/// What a resolved path ends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Terminal {
    /// A scalar attribute; the normal case.
    Scalar {
        field: String,
        attr_type: AttrType,
        nullable: bool,
    },
    /// A relationship itself. Only `$exists` may compare against this;
    /// the compiler enforces that restriction.
    Relationship {
        field: String,
        target: String,
        cardinality: Cardinality,
    },
}

impl Terminal {
    /// The converted field name of the terminal segment.
    pub fn field(&self) -> &str {
        match self {
            Terminal::Scalar { field, .. } | Terminal::Relationship { field, .. } => field,
        }
    }
}

/// A fully resolved dotted path: zero or more relationship hops plus a
/// terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPath {
    pub hops: Vec<Hop>,
    pub terminal: Terminal,
}

impl ResolvedPath {
    /// The converted dotted path, as checked against the whitelist.
    pub fn dotted(&self) -> String {
        let mut parts: Vec<&str> = self.hops.iter().map(|h| h.field.as_str()).collect();
        parts.push(self.terminal.field());
        parts.join(".")
    }
}

/// Resolve `raw_path` on `entity` against the graph.
///
/// Every segment except the last must be a relationship; the terminal may
/// be a scalar or a relationship. Empty paths and empty segments are
/// unknown-field errors.
pub fn resolve(
    graph: &dyn ModelGraph,
    entity: &str,
    raw_path: &str,
    converter: Option<&KeyConverterFn>,
) -> Result<ResolvedPath, FieldError> {
    let segments: Vec<&str> = raw_path.split('.').collect();
    let mut current_entity = entity.to_string();
    let mut hops = Vec::new();

    for (i, raw_segment) in segments.iter().enumerate() {
        if raw_segment.is_empty() {
            return Err(FieldError::UnknownField {
                path: raw_path.to_string(),
                segment: (*raw_segment).to_string(),
            });
        }
        let segment = match converter {
            Some(convert) => convert(raw_segment),
            None => (*raw_segment).to_string(),
        };
        let kind = graph
            .resolve_field(&current_entity, &segment)
            .ok_or_else(|| FieldError::UnknownField {
                path: raw_path.to_string(),
                segment: (*raw_segment).to_string(),
            })?;
        let last = i == segments.len() - 1;

        match kind {
            FieldKind::Relationship(rel) => {
                if last {
                    return Ok(ResolvedPath {
                        hops,
                        terminal: Terminal::Relationship {
                            field: segment,
                            target: rel.target,
                            cardinality: rel.cardinality,
                        },
                    });
                }
                current_entity = rel.target.clone();
                hops.push(Hop {
                    field: segment,
                    target: rel.target,
                    cardinality: rel.cardinality,
                });
            }
            FieldKind::Scalar(scalar) => {
                if !last {
                    // A scalar in hop position: the remaining segments can
                    // never resolve.
                    return Err(FieldError::UnknownField {
                        path: raw_path.to_string(),
                        segment: segments[i + 1].to_string(),
                    });
                }
                return Ok(ResolvedPath {
                    hops,
                    terminal: Terminal::Scalar {
                        field: segment,
                        attr_type: scalar.attr_type,
                        nullable: scalar.nullable,
                    },
                });
            }
        }
    }

    // split() always yields at least one segment, and every segment either
    // returns or errors above.
    unreachable!("path resolution fell through")
}

//! The compiled predicate tree and the join requirement set.
//!
//! Both are backend-agnostic and serializable, so callers can inspect,
//! cache, or transport a compiled filter before handing it to an emitter.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{Hop, ResolvedPath};

/// A comparison operator from the filter language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Mod,
    Exists,
    Like,
}

impl CompareOp {
    /// Parse a `$`-prefixed operator key. `None` for anything unrecognized.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "$eq" => Some(CompareOp::Eq),
            "$ne" => Some(CompareOp::Ne),
            "$gt" => Some(CompareOp::Gt),
            "$gte" => Some(CompareOp::Gte),
            "$lt" => Some(CompareOp::Lt),
            "$lte" => Some(CompareOp::Lte),
            "$in" => Some(CompareOp::In),
            "$nin" => Some(CompareOp::Nin),
            "$mod" => Some(CompareOp::Mod),
            "$exists" => Some(CompareOp::Exists),
            "$like" => Some(CompareOp::Like),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "$eq",
            CompareOp::Ne => "$ne",
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
            CompareOp::In => "$in",
            CompareOp::Nin => "$nin",
            CompareOp::Mod => "$mod",
            CompareOp::Exists => "$exists",
            CompareOp::Like => "$like",
        }
    }

    /// Whether this operator requires an orderable attribute type.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the compiled predicate tree.
///
/// Leaf values have already been coerced to the attribute's declared type.
/// `Always` is the normalized form of vacuous constructs: empty `$and`
/// (true), empty `$or`/`$nor` (false), empty `$in` (false), empty `$nin`
/// (true).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Always(bool),
    Compare {
        path: ResolvedPath,
        op: CompareOp,
        value: Value,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Nor(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Collapse a child list into a single node: empty lists become
    /// `Always(empty_value)`, singletons unwrap, anything else is handed
    /// to `combine`.
    pub(crate) fn combine(
        mut children: Vec<Predicate>,
        empty_value: bool,
        combine: fn(Vec<Predicate>) -> Predicate,
    ) -> Predicate {
        match children.len() {
            0 => Predicate::Always(empty_value),
            1 => children.pop().expect("len checked"),
            _ => combine(children),
        }
    }
}

/// One join requirement: the relationship hops leading to a related entity
/// that comparisons depend on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPath {
    pub hops: Vec<Hop>,
}

impl JoinPath {
    /// The dotted relationship path (converted names), e.g. `tracks.playlists`.
    pub fn dotted(&self) -> String {
        self.hops
            .iter()
            .map(|h| h.field.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The entity type the final hop lands on.
    pub fn target(&self) -> Option<&str> {
        self.hops.last().map(|h| h.target.as_str())
    }
}

/// The deduplicated, insertion-ordered set of join requirements for one
/// compiled filter.
///
/// Two field paths sharing a relationship prefix contribute one entry per
/// shared hop: `tracks.title` and `tracks.playlists.name` together yield
/// `tracks` and `tracks.playlists`. Order is first-use order, which keeps
/// emitted query shapes deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinSet {
    paths: Vec<JoinPath>,
}

impl JoinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every relationship-hop prefix of a resolved path.
    ///
    /// A path terminating in a relationship (`$exists` on `tracks`) records
    /// only the hops *before* the terminal; the existence test itself needs
    /// no join.
    pub fn record(&mut self, path: &ResolvedPath) {
        for end in 1..=path.hops.len() {
            self.insert(JoinPath {
                hops: path.hops[..end].to_vec(),
            });
        }
    }

    fn insert(&mut self, join: JoinPath) {
        if !self.paths.iter().any(|p| p.hops == join.hops) {
            self.paths.push(join);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &JoinPath> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether a join for the given dotted relationship path is recorded.
    pub fn contains(&self, dotted: &str) -> bool {
        self.paths.iter().any(|p| p.dotted() == dotted)
    }
}

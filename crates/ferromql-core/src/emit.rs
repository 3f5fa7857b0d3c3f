//! The emitter seam: turning a compiled filter into a backend query.
//!
//! The compiler never sees a backend. An emitter receives the predicate
//! tree and the join requirement set and is responsible for turning hops
//! into joins (or nested traversals), comparison leaves into native
//! predicate expressions, and composite nodes into logical combinators.
//! Any backend (a SQL ORM, a document store, an in-memory collection)
//! plugs in here without touching the compiler.

use serde_json::Value;

use crate::compile::{CompiledFilter, FilterCompiler};
use crate::error::Result;
use crate::model::ModelGraph;
use crate::whitelist::Whitelist;

/// A backend that can apply a compiled filter to its query type.
pub trait QueryEmitter {
    /// The backend's query representation (a select statement, a row
    /// vector, ...).
    type Query;

    /// Attach the compiled predicate and its joins to `query`.
    ///
    /// Backend failures are reported as [`crate::error::Error::Emitter`].
    fn apply(&self, query: Self::Query, filter: &CompiledFilter) -> Result<Self::Query>;
}

/// Compile `document` against `entity` with default options: pure
/// translation, no query execution. Callers can inspect or cache the
/// result before handing it to an emitter.
pub fn parse_filters(
    graph: &dyn ModelGraph,
    entity: &str,
    document: &Value,
    whitelist: Whitelist,
) -> Result<CompiledFilter> {
    FilterCompiler::new(graph)
        .whitelist(whitelist)
        .compile(entity, document)
}

/// Compile `document` and apply it to `query` through `emitter` in one
/// call.
pub fn apply_filters<E: QueryEmitter>(
    graph: &dyn ModelGraph,
    emitter: &E,
    entity: &str,
    query: E::Query,
    document: &Value,
    whitelist: Whitelist,
) -> Result<E::Query> {
    let compiled = parse_filters(graph, entity, document, whitelist)?;
    emitter.apply(query, &compiled)
}

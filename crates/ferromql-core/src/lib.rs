//! # FerroMQL
//!
//! Query mapped entity graphs with MongoDB-style filter syntax.
//!
//! FerroMQL compiles a nested, JSON-like filter document (the kind a web
//! frontend sends) into a validated, backend-agnostic predicate tree plus
//! the set of relationship joins the predicate depends on. A whitelist
//! decides which dotted paths a caller may filter on; everything else is
//! rejected before any query is built.
//!
//! ## Quick Start
//!
//! ```
//! use ferromql_core::model::{AttrType, ModelRegistry};
//! use ferromql_core::{Whitelist, parse_filters};
//! use serde_json::json;
//!
//! // Describe the entity graph (or implement `ModelGraph` over your ORM).
//! let mut registry = ModelRegistry::new();
//! registry
//!     .entity("Album")
//!     .required("album_id", AttrType::Integer)
//!     .required("title", AttrType::String)
//!     .to_one("artist", "Artist");
//! registry.entity("Artist").scalar("name", AttrType::String);
//!
//! // Compile a client-authored filter against it.
//! let compiled = parse_filters(
//!     &registry,
//!     "Album",
//!     &json!({"$or": [{"album_id": 1}, {"artist.name": {"$like": "Zep"}}]}),
//!     Whitelist::paths(["album_id", "artist.name"]),
//! )
//! .unwrap();
//!
//! // One join requirement: Album -> artist.
//! assert!(compiled.joins.contains("artist"));
//! ```
//!
//! The compiled filter is handed to a [`QueryEmitter`] implementation to
//! become an executable query; `ferromql-mem` ships one for in-memory
//! document collections.

pub mod coerce;
pub mod compile;
pub mod emit;
pub mod error;
pub mod model;
pub mod path;
pub mod predicate;
pub mod whitelist;

pub use compile::{CompiledFilter, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES, FilterCompiler};
pub use emit::{QueryEmitter, apply_filters, parse_filters};
pub use error::{DocumentError, Error, FieldError, Result, SchemaError};
pub use model::{AttrType, Cardinality, FieldKind, ModelGraph, ModelRegistry};
pub use path::{Hop, ResolvedPath, Terminal};
pub use predicate::{CompareOp, JoinPath, JoinSet, Predicate};
pub use whitelist::Whitelist;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry
            .entity("Album")
            .required("album_id", AttrType::Integer)
            .to_many("tracks", "Track");
        registry.entity("Track").scalar("title", AttrType::String);
        registry
    }

    // -----------------------------------------------------------------------
    // Serialization roundtrip
    // -----------------------------------------------------------------------

    #[test]
    fn test_compiled_filter_serde_roundtrip_json() {
        let registry = registry();
        let compiled = parse_filters(
            &registry,
            "Album",
            &json!({"tracks.title": {"$like": "Dog"}, "album_id": {"$in": [1, 2]}}),
            Whitelist::AllowAll,
        )
        .unwrap();

        let encoded = serde_json::to_string(&compiled).unwrap();
        let decoded: CompiledFilter = serde_json::from_str(&encoded).unwrap();
        assert_eq!(compiled, decoded);
    }

    #[test]
    fn test_compiled_filter_serde_roundtrip_msgpack() {
        let registry = registry();
        let compiled = parse_filters(
            &registry,
            "Album",
            &json!({"$nor": [{"album_id": 3}]}),
            Whitelist::AllowAll,
        )
        .unwrap();

        let bytes = rmp_serde::to_vec(&compiled).unwrap();
        let decoded: CompiledFilter = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(compiled, decoded);
    }
}

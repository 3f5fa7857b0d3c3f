//! The model graph: a read-only description of entity types, their scalar
//! attributes, and their relationships.
//!
//! The compiler only ever sees the [`ModelGraph`] trait, so any data-model
//! technology (a SQL ORM, a document store, a hand-written registry) can
//! back it. [`ModelRegistry`] is the built-in implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// The declared type of a scalar attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Time,
}

impl AttrType {
    /// Whether `$gt`/`$gte`/`$lt`/`$lte` are meaningful for this type.
    pub fn is_orderable(self) -> bool {
        !matches!(self, AttrType::Boolean)
    }

    /// Whether `$like` is meaningful for this type.
    pub fn is_text(self) -> bool {
        matches!(self, AttrType::String)
    }
}

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// A scalar attribute on an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    pub attr_type: AttrType,
    pub nullable: bool,
}

/// A relationship from one entity to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Name of the target entity type.
    pub target: String,
    pub cardinality: Cardinality,
}

/// What a field name on an entity resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    Scalar(ScalarField),
    Relationship(Relationship),
}

/// Read-only façade over an entity graph.
///
/// Implementations must be pure: the same `(entity, field)` pair always
/// resolves to the same answer for the lifetime of a compilation call.
pub trait ModelGraph {
    /// Resolve a field name on an entity type. `None` if either the entity
    /// or the field does not exist.
    fn resolve_field(&self, entity: &str, field: &str) -> Option<FieldKind>;

    /// Whether the named entity type exists in the graph.
    fn has_entity(&self, entity: &str) -> bool;
}

/// All fields declared for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    fields: HashMap<String, FieldKind>,
}

/// The built-in [`ModelGraph`] implementation: a registry of entity
/// definitions populated through a builder API.
///
/// ```
/// use ferromql_core::model::{AttrType, ModelRegistry};
///
/// let mut registry = ModelRegistry::new();
/// registry
///     .entity("Album")
///     .scalar("album_id", AttrType::Integer)
///     .scalar("title", AttrType::String)
///     .to_one("artist", "Artist")
///     .to_many("tracks", "Track");
/// registry
///     .entity("Artist")
///     .scalar("name", AttrType::String);
/// registry
///     .entity("Track")
///     .scalar("title", AttrType::String);
/// assert!(registry.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entities: HashMap<String, EntityDef>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or continue) defining an entity type.
    pub fn entity(&mut self, name: &str) -> EntityBuilder<'_> {
        let def = self.entities.entry(name.to_string()).or_default();
        EntityBuilder { def }
    }

    /// Check that every relationship targets a declared entity type.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (entity, def) in &self.entities {
            for (field, kind) in &def.fields {
                if let FieldKind::Relationship(rel) = kind
                    && !self.entities.contains_key(&rel.target)
                {
                    return Err(SchemaError::UnknownRelationshipTarget {
                        entity: entity.clone(),
                        field: field.clone(),
                        target: rel.target.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl ModelGraph for ModelRegistry {
    fn resolve_field(&self, entity: &str, field: &str) -> Option<FieldKind> {
        self.entities.get(entity)?.fields.get(field).cloned()
    }

    fn has_entity(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }
}

/// Builder for one entity's fields. Obtained from [`ModelRegistry::entity`].
pub struct EntityBuilder<'a> {
    def: &'a mut EntityDef,
}

impl EntityBuilder<'_> {
    /// Declare a nullable scalar attribute.
    pub fn scalar(self, name: &str, attr_type: AttrType) -> Self {
        self.insert_scalar(name, attr_type, true)
    }

    /// Declare a non-nullable scalar attribute.
    pub fn required(self, name: &str, attr_type: AttrType) -> Self {
        self.insert_scalar(name, attr_type, false)
    }

    /// Declare a to-one relationship to `target`.
    pub fn to_one(self, field: &str, target: &str) -> Self {
        self.insert_relationship(field, target, Cardinality::ToOne)
    }

    /// Declare a to-many relationship to `target`.
    pub fn to_many(self, field: &str, target: &str) -> Self {
        self.insert_relationship(field, target, Cardinality::ToMany)
    }

    fn insert_scalar(self, name: &str, attr_type: AttrType, nullable: bool) -> Self {
        self.def.fields.insert(
            name.to_string(),
            FieldKind::Scalar(ScalarField {
                attr_type,
                nullable,
            }),
        );
        self
    }

    fn insert_relationship(self, field: &str, target: &str, cardinality: Cardinality) -> Self {
        self.def.fields.insert(
            field.to_string(),
            FieldKind::Relationship(Relationship {
                target: target.to_string(),
                cardinality,
            }),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry
            .entity("Album")
            .required("album_id", AttrType::Integer)
            .required("title", AttrType::String)
            .to_one("artist", "Artist")
            .to_many("tracks", "Track");
        registry
            .entity("Artist")
            .required("artist_id", AttrType::Integer)
            .scalar("name", AttrType::String);
        registry
            .entity("Track")
            .required("track_id", AttrType::Integer)
            .scalar("title", AttrType::String);
        registry
    }

    #[test]
    fn test_resolve_scalar() {
        let registry = sample_registry();
        let kind = registry.resolve_field("Album", "title").unwrap();
        assert_eq!(
            kind,
            FieldKind::Scalar(ScalarField {
                attr_type: AttrType::String,
                nullable: false,
            })
        );
    }

    #[test]
    fn test_resolve_relationship() {
        let registry = sample_registry();
        let kind = registry.resolve_field("Album", "tracks").unwrap();
        assert_eq!(
            kind,
            FieldKind::Relationship(Relationship {
                target: "Track".to_string(),
                cardinality: Cardinality::ToMany,
            })
        );
    }

    #[test]
    fn test_resolve_unknown_field() {
        let registry = sample_registry();
        assert!(registry.resolve_field("Album", "label").is_none());
        assert!(registry.resolve_field("Label", "name").is_none());
    }

    #[test]
    fn test_has_entity() {
        let registry = sample_registry();
        assert!(registry.has_entity("Album"));
        assert!(!registry.has_entity("Label"));
    }

    #[test]
    fn test_redefining_field_overwrites() {
        let mut registry = sample_registry();
        registry.entity("Album").scalar("title", AttrType::Integer);
        let kind = registry.resolve_field("Album", "title").unwrap();
        assert_eq!(
            kind,
            FieldKind::Scalar(ScalarField {
                attr_type: AttrType::Integer,
                nullable: true,
            })
        );
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample_registry().validate().is_ok());
    }

    #[test]
    fn test_validate_dangling_target() {
        let mut registry = sample_registry();
        registry.entity("Album").to_many("reviews", "Review");
        let err = registry.validate().unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownRelationshipTarget {
                entity: "Album".to_string(),
                field: "reviews".to_string(),
                target: "Review".to_string(),
            }
        );
    }

    #[test]
    fn test_orderable_types() {
        assert!(AttrType::Integer.is_orderable());
        assert!(AttrType::String.is_orderable());
        assert!(AttrType::Date.is_orderable());
        assert!(!AttrType::Boolean.is_orderable());
    }

    #[test]
    fn test_text_types() {
        assert!(AttrType::String.is_text());
        assert!(!AttrType::Integer.is_text());
    }
}

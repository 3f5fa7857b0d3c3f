//! The filter compiler: recursive descent over a filter document.
//!
//! The recursion has two modes. *Document mode* classifies each key of an
//! object as a logical operator or a dotted field path; *field mode*
//! resolves and authorizes one path, then dispatches its comparison
//! operators. All errors abort the whole compilation: a silently dropped
//! clause would change the filter's meaning, and a silently ignored
//! forbidden field would defeat the whitelist.

use serde_json::Value;
use tracing::{debug, trace};

use crate::coerce::coerce;
use crate::emit::QueryEmitter;
use crate::error::{DocumentError, Error, FieldError, Result, SchemaError};
use crate::model::{AttrType, ModelGraph};
use crate::path::{self, KeyConverterFn, ResolvedPath, Terminal};
use crate::predicate::{CompareOp, JoinSet, Predicate};
use crate::whitelist::Whitelist;

/// Default maximum nesting depth of a filter document.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Default maximum number of predicate nodes one document may compile to.
pub const DEFAULT_MAX_NODES: usize = 1024;

/// The output of a compilation: the predicate tree plus the joins the
/// emitter must establish for it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompiledFilter {
    /// Entity type the filter was compiled against.
    pub entity: String,
    pub predicate: Predicate,
    pub joins: JoinSet,
}

/// Builder-configured compiler for MongoDB-style filter documents.
///
/// ```
/// use ferromql_core::{FilterCompiler, Whitelist};
/// use ferromql_core::model::{AttrType, ModelRegistry};
/// use serde_json::json;
///
/// let mut registry = ModelRegistry::new();
/// registry
///     .entity("Album")
///     .required("album_id", AttrType::Integer)
///     .to_one("artist", "Artist");
/// registry.entity("Artist").scalar("name", AttrType::String);
///
/// let compiled = FilterCompiler::new(&registry)
///     .whitelist(Whitelist::paths(["album_id", "artist.name"]))
///     .compile("Album", &json!({"artist.name": "Led Zeppelin"}))
///     .unwrap();
/// assert!(compiled.joins.contains("artist"));
/// ```
pub struct FilterCompiler<'g> {
    graph: &'g dyn ModelGraph,
    whitelist: Whitelist,
    conditions: Vec<Value>,
    key_converter: Option<Box<KeyConverterFn>>,
    max_depth: usize,
    max_nodes: usize,
}

struct Budget {
    nodes: usize,
    max_nodes: usize,
    joins: JoinSet,
}

impl Budget {
    fn charge(&mut self) -> Result<()> {
        self.nodes += 1;
        if self.nodes > self.max_nodes {
            return Err(DocumentError::TooComplex {
                max: self.max_nodes,
            }
            .into());
        }
        Ok(())
    }
}

impl<'g> FilterCompiler<'g> {
    pub fn new(graph: &'g dyn ModelGraph) -> Self {
        Self {
            graph,
            whitelist: Whitelist::AllowAll,
            conditions: Vec::new(),
            key_converter: None,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }

    /// Set the authorization policy. Defaults to [`Whitelist::AllowAll`].
    pub fn whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    /// Add a mandatory condition: a filter document AND-ed with every user
    /// document this compiler processes. Mandatory conditions are
    /// server-authored (row-level constraints such as tenant isolation),
    /// so they bypass the whitelist, but not path resolution or the
    /// depth/node budgets.
    pub fn condition(mut self, document: Value) -> Self {
        self.conditions.push(document);
        self
    }

    /// Set a key-name converter applied to every path segment before
    /// resolution, e.g. camelCase client keys to snake_case model fields.
    pub fn key_converter(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.key_converter = Some(Box::new(f));
        self
    }

    /// Override the maximum nesting depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Override the maximum predicate node count.
    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Compile a filter document against `entity`.
    pub fn compile(&self, entity: &str, document: &Value) -> Result<CompiledFilter> {
        if !self.graph.has_entity(entity) {
            return Err(SchemaError::EntityNotFound(entity.to_string()).into());
        }
        debug!(entity, "compiling filter document");

        let mut budget = Budget {
            nodes: 0,
            max_nodes: self.max_nodes,
            joins: JoinSet::new(),
        };

        let mut children = Vec::new();
        for condition in &self.conditions {
            children.push(self.document(&mut budget, entity, condition, 0, false)?);
        }
        children.push(self.document(&mut budget, entity, document, 0, true)?);
        let predicate = Predicate::combine(children, true, Predicate::And);

        trace!(
            entity,
            nodes = budget.nodes,
            joins = budget.joins.len(),
            "filter compiled"
        );
        Ok(CompiledFilter {
            entity: entity.to_string(),
            predicate,
            joins: budget.joins,
        })
    }

    /// Compile and hand the result to an emitter in one call.
    pub fn apply<E: QueryEmitter>(
        &self,
        emitter: &E,
        query: E::Query,
        entity: &str,
        document: &Value,
    ) -> Result<E::Query> {
        let compiled = self.compile(entity, document)?;
        emitter.apply(query, &compiled)
    }

    /// Document mode: classify each key of one filter document.
    ///
    /// `authorize` is false while compiling mandatory conditions.
    fn document(
        &self,
        budget: &mut Budget,
        entity: &str,
        document: &Value,
        depth: usize,
        authorize: bool,
    ) -> Result<Predicate> {
        if depth > self.max_depth {
            return Err(DocumentError::TooDeep {
                max: self.max_depth,
            }
            .into());
        }
        let map = document
            .as_object()
            .ok_or_else(|| DocumentError::NotADocument {
                actual: json_kind(document),
            })?;

        let mut children = Vec::new();
        for (key, value) in map {
            let child = match key.as_str() {
                "$and" | "$or" | "$nor" => {
                    let docs = value.as_array().ok_or_else(|| DocumentError::ExpectedArray {
                        op: key.clone(),
                    })?;
                    let mut parts = Vec::with_capacity(docs.len());
                    for doc in docs {
                        parts.push(self.document(budget, entity, doc, depth + 1, authorize)?);
                    }
                    budget.charge()?;
                    match key.as_str() {
                        "$and" => Predicate::combine(parts, true, Predicate::And),
                        "$or" => Predicate::combine(parts, false, Predicate::Or),
                        // $nor never unwraps: Nor of one clause is still a
                        // negation. Empty $nor is vacuously false.
                        _ => {
                            if parts.is_empty() {
                                Predicate::Always(false)
                            } else {
                                Predicate::Nor(parts)
                            }
                        }
                    }
                }
                "$not" => {
                    if !value.is_object() {
                        return Err(DocumentError::ExpectedDocument {
                            op: key.clone(),
                        }
                        .into());
                    }
                    let inner = self.document(budget, entity, value, depth + 1, authorize)?;
                    budget.charge()?;
                    Predicate::Not(Box::new(inner))
                }
                key if key.starts_with('$') => {
                    // A bare comparison operator (or an unsupported one
                    // like $regex) with no enclosing field.
                    return Err(DocumentError::UnknownOperator(key.to_string()).into());
                }
                _ => self.field(budget, entity, key, value, depth + 1, authorize)?,
            };
            children.push(child);
        }
        if children.len() > 1 {
            budget.charge()?;
        }
        Ok(Predicate::combine(children, true, Predicate::And))
    }

    /// Field mode: resolve and authorize one dotted path, then dispatch
    /// its comparison operators.
    fn field(
        &self,
        budget: &mut Budget,
        entity: &str,
        raw_path: &str,
        value: &Value,
        depth: usize,
        authorize: bool,
    ) -> Result<Predicate> {
        if depth > self.max_depth {
            return Err(DocumentError::TooDeep {
                max: self.max_depth,
            }
            .into());
        }
        let resolved = path::resolve(self.graph, entity, raw_path, self.key_converter.as_deref())?;
        if authorize && !self.whitelist.allows(&resolved.dotted()) {
            return Err(FieldError::Forbidden {
                path: raw_path.to_string(),
            }
            .into());
        }
        budget.joins.record(&resolved);

        match value.as_object() {
            Some(ops) => {
                if ops.is_empty() {
                    return Err(FieldError::EmptyComparison {
                        path: raw_path.to_string(),
                    }
                    .into());
                }
                let mut parts = Vec::with_capacity(ops.len());
                for (key, operand) in ops {
                    let op = CompareOp::parse(key).ok_or_else(|| FieldError::UnknownOperator {
                        path: raw_path.to_string(),
                        op: key.clone(),
                    })?;
                    parts.push(self.comparison(budget, &resolved, raw_path, op, operand)?);
                }
                if parts.len() > 1 {
                    budget.charge()?;
                }
                Ok(Predicate::combine(parts, true, Predicate::And))
            }
            // Implicit equality. An array here compares against the
            // attribute as a whole; membership needs an explicit $in.
            None => self.comparison(budget, &resolved, raw_path, CompareOp::Eq, value),
        }
    }

    /// Build one comparison leaf, validating and coercing the operand.
    fn comparison(
        &self,
        budget: &mut Budget,
        resolved: &ResolvedPath,
        raw_path: &str,
        op: CompareOp,
        operand: &Value,
    ) -> Result<Predicate> {
        budget.charge()?;

        let scalar = match &resolved.terminal {
            Terminal::Scalar { attr_type, .. } => Some(*attr_type),
            Terminal::Relationship { .. } => {
                if op != CompareOp::Exists {
                    return Err(FieldError::RelationshipComparison {
                        path: raw_path.to_string(),
                        op,
                    }
                    .into());
                }
                None
            }
        };

        let value = match op {
            CompareOp::Eq | CompareOp::Ne => {
                let attr_type = scalar.expect("relationship rejected above");
                if operand.is_array() {
                    // Whole-value comparison; elements are left untouched.
                    operand.clone()
                } else {
                    coerce(operand, attr_type, raw_path, op)?
                }
            }
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
                let attr_type = scalar.expect("relationship rejected above");
                if !attr_type.is_orderable() {
                    return Err(FieldError::NotOrderable {
                        path: raw_path.to_string(),
                        op,
                        attr_type,
                    }
                    .into());
                }
                coerce(operand, attr_type, raw_path, op)?
            }
            CompareOp::In | CompareOp::Nin => {
                let attr_type = scalar.expect("relationship rejected above");
                let items = operand.as_array().ok_or_else(|| FieldError::InvalidOperand {
                    path: raw_path.to_string(),
                    op,
                    message: "value must be an array".to_string(),
                })?;
                if items.is_empty() {
                    // Empty membership is legal: nothing is in the empty
                    // set, everything is outside it.
                    return Ok(Predicate::Always(op == CompareOp::Nin));
                }
                let coerced: Vec<Value> = items
                    .iter()
                    .map(|item| coerce(item, attr_type, raw_path, op))
                    .collect::<std::result::Result<_, _>>()?;
                Value::Array(coerced)
            }
            CompareOp::Mod => {
                let attr_type = scalar.expect("relationship rejected above");
                self.mod_operand(attr_type, raw_path, operand)?
            }
            CompareOp::Exists => {
                let Some(flag) = operand.as_bool() else {
                    return Err(FieldError::InvalidOperand {
                        path: raw_path.to_string(),
                        op,
                        message: "value must be a boolean".to_string(),
                    }
                    .into());
                };
                Value::Bool(flag)
            }
            CompareOp::Like => {
                let attr_type = scalar.expect("relationship rejected above");
                if !attr_type.is_text() {
                    return Err(FieldError::TypeMismatch {
                        path: raw_path.to_string(),
                        op,
                        expected: AttrType::String,
                    }
                    .into());
                }
                match operand {
                    Value::String(s) => Value::String(s.clone()),
                    Value::Number(n) => Value::String(n.to_string()),
                    Value::Bool(b) => Value::String(b.to_string()),
                    _ => {
                        return Err(FieldError::TypeMismatch {
                            path: raw_path.to_string(),
                            op,
                            expected: AttrType::String,
                        }
                        .into());
                    }
                }
            }
        };

        Ok(Predicate::Compare {
            path: resolved.clone(),
            op,
            value,
        })
    }

    fn mod_operand(
        &self,
        attr_type: AttrType,
        raw_path: &str,
        operand: &Value,
    ) -> Result<Value> {
        let invalid = |message: &str| -> Error {
            FieldError::InvalidOperand {
                path: raw_path.to_string(),
                op: CompareOp::Mod,
                message: message.to_string(),
            }
            .into()
        };
        if attr_type != AttrType::Integer {
            return Err(FieldError::TypeMismatch {
                path: raw_path.to_string(),
                op: CompareOp::Mod,
                expected: AttrType::Integer,
            }
            .into());
        }
        let items = operand
            .as_array()
            .ok_or_else(|| invalid("value must be a two-element array"))?;
        let [divisor, remainder] = items.as_slice() else {
            return Err(invalid("value must be a two-element array"));
        };
        let divisor = as_integer(divisor).ok_or_else(|| invalid("divisor must be an integer"))?;
        let remainder =
            as_integer(remainder).ok_or_else(|| invalid("remainder must be an integer"))?;
        if divisor == 0 {
            return Err(invalid("divisor must not be zero"));
        }
        Ok(Value::Array(vec![
            Value::from(divisor),
            Value::from(remainder),
        ]))
    }
}

/// Strict integer extraction for `$mod`: JSON numbers only, no fractional
/// part, no strings.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f.is_finite() {
        Some(f as i64)
    } else {
        None
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

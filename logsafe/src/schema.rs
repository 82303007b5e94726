//! Static redaction schemas and the registry that resolves them.
//!
//! Instead of reflecting over live objects while a request is in flight,
//! every domain record type contributes a [`RecordSchema`] once, at startup:
//! one [`FieldSchema`] per field with its serialized name, its `#[redact]`
//! flag, and the type path of its declared type. The redactor then works as a
//! pure tree-to-tree transformation over decoded JSON, looking field types up
//! in the [`SchemaRegistry`].
//!
//! The [`ScopeBoundary`] bounds traversal: only types whose path falls under
//! the configured prefix are walked field-by-field. Everything else
//! (framework types, primitives, enums) is an opaque leaf.

use std::collections::HashMap;

/// Per-field schema entry collected by `#[derive(Loggable)]`.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// Serialized (JSON) field name, after serde renames.
    pub name: &'static str,
    /// Whether the field carries the `#[redact]` marker.
    pub redact: bool,
    /// `std::any::type_name` of the declared field type.
    pub type_path: &'static str,
}

/// Static schema for one record type.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    /// `std::any::type_name` of the record type itself.
    pub type_path: &'static str,
    pub fields: Vec<FieldSchema>,
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Types whose captured bodies participate in field-level redaction.
///
/// Usually implemented via `#[derive(Loggable)]`; a manual implementation
/// only needs to return the same `&'static` schema on every call.
pub trait Loggable: 'static {
    fn schema() -> &'static RecordSchema;
}

/// Namespace prefix gating which types are deep-traversed.
///
/// The prefix is matched against resolved schema type paths
/// (e.g. `my_service::dto`). An empty prefix admits every registered type.
#[derive(Debug, Clone, Default)]
pub struct ScopeBoundary {
    prefix: String,
}

impl ScopeBoundary {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn contains(&self, type_path: &str) -> bool {
        type_path.starts_with(&self.prefix)
    }
}

/// Startup-built index from type paths to record schemas.
///
/// Register every domain type that may appear in a logged body, nested types
/// included; resolution is by declared type path, so an unregistered nested
/// record is simply walked as an opaque map.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, &'static RecordSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Loggable>(mut self) -> Self {
        let schema = T::schema();
        self.schemas.insert(schema.type_path, schema);
        self
    }

    /// Exact lookup by type path.
    pub fn lookup(&self, type_path: &str) -> Option<&'static RecordSchema> {
        self.schemas.get(type_path).copied()
    }

    /// Lookup that peels single-argument generic wrappers.
    ///
    /// `Json<Employee>`, `Option<Employee>`, and `Vec<Employee>` all resolve
    /// to the `Employee` schema; peeling repeats, so `Option<Json<Employee>>`
    /// resolves too. Multi-argument generics and tuples never resolve (their
    /// element types are not recoverable from a single path) and stay
    /// opaque.
    pub fn resolve(&self, type_path: &str) -> Option<&'static RecordSchema> {
        let mut path = type_path;
        loop {
            if let Some(schema) = self.lookup(path) {
                return Some(schema);
            }
            match generic_argument(path) {
                Some(inner) => path = inner,
                None => return None,
            }
        }
    }
}

/// Extracts the single type argument of a generic path, if there is exactly
/// one: `axum::Json<demo::Employee>` → `demo::Employee`.
fn generic_argument(path: &str) -> Option<&str> {
    if path.starts_with('(') || !path.ends_with('>') {
        return None;
    }
    let start = path.find('<')?;
    let inner = path[start + 1..path.len() - 1].trim();
    // A top-level comma means more than one argument.
    let mut depth = 0usize;
    for ch in inner.chars() {
        match ch {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return None,
            _ => {}
        }
    }
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

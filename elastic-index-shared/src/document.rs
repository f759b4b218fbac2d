//! Document body type.

use serde_json::{Map, Value};

/// A document as stored in the index.
///
/// Field values may nest arbitrarily (objects, arrays, scalars), so the body is
/// kept as a JSON object rather than a fixed struct.
pub type Document = Map<String, Value>;

/// Render a field value as a document identifier.
///
/// Strings are used as-is, numbers and booleans by their JSON text. `null`,
/// empty strings and composite values yield `None`, which leaves identifier
/// assignment to the search engine.
pub fn identifier_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

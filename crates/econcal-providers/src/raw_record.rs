//! Raw records as they come out of a source adapter.
//!
//! A [`RawRecord`] is deliberately opaque: a flat map of provider-specific
//! field names to JSON values. Only the normalizer's per-source field table
//! knows which key holds the title, the impact code or the timestamp.

use econcal_core::SourceKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One provider record before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// The source this record came from.
    pub source: SourceKind,
    /// Provider identifier, or a synthesized one; used only for diagnostics.
    pub id: String,
    /// Provider field name to value.
    pub fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(source: SourceKind, id: impl Into<String>) -> Self {
        Self {
            source,
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builds a record from a JSON object, taking `id_keys` in order to
    /// synthesize an identifier (`"{a}@{b}"`).
    pub fn from_object(source: SourceKind, fields: Map<String, Value>, id_keys: &[&str]) -> Self {
        let parts: Vec<String> = id_keys
            .iter()
            .filter_map(|key| fields.get(*key).and_then(value_text))
            .collect();
        Self {
            source,
            id: parts.join("@"),
            fields,
        }
    }

    /// Builder method to add a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the field as trimmed text; empty strings and `null` are absent.
    pub fn text(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(value_text)
    }
}

/// Renders a scalar JSON value as text.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

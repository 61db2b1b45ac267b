//! Document model for locale files
//!
//! A locale file is a tree of objects, arrays and scalar leaves. The tree is
//! modelled as an explicit three-way variant so that every traversal in the
//! codec is a total match instead of runtime type inspection.
//!
//! Object entries keep the order of the parsed JSON text, which is also the
//! display order of the resulting rows.

use crate::error::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A scalar leaf value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

impl Scalar {
    /// Returns the string value, if this is a string leaf
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable rendering of any scalar
    pub fn to_text(&self) -> String {
        match self {
            Scalar::String(s) => s.clone(),
            Scalar::Number(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Null => "null".to_string(),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

/// A nested locale document
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Object with entries in document order
    Object(Vec<(String, Document)>),
    Array(Vec<Document>),
    Scalar(Scalar),
}

impl Default for Document {
    fn default() -> Self {
        Document::Object(Vec::new())
    }
}

impl Document {
    /// Parse a document from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::structural("$", format!("invalid JSON document: {e}")))?;
        Ok(Document::from(value))
    }

    /// Serialize with the canonical formatter used for committed files.
    ///
    /// Two-space indentation and a trailing newline. Structurally identical
    /// documents always produce identical bytes.
    pub fn to_canonical_string(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, Document::Scalar(_))
    }

    /// Look up an object entry by key
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Document::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Mutable object entry lookup
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Document> {
        match self {
            Document::Object(entries) => entries
                .iter_mut()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Document::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Document::from(v)))
                    .collect(),
            ),
            Value::Array(items) => Document::Array(items.into_iter().map(Document::from).collect()),
            Value::String(s) => Document::Scalar(Scalar::String(s)),
            Value::Number(n) => Document::Scalar(Scalar::Number(n)),
            Value::Bool(b) => Document::Scalar(Scalar::Bool(b)),
            Value::Null => Document::Scalar(Scalar::Null),
        }
    }
}

impl From<&Document> for Value {
    fn from(doc: &Document) -> Self {
        match doc {
            Document::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
            Document::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            Document::Scalar(Scalar::String(s)) => Value::String(s.clone()),
            Document::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
            Document::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            Document::Scalar(Scalar::Null) => Value::Null,
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Document::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Document::Array(items) => items.serialize(serializer),
            Document::Scalar(scalar) => scalar.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Document::from)
    }
}

//! The record type flowing through the pipeline.
//!
//! A record is one JSON object read from one line of a JSONL file. Field
//! order is kept exactly as read so writing a record back reproduces the
//! input schema.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while turning a JSON object into a [`Record`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("text field '{key}' must be a string, found {found}")]
    TextNotString { key: String, found: &'static str },

    #[error("id field '{key}' must be a string, number or boolean, found {found}")]
    InvalidId { key: String, found: &'static str },
}

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordOrigin {
    /// URI of the source file.
    pub file: Arc<str>,
    /// 1-based physical line number.
    pub line: usize,
}

impl RecordOrigin {
    pub fn new(file: impl Into<Arc<str>>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Names of the fields the pipeline treats specially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKeys {
    pub text: Arc<str>,
    pub id: Arc<str>,
}

impl RecordKeys {
    pub fn new(text: impl Into<Arc<str>>, id: impl Into<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            id: id.into(),
        }
    }
}

impl Default for RecordKeys {
    fn default() -> Self {
        Self::new("text", "id")
    }
}

/// One JSONL record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    fields: Map<String, Value>,
    text_key: Arc<str>,
    origin: RecordOrigin,
}

impl Record {
    /// Builds a record from a parsed JSON object.
    ///
    /// A missing id is synthesized as `<file>/<line>` and stored under the id
    /// key. A present text field must be a string.
    pub fn from_fields(
        mut fields: Map<String, Value>,
        keys: &RecordKeys,
        origin: RecordOrigin,
    ) -> Result<Self, RecordError> {
        if let Some(text) = fields.get(&*keys.text) {
            if !text.is_string() {
                return Err(RecordError::TextNotString {
                    key: keys.text.to_string(),
                    found: json_type(text),
                });
            }
        }

        let id = match fields.get(&*keys.id) {
            Some(Value::String(s)) => s.clone(),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
            Some(other) => {
                return Err(RecordError::InvalidId {
                    key: keys.id.to_string(),
                    found: json_type(other),
                })
            }
            None => {
                let synthesized = format!("{}/{}", origin.file, origin.line);
                tracing::debug!(id = %synthesized, "Record has no id, synthesized one");
                fields.insert(keys.id.to_string(), Value::String(synthesized.clone()));
                synthesized
            }
        };

        Ok(Self {
            id,
            fields,
            text_key: Arc::clone(&keys.text),
            origin,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The designated text field, if present.
    pub fn text(&self) -> Option<&str> {
        self.fields.get(&*self.text_key).and_then(Value::as_str)
    }

    pub fn text_key(&self) -> &str {
        &self.text_key
    }

    /// All fields in their original order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn origin(&self) -> &RecordOrigin {
        &self.origin
    }

    /// Serializes the record as a single compact JSON line, without newline.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.fields)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn origin() -> RecordOrigin {
        RecordOrigin::new("/data/sample.jsonl", 3)
    }

    #[test]
    fn test_record_keeps_field_order() {
        let fields = object(json!({"title": "T", "id": "1", "text": "hello"}));
        let record = Record::from_fields(fields, &RecordKeys::default(), origin()).unwrap();

        let keys: Vec<_> = record.fields().keys().cloned().collect();
        assert_eq!(keys, vec!["title", "id", "text"]);
        assert_eq!(
            record.to_json_line().unwrap(),
            r#"{"title":"T","id":"1","text":"hello"}"#
        );
    }

    #[test]
    fn test_numeric_id_is_rendered() {
        let fields = object(json!({"id": 42, "text": "x"}));
        let record = Record::from_fields(fields, &RecordKeys::default(), origin()).unwrap();
        assert_eq!(record.id(), "42");
        assert_eq!(record.get("id"), Some(&json!(42)));
    }

    #[test]
    fn test_missing_id_is_synthesized_from_origin() {
        let fields = object(json!({"text": "no id here"}));
        let record = Record::from_fields(fields, &RecordKeys::default(), origin()).unwrap();
        assert_eq!(record.id(), "/data/sample.jsonl/3");
        assert_eq!(record.get("id"), Some(&json!("/data/sample.jsonl/3")));
    }

    #[test]
    fn test_custom_keys() {
        let keys = RecordKeys::new("content", "doc_id");
        let fields = object(json!({"doc_id": "a", "content": "body", "text": 5}));
        let record = Record::from_fields(fields, &keys, origin()).unwrap();
        assert_eq!(record.id(), "a");
        assert_eq!(record.text(), Some("body"));
        assert_eq!(record.text_key(), "content");
    }

    #[test]
    fn test_missing_text_is_none() {
        let fields = object(json!({"id": "1"}));
        let record = Record::from_fields(fields, &RecordKeys::default(), origin()).unwrap();
        assert_eq!(record.text(), None);
    }

    #[test]
    fn test_non_string_text_rejected() {
        let fields = object(json!({"id": "1", "text": ["a"]}));
        let err = Record::from_fields(fields, &RecordKeys::default(), origin()).unwrap_err();
        assert_eq!(
            err,
            RecordError::TextNotString {
                key: "text".to_string(),
                found: "array",
            }
        );
    }

    #[test]
    fn test_object_id_rejected() {
        let fields = object(json!({"id": {"nested": 1}, "text": "x"}));
        let err = Record::from_fields(fields, &RecordKeys::default(), origin()).unwrap_err();
        assert!(err.to_string().contains("found object"));
    }

    #[test]
    fn test_origin_display() {
        assert_eq!(origin().to_string(), "/data/sample.jsonl:3");
    }
}

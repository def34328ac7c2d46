//! Mapping of raw backend documents into typed model records.

use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};

use crate::{
    coerce::{FieldCoercer, FieldValue},
    error::SearchLayerResult,
    schema::{Model, PropertySchema},
};

/// A model instance as read back from the backend.
///
/// Holds only the fields that are both declared in the model's schema and carry
/// a truthy value in the source document, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRecord {
    fields: Vec<(String, FieldValue)>,
}

impl ModelRecord {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub(crate) fn push(&mut self, name: String, value: FieldValue) {
        self.fields.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Converts the record into a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect::<Map<String, Value>>(),
        )
    }

    /// Deserializes the record into a concrete model type.
    ///
    /// # Errors
    ///
    /// Returns a serialization error when the record does not fit `M`, e.g. when a
    /// required field was omitted because its stored value was falsy.
    pub fn into_model<M: Model>(self) -> SearchLayerResult<M> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl Serialize for ModelRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Turns raw source documents into [`ModelRecord`]s.
pub struct ModelMapper;

impl ModelMapper {
    /// Maps a source document onto the given schema.
    ///
    /// Returns `None` when there is no source (the document was not found) or when
    /// the source cannot be read as a document. Callers must treat `None` as
    /// "no record", never as an empty record.
    pub fn to_record(schema: &PropertySchema, source: Option<&Value>) -> Option<ModelRecord> {
        let document = match source? {
            Value::Object(document) => document,
            Value::Null => return None,
            other => {
                tracing::warn!(kind = value_kind(other), "Source document is not an object, skipping");
                return None;
            }
        };

        let mut record = ModelRecord::new();

        for (name, field_type) in schema.iter() {
            if let Some(value) = document.get(name).filter(|value| is_truthy(value)) {
                record.push(name.to_string(), FieldCoercer::coerce(field_type, value));
            }
        }

        Some(record)
    }
}

/// Returns whether a source value counts as present.
///
/// `null`, `false`, zero, NaN and the empty string are absent; arrays and objects
/// are always present, even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    fn person_schema() -> PropertySchema {
        PropertySchema::new()
            .field("name", FieldType::String)
            .field("tags", FieldType::Array)
    }

    #[test]
    fn keeps_only_declared_present_fields() {
        let source = json!({"name": "Bob", "tags": [], "other": "ignored"});
        let record = ModelMapper::to_record(&person_schema(), Some(&source)).unwrap();

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("name"), Some(&FieldValue::String("Bob".to_string())));
        assert_eq!(record.get("tags"), Some(&FieldValue::Array(Vec::new())));
        assert!(!record.contains("other"));
        assert_eq!(record.to_json(), json!({"name": "Bob", "tags": []}));
    }

    #[test]
    fn missing_source_yields_none() {
        assert!(ModelMapper::to_record(&person_schema(), None).is_none());
        assert!(ModelMapper::to_record(&person_schema(), Some(&Value::Null)).is_none());
    }

    #[test]
    fn unreadable_source_yields_none() {
        assert!(ModelMapper::to_record(&person_schema(), Some(&json!("not a doc"))).is_none());
        assert!(ModelMapper::to_record(&person_schema(), Some(&json!([1, 2]))).is_none());
    }

    #[test]
    fn falsy_fields_are_omitted_not_nulled() {
        let schema = PropertySchema::new()
            .field("name", FieldType::String)
            .field("count", FieldType::Number)
            .field("active", FieldType::Other);
        let source = json!({"name": "", "count": 0, "active": false});
        let record = ModelMapper::to_record(&schema, Some(&source)).unwrap();

        assert!(record.is_empty());
        assert_eq!(record.to_json(), json!({}));
    }

    #[test]
    fn malformed_numbers_become_nan() {
        let schema = PropertySchema::new().field("count", FieldType::Number);
        let record = ModelMapper::to_record(&schema, Some(&json!({"count": "abc"}))).unwrap();

        assert!(record.get("count").unwrap().is_nan());
        assert_eq!(record.to_json(), json!({"count": null}));
    }

    #[test]
    fn record_fields_follow_schema_order() {
        let schema = PropertySchema::new()
            .field("z", FieldType::String)
            .field("a", FieldType::String);
        let record = ModelMapper::to_record(&schema, Some(&json!({"a": "1", "z": "2"}))).unwrap();

        assert_eq!(record.iter().map(|(name, _)| name).collect::<Vec<_>>(), vec!["z", "a"]);
    }
}

//! Value coercion for identifiers and declared model fields.
//!
//! Both coercers are total: they never fail. Input that cannot be converted is
//! either returned unchanged (identifiers) or turned into a sentinel such as a
//! NaN number (numeric fields).

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::schema::FieldType;

/// Produces the string form of a JSON value.
///
/// Strings are returned verbatim, numbers and booleans use their display form,
/// `null` becomes `"null"`, arrays join the string forms of their elements with
/// `,` and objects are rendered as compact JSON.
pub fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(string_form)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Normalizes identifier values into the string form used for document ids.
pub struct IdCoercer;

impl IdCoercer {
    /// Coerces an identifier into a JSON string.
    ///
    /// Strings pass through, numbers and booleans are converted. Values without a
    /// scalar string form (`null`, arrays, objects) are returned unchanged.
    pub fn coerce(id: &Value) -> Value {
        Self::scalar_string(id)
            .map(Value::String)
            .unwrap_or_else(|| id.clone())
    }

    fn scalar_string(id: &Value) -> Option<String> {
        match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// A field value coerced to its declared type.
#[derive(Debug, Clone)]
pub enum FieldValue {
    String(String),
    /// A parsed number. `NaN` marks input that could not be parsed.
    Number(f64),
    Array(Vec<String>),
    /// A value of an undeclared-kind field, passed through untouched.
    Raw(Value),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[String]> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns `true` for a number that failed to parse.
    pub fn is_nan(&self) -> bool {
        matches!(self, FieldValue::Number(n) if n.is_nan())
    }

    /// Converts the value into JSON.
    ///
    /// Integral numbers become JSON integers; NaN and infinities become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Number(n) => number_to_json(*n),
            FieldValue::Array(items) => Value::Array(
                items
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
            FieldValue::Raw(value) => value.clone(),
        }
    }
}

// NaN never equals itself, so two unparsable numbers are treated as equal here
// to keep records comparable.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (FieldValue::Array(a), FieldValue::Array(b)) => a == b,
            (FieldValue::Raw(a), FieldValue::Raw(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Converts raw document values into the type declared for their field.
pub struct FieldCoercer;

impl FieldCoercer {
    /// Coerces `value` according to `field_type`.
    ///
    /// Array fields wrap the string form of the whole value into a single-element
    /// sequence; they do not distribute over the elements of an array value.
    pub fn coerce(field_type: FieldType, value: &Value) -> FieldValue {
        match field_type {
            FieldType::Array if is_empty(value) => FieldValue::Array(Vec::new()),
            FieldType::Array => FieldValue::Array(vec![string_form(value)]),
            FieldType::String => FieldValue::String(string_form(value)),
            FieldType::Number => FieldValue::Number(parse_number(value)),
            FieldType::Other => FieldValue::Raw(value.clone()),
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn parse_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_strings_pass_through() {
        assert_eq!(IdCoercer::coerce(&json!("abc-1")), json!("abc-1"));
    }

    #[test]
    fn id_scalars_are_stringified() {
        assert_eq!(IdCoercer::coerce(&json!(42)), json!("42"));
        assert_eq!(IdCoercer::coerce(&json!(1.5)), json!("1.5"));
        assert_eq!(IdCoercer::coerce(&json!(true)), json!("true"));
    }

    #[test]
    fn id_without_scalar_form_is_returned_unchanged() {
        assert_eq!(IdCoercer::coerce(&Value::Null), Value::Null);
        assert_eq!(IdCoercer::coerce(&json!({"a": 1})), json!({"a": 1}));
        assert_eq!(IdCoercer::coerce(&json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn array_fields_wrap_the_whole_value() {
        assert_eq!(
            FieldCoercer::coerce(FieldType::Array, &json!("red")),
            FieldValue::Array(vec!["red".to_string()])
        );
        // Multi-valued input is not distributed over the elements.
        assert_eq!(
            FieldCoercer::coerce(FieldType::Array, &json!(["red", "blue"])),
            FieldValue::Array(vec!["red,blue".to_string()])
        );
    }

    #[test]
    fn empty_array_fields_become_empty_sequences() {
        for value in [json!([]), json!(""), Value::Null] {
            assert_eq!(
                FieldCoercer::coerce(FieldType::Array, &value),
                FieldValue::Array(Vec::new())
            );
        }
    }

    #[test]
    fn string_fields_use_string_form() {
        assert_eq!(
            FieldCoercer::coerce(FieldType::String, &json!(12)),
            FieldValue::String("12".to_string())
        );
        assert_eq!(
            FieldCoercer::coerce(FieldType::String, &json!({"k": "v"})),
            FieldValue::String("{\"k\":\"v\"}".to_string())
        );
    }

    #[test]
    fn number_fields_parse_or_become_nan() {
        assert_eq!(FieldCoercer::coerce(FieldType::Number, &json!(" 3.25 ")).as_f64(), Some(3.25));
        assert_eq!(FieldCoercer::coerce(FieldType::Number, &json!(7)).as_f64(), Some(7.0));
        assert_eq!(FieldCoercer::coerce(FieldType::Number, &json!(true)).as_f64(), Some(1.0));
        assert!(FieldCoercer::coerce(FieldType::Number, &json!("abc")).is_nan());
        assert!(FieldCoercer::coerce(FieldType::Number, &json!([1])).is_nan());
    }

    #[test]
    fn other_fields_pass_through() {
        let value = json!({"nested": [1, 2]});
        assert_eq!(FieldCoercer::coerce(FieldType::Other, &value), FieldValue::Raw(value.clone()));
    }

    #[test]
    fn numbers_serialize_as_integers_when_integral() {
        assert_eq!(FieldValue::Number(3.0).to_json(), json!(3));
        assert_eq!(FieldValue::Number(2.5).to_json(), json!(2.5));
        assert_eq!(FieldValue::Number(f64::NAN).to_json(), Value::Null);
    }
}

//! Model schemas: declared field types and model definitions.
//!
//! A model is a named entity type with an ordered set of declared properties.
//! The connector only ever reads these definitions; they are registered once and
//! consulted whenever a raw document has to be turned into a [`ModelRecord`](crate::mapper::ModelRecord).

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

/// The declared type of a model property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Values are stored as their string form.
    String,
    /// Values are parsed as numbers; unparsable input becomes NaN.
    Number,
    /// Values are wrapped into a sequence of strings.
    Array,
    /// Values are passed through untouched.
    Other,
}

impl FieldType {
    /// Resolves a type name such as `"string"` or `"Number"`.
    ///
    /// Unknown names resolve to [`FieldType::Other`].
    pub fn from_type_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" => FieldType::String,
            "number" => FieldType::Number,
            "array" => FieldType::Array,
            _ => FieldType::Other,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Array => "array",
            FieldType::Other => "other",
        })
    }
}

/// Ordered mapping from property name to its declared [`FieldType`].
///
/// Declaration order is preserved and determines the field order of mapped records.
/// Declaring the same property twice replaces its type in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySchema {
    fields: Vec<(String, FieldType)>,
}

impl PropertySchema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declares a property, consuming and returning the schema for chaining.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.insert(name, field_type);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, field_type: FieldType) {
        let name = name.into();

        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, declared)) => *declared = field_type,
            None => self.fields.push((name, field_type)),
        }
    }

    /// Returns the declared type of a property, if it is declared.
    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, field_type)| *field_type)
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

    /// Iterates over the declared properties in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields
            .iter()
            .map(|(name, field_type)| (name.as_str(), *field_type))
    }
}

impl<S: Into<String>> FromIterator<(S, FieldType)> for PropertySchema {
    fn from_iter<I: IntoIterator<Item = (S, FieldType)>>(iter: I) -> Self {
        let mut schema = PropertySchema::new();
        for (name, field_type) in iter {
            schema.insert(name, field_type);
        }
        schema
    }
}

/// The name used for the identifier property when a definition does not specify one.
pub const DEFAULT_ID_NAME: &str = "id";

/// A named model type with its declared properties.
///
/// # Example
///
/// ```ignore
/// use searchlayer::schema::{FieldType, ModelDefinition, PropertySchema};
///
/// let user = ModelDefinition::new(
///     "User",
///     PropertySchema::new()
///         .field("id", FieldType::String)
///         .field("name", FieldType::String)
///         .field("tags", FieldType::Array),
/// );
/// assert_eq!(user.id_name(), "id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefinition {
    name: String,
    properties: PropertySchema,
    id_name: String,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, properties: PropertySchema) -> Self {
        Self {
            name: name.into(),
            properties,
            id_name: DEFAULT_ID_NAME.to_string(),
        }
    }

    /// Overrides the identifier property name.
    pub fn with_id_name(mut self, id_name: impl Into<String>) -> Self {
        self.id_name = id_name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &PropertySchema {
        &self.properties
    }

    pub fn id_name(&self) -> &str {
        &self.id_name
    }
}

/// A Rust type that can be persisted through the connector.
///
/// Usually implemented with `#[derive(Model)]`, which infers the property schema
/// from the struct's fields.
///
/// Records only carry fields with a truthy value, so fields that may be zero,
/// `false` or empty should be `Option`s or carry `#[serde(default)]`.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Returns the model's name (the backend document type).
    fn model_name() -> &'static str;

    /// Returns the model's full definition.
    fn definition() -> ModelDefinition;
}

//! Request and response types exchanged with search backends.
//!
//! These mirror the request shapes of the search engine's document API: every
//! request names an optional index and the document type (the model name).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A search, count or delete-by-query request produced by the
/// [`FilterTranslator`](crate::translator::FilterTranslator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    /// Query DSL body; `None` means "match all".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl QueryRequest {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            index: None,
            type_name: type_name.into(),
            size: None,
            from: None,
            body: None,
        }
    }

    /// Resolves the index the request targets.
    pub fn target_index(&self) -> String {
        target_index(self.index.as_deref(), &self.type_name)
    }
}

/// Request to store a document, replacing any document with the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Document id; the backend generates one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub body: Value,
    #[serde(default)]
    pub refresh: bool,
}

impl IndexRequest {
    pub fn target_index(&self) -> String {
        target_index(self.index.as_deref(), &self.type_name)
    }
}

/// Request addressing a single document by id (get, exists, delete).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
    #[serde(default)]
    pub refresh: bool,
}

impl DocumentRequest {
    pub fn target_index(&self) -> String {
        target_index(self.index.as_deref(), &self.type_name)
    }
}

/// Outcome of an [`IndexRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResponse {
    /// The id the document was stored under.
    pub id: String,
    /// `true` when a new document was created, `false` when one was replaced.
    pub created: bool,
}

/// The configured index, or the lower-cased type name when no index is configured.
pub fn target_index(index: Option<&str>, type_name: &str) -> String {
    index
        .map(str::to_string)
        .unwrap_or_else(|| type_name.to_lowercase())
}

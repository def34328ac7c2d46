//! Keeps models apart when several of them share one index.
//!
//! Documents written to a shared index carry their model name in
//! [`TYPE_FIELD`] and are stored under `{type}_{id}`. Every query against the
//! index is filtered on that field.

use serde_json::{Value, json};

/// Source field holding the model name of documents in a shared index.
pub const TYPE_FIELD: &str = "searchlayer_type";

/// The model a request is scoped to inside a shared index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeScope<'a> {
    type_name: &'a str,
}

impl<'a> TypeScope<'a> {
    /// Scope for a request, or `None` when the model has its own index.
    pub fn for_request(index: Option<&str>, type_name: &'a str) -> Option<Self> {
        index.map(|_| Self { type_name })
    }

    pub fn type_name(&self) -> &str {
        self.type_name
    }

    /// Document id the engine stores the record under.
    pub fn document_id(&self, id: &str) -> String {
        format!("{}_{}", self.type_name, id)
    }

    /// Record id for a stored document id; ids of other models are kept as-is.
    pub fn local_id<'b>(&self, document_id: &'b str) -> &'b str {
        document_id
            .strip_prefix(self.type_name)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(document_id)
    }

    /// Marks a document body with the model name.
    pub fn tag(&self, mut body: Value) -> Value {
        if let Some(document) = body.as_object_mut() {
            document.insert(TYPE_FIELD.to_string(), Value::String(self.type_name.to_string()));
        }
        body
    }

    /// Wraps the query of a search body in a filter on the model name.
    ///
    /// Other top-level keys (`sort`, `_source`, ...) are kept.
    pub fn restrict(&self, body: Value) -> Value {
        let Value::Object(mut body) = body else {
            return body;
        };

        let query = body
            .remove("query")
            .unwrap_or_else(|| json!({ "match_all": {} }));

        body.insert(
            "query".to_string(),
            json!({
                "bool": {
                    "must": [query],
                    "filter": [{ "term": { TYPE_FIELD: self.type_name } }],
                }
            }),
        );

        Value::Object(body)
    }

    /// Turns a stored hit back into the record's view: local `_id`, untagged `_source`.
    pub fn untag_hit(&self, hit: &mut Value) {
        let Some(hit) = hit.as_object_mut() else {
            return;
        };

        if let Some(Value::String(id)) = hit.get("_id") {
            let local = self.local_id(id).to_string();
            hit.insert("_id".to_string(), Value::String(local));
        }

        if let Some(Value::Object(source)) = hit.get_mut("_source") {
            source.remove(TYPE_FIELD);
        }
    }

    /// Applies [`untag_hit`](Self::untag_hit) to every hit of a search response.
    pub fn untag_hits(&self, response: &mut Value) {
        if let Some(Value::Array(hits)) = response.pointer_mut("/hits/hits") {
            hits.iter_mut().for_each(|hit| self.untag_hit(hit));
        }
    }
}

/// Mapping that makes [`TYPE_FIELD`] an exact-match keyword.
pub fn type_field_mapping() -> Value {
    json!({ "properties": { TYPE_FIELD: { "type": "keyword" } } })
}

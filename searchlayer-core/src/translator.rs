//! Translation of [`Criteria`] into backend [`QueryRequest`]s.
//!
//! Translation is a pure function of its inputs: it performs no I/O, holds no
//! mutable state and yields structurally identical requests for identical
//! arguments.
//!
//! # Query shape
//!
//! A `where` clause becomes a boolean conjunction of `match` clauses, one per
//! field, in the clause's own order:
//!
//! ```json
//! { "query": { "bool": { "must": [ { "match": { "a": 1 } }, { "match": { "b": "x" } } ] } } }
//! ```
//!
//! Only scalar `where` values translate; operator objects such as
//! `{ "gt": 5 }` are ignored. A native query is used as the body verbatim.
//! Ordering, projection, ranges and disjunctions have no translated form and
//! must go through the native query.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    criteria::{Criteria, WhereClause},
    request::QueryRequest,
};

/// Settings that shape every translated request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorSettings {
    /// Shared search index for all models; when unset each model uses its own.
    #[serde(default)]
    pub index: Option<String>,
    /// Page size used when a caller asks for a size below one.
    #[serde(default)]
    pub default_size: Option<u64>,
}

/// Builds backend query requests from criteria.
#[derive(Debug, Clone, Default)]
pub struct FilterTranslator {
    settings: TranslatorSettings,
}

impl FilterTranslator {
    pub fn new(settings: TranslatorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TranslatorSettings {
        &self.settings
    }

    /// Returns the request every translation starts from: the model's type and,
    /// if configured, the shared index.
    pub fn defaults(&self, model: &str) -> QueryRequest {
        QueryRequest {
            index: self.settings.index.clone(),
            ..QueryRequest::new(model)
        }
    }

    /// Translates criteria and pagination into a query request.
    ///
    /// * `size` - a value of at least one is used as-is; a value below one falls
    ///   back to the configured default page size, or to no size at all.
    /// * `offset` - only a positive offset produces a `from`.
    pub fn translate(
        &self,
        model: &str,
        criteria: Option<&Criteria>,
        size: Option<i64>,
        offset: Option<i64>,
    ) -> QueryRequest {
        let mut request = self.defaults(model);

        if let Some(size) = size {
            request.size = match u64::try_from(size) {
                Ok(size) if size >= 1 => Some(size),
                _ => self.settings.default_size,
            };
        }

        if let Some(offset) = offset.filter(|offset| *offset > 0) {
            request.from = Some(offset as u64);
        }

        request.body = criteria.and_then(Self::body);
        request
    }

    fn body(criteria: &Criteria) -> Option<Value> {
        if let Some(native) = &criteria.native {
            return Some(native.clone());
        }

        criteria
            .where_clause
            .as_ref()
            .map(Self::conjunction)
    }

    /// Only scalar values translate; operator objects, lists and nulls are skipped.
    fn conjunction(where_clause: &WhereClause) -> Value {
        let must = where_clause
            .iter()
            .filter(|(field, value)| {
                let scalar = matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_));
                if !scalar {
                    tracing::debug!(field = %field, value = %value, "Ignoring non-scalar where condition");
                }
                scalar
            })
            .map(|(field, value)| json!({ "match": { field.as_str(): value } }))
            .collect::<Vec<_>>();

        json!({ "query": { "bool": { "must": must } } })
    }
}

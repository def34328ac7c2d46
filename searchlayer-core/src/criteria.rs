//! Caller-supplied query criteria.
//!
//! A [`Criteria`] is either an opaque native query, passed to the backend
//! verbatim, or a `where` mapping interpreted as a conjunction of equality
//! matches. Pagination travels alongside as `limit`/`skip`.
//!
//! Criteria deserialize from the usual ORM filter shape. Keys the connector does
//! not understand (`order`, `fields`, `include`, ...) are accepted and ignored:
//!
//! ```ignore
//! use searchlayer::criteria::Criteria;
//!
//! let criteria: Criteria = serde_json::from_value(serde_json::json!({
//!     "where": { "status": "active", "role": "admin" },
//!     "limit": 10,
//!     "order": "name ASC"
//! }))?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An equality `where` clause; iteration order is insertion order.
pub type WhereClause = Map<String, Value>;

/// A structured request for documents of one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    /// A query already expressed in the backend's query DSL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<Value>,
    /// Field/value pairs that must all match.
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<WhereClause>,
    /// Maximum number of documents to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Number of documents to skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new criteria builder for fluent construction.
    pub fn builder() -> CriteriaBuilder {
        CriteriaBuilder::new()
    }

    /// Creates criteria holding only a `where` clause.
    pub fn from_where(where_clause: WhereClause) -> Self {
        Self {
            where_clause: Some(where_clause),
            ..Self::default()
        }
    }

    /// Creates criteria holding only a native backend query.
    pub fn from_native(native: Value) -> Self {
        Self {
            native: Some(native),
            ..Self::default()
        }
    }
}

/// Builder for [`Criteria`].
///
/// # Example
///
/// ```ignore
/// use searchlayer::criteria::Criteria;
///
/// let criteria = Criteria::builder()
///     .where_eq("status", "active")
///     .where_eq("age", 30)
///     .limit(10)
///     .skip(20)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct CriteriaBuilder {
    criteria: Criteria,
}

impl CriteriaBuilder {
    pub fn new() -> Self {
        CriteriaBuilder { criteria: Criteria::default() }
    }

    /// Sets a native query; it takes precedence over any `where` clause.
    pub fn native(mut self, native: Value) -> Self {
        self.criteria.native = Some(native);
        self
    }

    /// Appends an equality match to the `where` clause.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria
            .where_clause
            .get_or_insert_with(Map::new)
            .insert(field.into(), value.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.criteria.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.criteria.skip = Some(skip);
        self
    }

    pub fn build(self) -> Criteria {
        self.criteria
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_filter_and_ignores_unknown_keys() {
        let criteria: Criteria = serde_json::from_value(json!({
            "where": {"b": "x", "a": 1},
            "limit": 5,
            "skip": 10,
            "order": "name ASC",
            "fields": {"name": true}
        }))
        .unwrap();

        let keys = criteria
            .where_clause
            .as_ref()
            .unwrap()
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(criteria.limit, Some(5));
        assert_eq!(criteria.skip, Some(10));
        assert!(criteria.native.is_none());
    }

    #[test]
    fn builder_appends_in_order() {
        let criteria = Criteria::builder()
            .where_eq("a", 1)
            .where_eq("b", "x")
            .limit(3)
            .build();

        assert_eq!(
            serde_json::to_value(&criteria).unwrap(),
            json!({"where": {"a": 1, "b": "x"}, "limit": 3})
        );
    }
}

//! Query DSL evaluation for in-memory document filtering.
//!
//! Supports the subset of the search engine's query DSL that the connector
//! produces: `match_all`, `match`, `term`, and `bool` with `must`, `filter` and
//! `must_not`. Any other clause is rejected rather than silently matched.

use std::collections::HashMap;
use serde_json::Value;

use searchlayer_core::error::{SearchLayerError, SearchLayerResult};


/// Comparable representation of JSON values.
///
/// Normalizes all numbers to f64 so that `1` and `1.0` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => value
                .as_f64()
                .map(Comparable::Number)
                .unwrap_or(Comparable::Null),
            Value::String(value) => Comparable::String(value),
            Value::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Value::Object(map) => Comparable::Map(
                map
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Loose equality used by `match`: strings compare case-insensitively and a
    /// numeric string matches the number it spells.
    fn matches(&self, other: &Comparable<'a>) -> bool {
        match (self, other) {
            (Comparable::String(a), Comparable::String(b)) => a.to_lowercase() == b.to_lowercase(),
            (Comparable::String(a), Comparable::Number(b)) | (Comparable::Number(b), Comparable::String(a)) => {
                a.trim().parse::<f64>().is_ok_and(|a| a == *b)
            }
            (Comparable::Bool(a), Comparable::String(b)) | (Comparable::String(b), Comparable::Bool(a)) => {
                b.eq_ignore_ascii_case(if *a { "true" } else { "false" })
            }
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            _ => false,
        }
    }
}


/// A parsed query clause.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Clause {
    MatchAll,
    Match(String, Value),
    Term(String, Value),
    Bool {
        must: Vec<Clause>,
        must_not: Vec<Clause>,
    },
}

impl Clause {
    /// Parses a request body. A missing body or a body without `query` matches all.
    pub fn from_body(body: Option<&Value>) -> SearchLayerResult<Clause> {
        match body.and_then(|body| body.get("query")) {
            Some(query) => Self::parse(query),
            None => Ok(Clause::MatchAll),
        }
    }

    fn parse(query: &Value) -> SearchLayerResult<Clause> {
        let object = query
            .as_object()
            .filter(|object| object.len() == 1)
            .ok_or_else(|| unsupported(query))?;

        match object.iter().next() {
            Some((kind, _)) if kind == "match_all" => Ok(Clause::MatchAll),
            Some((kind, body)) if kind == "match" => {
                let (field, value) = Self::field_value(body, "query").ok_or_else(|| unsupported(query))?;
                Ok(Clause::Match(field, value))
            }
            Some((kind, body)) if kind == "term" => {
                let (field, value) = Self::field_value(body, "value").ok_or_else(|| unsupported(query))?;
                Ok(Clause::Term(field, value))
            }
            Some((kind, body)) if kind == "bool" => {
                let mut must = Self::parse_list(body.get("must"))?;
                must.extend(Self::parse_list(body.get("filter"))?);

                Ok(Clause::Bool {
                    must,
                    must_not: Self::parse_list(body.get("must_not"))?,
                })
            }
            _ => Err(unsupported(query)),
        }
    }

    fn parse_list(clauses: Option<&Value>) -> SearchLayerResult<Vec<Clause>> {
        match clauses {
            None => Ok(Vec::new()),
            Some(Value::Array(clauses)) => clauses
                .iter()
                .map(Self::parse)
                .collect(),
            Some(clause) => Ok(vec![Self::parse(clause)?]),
        }
    }

    /// Reads `{ field: value }` or `{ field: { <key>: value } }`.
    fn field_value(body: &Value, key: &str) -> Option<(String, Value)> {
        let (field, value) = body
            .as_object()
            .filter(|object| object.len() == 1)?
            .iter()
            .next()?;

        let value = match value {
            Value::Object(options) => options.get(key)?.clone(),
            value => value.clone(),
        };

        Some((field.clone(), value))
    }
}

fn unsupported(query: &Value) -> SearchLayerError {
    SearchLayerError::Backend(format!("Unsupported query clause: {}", query))
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Value,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Value) -> Self {
        Self { document }
    }

    pub fn evaluate(&self, clause: &Clause) -> bool {
        match clause {
            Clause::MatchAll => true,
            Clause::Match(field, value) => self.any_field_value(field, |candidate| {
                Comparable::from(candidate).matches(&Comparable::from(value))
            }),
            Clause::Term(field, value) => self.any_field_value(field, |candidate| {
                Comparable::from(candidate) == Comparable::from(value)
            }),
            Clause::Bool { must, must_not } => {
                must.iter().all(|clause| self.evaluate(clause))
                    && !must_not.iter().any(|clause| self.evaluate(clause))
            }
        }
    }

    /// Applies `predicate` to the field's value, or to each element when the field
    /// holds an array.
    fn any_field_value(&self, field: &str, predicate: impl Fn(&Value) -> bool) -> bool {
        match self.lookup(field) {
            Some(Value::Array(items)) => items.iter().any(predicate),
            Some(value) => predicate(value),
            None => false,
        }
    }

    /// Resolves a possibly dotted field path.
    fn lookup(&self, field: &str) -> Option<&'a Value> {
        field
            .split('.')
            .try_fold(self.document, |value, segment| value.get(segment))
    }
}

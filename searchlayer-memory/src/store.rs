//! In-memory search backend.
//!
//! Documents live in per-index vectors guarded by async-aware read-write locks,
//! and answer in the same response shapes as the search engine.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::{Value, json};
use uuid::Uuid;

use searchlayer_core::{
    backend::{SearchBackend, SearchBackendBuilder},
    error::SearchLayerResult,
    request::{DocumentRequest, IndexRequest, IndexResponse, QueryRequest},
};

use crate::evaluator::{Clause, DocumentEvaluator};

/// Page size applied to searches that do not specify one, as the search engine does.
pub const DEFAULT_SEARCH_SIZE: u64 = 10;

#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    type_name: String,
    source: Value,
}

type IndexMap = HashMap<String, Vec<StoredDocument>>;


/// Thread-safe in-memory search backend.
///
/// Cloneable; clones share the same underlying data. Every index keeps its
/// documents in insertion order and remembers each document's type, so several
/// models can share a single index. Queries scan all documents of an index.
///
/// # Example
///
/// ```ignore
/// use searchlayer_memory::InMemorySearch;
/// use searchlayer::prelude::*;
///
/// let connector = Connector::new(InMemorySearch::new(), ConnectorSettings::default());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemorySearch {
    /// index name -> documents
    indices: Arc<RwLock<IndexMap>>,
}

impl InMemorySearch {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self {
            indices: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    pub fn builder() -> InMemorySearchBuilder {
        InMemorySearchBuilder::default()
    }

    /// Lists the names of all indices that hold or have held documents.
    pub async fn list_indices(&self) -> Vec<String> {
        let mut names = self.indices
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Returns the documents of `type_name` in `index` that match the request body.
    fn matching<'a>(
        documents: &'a [StoredDocument],
        type_name: &'a str,
        clause: &'a Clause,
    ) -> impl Iterator<Item = &'a StoredDocument> + 'a {
        documents
            .iter()
            .filter(move |doc| doc.type_name == type_name)
            .filter(move |doc| DocumentEvaluator::new(&doc.source).evaluate(clause))
    }
}


#[async_trait]
impl SearchBackend for InMemorySearch {
    async fn ping(&self) -> SearchLayerResult<()> {
        Ok(())
    }

    async fn index_document(&self, request: IndexRequest) -> SearchLayerResult<IndexResponse> {
        let index = request.target_index();
        let id = request.id.unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        let mut indices = self.indices.write().await;
        let documents = indices
            .entry(index.clone())
            .or_default();

        let created = match documents
            .iter_mut()
            .find(|doc| doc.id == id && doc.type_name == request.type_name)
        {
            Some(existing) => {
                existing.source = request.body;
                false
            }
            None => {
                documents.push(StoredDocument {
                    id: id.clone(),
                    type_name: request.type_name,
                    source: request.body,
                });
                true
            }
        };

        tracing::trace!(index = %index, id = %id, created, "Indexed document in memory");

        Ok(IndexResponse { id, created })
    }

    async fn get_document(&self, request: DocumentRequest) -> SearchLayerResult<Value> {
        let index = request.target_index();
        let indices = self.indices.read().await;

        let found = indices
            .get(&index)
            .and_then(|documents| documents
                .iter()
                .find(|doc| doc.id == request.id && doc.type_name == request.type_name)
            );

        Ok(match found {
            Some(doc) => json!({
                "_index": index,
                "_id": doc.id,
                "found": true,
                "_source": doc.source,
            }),
            None => json!({
                "_index": index,
                "_id": request.id,
                "found": false,
            }),
        })
    }

    async fn document_exists(&self, request: DocumentRequest) -> SearchLayerResult<bool> {
        Ok(
            self.indices
                .read()
                .await
                .get(&request.target_index())
                .is_some_and(|documents| documents
                    .iter()
                    .any(|doc| doc.id == request.id && doc.type_name == request.type_name)
                )
        )
    }

    async fn delete_document(&self, request: DocumentRequest) -> SearchLayerResult<bool> {
        let mut indices = self.indices.write().await;

        let documents = match indices.get_mut(&request.target_index()) {
            Some(documents) => documents,
            None => return Ok(false),
        };

        let before = documents.len();
        documents.retain(|doc| !(doc.id == request.id && doc.type_name == request.type_name));

        Ok(documents.len() < before)
    }

    async fn search(&self, request: QueryRequest) -> SearchLayerResult<Value> {
        let index = request.target_index();
        let clause = Clause::from_body(request.body.as_ref())?;
        let indices = self.indices.read().await;

        let matched = match indices.get(&index) {
            Some(documents) => Self::matching(documents, &request.type_name, &clause).collect::<Vec<_>>(),
            None => Vec::new(),
        };

        let hits = matched
            .iter()
            .skip(request.from.unwrap_or(0) as usize)
            .take(request.size.unwrap_or(DEFAULT_SEARCH_SIZE) as usize)
            .map(|doc| json!({
                "_index": index,
                "_id": doc.id,
                "_score": 1.0,
                "_source": doc.source,
            }))
            .collect::<Vec<_>>();

        Ok(json!({
            "took": 0,
            "timed_out": false,
            "hits": {
                "total": { "value": matched.len(), "relation": "eq" },
                "max_score": if hits.is_empty() { Value::Null } else { json!(1.0) },
                "hits": hits,
            }
        }))
    }

    async fn count(&self, request: QueryRequest) -> SearchLayerResult<u64> {
        let clause = Clause::from_body(request.body.as_ref())?;
        let indices = self.indices.read().await;

        Ok(
            indices
                .get(&request.target_index())
                .map(|documents| Self::matching(documents, &request.type_name, &clause).count() as u64)
                .unwrap_or(0)
        )
    }

    async fn delete_by_query(&self, request: QueryRequest) -> SearchLayerResult<u64> {
        let clause = Clause::from_body(request.body.as_ref())?;
        let mut indices = self.indices.write().await;

        let documents = match indices.get_mut(&request.target_index()) {
            Some(documents) => documents,
            None => return Ok(0),
        };

        let before = documents.len();
        documents.retain(|doc| {
            doc.type_name != request.type_name || !DocumentEvaluator::new(&doc.source).evaluate(&clause)
        });

        Ok((before - documents.len()) as u64)
    }
}


/// Builder for constructing [`InMemorySearch`] instances.
///
/// # Example
///
/// ```ignore
/// use searchlayer_memory::InMemorySearch;
/// use searchlayer::backend::SearchBackendBuilder;
///
/// let backend = InMemorySearch::builder().build().await.unwrap();
/// ```
#[derive(Default)]
pub struct InMemorySearchBuilder;

#[async_trait]
impl SearchBackendBuilder for InMemorySearchBuilder {
    type Backend = InMemorySearch;

    /// Builds a freshly initialized, empty backend. Always succeeds.
    async fn build(self) -> SearchLayerResult<Self::Backend> {
        Ok(InMemorySearch::new())
    }
}

//! Search backend abstraction.
//!
//! This module defines the seam between the [`Connector`](crate::connector::Connector)
//! and the search engine. A backend executes requests built by the connector and
//! answers with the engine's raw response shapes; transport, connection pooling
//! and retries are entirely the backend's business.
//!
//! # Traits
//!
//! - [`SearchBackend`]: The core trait for search backends
//! - [`DynSearchBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`SearchBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Response shapes
//!
//! [`SearchBackend::get_document`] answers with
//! `{ "_id": ..., "found": bool, "_source": {...} }` and [`SearchBackend::search`]
//! with `{ "hits": { "total": ..., "hits": [ { "_id": ..., "_source": {...} }, ... ] } }`.

use async_trait::async_trait;
use serde_json::Value;
use std::{any::Any, fmt::Debug};

use crate::{
    error::SearchLayerResult,
    request::{DocumentRequest, IndexRequest, IndexResponse, QueryRequest},
};

/// Abstract interface for document search backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from
/// multiple async tasks.
///
/// # Index resolution
///
/// Every request carries an optional index and the model's type name; backends
/// target the given index or, if absent, the lower-cased type name (see
/// [`QueryRequest::target_index`]).
#[async_trait]
pub trait SearchBackend: Send + Sync + Debug {
    /// Checks that the backend is reachable.
    async fn ping(&self) -> SearchLayerResult<()>;

    /// Stores a document, replacing any document with the same id.
    ///
    /// When the request carries no id the backend generates one.
    async fn index_document(&self, request: IndexRequest) -> SearchLayerResult<IndexResponse>;

    /// Fetches a single document.
    ///
    /// A missing document is not an error: the response reports `"found": false`.
    async fn get_document(&self, request: DocumentRequest) -> SearchLayerResult<Value>;

    /// Checks whether a document exists.
    async fn document_exists(&self, request: DocumentRequest) -> SearchLayerResult<bool>;

    /// Deletes a document, returning whether it existed.
    async fn delete_document(&self, request: DocumentRequest) -> SearchLayerResult<bool>;

    /// Runs a search. A request without a body matches every document of its type.
    async fn search(&self, request: QueryRequest) -> SearchLayerResult<Value>;

    /// Counts matching documents. Pagination fields are ignored.
    async fn count(&self, request: QueryRequest) -> SearchLayerResult<u64>;

    /// Deletes matching documents, returning how many were deleted.
    /// Pagination fields are ignored.
    async fn delete_by_query(&self, request: QueryRequest) -> SearchLayerResult<u64>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> SearchLayerResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait DynSearchBackend: Send + Sync + Debug {
    async fn ping(&self) -> SearchLayerResult<()>;
    async fn index_document(&self, request: IndexRequest) -> SearchLayerResult<IndexResponse>;
    async fn get_document(&self, request: DocumentRequest) -> SearchLayerResult<Value>;
    async fn document_exists(&self, request: DocumentRequest) -> SearchLayerResult<bool>;
    async fn delete_document(&self, request: DocumentRequest) -> SearchLayerResult<bool>;
    async fn search(&self, request: QueryRequest) -> SearchLayerResult<Value>;
    async fn count(&self, request: QueryRequest) -> SearchLayerResult<u64>;
    async fn delete_by_query(&self, request: QueryRequest) -> SearchLayerResult<u64>;
    async fn shutdown_boxed(self: Box<Self>) -> SearchLayerResult<()>;

    /// Exposes the concrete backend for downcasting.
    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<B: SearchBackend + 'static> DynSearchBackend for B {
    async fn ping(&self) -> SearchLayerResult<()> {
        SearchBackend::ping(self).await
    }

    async fn index_document(&self, request: IndexRequest) -> SearchLayerResult<IndexResponse> {
        SearchBackend::index_document(self, request).await
    }

    async fn get_document(&self, request: DocumentRequest) -> SearchLayerResult<Value> {
        SearchBackend::get_document(self, request).await
    }

    async fn document_exists(&self, request: DocumentRequest) -> SearchLayerResult<bool> {
        SearchBackend::document_exists(self, request).await
    }

    async fn delete_document(&self, request: DocumentRequest) -> SearchLayerResult<bool> {
        SearchBackend::delete_document(self, request).await
    }

    async fn search(&self, request: QueryRequest) -> SearchLayerResult<Value> {
        SearchBackend::search(self, request).await
    }

    async fn count(&self, request: QueryRequest) -> SearchLayerResult<u64> {
        SearchBackend::count(self, request).await
    }

    async fn delete_by_query(&self, request: QueryRequest) -> SearchLayerResult<u64> {
        SearchBackend::delete_by_query(self, request).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> SearchLayerResult<()> {
        SearchBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Lets a boxed dynamic backend drive a [`Connector`](crate::connector::Connector).
#[async_trait]
impl SearchBackend for Box<dyn DynSearchBackend> {
    async fn ping(&self) -> SearchLayerResult<()> {
        DynSearchBackend::ping(&**self).await
    }

    async fn index_document(&self, request: IndexRequest) -> SearchLayerResult<IndexResponse> {
        DynSearchBackend::index_document(&**self, request).await
    }

    async fn get_document(&self, request: DocumentRequest) -> SearchLayerResult<Value> {
        DynSearchBackend::get_document(&**self, request).await
    }

    async fn document_exists(&self, request: DocumentRequest) -> SearchLayerResult<bool> {
        DynSearchBackend::document_exists(&**self, request).await
    }

    async fn delete_document(&self, request: DocumentRequest) -> SearchLayerResult<bool> {
        DynSearchBackend::delete_document(&**self, request).await
    }

    async fn search(&self, request: QueryRequest) -> SearchLayerResult<Value> {
        DynSearchBackend::search(&**self, request).await
    }

    async fn count(&self, request: QueryRequest) -> SearchLayerResult<u64> {
        DynSearchBackend::count(&**self, request).await
    }

    async fn delete_by_query(&self, request: QueryRequest) -> SearchLayerResult<u64> {
        DynSearchBackend::delete_by_query(&**self, request).await
    }

    async fn shutdown(self) -> SearchLayerResult<()> {
        self.shutdown_boxed().await
    }
}

#[async_trait]
pub trait SearchBackendBuilder {
    type Backend: SearchBackend;

    async fn build(self) -> SearchLayerResult<Self::Backend>;
}

//! The connector: ORM-style data access over a search backend.
//!
//! A [`Connector`] owns exactly one backend handle together with its settings and
//! the definitions of the models it serves. It turns create/read/update/delete and
//! query calls into backend requests (via the [`FilterTranslator`] for queries)
//! and maps raw responses back into [`ModelRecord`]s (via the [`ModelMapper`]).
//!
//! # Example
//!
//! ```ignore
//! use searchlayer::prelude::*;
//! use searchlayer::memory::InMemorySearch;
//! use serde_json::json;
//!
//! let connector = Connector::new(InMemorySearch::new(), ConnectorSettings::default());
//! connector.define(ModelDefinition::new(
//!     "User",
//!     PropertySchema::new()
//!         .field("id", FieldType::String)
//!         .field("name", FieldType::String),
//! )).await;
//! connector.connect().await?;
//!
//! let id = connector.create("User", json!({ "name": "Alice" })).await?;
//! let alice = connector.find("User", id).await?;
//! ```

use mea::{mutex::Mutex, rwlock::RwLock};
use serde_json::Value;
use std::{collections::HashMap, fmt, marker::PhantomData};

use crate::{
    backend::{DynSearchBackend, SearchBackend},
    coerce::IdCoercer,
    config::ConnectorSettings,
    criteria::{Criteria, WhereClause},
    error::{SearchLayerError, SearchLayerResult},
    mapper::{ModelMapper, ModelRecord},
    request::{DocumentRequest, IndexRequest},
    schema::{Model, ModelDefinition},
    translator::FilterTranslator,
};

/// Data access to one search backend for a set of models.
pub struct Connector<B: SearchBackend> {
    backend: B,
    settings: ConnectorSettings,
    translator: FilterTranslator,
    models: RwLock<HashMap<String, ModelDefinition>>,
    connected: Mutex<bool>,
}

impl<B: SearchBackend> fmt::Debug for Connector<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("backend", &self.backend)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<B: SearchBackend> Connector<B> {
    /// Creates a connector over the given backend.
    ///
    /// No request is made until [`connect`](Self::connect) or the first operation.
    pub fn new(backend: B, settings: ConnectorSettings) -> Self {
        Self {
            translator: FilterTranslator::new(settings.translator_settings()),
            backend,
            settings,
            models: RwLock::new(HashMap::new()),
            connected: Mutex::new(false),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    pub fn translator(&self) -> &FilterTranslator {
        &self.translator
    }

    /// Registers a model definition, replacing any previous one of the same name.
    pub async fn define(&self, definition: ModelDefinition) {
        tracing::debug!(model = definition.name(), fields = definition.properties().len(), "Defining model");

        self.models
            .write()
            .await
            .insert(definition.name().to_string(), definition);
    }

    /// Registers the definition of a [`Model`] type.
    pub async fn define_model<M: Model>(&self) {
        self.define(M::definition()).await
    }

    /// Returns the definition registered under `model`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchLayerError::ModelNotFound`] for an unknown model.
    pub async fn definition(&self, model: &str) -> SearchLayerResult<ModelDefinition> {
        self.models
            .read()
            .await
            .get(model)
            .cloned()
            .ok_or_else(|| SearchLayerError::ModelNotFound(model.to_string()))
    }

    /// Verifies the backend is reachable.
    ///
    /// Only the first successful call pings the backend; concurrent callers wait
    /// for it and later calls return immediately.
    pub async fn connect(&self) -> SearchLayerResult<()> {
        let mut connected = self.connected.lock().await;

        if *connected {
            return Ok(());
        }

        self.backend.ping().await?;
        *connected = true;

        tracing::info!(hosts = ?self.settings.hosts, "Connected to search backend");

        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.lock().await
    }

    /// Pings the backend regardless of connection state.
    pub async fn ping(&self) -> SearchLayerResult<()> {
        self.backend.ping().await
    }

    /// Shuts the backend down, consuming the connector.
    pub async fn disconnect(self) -> SearchLayerResult<()> {
        self.backend.shutdown().await?;

        tracing::info!("Disconnected from search backend");

        Ok(())
    }

    /// Stores a new document and returns its id.
    ///
    /// The id field is taken out of `data`; when it is absent the backend
    /// generates an id.
    ///
    /// # Errors
    ///
    /// Fails when the model is unknown, `data` is not a JSON object, the id has no
    /// scalar string form, or the backend request fails.
    pub async fn create(&self, model: &str, data: Value) -> SearchLayerResult<String> {
        let definition = self.definition(model).await?;
        self.create_with(&definition, data).await
    }

    /// Replaces a stored document entirely. `data` must carry the id.
    pub async fn save(&self, model: &str, data: Value) -> SearchLayerResult<()> {
        let definition = self.definition(model).await?;
        self.save_with(&definition, data).await
    }

    /// Replaces the document when `data` carries an id, creates it otherwise.
    ///
    /// Returns the record as it maps back from the stored data.
    pub async fn update_or_create(&self, model: &str, data: Value) -> SearchLayerResult<ModelRecord> {
        let definition = self.definition(model).await?;
        let (id, body) = Self::split_document(&definition, data)?;

        let response = self
            .backend
            .index_document(self.index_request(&definition, id, body.clone()))
            .await?;

        tracing::debug!(model, id = %response.id, created = response.created, "Upserted document");

        Self::record_from_source(&definition, body, &response.id).ok_or_else(|| {
            SearchLayerError::InvalidDocument(format!("Stored {} document {} cannot be mapped", model, response.id))
        })
    }

    /// Partial updates are not supported.
    ///
    /// Whether changed attributes should be merged into the stored document or
    /// replace it is undefined, so this always fails with
    /// [`SearchLayerError::Unsupported`]. Use [`save`](Self::save) for a full
    /// replacement.
    pub async fn update_attributes(
        &self,
        model: &str,
        _id: impl Into<Value>,
        _data: Value,
    ) -> SearchLayerResult<ModelRecord> {
        Err(SearchLayerError::Unsupported(format!("update_attributes on model {}", model)))
    }

    pub async fn exists(&self, model: &str, id: impl Into<Value>) -> SearchLayerResult<bool> {
        let definition = self.definition(model).await?;
        self.exists_with(&definition, &id.into()).await
    }

    /// Fetches a document by id; `Ok(None)` means there is no readable document.
    pub async fn find(&self, model: &str, id: impl Into<Value>) -> SearchLayerResult<Option<ModelRecord>> {
        let definition = self.definition(model).await?;
        self.find_with(&definition, &id.into()).await
    }

    /// Deletes a document by id, returning whether it existed.
    pub async fn destroy(&self, model: &str, id: impl Into<Value>) -> SearchLayerResult<bool> {
        let definition = self.definition(model).await?;
        self.destroy_with(&definition, &id.into()).await
    }

    /// Returns all records matching the criteria.
    ///
    /// `criteria.limit` and `criteria.skip` paginate the search. Documents that
    /// cannot be mapped are skipped.
    pub async fn all(&self, model: &str, criteria: Option<&Criteria>) -> SearchLayerResult<Vec<ModelRecord>> {
        let definition = self.definition(model).await?;
        self.all_with(&definition, criteria).await
    }

    /// Deletes every document matching the `where` clause (all documents of the
    /// model when `None`), returning how many were deleted.
    pub async fn destroy_all(&self, model: &str, where_clause: Option<&WhereClause>) -> SearchLayerResult<u64> {
        let definition = self.definition(model).await?;
        let request = self.translator.translate(
            definition.name(),
            Self::where_criteria(where_clause).as_ref(),
            None,
            None,
        );

        let deleted = self.backend.delete_by_query(request).await?;

        tracing::debug!(model, deleted, "Deleted matching documents");

        Ok(deleted)
    }

    /// Counts documents matching the `where` clause (all documents when `None`).
    pub async fn count(&self, model: &str, where_clause: Option<&WhereClause>) -> SearchLayerResult<u64> {
        let definition = self.definition(model).await?;
        self.count_with(&definition, where_clause).await
    }

    /// Returns a typed handle for a [`Model`] type.
    ///
    /// The handle uses `M`'s own definition and does not require
    /// [`define_model`](Self::define_model).
    pub fn model<M: Model>(&self) -> ModelHandle<'_, B, M> {
        ModelHandle::new(self)
    }

    /// Converts into a connector over a dynamically dispatched backend.
    pub fn into_dyn(self) -> Connector<Box<dyn DynSearchBackend>>
    where
        B: 'static,
    {
        Connector {
            backend: Box::new(self.backend) as Box<dyn DynSearchBackend>,
            settings: self.settings,
            translator: self.translator,
            models: self.models,
            connected: self.connected,
        }
    }

    async fn create_with(&self, definition: &ModelDefinition, data: Value) -> SearchLayerResult<String> {
        let (id, body) = Self::split_document(definition, data)?;
        let response = self
            .backend
            .index_document(self.index_request(definition, id, body))
            .await?;

        tracing::debug!(model = definition.name(), id = %response.id, "Created document");

        Ok(response.id)
    }

    async fn save_with(&self, definition: &ModelDefinition, data: Value) -> SearchLayerResult<()> {
        let (id, body) = Self::split_document(definition, data)?;
        let id = id.ok_or_else(|| SearchLayerError::MissingIdentifier(definition.name().to_string()))?;

        self.backend
            .index_document(self.index_request(definition, Some(id.clone()), body))
            .await?;

        tracing::debug!(model = definition.name(), id = %id, "Saved document");

        Ok(())
    }

    async fn exists_with(&self, definition: &ModelDefinition, id: &Value) -> SearchLayerResult<bool> {
        let request = self.document_request(definition, id)?;
        self.backend.document_exists(request).await
    }

    async fn find_with(&self, definition: &ModelDefinition, id: &Value) -> SearchLayerResult<Option<ModelRecord>> {
        let request = self.document_request(definition, id)?;
        let response = self.backend.get_document(request).await?;

        Ok(Self::record_from_hit(definition, &response))
    }

    async fn destroy_with(&self, definition: &ModelDefinition, id: &Value) -> SearchLayerResult<bool> {
        let request = self.document_request(definition, id)?;
        let found = self.backend.delete_document(request).await?;

        tracing::debug!(model = definition.name(), id = %id, found, "Destroyed document");

        Ok(found)
    }

    async fn all_with(
        &self,
        definition: &ModelDefinition,
        criteria: Option<&Criteria>,
    ) -> SearchLayerResult<Vec<ModelRecord>> {
        let request = self.translator.translate(
            definition.name(),
            criteria,
            criteria.and_then(|criteria| criteria.limit),
            criteria.and_then(|criteria| criteria.skip),
        );

        tracing::debug!(model = definition.name(), size = ?request.size, from = ?request.from, "Searching documents");

        let response = self.backend.search(request).await?;
        let hits = response
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchLayerError::Backend("Search response carries no hits".to_string()))?;

        Ok(hits
            .iter()
            .filter_map(|hit| {
                let record = Self::record_from_hit(definition, hit);
                if record.is_none() {
                    tracing::warn!(model = definition.name(), id = ?hit.get("_id"), "Skipping unreadable search hit");
                }
                record
            })
            .collect())
    }

    async fn count_with(
        &self,
        definition: &ModelDefinition,
        where_clause: Option<&WhereClause>,
    ) -> SearchLayerResult<u64> {
        let request = self.translator.translate(
            definition.name(),
            Self::where_criteria(where_clause).as_ref(),
            None,
            None,
        );

        self.backend.count(request).await
    }

    fn index_request(&self, definition: &ModelDefinition, id: Option<String>, body: Value) -> IndexRequest {
        let defaults = self.translator.defaults(definition.name());

        IndexRequest {
            index: defaults.index,
            type_name: defaults.type_name,
            id,
            body,
            refresh: self.settings.refresh_on_write,
        }
    }

    fn document_request(&self, definition: &ModelDefinition, id: &Value) -> SearchLayerResult<DocumentRequest> {
        let defaults = self.translator.defaults(definition.name());

        Ok(DocumentRequest {
            index: defaults.index,
            type_name: defaults.type_name,
            id: Self::document_id(definition, id)?,
            refresh: self.settings.refresh_on_write,
        })
    }

    fn document_id(definition: &ModelDefinition, id: &Value) -> SearchLayerResult<String> {
        if id.is_null() {
            return Err(SearchLayerError::MissingIdentifier(definition.name().to_string()));
        }

        match IdCoercer::coerce(id) {
            Value::String(id) => Ok(id),
            other => Err(SearchLayerError::InvalidIdentifier(format!(
                "{} has no string form usable as a {} id",
                other,
                definition.name()
            ))),
        }
    }

    /// Separates the id from the document body.
    fn split_document(definition: &ModelDefinition, data: Value) -> SearchLayerResult<(Option<String>, Value)> {
        let Value::Object(mut body) = data else {
            return Err(SearchLayerError::InvalidDocument(format!(
                "{} documents must be JSON objects",
                definition.name()
            )));
        };

        let id = match body.remove(definition.id_name()) {
            None | Some(Value::Null) => None,
            Some(id) => Some(Self::document_id(definition, &id)?),
        };

        Ok((id, Value::Object(body)))
    }

    fn where_criteria(where_clause: Option<&WhereClause>) -> Option<Criteria> {
        where_clause.map(|where_clause| Criteria::from_where(where_clause.clone()))
    }

    /// Maps a get response or search hit, injecting `_id` as the id field.
    fn record_from_hit(definition: &ModelDefinition, hit: &Value) -> Option<ModelRecord> {
        if hit.get("found").and_then(Value::as_bool) == Some(false) {
            return None;
        }

        let source = hit.get("_source")?.clone();

        match hit.get("_id").and_then(Value::as_str) {
            Some(id) => Self::record_from_source(definition, source, id),
            None => ModelMapper::to_record(definition.properties(), Some(&source)),
        }
    }

    fn record_from_source(definition: &ModelDefinition, mut source: Value, id: &str) -> Option<ModelRecord> {
        if let Some(document) = source.as_object_mut() {
            document
                .entry(definition.id_name())
                .or_insert_with(|| Value::String(id.to_string()));
        }

        ModelMapper::to_record(definition.properties(), Some(&source))
    }
}

/// A typed view of one [`Model`] on a connector.
///
/// Converts between `M` and the JSON documents the connector stores.
#[derive(Debug)]
pub struct ModelHandle<'a, B: SearchBackend, M: Model> {
    connector: &'a Connector<B>,
    definition: ModelDefinition,
    _marker: PhantomData<M>,
}

impl<'a, B: SearchBackend, M: Model> ModelHandle<'a, B, M> {
    fn new(connector: &'a Connector<B>) -> Self {
        Self {
            connector,
            definition: M::definition(),
            _marker: PhantomData,
        }
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    /// Stores a new instance and returns its id.
    pub async fn create(&self, instance: &M) -> SearchLayerResult<String> {
        self.connector
            .create_with(&self.definition, serde_json::to_value(instance)?)
            .await
    }

    /// Replaces a stored instance; the instance must carry its id.
    pub async fn save(&self, instance: &M) -> SearchLayerResult<()> {
        self.connector
            .save_with(&self.definition, serde_json::to_value(instance)?)
            .await
    }

    pub async fn exists(&self, id: impl Into<Value>) -> SearchLayerResult<bool> {
        self.connector
            .exists_with(&self.definition, &id.into())
            .await
    }

    /// Fetches an instance by id.
    ///
    /// # Errors
    ///
    /// Besides backend failures, fails with a serialization error when the stored
    /// record does not deserialize into `M`.
    pub async fn find(&self, id: impl Into<Value>) -> SearchLayerResult<Option<M>> {
        self.connector
            .find_with(&self.definition, &id.into())
            .await?
            .map(ModelRecord::into_model)
            .transpose()
    }

    pub async fn all(&self, criteria: Option<&Criteria>) -> SearchLayerResult<Vec<M>> {
        self.connector
            .all_with(&self.definition, criteria)
            .await?
            .into_iter()
            .map(ModelRecord::into_model)
            .collect()
    }

    pub async fn destroy(&self, id: impl Into<Value>) -> SearchLayerResult<bool> {
        self.connector
            .destroy_with(&self.definition, &id.into())
            .await
    }

    pub async fn count(&self, where_clause: Option<&WhereClause>) -> SearchLayerResult<u64> {
        self.connector
            .count_with(&self.definition, where_clause)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        request::{IndexResponse, QueryRequest},
        schema::{FieldType, PropertySchema},
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::{
        sync::{
            Mutex as StdMutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    /// Records requests and answers with canned responses.
    #[derive(Debug, Default)]
    struct RecordingBackend {
        pings: AtomicUsize,
        indexed: StdMutex<Vec<IndexRequest>>,
        queries: StdMutex<Vec<QueryRequest>>,
        search_response: Value,
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        async fn ping(&self) -> SearchLayerResult<()> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.pings.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn index_document(&self, request: IndexRequest) -> SearchLayerResult<IndexResponse> {
            let id = request.id.clone().unwrap_or_else(|| "generated".to_string());
            self.indexed.lock().unwrap().push(request);
            Ok(IndexResponse { id, created: true })
        }

        async fn get_document(&self, request: DocumentRequest) -> SearchLayerResult<Value> {
            Ok(json!({ "_id": request.id, "found": false }))
        }

        async fn document_exists(&self, _request: DocumentRequest) -> SearchLayerResult<bool> {
            Ok(false)
        }

        async fn delete_document(&self, _request: DocumentRequest) -> SearchLayerResult<bool> {
            Ok(false)
        }

        async fn search(&self, request: QueryRequest) -> SearchLayerResult<Value> {
            self.queries.lock().unwrap().push(request);
            Ok(self.search_response.clone())
        }

        async fn count(&self, request: QueryRequest) -> SearchLayerResult<u64> {
            self.queries.lock().unwrap().push(request);
            Ok(0)
        }

        async fn delete_by_query(&self, request: QueryRequest) -> SearchLayerResult<u64> {
            self.queries.lock().unwrap().push(request);
            Ok(0)
        }
    }

    fn definition() -> ModelDefinition {
        ModelDefinition::new(
            "Note",
            PropertySchema::new()
                .field("key", FieldType::String)
                .field("body", FieldType::String),
        )
        .with_id_name("key")
    }

    async fn connector(backend: RecordingBackend, settings: ConnectorSettings) -> Connector<RecordingBackend> {
        let connector = Connector::new(backend, settings);
        connector.define(definition()).await;
        connector
    }

    #[tokio::test]
    async fn concurrent_connects_ping_once() {
        let connector = connector(RecordingBackend::default(), ConnectorSettings::default()).await;

        let (a, b, c) = tokio::join!(connector.connect(), connector.connect(), connector.connect());
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(connector.backend().pings.load(Ordering::SeqCst), 1);
        assert!(connector.is_connected().await);
    }

    #[tokio::test]
    async fn writes_strip_the_id_and_carry_settings() {
        let settings = ConnectorSettings {
            index: Some("notes".to_string()),
            refresh_on_write: true,
            ..ConnectorSettings::default()
        };
        let connector = connector(RecordingBackend::default(), settings).await;

        let id = connector
            .create("Note", json!({ "key": 12, "body": "hello" }))
            .await
            .unwrap();
        assert_eq!(id, "12");

        let indexed = connector.backend().indexed.lock().unwrap().clone();
        assert_eq!(
            indexed,
            vec![IndexRequest {
                index: Some("notes".to_string()),
                type_name: "Note".to_string(),
                id: Some("12".to_string()),
                body: json!({ "body": "hello" }),
                refresh: true,
            }]
        );
    }

    #[tokio::test]
    async fn search_hits_get_their_id_injected() {
        let backend = RecordingBackend {
            search_response: json!({
                "hits": { "hits": [
                    { "_id": "a", "_source": { "body": "first" } },
                    { "_id": "b", "_source": "unreadable" },
                    { "_id": "c", "_source": { "key": "kept", "body": "third" } },
                ] }
            }),
            ..RecordingBackend::default()
        };
        let connector = connector(backend, ConnectorSettings::default()).await;

        let records = connector
            .all("Note", Some(&Criteria::builder().limit(5).skip(0).build()))
            .await
            .unwrap();

        assert_eq!(
            records.iter().map(ModelRecord::to_json).collect::<Vec<_>>(),
            vec![
                json!({ "key": "a", "body": "first" }),
                json!({ "key": "kept", "body": "third" }),
            ]
        );

        let queries = connector.backend().queries.lock().unwrap().clone();
        assert_eq!(queries[0].size, Some(5));
        assert_eq!(queries[0].from, None);
        assert_eq!(queries[0].body, None);
    }

    #[tokio::test]
    async fn search_response_without_hits_is_an_error() {
        let backend = RecordingBackend {
            search_response: json!({ "error": "boom" }),
            ..RecordingBackend::default()
        };
        let connector = connector(backend, ConnectorSettings::default()).await;

        assert!(matches!(
            connector.all("Note", None).await,
            Err(SearchLayerError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn not_found_documents_are_none() {
        let connector = connector(RecordingBackend::default(), ConnectorSettings::default()).await;

        assert_eq!(connector.find("Note", "missing").await.unwrap(), None);
        assert!(!connector.destroy("Note", "missing").await.unwrap());
    }

    #[tokio::test]
    async fn count_translates_the_where_clause() {
        let connector = connector(RecordingBackend::default(), ConnectorSettings::default()).await;
        let mut where_clause = WhereClause::new();
        where_clause.insert("body".to_string(), json!("hello"));

        connector.count("Note", Some(&where_clause)).await.unwrap();

        let queries = connector.backend().queries.lock().unwrap().clone();
        assert_eq!(
            queries[0].body,
            Some(json!({ "query": { "bool": { "must": [ { "match": { "body": "hello" } } ] } } }))
        );
        assert_eq!(queries[0].size, None);
    }
}

//! Elasticsearch search backend.

use std::collections::HashSet;
use std::fmt::Debug;
use async_trait::async_trait;
use elasticsearch::{
    CountParts, DeleteByQueryParts, DeleteParts, Elasticsearch, ExistsParts, GetParts,
    IndexParts, SearchParts,
    auth::Credentials,
    cert::{Certificate, CertificateValidation},
    http::{
        StatusCode, Url,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesExistsParts, IndicesPutMappingParts},
    params::Refresh,
};
use mea::mutex::Mutex;
use serde_json::{Value, json};
use uuid::Uuid;

use searchlayer_core::{
    backend::{SearchBackend, SearchBackendBuilder},
    config::{Auth, TransportConfig},
    error::{SearchLayerError, SearchLayerResult},
    request::{DocumentRequest, IndexRequest, IndexResponse, QueryRequest},
};

use crate::scope::{TypeScope, type_field_mapping};

const INDEX_NOT_FOUND: &str = "index_not_found_exception";
const INDEX_EXISTS: &str = "resource_already_exists_exception";

fn backend_error(action: &str, error: elasticsearch::Error) -> SearchLayerError {
    SearchLayerError::Backend(format!("Failed to {}: {}", action, error))
}

fn refresh(flag: bool) -> Refresh {
    if flag { Refresh::True } else { Refresh::False }
}

/// Id a record is stored under, namespaced in a shared index.
fn stored_id(scope: Option<TypeScope<'_>>, id: &str) -> String {
    match scope {
        Some(scope) => scope.document_id(id),
        None => id.to_string(),
    }
}

/// Query body for a request, defaulting to "match all".
///
/// In a shared index the query is also filtered on the request's model.
fn query_body(request: &QueryRequest) -> Value {
    let body = request
        .body
        .clone()
        .unwrap_or_else(|| json!({ "query": { "match_all": {} } }));

    match TypeScope::for_request(request.index.as_deref(), &request.type_name) {
        Some(scope) => scope.restrict(body),
        None => body,
    }
}

/// Search backend over an Elasticsearch cluster.
///
/// Talks to the first configured node through a single-node connection pool.
/// Models sharing a configured index are kept apart by a type field and
/// type-prefixed document ids (see [`crate::scope`]).
pub struct ElasticsearchSearch {
    client: Elasticsearch,
    config: TransportConfig,
    mapped_indices: Mutex<HashSet<String>>,
}

impl Debug for ElasticsearchSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchSearch")
            .field("hosts", &self.config.hosts)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchSearch {
    /// Creates a backend from a resolved transport configuration.
    ///
    /// No request is sent; use [`SearchBackend::ping`] to verify connectivity.
    pub fn new(config: TransportConfig) -> SearchLayerResult<Self> {
        let client = Self::build_client(&config)?;
        Ok(Self {
            client,
            config,
            mapped_indices: Mutex::new(HashSet::new()),
        })
    }

    pub fn builder(config: TransportConfig) -> ElasticsearchSearchBuilder {
        ElasticsearchSearchBuilder::new(config)
    }

    pub fn client(&self) -> &Elasticsearch {
        &self.client
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn build_client(config: &TransportConfig) -> SearchLayerResult<Elasticsearch> {
        let url = config
            .hosts
            .first()
            .ok_or_else(|| SearchLayerError::Configuration("At least one host is required".to_string()))?;

        if config.hosts.len() > 1 {
            tracing::warn!(
                "Only the first host is used, ignoring: {}",
                config.hosts[1..].iter().map(Url::as_str).collect::<Vec<_>>().join(", ")
            );
        }

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url.clone()))
            .timeout(config.timeout);

        if !config.validate_certificates {
            builder = builder.cert_validation(CertificateValidation::None);
        } else if let Some(pem) = config.ca_certificates.first() {
            let certificate = Certificate::from_pem(pem).map_err(|e| {
                SearchLayerError::Configuration(format!("Invalid CA certificate: {}", e))
            })?;
            builder = builder.cert_validation(CertificateValidation::Full(certificate));
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                Auth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                Auth::Bearer { token } => builder.auth(Credentials::Bearer(token.clone())),
            };
        }

        let transport = builder
            .build()
            .map_err(|e| SearchLayerError::Initialization(format!("Failed to build transport: {}", e)))?;

        Ok(Elasticsearch::new(transport))
    }

    /// Makes sure a shared index maps the type field as a keyword.
    ///
    /// Runs once per index; a missing index is created with the mapping.
    async fn ensure_type_mapping(&self, index: &str) -> SearchLayerResult<()> {
        let mut mapped = self.mapped_indices.lock().await;
        if mapped.contains(index) {
            return Ok(());
        }

        let exists = self.client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| backend_error("check index", e))?;

        let response = if exists.status_code().is_success() {
            self.client
                .indices()
                .put_mapping(IndicesPutMappingParts::Index(&[index]))
                .body(type_field_mapping())
                .send()
                .await
                .map_err(|e| backend_error("update index mapping", e))?
        } else {
            self.client
                .indices()
                .create(IndicesCreateParts::Index(index))
                .body(json!({ "mappings": type_field_mapping() }))
                .send()
                .await
                .map_err(|e| backend_error("create index", e))?
        };

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if !body.contains(INDEX_EXISTS) {
                return Err(SearchLayerError::Backend(format!(
                    "Failed to map type field of index {} (status {}): {}",
                    index, status, body
                )));
            }
        }

        tracing::debug!(index = %index, "Mapped type field of shared index");
        mapped.insert(index.to_string());
        Ok(())
    }

    fn log_body(&self, action: &str, index: &str, body: &Value) {
        if self.config.logs_bodies() {
            tracing::debug!(index = %index, body = %body, "Elasticsearch {} request", action);
        }
    }

    /// Reads a successful response as JSON, or turns a failed one into an error.
    async fn json_response(action: &str, response: Response) -> SearchLayerResult<Value> {
        let status = response.status_code();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchLayerError::Backend(format!(
                "Failed to {} (status {}): {}",
                action, status, body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SearchLayerError::Backend(format!("Failed to parse {} response: {}", action, e)))
    }

    /// Like [`json_response`](Self::json_response), but a missing index yields `None`.
    async fn query_response(action: &str, response: Response) -> SearchLayerResult<Option<Value>> {
        if response.status_code() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            if body.contains(INDEX_NOT_FOUND) {
                tracing::debug!("Index not found during {}, treating as empty", action);
                return Ok(None);
            }
            return Err(SearchLayerError::Backend(format!(
                "Failed to {} (status 404): {}",
                action, body
            )));
        }

        Self::json_response(action, response).await.map(Some)
    }
}


#[async_trait]
impl SearchBackend for ElasticsearchSearch {
    async fn ping(&self) -> SearchLayerResult<()> {
        let response = self.client
            .ping()
            .send()
            .await
            .map_err(|e| backend_error("ping", e))?;

        if !response.status_code().is_success() {
            return Err(SearchLayerError::Backend(format!(
                "Ping failed with status {}",
                response.status_code()
            )));
        }

        Ok(())
    }

    async fn index_document(&self, request: IndexRequest) -> SearchLayerResult<IndexResponse> {
        let index = request.target_index();
        let scope = TypeScope::for_request(request.index.as_deref(), &request.type_name);

        let (document_id, body) = match scope {
            Some(scope) => {
                self.ensure_type_mapping(&index).await?;
                let id = request
                    .id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
                (Some(scope.document_id(&id)), scope.tag(request.body))
            }
            None => (request.id.clone(), request.body),
        };
        self.log_body("index", &index, &body);

        let parts = match document_id.as_deref() {
            Some(id) => IndexParts::IndexId(&index, id),
            None => IndexParts::Index(&index),
        };

        let response = self.client
            .index(parts)
            .refresh(refresh(request.refresh))
            .body(body)
            .send()
            .await
            .map_err(|e| backend_error("index document", e))?;

        let body = Self::json_response("index document", response).await?;

        let stored_id = body
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(document_id)
            .ok_or_else(|| SearchLayerError::Backend("Index response carried no _id".to_string()))?;
        let id = match scope {
            Some(scope) => scope.local_id(&stored_id).to_string(),
            None => stored_id,
        };

        let created = body.get("result").and_then(Value::as_str) == Some("created");

        Ok(IndexResponse { id, created })
    }

    async fn get_document(&self, request: DocumentRequest) -> SearchLayerResult<Value> {
        let index = request.target_index();
        let scope = TypeScope::for_request(request.index.as_deref(), &request.type_name);
        let document_id = stored_id(scope, &request.id);

        let response = self.client
            .get(GetParts::IndexId(&index, &document_id))
            .send()
            .await
            .map_err(|e| backend_error("get document", e))?;

        if response.status_code() == StatusCode::NOT_FOUND {
            return Ok(json!({
                "_index": index,
                "_id": request.id,
                "found": false,
            }));
        }

        let mut document = Self::json_response("get document", response).await?;
        if let Some(scope) = scope {
            scope.untag_hit(&mut document);
        }

        Ok(document)
    }

    async fn document_exists(&self, request: DocumentRequest) -> SearchLayerResult<bool> {
        let index = request.target_index();

        let scope = TypeScope::for_request(request.index.as_deref(), &request.type_name);
        let document_id = stored_id(scope, &request.id);

        let response = self.client
            .exists(ExistsParts::IndexId(&index, &document_id))
            .send()
            .await
            .map_err(|e| backend_error("check document", e))?;

        match response.status_code() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(SearchLayerError::Backend(format!(
                "Failed to check document (status {})",
                status
            ))),
        }
    }

    async fn delete_document(&self, request: DocumentRequest) -> SearchLayerResult<bool> {
        let index = request.target_index();

        let scope = TypeScope::for_request(request.index.as_deref(), &request.type_name);
        let document_id = stored_id(scope, &request.id);

        let response = self.client
            .delete(DeleteParts::IndexId(&index, &document_id))
            .refresh(refresh(request.refresh))
            .send()
            .await
            .map_err(|e| backend_error("delete document", e))?;

        if response.status_code() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        let body = Self::json_response("delete document", response).await?;
        Ok(body.get("result").and_then(Value::as_str) == Some("deleted"))
    }

    async fn search(&self, request: QueryRequest) -> SearchLayerResult<Value> {
        let index = request.target_index();
        let body = query_body(&request);
        self.log_body("search", &index, &body);

        let indices = [index.as_str()];
        let mut search = self.client
            .search(SearchParts::Index(&indices))
            .body(body);

        if let Some(size) = request.size {
            search = search.size(size as i64);
        }
        if let Some(from) = request.from {
            search = search.from(from as i64);
        }

        let response = search
            .send()
            .await
            .map_err(|e| backend_error("search", e))?;

        let mut results = Self::query_response("search", response)
            .await?
            .unwrap_or_else(|| json!({
                "took": 0,
                "timed_out": false,
                "hits": {
                    "total": { "value": 0, "relation": "eq" },
                    "max_score": null,
                    "hits": [],
                }
            }));

        if let Some(scope) = TypeScope::for_request(request.index.as_deref(), &request.type_name) {
            scope.untag_hits(&mut results);
        }

        Ok(results)
    }

    async fn count(&self, request: QueryRequest) -> SearchLayerResult<u64> {
        let index = request.target_index();
        let body = query_body(&request);
        self.log_body("count", &index, &body);

        let indices = [index.as_str()];
        let response = self.client
            .count(CountParts::Index(&indices))
            .body(body)
            .send()
            .await
            .map_err(|e| backend_error("count", e))?;

        Ok(
            Self::query_response("count", response)
                .await?
                .and_then(|body| body.get("count").and_then(Value::as_u64))
                .unwrap_or(0)
        )
    }

    async fn delete_by_query(&self, request: QueryRequest) -> SearchLayerResult<u64> {
        let index = request.target_index();
        let body = query_body(&request);
        self.log_body("delete by query", &index, &body);

        let indices = [index.as_str()];
        let response = self.client
            .delete_by_query(DeleteByQueryParts::Index(&indices))
            .body(body)
            .send()
            .await
            .map_err(|e| backend_error("delete by query", e))?;

        Ok(
            Self::query_response("delete by query", response)
                .await?
                .and_then(|body| body.get("deleted").and_then(Value::as_u64))
                .unwrap_or(0)
        )
    }
}


/// Builder for constructing [`ElasticsearchSearch`] instances.
///
/// # Example
///
/// ```ignore
/// use searchlayer::prelude::*;
/// use searchlayer::elasticsearch::ElasticsearchSearchBuilder;
///
/// let settings = ConnectorSettings::default();
/// let config = ConfigBuilder::build(&settings)?;
/// let backend = ElasticsearchSearchBuilder::new(config).build().await?;
/// let connector = Connector::new(backend, settings);
/// connector.connect().await?;
/// ```
pub struct ElasticsearchSearchBuilder {
    config: TransportConfig,
}

impl ElasticsearchSearchBuilder {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SearchBackendBuilder for ElasticsearchSearchBuilder {
    type Backend = ElasticsearchSearch;

    async fn build(self) -> SearchLayerResult<Self::Backend> {
        ElasticsearchSearch::new(self.config)
    }
}

//! Mock Elasticsearch node for integration testing.
//!
//! Records every request and answers with whatever the test's responder
//! returns for it.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use searchlayer_core::config::{ConfigBuilder, ConnectorSettings};
use searchlayer_elasticsearch::ElasticsearchSearch;

/// A request as the mock node received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub body: Option<Value>,
}

impl RecordedRequest {
    pub fn is(&self, method: &Method, path: &str) -> bool {
        self.method == *method && self.path == path
    }
}

type Responder = dyn Fn(&RecordedRequest) -> (StatusCode, Value) + Send + Sync;

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Arc<Responder>,
}

async fn handle(State(state): State<MockState>, method: Method, uri: Uri, body: Bytes) -> Response {
    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        body: serde_json::from_slice(&body).ok(),
    };

    let (status, reply) = (state.responder)(&request);
    state.requests.lock().unwrap().push(request);

    (status, [("x-elastic-product", "Elasticsearch")], Json(reply)).into_response()
}

pub struct MockElasticsearch {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockElasticsearch {
    /// Starts a mock node on a random port.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            requests: requests.clone(),
            responder: Arc::new(responder),
        };

        let app = Router::new().fallback(handle).with_state(state);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, requests, handle }
    }

    /// Connector settings pointing at this node.
    pub fn settings(&self, index: Option<&str>) -> ConnectorSettings {
        ConnectorSettings {
            hosts: vec![self.base_url.clone()],
            index: index.map(str::to_string),
            ..ConnectorSettings::default()
        }
    }

    pub fn backend(&self, index: Option<&str>) -> ElasticsearchSearch {
        ElasticsearchSearch::new(ConfigBuilder::build(&self.settings(index)).unwrap()).unwrap()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The last request sent to `path` with `method`.
    pub fn last(&self, method: Method, path: &str) -> RecordedRequest {
        self.requests()
            .into_iter()
            .rev()
            .find(|request| request.is(&method, path))
            .unwrap_or_else(|| panic!("no {} {} request was sent", method, path))
    }
}

impl MockElasticsearch {
    /// The last request sent to `path`, whatever its method.
    pub fn sent_to(&self, path: &str) -> RecordedRequest {
        self.requests()
            .into_iter()
            .rev()
            .find(|request| request.path == path)
            .unwrap_or_else(|| panic!("no request was sent to {}", path))
    }
}

impl Drop for MockElasticsearch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

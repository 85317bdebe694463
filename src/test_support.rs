//! In-process fake backend for client tests.
//!
//! Routes are scripted per `(METHOD, path)`; anything unscripted answers 404.
//! Every request is recorded so tests can assert on headers and bodies.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::config::ClientConfig;
use crate::net::api::ApiClient;
use crate::storage::{MemoryStorage, Storage, StorageError};

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Default)]
struct MockInner {
    routes: HashMap<(String, String), (u16, String)>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<MockInner>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `status` + raw `body` for `method path`.
    pub fn respond(&self, method: &str, path: &str, status: u16, body: &str) -> &Self {
        let mut inner = self.inner.lock().unwrap();
        inner.routes.insert((method.to_owned(), path.to_owned()), (status, body.to_owned()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }

    /// Bind on an ephemeral port and return the base URL.
    pub async fn serve(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(handle).with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

async fn handle(State(mock): State<MockBackend>, method: Method, uri: Uri, headers: HeaderMap, body: String) -> Response {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path_and_query().map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned()),
        headers: headers
            .iter()
            .map(|(name, value)| (name.as_str().to_owned(), value.to_str().unwrap_or_default().to_owned()))
            .collect(),
        body,
    };

    let mut inner = mock.inner.lock().unwrap();
    inner.requests.push(recorded);
    let scripted = inner.routes.get(&(method.to_string(), uri.path().to_owned())).cloned();
    drop(inner);

    match scripted {
        Some((status, body)) => (StatusCode::from_u16(status).unwrap(), body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Base URL of a port nothing is listening on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Client over fresh memory storage.
pub fn memory_client(base_url: &str) -> (Arc<MemoryStorage>, ApiClient) {
    let storage = Arc::new(MemoryStorage::new());
    let config = ClientConfig::default().with_base_url(base_url);
    let client = ApiClient::new(&config, storage.clone()).unwrap();
    (storage, client)
}

/// Memory storage whose writes to chosen keys fail.
#[derive(Default)]
pub struct FailingStorage {
    inner: MemoryStorage,
    failing_sets: Mutex<HashSet<String>>,
    failing_removes: Mutex<HashSet<String>>,
}

impl FailingStorage {
    pub fn fail_set(&self, key: &str) {
        self.failing_sets.lock().unwrap().insert(key.to_owned());
    }

    pub fn fail_remove(&self, key: &str) {
        self.failing_removes.lock().unwrap().insert(key.to_owned());
    }

    fn refused(key: &str) -> StorageError {
        StorageError::Io {
            path: key.into(),
            source: std::io::Error::other("write refused"),
        }
    }
}

impl Storage for FailingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.failing_sets.lock().unwrap().contains(key) {
            return Err(Self::refused(key));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.failing_removes.lock().unwrap().contains(key) {
            return Err(Self::refused(key));
        }
        self.inner.remove(key)
    }
}

/// Client over a [`FailingStorage`].
pub fn failing_client(base_url: &str) -> (Arc<FailingStorage>, ApiClient) {
    let storage = Arc::new(FailingStorage::default());
    let config = ClientConfig::default().with_base_url(base_url);
    let client = ApiClient::new(&config, storage.clone()).unwrap();
    (storage, client)
}

//! Authenticated REST client for the backend API.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every verb builds `base_url + path`, sends JSON, and attaches the bearer
//! token currently held in storage. The token is read on each call, so a
//! login or logout takes effect on the very next request.
//!
//! ERROR HANDLING
//! ==============
//! Verbs return [`ApiError`] for transport failures, non-2xx statuses, and
//! undecodable bodies. Error bodies are never parsed. There is no retry,
//! backoff, or timeout; callers decide how to surface the failure.
//!
//! Each call appends exactly one [`CallLogEntry`], success or not. When no
//! response arrived the entry carries [`UNRESOLVED_STATUS`].

use std::sync::Arc;
use std::time::Instant;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::call_log::{CallLog, CallLogEntry, UNRESOLVED_STATUS};
use super::types::RequestOptions;
use crate::config::ClientConfig;
use crate::storage::Storage;

pub const TOKEN_KEY: &str = "auth_token";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{method} {path} failed with status {status}")]
    Status { method: Method, path: String, status: u16 },
    #[error("{method} {path} request failed: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {path} returned an unreadable body: {source}")]
    Decode {
        method: Method,
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{method} {path} body could not be serialized: {source}")]
    Encode {
        method: Method,
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },
    #[error("http client setup failed: {0}")]
    Setup(#[source] reqwest::Error),
}

impl ApiError {
    /// HTTP status of a non-2xx failure, if that is what this is.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Which statuses short-circuit to an empty object without reading the body.
fn empty_statuses(method: &Method) -> &'static [u16] {
    if *method == Method::PUT {
        &[204]
    } else if *method == Method::DELETE {
        &[204, 200]
    } else {
        &[]
    }
}

/// Shared API client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn Storage>,
    call_log: CallLog,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client for `config.base_url` backed by `storage`.
    pub fn new(config: &ClientConfig, storage: Arc<dyn Storage>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().build().map_err(ApiError::Setup)?;
        let call_log = CallLog::new(storage.clone(), config.log_capacity);
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            storage,
            call_log,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn call_log(&self) -> &CallLog {
        &self.call_log
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// `GET path`; any 2xx body is decoded as `T`.
    pub async fn get<T>(&self, path: &str, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.execute(Method::GET, path, None, options).await
    }

    /// `POST path` with `body` as JSON; any 2xx body is decoded as `T`.
    pub async fn post<B, T>(&self, path: &str, body: &B, options: RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let encoded = self.encode(&Method::POST, path, body);
        self.execute_encoded(Method::POST, path, encoded, options).await
    }

    /// `PUT path` with `body` as JSON; 204 yields `T` built from `{}`.
    pub async fn put<B, T>(&self, path: &str, body: &B, options: RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let encoded = self.encode(&Method::PUT, path, body);
        self.execute_encoded(Method::PUT, path, encoded, options).await
    }

    /// `DELETE path`; 200 and 204 yield `T` built from `{}`.
    pub async fn delete<T>(&self, path: &str, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.execute(Method::DELETE, path, None, options).await
    }

    /// Send without a JSON body (the caller's raw body, if any, passes through).
    pub async fn send_raw<T>(&self, method: Method, path: &str, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.execute(method, path, None, options).await
    }

    fn encode<B>(&self, method: &Method, path: &str, body: &B) -> Result<String, ApiError>
    where
        B: Serialize + ?Sized,
    {
        serde_json::to_string(body).map_err(|source| ApiError::Encode {
            method: method.clone(),
            path: path.to_owned(),
            source,
        })
    }

    async fn execute_encoded<T>(
        &self,
        method: Method,
        path: &str,
        encoded: Result<String, ApiError>,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        match encoded {
            Ok(body) => self.execute(method, path, Some(body), options).await,
            Err(error) => {
                self.call_log.record(CallLogEntry::new(
                    method.as_str(),
                    &self.base_url,
                    path,
                    UNRESOLVED_STATUS,
                    std::time::Duration::ZERO,
                ));
                Err(error)
            }
        }
    }

    async fn execute<T>(&self, method: Method, path: &str, body: Option<String>, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let started = Instant::now();
        let mut status = None;
        let result = self.dispatch(&method, path, body, options, &mut status).await;

        let resolved = status.unwrap_or(UNRESOLVED_STATUS);
        self.call_log.record(CallLogEntry::new(method.as_str(), &self.base_url, path, resolved, started.elapsed()));

        if let Err(error) = &result {
            tracing::warn!(%method, path, status = resolved, %error, "api call failed");
        }
        result
    }

    async fn dispatch<T>(
        &self,
        method: &Method,
        path: &str,
        body: Option<String>,
        options: RequestOptions,
        status: &mut Option<u16>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let headers = self.headers(&options)?;
        tracing::debug!(%method, path, authorized = headers.contains_key(AUTHORIZATION), "api request");

        let mut request = self.http.request(method.clone(), &url).headers(headers);
        if let Some(body) = body.or(options.raw_body) {
            request = request.body(body);
        }

        let transport = |source| ApiError::Transport { method: method.clone(), path: path.to_owned(), source };
        let response = request.send().await.map_err(transport)?;
        let code = response.status().as_u16();
        *status = Some(code);

        if empty_statuses(method).contains(&code) {
            return decode_value(method, path, Value::Object(Map::new()));
        }
        if !response.status().is_success() {
            return Err(ApiError::Status { method: method.clone(), path: path.to_owned(), status: code });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            method: method.clone(),
            path: path.to_owned(),
            source,
        })
    }

    /// Content type, then caller overrides, then the stored bearer token.
    fn headers(&self, options: &RequestOptions) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &options.headers {
            let invalid = |message: String| ApiError::InvalidHeader { name: name.clone(), message };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.insert(header_name, header_value);
        }

        if let Some(token) = self.bearer_token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| ApiError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                message: e.to_string(),
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// The token currently in storage. An unreadable store counts as none.
    fn bearer_token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(error) => {
                tracing::debug!(%error, "token lookup failed; sending unauthenticated");
                None
            }
        }
    }
}

fn decode_value<T>(method: &Method, path: &str, value: Value) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(value).map_err(|source| ApiError::Decode {
        method: method.clone(),
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

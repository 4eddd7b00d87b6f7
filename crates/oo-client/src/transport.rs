//! HTTP transport abstraction
//!
//! A transport moves exactly one request over the wire and reports either
//! the raw response or the reason no response arrived. Retrying and error
//! interpretation live in the dispatcher.

use crate::query::QueryParams;
use async_trait::async_trait;
use oo_core::{OoConfig, OoError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// HTTP verbs used by the compute API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One logical endpoint call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Resource path relative to the base URL, starting with `/`
    pub path: String,
    pub body: Option<Value>,
    pub query: QueryParams,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: QueryParams::default(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }
}

/// A complete HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }
}

/// No HTTP response was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("response body could not be read: {0}")]
    Body(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(message)
        } else {
            TransportError::Other(message)
        }
    }
}

/// Trait for sending HTTP requests (allows mocking in tests)
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request and return the complete response
    async fn send(&self, request: &ApiRequest) -> std::result::Result<RawResponse, TransportError>;
}

/// Real transport backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport for `base_url`; `timeout: None` never times out
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| OoError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &OoConfig) -> Result<Self> {
        Self::new(&config.api_url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: &ApiRequest) -> std::result::Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), self.url_for(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query.encode());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        debug!("Received {} ({} bytes)", status, body.len());

        Ok(RawResponse::new(status, body.to_vec()))
    }
}

type Outcome = std::result::Result<RawResponse, TransportError>;

/// Mock transport for testing
///
/// Outcomes are served in the order they were queued. Once the queue is
/// empty the fallback outcome (if any) is served forever. Every request is
/// recorded.
#[derive(Default)]
pub struct MockTransport {
    outcomes: Mutex<VecDeque<Outcome>>,
    fallback: Option<Outcome>,
    requests: Mutex<Vec<ApiRequest>>,
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response
    pub fn with_response(self, status: u16, body: Value) -> Self {
        self.with_outcome(Ok(RawResponse::json(status, &body)))
    }

    /// Queue a response with an arbitrary body
    pub fn with_raw_response(self, status: u16, body: &str) -> Self {
        self.with_outcome(Ok(RawResponse::new(status, body)))
    }

    /// Queue a transport failure
    pub fn with_error(self, error: TransportError) -> Self {
        self.with_outcome(Err(error))
    }

    /// Serve `outcome` whenever the queue is empty
    pub fn always(mut self, outcome: Outcome) -> Self {
        self.fallback = Some(outcome);
        self
    }

    fn with_outcome(self, outcome: Outcome) -> Self {
        lock_unpoisoned(&self.outcomes).push_back(outcome);
        self
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Outcome {
        lock_unpoisoned(&self.requests).push(request.clone());

        let queued = lock_unpoisoned(&self.outcomes).pop_front();
        match queued.or_else(|| self.fallback.clone()) {
            Some(outcome) => outcome,
            None => Err(TransportError::Other(format!(
                "No mock response for: {} {}",
                request.method, request.path
            ))),
        }
    }
}

//! Registry client trait and implementations

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use serde_json::{Value, json};

use super::types::{RegistryError, SearchResults, parse_search_body};

/// Default registry base URL
pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:8000/supatool/v1";

/// Remote tool registry: search for tools, execute them by identifier
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Search the registry with a natural-language query
    async fn search(&self, query: &str) -> Result<SearchResults, RegistryError>;

    /// Execute a registered tool; returns the response body verbatim
    async fn execute(&self, identifier: &str, params: Value) -> Result<String, RegistryError>;
}

/// HTTP registry client
pub struct HttpRegistryClient {
    http: Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| RegistryError::Format(format!("registry URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| RegistryError::Format(format!("registry URL '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post(&self, url: Url, body: Value) -> Result<String, RegistryError> {
        debug!("POST {}", url);
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl ToolRegistry for HttpRegistryClient {
    async fn search(&self, query: &str) -> Result<SearchResults, RegistryError> {
        let body = self.post(self.endpoint(&["search"])?, json!({ "query": query })).await?;
        parse_search_body(body)
    }

    async fn execute(&self, identifier: &str, params: Value) -> Result<String, RegistryError> {
        self.post(self.endpoint(&["execute", identifier])?, json!({ "params": params }))
            .await
    }
}

/// Scripted registry for tests and offline runs
///
/// Each `search` pops the next scripted body; a body that fails to parse, or a
/// scripted failure, surfaces as a `RegistryError`. `execute` records the call
/// and answers from the scripted execute responses, or a fixed acknowledgement.
#[derive(Debug, Default)]
pub struct MockRegistry {
    searches: Mutex<VecDeque<Result<String, u16>>>,
    executions: Mutex<VecDeque<Result<String, u16>>>,
    queries: Mutex<Vec<String>>,
    executed: Mutex<Vec<(String, Value)>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a search response body
    pub fn with_search(self, body: impl Into<String>) -> Self {
        if let Ok(mut q) = self.searches.lock() {
            q.push_back(Ok(body.into()));
        }
        self
    }

    /// Queue a failed search with the given HTTP status
    pub fn with_search_failure(self, status: u16) -> Self {
        if let Ok(mut q) = self.searches.lock() {
            q.push_back(Err(status));
        }
        self
    }

    /// Queue an execute response body
    pub fn with_execute(self, body: impl Into<String>) -> Self {
        if let Ok(mut q) = self.executions.lock() {
            q.push_back(Ok(body.into()));
        }
        self
    }

    /// Queue a failed execute with the given HTTP status
    pub fn with_execute_failure(self, status: u16) -> Self {
        if let Ok(mut q) = self.executions.lock() {
            q.push_back(Err(status));
        }
        self
    }

    /// Queries searched so far
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// `(identifier, params)` of every execute call so far
    pub fn executed(&self) -> Vec<(String, Value)> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

fn pop_scripted(queue: &Mutex<VecDeque<Result<String, u16>>>) -> Option<Result<String, u16>> {
    queue.lock().ok().and_then(|mut q| q.pop_front())
}

#[async_trait]
impl ToolRegistry for MockRegistry {
    async fn search(&self, query: &str) -> Result<SearchResults, RegistryError> {
        if let Ok(mut q) = self.queries.lock() {
            q.push(query.to_string());
        }
        match pop_scripted(&self.searches) {
            Some(Ok(body)) => parse_search_body(body),
            Some(Err(status)) => Err(RegistryError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            None => parse_search_body("[]"),
        }
    }

    async fn execute(&self, identifier: &str, params: Value) -> Result<String, RegistryError> {
        if let Ok(mut e) = self.executed.lock() {
            e.push((identifier.to_string(), params));
        }
        match pop_scripted(&self.executions) {
            Some(Ok(body)) => Ok(body),
            Some(Err(status)) => Err(RegistryError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            None => Ok(json!({ "status": "ok" }).to_string()),
        }
    }
}

//! Core LLM client trait, error type and a scripted mock

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse};

/// Stateless LLM client - the caller sends the full transcript every call
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier used for requests
    fn model(&self) -> &str;
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500 || *status == 408,
            LlmError::Network(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::JsonError(_) => false,
            LlmError::MissingApiKey { .. } => false,
        }
    }
}

/// Scripted LLM client for tests and dry runs
///
/// Replays queued responses in order. Once the queue is empty it repeats the
/// fallback response if one is set, otherwise it fails with `InvalidResponse`.
/// Every request is recorded so callers can inspect what the model was shown.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<CompletionResponse>>,
    fallback: Option<CompletionResponse>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    /// Create a mock that replays `responses` once each
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that answers every request with `response`
    pub fn repeating(response: CompletionResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Default::default()
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of completion calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self.responses.lock().ok().and_then(|mut queue| queue.pop_front());
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| LlmError::InvalidResponse("mock response queue exhausted".to_string()))
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{Message, ToolCall};

    #[test]
    fn test_llm_error_is_retryable() {
        assert!(
            LlmError::RateLimited {
                retry_after: Duration::from_secs(60)
            }
            .is_retryable()
        );

        assert!(
            LlmError::ApiError {
                status: 503,
                message: "Service unavailable".to_string()
            }
            .is_retryable()
        );

        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "Bad request".to_string()
            }
            .is_retryable()
        );

        assert!(!LlmError::InvalidResponse("bad".to_string()).is_retryable());
        assert!(
            !LlmError::MissingApiKey {
                env_var: "OPENAI_API_KEY".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_missing_api_key_message() {
        let err = LlmError::MissingApiKey {
            env_var: "OPENAI_API_KEY".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing API key: environment variable OPENAI_API_KEY not set"
        );
    }

    #[tokio::test]
    async fn test_mock_replays_in_order_then_fails() {
        let mock = MockLlmClient::new(vec![
            CompletionResponse::text("first"),
            CompletionResponse::tool_calls(vec![ToolCall::new("c1", "finish", "{}")]),
        ]);

        let r1 = mock.complete(CompletionRequest::default()).await.unwrap();
        assert_eq!(r1.message.content_str(), "first");

        let r2 = mock.complete(CompletionRequest::default()).await.unwrap();
        assert_eq!(r2.message.tool_calls[0].name, "finish");

        let r3 = mock.complete(CompletionRequest::default()).await;
        assert!(matches!(r3, Err(LlmError::InvalidResponse(_))));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_repeating_records_requests() {
        let mock = MockLlmClient::repeating(CompletionResponse::text("again"));

        for _ in 0..3 {
            let req = CompletionRequest::new(vec![Message::user("hi")]);
            let resp = mock.complete(req).await.unwrap();
            assert_eq!(resp.message.content_str(), "again");
        }

        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].messages[0].content_str(), "hi");
        assert_eq!(mock.model(), "mock-model");
    }
}

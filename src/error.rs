//! Error types for dynloop
//!
//! Centralized error handling using thiserror. Only failures that abort a run
//! end up here; per-tool-call failures are turned into observations by the
//! dispatcher instead.

use thiserror::Error;

use crate::llm::LlmError;

/// All error types that can abort an agent run
#[derive(Debug, Error)]
pub enum DynloopError {
    /// Model endpoint unreachable or returned an unusable response
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Model did not answer within the configured timeout
    #[error("Timed out after {timeout_ms}ms waiting for {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Run was cancelled through its cancellation token
    #[error("Run cancelled")]
    Cancelled,

    /// Invalid state transition or transcript invariant violation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias for dynloop operations
pub type Result<T> = std::result::Result<T, DynloopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error() {
        let err = DynloopError::Timeout {
            operation: "completion".to_string(),
            timeout_ms: 5000,
        };
        assert_eq!(err.to_string(), "Timed out after 5000ms waiting for completion");
    }

    #[test]
    fn test_cancelled_error() {
        assert_eq!(DynloopError::Cancelled.to_string(), "Run cancelled");
    }

    #[test]
    fn test_invalid_state_error() {
        let err = DynloopError::InvalidState("tool message without pending call".to_string());
        assert_eq!(err.to_string(), "Invalid state: tool message without pending call");
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: DynloopError = LlmError::InvalidResponse("no choices".to_string()).into();
        assert!(matches!(err, DynloopError::Llm(_)));
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(DynloopError::Cancelled)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}

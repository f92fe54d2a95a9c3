//! Tool error types

use thiserror::Error;

use super::expr::ExprError;

/// Errors raised by a built-in tool handler
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Expression(#[from] ExprError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Short category name reported to the model alongside the message
    pub fn category(&self) -> &'static str {
        match self {
            ToolError::InvalidInput(_) => "InvalidInput",
            ToolError::Expression(_) => "ExpressionError",
            ToolError::Http(_) => "HttpError",
            ToolError::Io(_) => "IoError",
        }
    }
}

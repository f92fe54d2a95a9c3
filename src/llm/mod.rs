//! LLM Client Layer - chat-completions integration and tool-call parsing
//!
//! This module provides:
//! - Transcript message types
//! - LlmClient trait for API abstraction
//! - OpenAIClient implementation
//! - MockLlmClient for scripted runs
//! - Response parsing

pub mod client;
pub mod openai;
pub mod tool_parser;
pub mod types;

pub use client::{LlmClient, LlmError, MockLlmClient};
pub use openai::{OpenAIClient, OpenAIConfig};
pub use tool_parser::parse_response;
pub use types::{
    CompletionRequest, CompletionResponse, Message, Role, StopReason, ToolCall, ToolChoice, ToolDefinition, Usage,
};

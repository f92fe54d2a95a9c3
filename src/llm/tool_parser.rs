//! Tool parser for extracting tool calls from chat-completion responses
//!
//! Parses the `choices[0].message` of an OpenAI-style response body into a
//! `CompletionResponse`. Tool-call arguments are kept as raw text; decoding
//! them is the dispatcher's job so that malformed arguments become an
//! observation instead of a failed request.

use serde_json::Value;

use crate::llm::client::LlmError;
use crate::llm::types::{CompletionResponse, Message, StopReason, ToolCall, Usage};

/// Parse a raw chat-completion response body into a CompletionResponse
pub fn parse_response(response: &Value) -> Result<CompletionResponse, LlmError> {
    let choice = response
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

    let message = choice
        .get("message")
        .ok_or_else(|| LlmError::InvalidResponse("choice has no message".to_string()))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let tool_calls: Vec<ToolCall> = message
        .get("tool_calls")
        .and_then(|t| t.as_array())
        .map(|calls| calls.iter().filter_map(parse_tool_call_block).collect())
        .unwrap_or_default();

    let stop_reason = choice
        .get("finish_reason")
        .and_then(|s| s.as_str())
        .map(parse_stop_reason)
        .unwrap_or_default();

    let usage = response.get("usage").map(parse_usage).unwrap_or_default();

    Ok(CompletionResponse {
        message: Message::assistant_tool_calls(content, tool_calls),
        stop_reason,
        usage,
    })
}

/// Parse a single `tool_calls[]` entry into a ToolCall
///
/// Arguments may arrive as a JSON string (the normal case) or, from some
/// compatible servers, as an already-decoded object.
fn parse_tool_call_block(block: &Value) -> Option<ToolCall> {
    let id = block.get("id").and_then(|v| v.as_str())?.to_string();
    let function = block.get("function")?;
    let name = function.get("name").and_then(|v| v.as_str())?.to_string();
    let arguments = match function.get("arguments") {
        Some(Value::String(raw)) => raw.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Some(ToolCall { id, name, arguments })
}

/// Parse finish_reason string into StopReason enum
fn parse_stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::EndTurn,
        "tool_calls" | "function_call" => StopReason::ToolUse,
        "length" => StopReason::MaxTokens,
        "content_filter" => StopReason::ContentFilter,
        _ => StopReason::EndTurn,
    }
}

/// Parse usage object from response
fn parse_usage(usage: &Value) -> Usage {
    Usage {
        input_tokens: usage.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
        output_tokens: usage.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
    }
}

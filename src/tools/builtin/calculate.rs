//! calculate tool - evaluate an arithmetic formula

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::decode;
use crate::tools::expr::evaluate;
use crate::tools::{Tool, ToolContext, ToolError, ToolOutput};

#[derive(Debug, Deserialize)]
struct CalculateArgs {
    formula: String,
}

pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &'static str {
        "calculate"
    }

    fn description(&self) -> &'static str {
        "Calculate the result of a given formula."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "formula": {
                    "type": "string",
                    "description": "Numerical expression to compute the result of. Supports + - * / // % ** and parentheses."
                }
            },
            "required": ["formula"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let args: CalculateArgs = decode(input)?;
        let value = evaluate(&args.formula)?;
        Ok(ToolOutput::Text(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_context;

    #[tokio::test]
    async fn test_calculate_basic() {
        let result = CalculateTool
            .execute(serde_json::json!({"formula": "2+2"}), &test_context())
            .await
            .unwrap();
        assert_eq!(result, ToolOutput::Text("4".to_string()));
    }

    #[tokio::test]
    async fn test_calculate_fractional() {
        let result = CalculateTool
            .execute(serde_json::json!({"formula": "(1 + 2) / 4"}), &test_context())
            .await
            .unwrap();
        assert_eq!(result, ToolOutput::Text("0.75".to_string()));
    }

    #[tokio::test]
    async fn test_calculate_large_integer_is_exact() {
        let result = CalculateTool
            .execute(serde_json::json!({"formula": "2**53 + 1"}), &test_context())
            .await
            .unwrap();
        assert_eq!(result, ToolOutput::Text("9007199254740993".to_string()));
    }

    #[tokio::test]
    async fn test_calculate_overflow_is_an_error() {
        let err = CalculateTool
            .execute(serde_json::json!({"formula": "2**200"}), &test_context())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "ExpressionError");
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_calculate_malformed_formula() {
        let err = CalculateTool
            .execute(serde_json::json!({"formula": "2 +* 2"}), &test_context())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "ExpressionError");
    }

    #[tokio::test]
    async fn test_calculate_missing_formula() {
        let err = CalculateTool
            .execute(serde_json::json!({}), &test_context())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}

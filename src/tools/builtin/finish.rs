//! finish tool - answer the user and end the run

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::decode;
use crate::tools::{Tool, ToolContext, ToolError, ToolOutput};

#[derive(Debug, Deserialize)]
struct FinishArgs {
    answer: String,
}

pub struct FinishTool;

#[async_trait]
impl Tool for FinishTool {
    fn name(&self) -> &'static str {
        "finish"
    }

    fn description(&self) -> &'static str {
        "Answer the user's question, and finish the conversation."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "answer": {
                    "type": "string",
                    "description": "Answer to the user's question."
                }
            },
            "required": ["answer"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let args: FinishArgs = decode(input)?;
        Ok(ToolOutput::Finish(args.answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_context;

    #[tokio::test]
    async fn test_finish_raises_termination() {
        let result = FinishTool
            .execute(
                serde_json::json!({"answer": "Your reservation is booked."}),
                &test_context(),
            )
            .await
            .unwrap();

        assert_eq!(result, ToolOutput::Finish("Your reservation is booked.".to_string()));
        assert!(result.is_finish());
    }

    #[tokio::test]
    async fn test_finish_missing_answer() {
        let result = FinishTool.execute(serde_json::json!({}), &test_context()).await;
        assert!(result.is_err());
    }
}

//! ask_human tool - put a question to the operator

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::decode;
use crate::tools::{Tool, ToolContext, ToolError, ToolOutput};

#[derive(Debug, Deserialize)]
struct AskHumanArgs {
    question: String,
}

pub struct AskHumanTool;

#[async_trait]
impl Tool for AskHumanTool {
    fn name(&self) -> &'static str {
        "ask_human"
    }

    fn description(&self) -> &'static str {
        "Ask the user for additional context or information if you need it."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "A question to ask the user."
                }
            },
            "required": ["question"]
        })
    }

    fn is_interactive(&self) -> bool {
        true
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let args: AskHumanArgs = decode(input)?;
        let reply = ctx.console.ask(&args.question).await?;
        Ok(ToolOutput::Text(reply.unwrap_or_default()))
    }
}

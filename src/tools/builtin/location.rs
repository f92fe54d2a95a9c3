//! get_current_location tool - approximate coordinates of this machine

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Tool, ToolContext, ToolError, ToolOutput};

pub struct LocationTool;

#[async_trait]
impl Tool for LocationTool {
    fn name(&self) -> &'static str {
        "get_current_location"
    }

    fn description(&self) -> &'static str {
        "Get the current location of the user."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let body = ctx
            .http
            .get(&ctx.location_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(ToolOutput::Text(body))
    }
}

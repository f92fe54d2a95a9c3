//! search_tools - registry discovery, dispatched specially
//!
//! Searching mutates the session catalog, so it is not a plain `Tool`; the
//! dispatcher recognises the name and routes to the registry itself.

use serde::Deserialize;

use crate::tools::ToolDescriptor;

/// Name the model uses to search the registry
pub const SEARCH_TOOLS_NAME: &str = "search_tools";

#[derive(Debug, Deserialize)]
pub struct SearchArgs {
    pub query: String,
}

/// Descriptor offered to the model for registry search
pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        SEARCH_TOOLS_NAME,
        "Search the tool registry for more tools that can extend your functionality. \
         If you do not have the ability to execute a task, search for more options.",
    )
    .with_schema(serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "A query to search for more tools that can execute actions. \
                                This should be a full sentence describing what you need to do."
            }
        },
        "required": ["query"],
        "additionalProperties": false
    }))
}

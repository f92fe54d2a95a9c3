//! Built-in tools handled in-process

mod ask_human;
mod calculate;
mod finish;
mod location;
pub mod search;

pub use ask_human::AskHumanTool;
pub use calculate::CalculateTool;
pub use finish::FinishTool;
pub use location::LocationTool;
pub use search::SEARCH_TOOLS_NAME;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ToolError;

/// Decode tool input into the handler's typed arguments
fn decode<T: DeserializeOwned>(input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

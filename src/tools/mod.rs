//! Tool System - descriptors, catalog, built-in handlers, and dispatch

pub mod builtin;
mod catalog;
pub mod console;
mod context;
mod definition;
mod dispatcher;
mod error;
pub mod expr;

pub use builtin::SEARCH_TOOLS_NAME;
pub use catalog::{Resolution, ToolCatalog};
pub use console::{Console, ScriptedConsole, StdConsole};
pub use context::{DEFAULT_LOCATION_URL, ToolContext};
pub use definition::{ToolDescriptor, ToolKind};
pub use dispatcher::{DispatchError, Dispatcher, ToolOutcome};
pub use error::ToolError;

use async_trait::async_trait;
use serde_json::Value;

/// Names of the built-ins offered to the model by default
pub const DEFAULT_BUILTINS: &[&str] = &["calculate", "finish", "ask_human", SEARCH_TOOLS_NAME];

/// What a built-in handler produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    /// Observation text returned to the model
    Text(String),
    /// Termination signal carrying the final answer
    Finish(String),
}

impl ToolOutput {
    pub fn is_finish(&self) -> bool {
        matches!(self, ToolOutput::Finish(_))
    }
}

/// Trait for in-process tool implementations
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match the descriptor name)
    fn name(&self) -> &'static str;

    /// Tool description for the model
    fn description(&self) -> &'static str;

    /// JSON schema for input parameters
    fn input_schema(&self) -> Value;

    /// Interactive tools wait on a person and are exempt from the tool timeout
    fn is_interactive(&self) -> bool {
        false
    }

    /// Execute the tool with validated input
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError>;

    /// Descriptor offered to the model
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(self.name(), self.description()).with_schema(self.input_schema())
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> ToolContext {
    ToolContext::new(std::sync::Arc::new(ScriptedConsole::default()), reqwest::Client::new())
}

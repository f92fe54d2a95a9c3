//! Tool dispatcher - routes one model tool call to its handler
//!
//! Every call yields exactly one `ToolOutcome`. Failures become observations
//! the model can read and recover from; only the finish signal changes
//! control flow.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use log::{debug, info, warn};

use super::builtin::search::{self, SearchArgs};
use super::builtin::{AskHumanTool, CalculateTool, FinishTool, LocationTool, SEARCH_TOOLS_NAME};
use super::catalog::{Resolution, ToolCatalog};
use super::context::ToolContext;
use super::definition::ToolDescriptor;
use super::{Tool, ToolOutput};
use crate::llm::ToolCall;
use crate::registry::{RegistryError, ToolRegistry};

/// Recoverable failure of a single tool call
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid function name: '{name}'")]
    UnknownTool { name: String },

    #[error("Error decoding function call `{name}` arguments {arguments:?}! Error: {message}")]
    ArgumentDecode {
        name: String,
        arguments: String,
        message: String,
    },

    #[error("Tool '{name}' has no registry identifier; search for it again")]
    UnresolvableTool { name: String },

    #[error("Error calling function `{name}`: RegistryError: {source}!")]
    Registry {
        name: String,
        #[source]
        source: RegistryError,
    },

    #[error("Error calling function `{name}`: {category}: {message}!")]
    Handler {
        name: String,
        category: String,
        message: String,
    },

    #[error("Error calling function `{name}`: Timeout: no result after {timeout_ms}ms!")]
    Timeout { name: String, timeout_ms: u64 },
}

/// Result of dispatching one tool call
#[derive(Debug)]
pub enum ToolOutcome {
    /// Successful observation text
    Observation(String),
    /// Recoverable failure, reported to the model
    Failed(DispatchError),
    /// The finish tool ran; carries the final answer
    Finish(String),
}

impl ToolOutcome {
    /// Text appended to the transcript for this call
    pub fn observation_text(&self) -> String {
        match self {
            ToolOutcome::Observation(text) | ToolOutcome::Finish(text) => text.clone(),
            ToolOutcome::Failed(err) => err.to_string(),
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, ToolOutcome::Finish(_))
    }
}

/// Routes tool calls to built-in handlers, registry search, or registry execute
pub struct Dispatcher {
    handlers: HashMap<String, Box<dyn Tool>>,
    registry: Arc<dyn ToolRegistry>,
    ctx: ToolContext,
    tool_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher with no built-in handlers
    pub fn new(registry: Arc<dyn ToolRegistry>, ctx: ToolContext) -> Self {
        Self {
            handlers: HashMap::new(),
            registry,
            ctx,
            tool_timeout: None,
        }
    }

    /// Create a dispatcher with the standard built-in handlers
    pub fn standard(registry: Arc<dyn ToolRegistry>, ctx: ToolContext) -> Self {
        let mut dispatcher = Self::new(registry, ctx);
        dispatcher.add_tool(Box::new(CalculateTool));
        dispatcher.add_tool(Box::new(FinishTool));
        dispatcher.add_tool(Box::new(AskHumanTool));
        dispatcher.add_tool(Box::new(LocationTool));
        dispatcher
    }

    /// Bound every non-interactive tool execution
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Register a built-in handler
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        self.handlers.insert(tool.name().to_string(), tool);
    }

    /// Build a session catalog offering the named built-ins
    ///
    /// Names without a handler (other than the search tool) are skipped.
    pub fn catalog_for<S: AsRef<str>>(&self, names: &[S]) -> ToolCatalog {
        let mut builtins: Vec<ToolDescriptor> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if name == SEARCH_TOOLS_NAME {
                builtins.push(search::descriptor());
            } else if let Some(tool) = self.handlers.get(name) {
                builtins.push(tool.descriptor());
            } else {
                warn!("No handler for configured built-in {}; skipping", name);
            }
        }
        ToolCatalog::new(builtins)
    }

    /// Dispatch one tool call
    pub async fn dispatch(&self, call: &ToolCall, catalog: &mut ToolCatalog) -> ToolOutcome {
        let name = call.name.as_str();
        let resolution = catalog.resolve(name);
        debug!("Dispatching {} ({}) as {:?}", name, call.id, resolution);

        let result = match resolution {
            Resolution::Builtin if name == SEARCH_TOOLS_NAME => self.search(call, catalog).await,
            Resolution::Builtin => self.run_builtin(call, catalog).await,
            Resolution::Dynamic(identifier) => self.run_dynamic(call, &identifier).await,
            Resolution::Unresolvable => Err(DispatchError::UnresolvableTool { name: name.to_string() }),
            Resolution::Unknown => Err(DispatchError::UnknownTool { name: name.to_string() }),
        };

        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Tool call {} ({}) failed: {}", name, call.id, err);
                ToolOutcome::Failed(err)
            }
        }
    }

    async fn search(&self, call: &ToolCall, catalog: &mut ToolCatalog) -> Result<ToolOutcome, DispatchError> {
        let input = decode_arguments(call)?;
        let args: SearchArgs = serde_json::from_value(input).map_err(|e| argument_error(call, e.to_string()))?;

        let results = self
            .bounded(&call.name, self.registry.search(&args.query))
            .await?
            .map_err(|source| DispatchError::Registry {
                name: call.name.clone(),
                source,
            })?;

        info!("Registry search for {:?} found {} tools", args.query, results.entries.len());

        catalog.reset_dynamic(results.entries.iter().map(|e| e.descriptor.clone()));
        for entry in &results.entries {
            catalog.record_identifier(entry.descriptor.name.clone(), entry.identifier.clone());
        }

        Ok(ToolOutcome::Observation(results.raw))
    }

    async fn run_dynamic(&self, call: &ToolCall, identifier: &str) -> Result<ToolOutcome, DispatchError> {
        let params = decode_arguments(call)?;
        info!("Executing registry tool {} ({})", call.name, identifier);

        let body = self
            .bounded(&call.name, self.registry.execute(identifier, params))
            .await?
            .map_err(|source| DispatchError::Registry {
                name: call.name.clone(),
                source,
            })?;

        Ok(ToolOutcome::Observation(body))
    }

    async fn run_builtin(&self, call: &ToolCall, catalog: &ToolCatalog) -> Result<ToolOutcome, DispatchError> {
        let Some(tool) = self.handlers.get(&call.name) else {
            return Err(DispatchError::UnknownTool { name: call.name.clone() });
        };

        let input = decode_arguments(call)?;
        let descriptor = catalog.get(&call.name).cloned().unwrap_or_else(|| tool.descriptor());
        descriptor
            .validate_arguments(&input)
            .map_err(|e| argument_error(call, e.to_string()))?;

        let execution = tool.execute(input, &self.ctx);
        let result = if tool.is_interactive() {
            execution.await
        } else {
            self.bounded(&call.name, execution).await?
        };

        match result {
            Ok(ToolOutput::Text(text)) => Ok(ToolOutcome::Observation(text)),
            Ok(ToolOutput::Finish(answer)) => Ok(ToolOutcome::Finish(answer)),
            Err(e) => Err(DispatchError::Handler {
                name: call.name.clone(),
                category: e.category().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Apply the tool timeout, if any
    async fn bounded<F, T>(&self, name: &str, fut: F) -> Result<T, DispatchError>
    where
        F: Future<Output = T>,
    {
        match self.tool_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| DispatchError::Timeout {
                name: name.to_string(),
                timeout_ms: limit.as_millis() as u64,
            }),
            None => Ok(fut.await),
        }
    }
}

/// Decode the raw argument text as a JSON object; empty text is `{}`
fn decode_arguments(call: &ToolCall) -> Result<Value, DispatchError> {
    let raw = call.arguments.trim();
    if raw.is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| argument_error(call, e.to_string()))?;
    if !value.is_object() {
        return Err(argument_error(call, "expected a JSON object".to_string()));
    }
    Ok(value)
}

fn argument_error(call: &ToolCall, message: String) -> DispatchError {
    DispatchError::ArgumentDecode {
        name: call.name.clone(),
        arguments: call.arguments.clone(),
        message,
    }
}

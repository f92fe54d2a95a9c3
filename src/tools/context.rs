//! Tool execution context - shared handles the built-in tools need

use std::sync::Arc;

use super::console::{Console, StdConsole};

/// Default endpoint for the location lookup tool
pub const DEFAULT_LOCATION_URL: &str = "http://ip-api.com/json?fields=lat,lon";

/// Execution context handed to every built-in tool
#[derive(Clone)]
pub struct ToolContext {
    /// Where the human-prompt tool asks its questions
    pub console: Arc<dyn Console>,

    /// HTTP client for tools that call out to the network
    pub http: reqwest::Client,

    /// URL the location tool queries
    pub location_url: String,
}

impl ToolContext {
    pub fn new(console: Arc<dyn Console>, http: reqwest::Client) -> Self {
        Self {
            console,
            http,
            location_url: DEFAULT_LOCATION_URL.to_string(),
        }
    }

    /// Context for an interactive terminal session
    pub fn interactive() -> Self {
        Self::new(Arc::new(StdConsole::new()), reqwest::Client::new())
    }

    /// Override the location lookup endpoint
    pub fn with_location_url(mut self, url: impl Into<String>) -> Self {
        self.location_url = url.into();
        self
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("location_url", &self.location_url)
            .finish()
    }
}

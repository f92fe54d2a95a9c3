//! Tool Registry Client - remote search and execute
//!
//! The registry is an external HTTP service. Search returns groups of
//! endpoints, each carrying a tool descriptor and an opaque identifier;
//! execute runs a tool by that identifier.

mod client;
mod types;

pub use client::{DEFAULT_REGISTRY_URL, HttpRegistryClient, MockRegistry, ToolRegistry};
pub use types::{DiscoveredTool, RegistryError, SearchResults, parse_search_body};

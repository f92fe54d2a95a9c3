//! Registry wire types and search-result parsing

use serde::Deserialize;
use thiserror::Error;

use crate::tools::ToolDescriptor;

/// Errors talking to the tool registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Registry returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed registry response: {0}")]
    Format(String),
}

/// A tool found by a registry search
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredTool {
    /// Opaque registry identifier used for execution
    pub identifier: String,
    pub descriptor: ToolDescriptor,
}

/// Outcome of one successful search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Response body verbatim, used as the observation text
    pub raw: String,
    pub entries: Vec<DiscoveredTool>,
}

#[derive(Debug, Deserialize)]
struct SearchGroup {
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    name: String,
    cuid: String,
    #[serde(rename = "toolString")]
    tool_string: String,
}

/// Parse a search response body
///
/// Groups are flattened in order. The endpoint's `name` wins over the name
/// inside `toolString` when the two disagree.
pub fn parse_search_body(raw: impl Into<String>) -> Result<SearchResults, RegistryError> {
    let raw = raw.into();
    let groups: Vec<SearchGroup> =
        serde_json::from_str(&raw).map_err(|e| RegistryError::Format(format!("search body: {}", e)))?;

    let mut entries = Vec::new();
    for endpoint in groups.into_iter().flat_map(|g| g.endpoints) {
        let tool_json: serde_json::Value = serde_json::from_str(&endpoint.tool_string)
            .map_err(|e| RegistryError::Format(format!("toolString for '{}': {}", endpoint.name, e)))?;
        let mut descriptor = ToolDescriptor::from_tool_json(&tool_json)
            .ok_or_else(|| RegistryError::Format(format!("toolString for '{}' has no function name", endpoint.name)))?;

        if descriptor.name != endpoint.name {
            log::warn!(
                "Registry endpoint '{}' carries descriptor named '{}'; using endpoint name",
                endpoint.name,
                descriptor.name
            );
            descriptor.name = endpoint.name.clone();
        }

        entries.push(DiscoveredTool {
            identifier: endpoint.cuid,
            descriptor,
        });
    }

    Ok(SearchResults { raw, entries })
}

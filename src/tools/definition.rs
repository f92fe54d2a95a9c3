//! Tool descriptors and kind classification
//!
//! A descriptor is what the model sees for one tool. The kind tag decides how
//! a call is routed: built-ins run in-process, dynamic tools go to the
//! registry's execute endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::ToolDefinition;

use super::error::ToolError;

/// Where a tool's implementation lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Handled in-process by the dispatcher
    #[default]
    Builtin,
    /// Discovered through registry search, executed remotely
    Dynamic,
}

/// A tool descriptor with its routing kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within a catalog
    pub name: String,
    /// Human-readable description for the model
    pub description: String,
    /// JSON schema for input parameters
    pub parameters: Value,
    #[serde(default)]
    pub kind: ToolKind,
}

impl ToolDescriptor {
    /// Create a new built-in descriptor with an empty parameter schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            kind: ToolKind::Builtin,
        }
    }

    /// Set parameter schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }

    /// Set kind
    pub fn with_kind(mut self, kind: ToolKind) -> Self {
        self.kind = kind;
        self
    }

    /// Parse a dynamic descriptor from a registry tool definition
    ///
    /// Accepts the function-calling envelope
    /// `{"type": "function", "function": {...}}` or the bare inner object.
    pub fn from_tool_json(value: &Value) -> Option<Self> {
        let function = value.get("function").unwrap_or(value);
        let name = function.get("name")?.as_str()?.to_string();
        let description = function
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or_default()
            .to_string();
        let parameters = function
            .get("parameters")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}}));

        Some(Self {
            name,
            description,
            parameters,
            kind: ToolKind::Dynamic,
        })
    }

    /// Convert to the definition sent to the model
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(&self.name, &self.description, self.parameters.clone())
    }

    /// Check decoded arguments against the parameter schema
    ///
    /// Verifies the payload is an object, every required field is present,
    /// and declared primitive types and enums match. Properties not in the
    /// schema are left alone.
    pub fn validate_arguments(&self, input: &Value) -> Result<(), ToolError> {
        let args = input
            .as_object()
            .ok_or_else(|| ToolError::InvalidInput(format!("arguments for '{}' must be a JSON object", self.name)))?;

        if let Some(required) = self.parameters.get("required").and_then(|r| r.as_array()) {
            for field in required.iter().filter_map(|r| r.as_str()) {
                if !args.contains_key(field) {
                    return Err(ToolError::InvalidInput(format!("missing required field '{}'", field)));
                }
            }
        }

        let Some(properties) = self.parameters.get("properties").and_then(|p| p.as_object()) else {
            return Ok(());
        };

        for (field, value) in args {
            let Some(property) = properties.get(field) else {
                continue;
            };

            if let Some(expected) = property.get("type")
                && !matches_schema_type(expected, value)
            {
                return Err(ToolError::InvalidInput(format!(
                    "field '{}' should be of type {}, got {}",
                    field,
                    expected,
                    json_type_name(value)
                )));
            }

            if let Some(allowed) = property.get("enum").and_then(|e| e.as_array())
                && !allowed.contains(value)
            {
                return Err(ToolError::InvalidInput(format!(
                    "field '{}' must be one of {}",
                    field,
                    Value::Array(allowed.clone())
                )));
            }
        }

        Ok(())
    }
}

fn matches_schema_type(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => matches_type_name(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(|n| n.as_str())
            .any(|n| matches_type_name(n, value)),
        _ => true,
    }
}

fn matches_type_name(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather() -> ToolDescriptor {
        ToolDescriptor::new("get_current_weather", "Get the current weather").with_schema(json!({
            "type": "object",
            "properties": {
                "latitude": {"type": "number"},
                "longitude": {"type": "number"},
                "temperature_unit": {"type": "string", "enum": ["celsius", "fahrenheit"]}
            },
            "required": ["latitude", "longitude", "temperature_unit"]
        }))
    }

    #[test]
    fn test_new_descriptor_defaults() {
        let tool = ToolDescriptor::new("finish", "Finish the conversation");
        assert_eq!(tool.kind, ToolKind::Builtin);
        assert_eq!(tool.parameters["type"], "object");
    }

    #[test]
    fn test_from_tool_json_envelope() {
        let value = json!({
            "type": "function",
            "function": {
                "name": "reserve_restaurant",
                "description": "Book a table",
                "parameters": {"type": "object", "properties": {"restaurant": {"type": "string"}}}
            }
        });

        let tool = ToolDescriptor::from_tool_json(&value).unwrap();
        assert_eq!(tool.name, "reserve_restaurant");
        assert_eq!(tool.description, "Book a table");
        assert_eq!(tool.kind, ToolKind::Dynamic);
        assert!(tool.parameters["properties"]["restaurant"].is_object());
    }

    #[test]
    fn test_from_tool_json_flat_without_parameters() {
        let tool = ToolDescriptor::from_tool_json(&json!({"name": "ping"})).unwrap();
        assert_eq!(tool.name, "ping");
        assert!(tool.description.is_empty());
        assert_eq!(tool.parameters["type"], "object");
    }

    #[test]
    fn test_from_tool_json_without_name() {
        assert!(ToolDescriptor::from_tool_json(&json!({"description": "nameless"})).is_none());
    }

    #[test]
    fn test_to_definition() {
        let def = weather().to_definition();
        assert_eq!(def.name, "get_current_weather");
        assert_eq!(def.parameters["required"][0], "latitude");
    }

    #[test]
    fn test_validate_arguments_ok() {
        let args = json!({"latitude": 42.3, "longitude": -71.0, "temperature_unit": "celsius"});
        assert!(weather().validate_arguments(&args).is_ok());
    }

    #[test]
    fn test_validate_arguments_missing_required() {
        let args = json!({"latitude": 42.3, "temperature_unit": "celsius"});
        let err = weather().validate_arguments(&args).unwrap_err();
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn test_validate_arguments_wrong_type() {
        let args = json!({"latitude": "north", "longitude": -71.0, "temperature_unit": "celsius"});
        let err = weather().validate_arguments(&args).unwrap_err();
        assert!(err.to_string().contains("latitude"));
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_validate_arguments_enum() {
        let args = json!({"latitude": 1, "longitude": 2, "temperature_unit": "kelvin"});
        let err = weather().validate_arguments(&args).unwrap_err();
        assert!(err.to_string().contains("must be one of"));
    }

    #[test]
    fn test_validate_arguments_not_object() {
        let err = weather().validate_arguments(&json!(["a"])).unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn test_validate_arguments_integer_and_union_types() {
        let tool = ToolDescriptor::new("t", "t").with_schema(json!({
            "type": "object",
            "properties": {
                "count": {"type": "integer"},
                "label": {"type": ["string", "null"]}
            }
        }));

        assert!(tool.validate_arguments(&json!({"count": 3, "label": null})).is_ok());
        assert!(tool.validate_arguments(&json!({"count": 3.5})).is_err());
        assert!(tool.validate_arguments(&json!({"extra": true})).is_ok());
    }
}

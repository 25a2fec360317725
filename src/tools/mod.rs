//! Invocable, schema-validated actions.
//!
//! A [`Tool`] declares a JSON Schema for its arguments; the
//! [`ToolRegistry`] checks incoming arguments against that schema before
//! the tool runs, so a handler never sees structurally invalid input.
//! The check covers what the declared schemas actually use: object shape,
//! `required` names, and primitive property types.

mod cms;

pub use cms::{default_registry, ClearCache, SearchContent, SiteInfo};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Static description of a tool, returned by `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub input_schema: Value,
}

/// Failure modes of tool lookup and execution.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No tool registered under the requested name.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// The requested name.
        name: String,
    },

    /// Arguments did not satisfy the tool's input schema.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// Description of the mismatch.
        message: String,
    },

    /// The tool ran and failed.
    #[error("{0}")]
    ExecutionFailed(String),
}

impl From<crate::error::StoreError> for ToolError {
    fn from(err: crate::error::StoreError) -> Self {
        Self::ExecutionFailed(err.to_string())
    }
}

/// An invocable, schema-validated action.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the static definition of this tool.
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool with already-validated arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails against the backing store.
    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError>;
}

/// Checks arguments against a tool's declared input schema.
///
/// Covers `type: object` at the root, `required` property names, and the
/// declared `type` of each present property (`string`, `integer`,
/// `number`, `boolean`, `array`, `object`).
///
/// # Errors
///
/// Returns [`ToolError::InvalidArguments`] on the first mismatch.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), ToolError> {
    let invalid = |message: String| ToolError::InvalidArguments { message };

    if schema.get("type").and_then(Value::as_str) == Some("object") && !arguments.is_object() {
        return Err(invalid("arguments must be an object".to_string()));
    }

    let args = arguments.as_object();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if args.map_or(true, |a| !a.contains_key(name)) {
                return Err(invalid(format!("missing required argument: {name}")));
            }
        }
    }

    let (Some(args), Some(properties)) =
        (args, schema.get("properties").and_then(Value::as_object))
    else {
        return Ok(());
    };

    for (name, prop_schema) in properties {
        let Some(value) = args.get(name) else {
            continue;
        };
        let Some(expected) = prop_schema.get("type").and_then(Value::as_str) else {
            continue;
        };
        let ok = match expected {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        };
        if !ok {
            return Err(invalid(format!("argument '{name}' must be of type {expected}")));
        }
    }

    Ok(())
}

/// Ordered collection of tools.
///
/// Constructed once at startup from an explicit registration list and
/// shared read-only across connections.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates a registry from an explicit list of tools.
    #[must_use]
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// Returns every definition, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invokes a tool by name.
    ///
    /// Arguments are validated against the tool's schema first; a
    /// mismatch fails fast without running the tool.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown name, invalid arguments, or a
    /// failed execution.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.definition().name == name)
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })?;

        validate_arguments(&tool.definition().input_schema, arguments)?;
        tool.execute(arguments).await
    }
}

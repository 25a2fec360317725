//! Request routing for the MCP method surface.
//!
//! The dispatcher is stateless per request and holds only shared,
//! read-only registries, so one instance is cloned freely across every
//! transport connection and invoked concurrently.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::resources::{RegistryError, ResourceError, ResourceRegistry};
use crate::tools::{ToolError, ToolRegistry};

use super::protocol::{ErrorCode, JsonRpcError, JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse};

/// Routes parsed requests to the built-in methods and the registries.
#[derive(Clone)]
pub struct Dispatcher {
    resources: Arc<ResourceRegistry>,
    tools: Arc<ToolRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over shared registries.
    #[must_use]
    pub fn new(resources: Arc<ResourceRegistry>, tools: Arc<ToolRegistry>) -> Self {
        Self { resources, tools }
    }

    /// Handles one request and produces its response envelope.
    ///
    /// # Errors
    ///
    /// Returns a `JsonRpcError` envelope for unknown methods, invalid
    /// params and registry failures. Transport teardown is never signalled
    /// through this path.
    pub async fn dispatch(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        match req.method.as_str() {
            "ping" => Ok(JsonRpcResponse::success(req.id, json!("pong"))),
            "resources/list" => Ok(JsonRpcResponse::success(
                req.id,
                json!({ "resources": self.resources.list() }),
            )),
            "resources/read" => self.handle_resources_read(req).await,
            "tools/list" => Ok(JsonRpcResponse::success(
                req.id,
                json!({ "tools": self.tools.list() }),
            )),
            "tools/call" => self.handle_tools_call(req).await,
            _ => Err(JsonRpcError::method_not_found(req.id, &req.method)),
        }
    }

    async fn handle_resources_read(
        &self,
        req: JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let uri = req
            .params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "missing string param: uri")
            })?;

        match self.resources.read(uri).await {
            Ok(contents) => Ok(JsonRpcResponse::success(
                req.id,
                json!({ "contents": contents }),
            )),
            Err(RegistryError::NoMatch { uri }) => {
                Err(JsonRpcError::resource_not_found(req.id, &uri))
            }
            Err(RegistryError::Read(ResourceError::NotFound(message))) => Err(JsonRpcError::new(
                Some(req.id),
                JsonRpcErrorData::with_message(ErrorCode::ResourceNotFound, message),
            )),
            Err(RegistryError::Read(ResourceError::ReadFailed(message))) => {
                Err(JsonRpcError::application(req.id, message))
            }
        }
    }

    async fn handle_tools_call(
        &self,
        req: JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let params = req.params.as_ref();
        let name = params
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "missing string param: name")
            })?;
        let arguments = params
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        match self.tools.call(name, &arguments).await {
            Ok(result) => Ok(JsonRpcResponse::success(req.id, result)),
            Err(err @ ToolError::UnknownTool { .. }) => Err(JsonRpcError::new(
                Some(req.id),
                JsonRpcErrorData::with_message(ErrorCode::MethodNotFound, err.to_string()),
            )),
            Err(ToolError::InvalidArguments { message }) => {
                Err(JsonRpcError::invalid_params(req.id, message))
            }
            Err(ToolError::ExecutionFailed(message)) => {
                Err(JsonRpcError::application(req.id, message))
            }
        }
    }
}

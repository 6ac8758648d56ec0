//! MCP Server Implementation
//!
//! This module contains the protocol core shared by every transport:
//! - JSON-RPC 2.0 request/response/notification structures
//! - MCP result shapes for tools, prompts and resources
//! - The capability registry (tools, prompts, resources) with typed argument validation
//! - The dispatcher that routes MCP methods to registered handlers

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::error::{RpcError, ToolError};
use crate::core::notify::Notifier;
use crate::{prompts, resources, tools};

/// MCP protocol revision reported in `initialize` responses.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
const JSONRPC_VERSION: &str = "2.0";

/// Server metadata reported in MCP initialize responses.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server name as reported in MCP initialize responses
    pub server_name: String,
    /// Server version string as reported in MCP initialize responses
    pub server_version: String,
}

/// JSON-RPC 2.0 request structure for MCP protocol.
///
/// The jsonrpc field must be "2.0", id is optional (None for notifications),
/// method specifies the MCP method to call, and params contains method-specific
/// parameters.
#[derive(Deserialize, Debug, Clone)]
pub struct MCPRequest {
    /// JSON-RPC version identifier, must be "2.0"
    pub jsonrpc: String,
    /// Request ID for correlating responses. None indicates a notification.
    #[serde(default)]
    pub id: Option<Value>,
    /// MCP method name (e.g., "initialize", "tools/list", "tools/call")
    pub method: String,
    /// Method-specific parameters as JSON value
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure for MCP protocol.
///
/// Responses include jsonrpc "2.0", the request id, and either a result
/// or an error.
#[derive(Serialize, Debug, Clone)]
pub struct MCPResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MCPError>,
}

impl MCPResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, error: impl Into<MCPError>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn from_result(id: Option<Value>, result: Result<Value, RpcError>) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(err) => Self::failure(id, err),
        }
    }
}

/// JSON-RPC 2.0 error structure.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MCPError {
    /// JSON-RPC error code (e.g., -32601 for method not found)
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<RpcError> for MCPError {
    fn from(err: RpcError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            data: None,
        }
    }
}

/// JSON-RPC 2.0 notification sent from server to client (no id, no response).
#[derive(Serialize, Debug, Clone)]
pub struct MCPNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl MCPNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
        }
    }
}

/// Any message a transport writes back to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum Outbound {
    Response(MCPResponse),
    Notification(MCPNotification),
}

/// Content block inside tool results and prompt messages.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }
}

/// Result of `tools/call`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    pub is_error: bool,
}

impl CallToolResult {
    /// Successful result carrying a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    /// Tool-level failure reported in-band rather than as a JSON-RPC error.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: true,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Content,
}

/// Result of `prompts/get`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GetPromptResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

/// Result of `resources/read`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

/// MCP tool definition structure.
///
/// Each tool must have a unique name, description, and JSON schema defining
/// its input parameters. This structure is serialized when listing tools.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MCPTool {
    pub name: String,
    pub description: String,
    /// JSON Schema advertised to clients
    pub input_schema: Value,
}

#[derive(Serialize, Debug, Clone)]
pub struct MCPPromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// MCP prompt definition, serialized by `prompts/list`.
#[derive(Serialize, Debug, Clone)]
pub struct MCPPrompt {
    pub name: String,
    pub description: String,
    pub arguments: Vec<MCPPromptArgument>,
}

/// MCP resource definition, serialized by `resources/list`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MCPResource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Per-invocation capabilities handed to a tool handler.
#[derive(Clone)]
pub struct ToolContext {
    /// Out-of-band notification delivery to the calling client
    pub notifier: Notifier,
    /// Fires when the client cancels the request or disconnects
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn new(notifier: Notifier, cancel: CancellationToken) -> Self {
        Self { notifier, cancel }
    }
}

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<CallToolResult, ToolError>> + Send>>;

/// Tool handler function type definition.
///
/// Handlers receive the raw JSON arguments and the invocation context. The
/// registry builds these from typed handlers, so argument decoding has already
/// happened by the time user code runs.
pub type ToolHandler = Box<dyn Fn(Value, ToolContext) -> ToolFuture + Send + Sync>;
pub type PromptHandler = Box<dyn Fn(Value) -> Result<GetPromptResult, ToolError> + Send + Sync>;
pub type ResourceHandler = Box<dyn Fn() -> ReadResourceResult + Send + Sync>;

/// Registry of available MCP tools, prompts and resources.
///
/// Definitions are kept in registration order for the list methods; handlers
/// are looked up by tool/prompt name or resource URI.
#[derive(Default)]
pub struct Registry {
    pub tools: Vec<MCPTool>,
    tool_handlers: HashMap<String, ToolHandler>,
    pub prompts: Vec<MCPPrompt>,
    prompt_handlers: HashMap<String, PromptHandler>,
    pub resources: Vec<MCPResource>,
    resource_handlers: HashMap<String, ResourceHandler>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool whose arguments decode into `P`.
    ///
    /// Arguments that do not decode (missing required fields, wrong types) are
    /// rejected with [`ToolError::InvalidArgument`] before `handler` runs.
    /// Registering a name twice replaces the earlier tool.
    pub fn register_tool<P, F, Fut>(&mut self, tool: MCPTool, handler: F)
    where
        P: DeserializeOwned + 'static,
        F: Fn(P, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult, ToolError>> + Send + 'static,
    {
        let name = tool.name.clone();
        let tool_name = name.clone();
        let wrapped: ToolHandler = Box::new(move |args: Value, ctx: ToolContext| -> ToolFuture {
            match serde_json::from_value::<P>(args) {
                Ok(params) => Box::pin(handler(params, ctx)),
                Err(e) => Box::pin(std::future::ready(Err::<CallToolResult, _>(
                    ToolError::InvalidArgument(format!("invalid arguments for {tool_name}: {e}")),
                ))),
            }
        });

        self.tools.retain(|t| t.name != name);
        self.tools.push(tool);
        self.tool_handlers.insert(name.clone(), wrapped);
        debug!(tool = %name, "registered tool");
    }

    /// Register a prompt whose arguments decode into `P`.
    pub fn register_prompt<P, F>(&mut self, prompt: MCPPrompt, handler: F)
    where
        P: DeserializeOwned + 'static,
        F: Fn(P) -> Result<GetPromptResult, ToolError> + Send + Sync + 'static,
    {
        let name = prompt.name.clone();
        let prompt_name = name.clone();
        let wrapped: PromptHandler = Box::new(move |args: Value| {
            let params = serde_json::from_value::<P>(args).map_err(|e| {
                ToolError::InvalidArgument(format!("invalid arguments for {prompt_name}: {e}"))
            })?;
            handler(params)
        });

        self.prompts.retain(|p| p.name != name);
        self.prompts.push(prompt);
        self.prompt_handlers.insert(name.clone(), wrapped);
        debug!(prompt = %name, "registered prompt");
    }

    /// Register a read-only resource addressed by its URI.
    pub fn register_resource<F>(&mut self, resource: MCPResource, handler: F)
    where
        F: Fn() -> ReadResourceResult + Send + Sync + 'static,
    {
        let uri = resource.uri.clone();
        self.resources.retain(|r| r.uri != uri);
        self.resources.push(resource);
        self.resource_handlers.insert(uri.clone(), Box::new(handler));
        debug!(uri = %uri, "registered resource");
    }
}

/// Build the registry with every tool, prompt and resource this server offers.
pub fn initialize_registry() -> Registry {
    let mut registry = Registry::new();
    tools::register_all(&mut registry);
    prompts::register_all(&mut registry);
    resources::register_all(&mut registry);
    registry
}

#[derive(Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Deserialize)]
struct ReadResourceParams {
    uri: String,
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, RpcError> {
    let params = params.ok_or_else(|| RpcError::InvalidParams("missing params".to_string()))?;
    serde_json::from_value(params).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

/// Routes MCP requests to the registry. Shared by all transports.
pub struct Dispatcher {
    state: AppState,
    registry: Registry,
}

impl Dispatcher {
    pub fn new(state: AppState, registry: Registry) -> Self {
        Self { state, registry }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handle one request.
    ///
    /// Returns `None` when no response must be sent: for notifications and
    /// for tool calls that were cancelled before completing.
    pub async fn handle(&self, request: MCPRequest, ctx: ToolContext) -> Option<MCPResponse> {
        let Some(id) = request.id else {
            debug!(method = %request.method, "received notification");
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(MCPResponse::failure(
                Some(id),
                RpcError::InvalidRequest(format!(
                    "unsupported jsonrpc version '{}'",
                    request.jsonrpc
                )),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.registry.tools })),
            "tools/call" => match self.call_tool(request.params, ctx).await {
                Some(result) => result,
                None => {
                    debug!(id = %id, "tool call cancelled, suppressing response");
                    return None;
                }
            },
            "prompts/list" => Ok(json!({ "prompts": self.registry.prompts })),
            "prompts/get" => self.get_prompt(request.params),
            "resources/list" => Ok(json!({ "resources": self.registry.resources })),
            "resources/read" => self.read_resource(request.params),
            other => Err(RpcError::MethodNotFound(other.to_string())),
        };

        Some(MCPResponse::from_result(Some(id), result))
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "prompts": {},
                "resources": {},
                "logging": {}
            },
            "serverInfo": {
                "name": self.state.server_name,
                "version": self.state.server_version
            }
        })
    }

    /// `None` means the call was cancelled.
    async fn call_tool(
        &self,
        params: Option<Value>,
        ctx: ToolContext,
    ) -> Option<Result<Value, RpcError>> {
        let params: CallToolParams = match parse_params(params) {
            Ok(params) => params,
            Err(err) => return Some(Err(err)),
        };
        let Some(handler) = self.registry.tool_handlers.get(&params.name) else {
            return Some(Err(RpcError::ToolNotFound(params.name)));
        };

        debug!(tool = %params.name, "calling tool");
        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let result = match handler(arguments, ctx).await {
            Ok(result) => result,
            Err(ToolError::Cancelled) => return None,
            Err(ToolError::Internal(message)) => {
                warn!(tool = %params.name, error = %message, "tool execution failed");
                CallToolResult::error(format!("Error: {message}"))
            }
            Err(err) => return Some(Err(err.into())),
        };
        Some(serde_json::to_value(result).map_err(RpcError::from))
    }

    fn get_prompt(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: GetPromptParams = parse_params(params)?;
        let handler = self
            .registry
            .prompt_handlers
            .get(&params.name)
            .ok_or_else(|| RpcError::PromptNotFound(params.name.clone()))?;
        let result = handler(params.arguments.unwrap_or_else(|| json!({})))?;
        Ok(serde_json::to_value(result)?)
    }

    fn read_resource(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: ReadResourceParams = parse_params(params)?;
        let handler = self
            .registry
            .resource_handlers
            .get(&params.uri)
            .ok_or_else(|| RpcError::ResourceNotFound(params.uri.clone()))?;
        Ok(serde_json::to_value(handler())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Named {
        name: String,
    }

    fn named_tool(name: &str) -> MCPTool {
        MCPTool {
            name: name.to_string(),
            description: "test".to_string(),
            input_schema: json!({ "type": "object" }),
        }
    }

    #[test]
    fn tool_definitions_use_camel_case_schema_key() {
        let value = serde_json::to_value(named_tool("t")).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn reregistering_a_tool_replaces_it() {
        let mut registry = Registry::new();
        registry.register_tool(named_tool("t"), |p: Named, _ctx| async move {
            Ok::<_, ToolError>(CallToolResult::text(p.name))
        });
        registry.register_tool(named_tool("t"), |p: Named, _ctx| async move {
            Ok::<_, ToolError>(CallToolResult::text(p.name))
        });
        assert_eq!(registry.tools.len(), 1);
        assert_eq!(registry.tool_handlers.len(), 1);
    }

    #[test]
    fn prompt_arguments_are_decoded_before_the_handler() {
        let mut registry = Registry::new();
        registry.register_prompt(
            MCPPrompt {
                name: "p".to_string(),
                description: "test".to_string(),
                arguments: vec![],
            },
            |p: Named| {
                Ok(GetPromptResult {
                    description: None,
                    messages: vec![PromptMessage {
                        role: Role::User,
                        content: Content::text(p.name),
                    }],
                })
            },
        );

        let handler = &registry.prompt_handlers["p"];
        let err = handler(json!({ "name": 3 })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(ref m) if m.contains("invalid arguments for p")));
        let ok = handler(json!({ "name": "Ada" })).unwrap();
        assert_eq!(ok.messages[0].content.as_text(), "Ada");
    }

    #[test]
    fn response_shapes() {
        let ok = serde_json::to_value(MCPResponse::success(Some(json!(1)), json!({}))).unwrap();
        assert_eq!(ok, json!({ "jsonrpc": "2.0", "id": 1, "result": {} }));

        let err = serde_json::to_value(MCPResponse::failure(
            None,
            RpcError::ParseError("eof".to_string()),
        ))
        .unwrap();
        assert_eq!(err["id"], Value::Null);
        assert_eq!(err["error"]["code"], -32700);
        assert!(err.get("result").is_none());
    }

    #[test]
    fn call_tool_result_serializes_content_blocks() {
        let value = serde_json::to_value(CallToolResult::text("hi")).unwrap();
        assert_eq!(
            value,
            json!({ "content": [{ "type": "text", "text": "hi" }], "isError": false })
        );
    }
}

//! Error Types
//!
//! Typed errors for every layer of the server: tool handlers, the JSON-RPC
//! dispatcher, the notification capability and startup configuration.

use thiserror::Error;

/// JSON-RPC 2.0 error codes used by the server.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// MCP-specific: the requested resource URI is not registered.
    pub const RESOURCE_NOT_FOUND: i32 = -32002;
}

/// Failure raised by a tool or prompt handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// The arguments were well-formed but semantically unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The invocation was cancelled before it finished.
    #[error("request cancelled")]
    Cancelled,
    #[error("{0}")]
    Internal(String),
}

/// Failure surfaced to the client as a JSON-RPC error object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),
    #[error("Unknown prompt: {0}")]
    PromptNotFound(String),
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError(_) => codes::PARSE_ERROR,
            Self::InvalidRequest(_) => codes::INVALID_REQUEST,
            Self::MethodNotFound(_) | Self::ToolNotFound(_) | Self::PromptNotFound(_) => {
                codes::METHOD_NOT_FOUND
            }
            Self::ResourceNotFound(_) => codes::RESOURCE_NOT_FOUND,
            Self::InvalidParams(_) => codes::INVALID_PARAMS,
            Self::Internal(_) => codes::INTERNAL_ERROR,
        }
    }
}

impl From<ToolError> for RpcError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::InvalidArgument(msg) => Self::InvalidParams(msg),
            ToolError::Cancelled => Self::Internal("request cancelled".to_string()),
            ToolError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization failed: {err}"))
    }
}

/// Failure of the notification-sending capability for a single message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The receiving side of the channel is gone (client disconnected).
    #[error("notification channel closed")]
    Closed,
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Invalid startup configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid transport mode '{0}'. Must be 'stdio', 'http', or 'both'")]
    InvalidTransport(String),
    #[error("invalid PORT '{value}': {source}")]
    InvalidPort {
        value: String,
        source: std::num::ParseIntError,
    },
    #[error("invalid WORKER_THREADS '{value}': must be a positive integer")]
    InvalidWorkers { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_error_codes() {
        assert_eq!(RpcError::ParseError("x".into()).code(), -32700);
        assert_eq!(RpcError::ToolNotFound("x".into()).code(), -32601);
        assert_eq!(RpcError::PromptNotFound("x".into()).code(), -32601);
        assert_eq!(RpcError::ResourceNotFound("x".into()).code(), -32002);
        assert_eq!(RpcError::InvalidParams("x".into()).code(), -32602);
    }

    #[test]
    fn invalid_argument_becomes_invalid_params() {
        let err: RpcError = ToolError::InvalidArgument("min > max".into()).into();
        assert_eq!(err, RpcError::InvalidParams("min > max".into()));
        assert_eq!(err.to_string(), "Invalid params: min > max");
    }
}

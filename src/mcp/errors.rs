//! MCP Error Handling
//!
//! Error classification for both ends of the tool channel and the mapping
//! from errors to JSON-RPC error responses.

use crate::mcp::protocol::*;
use thiserror::Error;
use tracing::error;

/// Errors raised while serving or consuming the tool protocol
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Protocol version not supported: {version}. Supported versions: {supported:?}")]
    UnsupportedProtocolVersion {
        version: String,
        supported: Vec<String>,
    },

    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Invalid tool parameters for {tool}: {message}")]
    InvalidToolParameters { tool: String, message: String },

    #[error("Server not initialized")]
    ServerNotInitialized,

    #[error("Internal server error: {message}")]
    InternalError { message: String },

    #[error("JSON-RPC parse error: {message}")]
    ParseError { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    /// An error response sent back by the remote end
    #[error("Remote error {code}: {message}")]
    Remote { code: i32, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl McpError {
    /// Convert MCP error to JSON-RPC error
    #[inline]
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            Self::UnsupportedProtocolVersion { version, supported } => JsonRpcError::new(
                mcp_error_codes::INVALID_PROTOCOL_VERSION,
                format!(
                    "Unsupported protocol version: {}. Supported: {}",
                    version,
                    supported.join(", ")
                ),
                None,
            ),
            Self::ToolNotFound { name } => JsonRpcError::new(
                mcp_error_codes::TOOL_NOT_FOUND,
                format!("Tool not found: {}", name),
                None,
            ),
            Self::InvalidToolParameters { tool, message } => JsonRpcError::new(
                error_codes::INVALID_PARAMS,
                format!("Invalid parameters for tool '{}': {}", tool, message),
                None,
            ),
            Self::ServerNotInitialized => JsonRpcError::new(
                error_codes::INVALID_REQUEST,
                "Server not initialized. Send initialize request first.".to_string(),
                None,
            ),
            Self::InternalError { message } => {
                JsonRpcError::new(error_codes::INTERNAL_ERROR, message.clone(), None)
            }
            Self::ParseError { message } => {
                JsonRpcError::new(error_codes::PARSE_ERROR, message.clone(), None)
            }
            Self::MethodNotFound { method } => JsonRpcError::method_not_found(method),
            Self::InvalidParameters { message } => {
                JsonRpcError::new(error_codes::INVALID_PARAMS, message.clone(), None)
            }
            Self::Remote { code, message } => JsonRpcError::new(*code, message.clone(), None),
            Self::Transport(err) => JsonRpcError::new(
                error_codes::INTERNAL_ERROR,
                format!("Transport error: {}", err),
                None,
            ),
            Self::ConnectionClosed => JsonRpcError::new(
                error_codes::INTERNAL_ERROR,
                "Connection closed".to_string(),
                None,
            ),
            Self::ValidationError { message } => JsonRpcError::new(
                error_codes::INVALID_PARAMS,
                format!("Validation error: {}", message),
                None,
            ),
        }
    }

    /// Create error response message
    #[inline]
    pub fn to_error_response(&self, id: Option<RequestId>) -> JsonRpcMessage {
        let error = self.to_jsonrpc_error();
        JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(error, id))
    }

    /// Log the error with appropriate level
    #[inline]
    pub fn log(&self) {
        match self {
            Self::ParseError { .. }
            | Self::InvalidParameters { .. }
            | Self::InvalidToolParameters { .. }
            | Self::ValidationError { .. } => {
                error!("Client error: {}", self);
            }
            Self::ToolNotFound { .. } | Self::MethodNotFound { .. } => {
                error!("Not found error: {}", self);
            }
            Self::InternalError { .. } => {
                error!("Server error: {}", self);
            }
            _ => {
                error!("MCP error: {}", self);
            }
        }
    }
}

/// Error handler utility for consistent error processing
pub struct ErrorHandler;

impl ErrorHandler {
    /// Handle any error and convert to appropriate JSON-RPC response
    #[inline]
    pub fn handle_error(error: &anyhow::Error, id: Option<RequestId>) -> JsonRpcMessage {
        if let Some(mcp_error) = error.downcast_ref::<McpError>() {
            mcp_error.log();
            return mcp_error.to_error_response(id);
        }

        error!("Unexpected error: {}", error);
        let internal_error = McpError::InternalError {
            message: error.to_string(),
        };
        internal_error.to_error_response(id)
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

impl From<JsonRpcError> for McpError {
    #[inline]
    fn from(error: JsonRpcError) -> Self {
        Self::Remote {
            code: error.code,
            message: error.message,
        }
    }
}

/// Convert from serde_json::Error to McpError
impl From<serde_json::Error> for McpError {
    #[inline]
    fn from(error: serde_json::Error) -> Self {
        Self::ParseError {
            message: error.to_string(),
        }
    }
}

/// Convert from validation errors to McpError
impl From<jsonschema::ValidationError<'_>> for McpError {
    #[inline]
    fn from(error: jsonschema::ValidationError) -> Self {
        Self::ValidationError {
            message: format!("{}:{}", error.instance_path, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_error() {
        let error = McpError::ToolNotFound {
            name: "lookup_weather".to_string(),
        };

        let jsonrpc_error = error.to_jsonrpc_error();
        assert_eq!(jsonrpc_error.code, mcp_error_codes::TOOL_NOT_FOUND);
        assert!(jsonrpc_error.message.contains("lookup_weather"));
    }

    #[test]
    fn invalid_protocol_version_error() {
        let error = McpError::UnsupportedProtocolVersion {
            version: "invalid".to_string(),
            supported: vec![MCP_VERSION.to_string()],
        };

        let jsonrpc_error = error.to_jsonrpc_error();
        assert_eq!(
            jsonrpc_error.code,
            mcp_error_codes::INVALID_PROTOCOL_VERSION
        );
        assert!(jsonrpc_error.message.contains("invalid"));
        assert!(jsonrpc_error.message.contains(MCP_VERSION));
    }

    #[test]
    fn error_response_creation() {
        let error = McpError::InvalidToolParameters {
            tool: "ask_tax_question".to_string(),
            message: "\"question\" is a required property".to_string(),
        };

        let response = error.to_error_response(Some(RequestId::Number(7)));

        if let JsonRpcMessage::ErrorResponse(err_resp) = response {
            assert_eq!(err_resp.error.code, error_codes::INVALID_PARAMS);
            assert!(err_resp.error.message.contains("ask_tax_question"));
            assert_eq!(err_resp.id, Some(RequestId::Number(7)));
        } else {
            panic!("Expected error response");
        }
    }

    #[test]
    fn remote_errors_keep_their_code() {
        let error = McpError::from(JsonRpcError::method_not_found("resources/list"));
        assert!(matches!(
            error,
            McpError::Remote {
                code: error_codes::METHOD_NOT_FOUND,
                ..
            }
        ));
        assert_eq!(error.to_jsonrpc_error().code, error_codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn handler_downcasts_mcp_errors() {
        let error = anyhow::Error::new(McpError::ServerNotInitialized);
        let JsonRpcMessage::ErrorResponse(response) = ErrorHandler::handle_error(&error, None)
        else {
            panic!("Expected error response");
        };
        assert_eq!(response.error.code, error_codes::INVALID_REQUEST);

        let error = anyhow::anyhow!("disk full");
        let JsonRpcMessage::ErrorResponse(response) = ErrorHandler::handle_error(&error, None)
        else {
            panic!("Expected error response");
        };
        assert_eq!(response.error.code, error_codes::INTERNAL_ERROR);
        assert!(response.error.message.contains("disk full"));
    }
}

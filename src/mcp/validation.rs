//! MCP Message Validation
//!
//! JSON schema validation for protocol messages on the wire and for the
//! arguments passed to a tool, checked against the tool's declared input schema.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use anyhow::{Result, anyhow};
use jsonschema::{Draft, JSONSchema};
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::debug;

/// JSON Schema validator for MCP messages
#[derive(Debug)]
pub struct McpValidator {
    schemas: HashMap<String, JSONSchema>,
}

impl McpValidator {
    /// Create a new MCP validator with built-in schemas
    #[inline]
    pub fn new() -> Result<Self> {
        let mut validator = Self {
            schemas: HashMap::new(),
        };
        validator.load_builtin_schemas()?;
        Ok(validator)
    }

    fn load_builtin_schemas(&mut self) -> Result<()> {
        let id_schema = json!({
            "oneOf": [
                {"type": "string"},
                {"type": "integer"}
            ]
        });

        self.add_schema(
            "jsonrpc_request",
            &json!({
                "type": "object",
                "properties": {
                    "jsonrpc": {"type": "string", "const": "2.0"},
                    "method": {"type": "string"},
                    "params": {},
                    "id": id_schema
                },
                "required": ["jsonrpc", "method", "id"]
            }),
        )?;

        self.add_schema(
            "jsonrpc_response",
            &json!({
                "type": "object",
                "properties": {
                    "jsonrpc": {"type": "string", "const": "2.0"},
                    "result": {},
                    "id": id_schema
                },
                "required": ["jsonrpc", "result", "id"]
            }),
        )?;

        self.add_schema(
            "jsonrpc_error_response",
            &json!({
                "type": "object",
                "properties": {
                    "jsonrpc": {"type": "string", "const": "2.0"},
                    "error": {
                        "type": "object",
                        "properties": {
                            "code": {"type": "integer"},
                            "message": {"type": "string"},
                            "data": {}
                        },
                        "required": ["code", "message"]
                    },
                    "id": {
                        "oneOf": [
                            {"type": "string"},
                            {"type": "integer"},
                            {"type": "null"}
                        ]
                    }
                },
                "required": ["jsonrpc", "error", "id"]
            }),
        )?;

        self.add_schema(
            "jsonrpc_notification",
            &json!({
                "type": "object",
                "properties": {
                    "jsonrpc": {"type": "string", "const": "2.0"},
                    "method": {"type": "string"},
                    "params": {}
                },
                "required": ["jsonrpc", "method"]
            }),
        )?;

        let implementation = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "version": {"type": "string"}
            },
            "required": ["name", "version"]
        });

        self.add_schema(
            "initialize_params",
            &json!({
                "type": "object",
                "properties": {
                    "protocolVersion": {"type": "string"},
                    "capabilities": {"type": "object"},
                    "clientInfo": implementation
                },
                "required": ["protocolVersion", "capabilities", "clientInfo"]
            }),
        )?;

        self.add_schema(
            "initialize_result",
            &json!({
                "type": "object",
                "properties": {
                    "protocolVersion": {"type": "string"},
                    "capabilities": {"type": "object"},
                    "serverInfo": implementation
                },
                "required": ["protocolVersion", "capabilities", "serverInfo"]
            }),
        )?;

        self.add_schema(
            "call_tool_params",
            &json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "arguments": {"type": "object"}
                },
                "required": ["name"]
            }),
        )?;

        self.add_schema(
            "list_tools_result",
            &json!({
                "type": "object",
                "properties": {
                    "tools": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string", "minLength": 1},
                                "description": {"type": ["string", "null"]},
                                "inputSchema": {"type": "object"}
                            },
                            "required": ["name", "inputSchema"]
                        }
                    }
                },
                "required": ["tools"]
            }),
        )?;

        self.add_schema(
            "call_tool_result",
            &json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {"type": {"type": "string"}},
                            "required": ["type"]
                        }
                    },
                    "isError": {"type": "boolean"}
                },
                "required": ["content"]
            }),
        )?;

        debug!("Loaded {} built-in JSON schemas", self.schemas.len());
        Ok(())
    }

    /// Add a JSON schema to the validator
    #[inline]
    pub fn add_schema(&mut self, name: &str, schema: &Value) -> Result<()> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| anyhow!("Failed to compile schema '{}': {}", name, e))?;

        self.schemas.insert(name.to_string(), compiled);
        Ok(())
    }

    /// Validate a JSON-RPC request, including method-specific parameters
    #[inline]
    pub fn validate_request(&self, request: &JsonRpcRequest) -> Result<()> {
        let request_value = serde_json::to_value(request)?;
        self.validate_with_schema("jsonrpc_request", &request_value)?;

        if let Some(params) = &request.params {
            let schema_name = match request.method.as_str() {
                "initialize" => "initialize_params",
                "tools/call" => "call_tool_params",
                _ => {
                    debug!("No parameter validation schema for method: {}", request.method);
                    return Ok(());
                }
            };
            self.validate_with_schema(schema_name, params)?;
        }

        Ok(())
    }

    /// Validate the result of a successful response to `method`
    #[inline]
    pub fn validate_result(&self, method: &str, result: &Value) -> Result<()> {
        let schema_name = match method {
            "initialize" => "initialize_result",
            "tools/list" => "list_tools_result",
            "tools/call" => "call_tool_result",
            _ => return Ok(()),
        };
        self.validate_with_schema(schema_name, result)
    }

    /// Validate a value against a named schema
    #[inline]
    pub fn validate_with_schema(&self, schema_name: &str, value: &Value) -> Result<()> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| anyhow!("Schema '{}' not found", schema_name))?;

        if let Err(errors) = schema.validate(value) {
            let error_messages: Vec<String> = errors
                .map(|e| format!("{}:{}", e.instance_path, e))
                .collect();

            return Err(anyhow!(
                "Schema validation failed for '{}': {}",
                schema_name,
                error_messages.join(", ")
            ));
        }

        Ok(())
    }

    /// Validate a raw JSON value as a JSON-RPC message
    #[inline]
    pub fn validate_raw_message(&self, value: &Value) -> Result<JsonRpcMessage> {
        if let Ok(request) = serde_json::from_value::<JsonRpcRequest>(value.clone()) {
            self.validate_request(&request)?;
            return Ok(JsonRpcMessage::Request(request));
        }

        if value.get("result").is_some() {
            self.validate_with_schema("jsonrpc_response", value)?;
            return Ok(JsonRpcMessage::Response(serde_json::from_value(
                value.clone(),
            )?));
        }

        if value.get("error").is_some() {
            self.validate_with_schema("jsonrpc_error_response", value)?;
            return Ok(JsonRpcMessage::ErrorResponse(serde_json::from_value(
                value.clone(),
            )?));
        }

        self.validate_with_schema("jsonrpc_notification", value)?;
        Ok(JsonRpcMessage::Notification(serde_json::from_value(
            value.clone(),
        )?))
    }

    /// Check if a protocol version is supported
    #[inline]
    pub fn is_protocol_version_supported(&self, version: &str) -> bool {
        version == MCP_VERSION
    }

    /// Get supported protocol versions
    #[inline]
    pub fn supported_protocol_versions(&self) -> Vec<String> {
        vec![MCP_VERSION.to_string()]
    }
}

/// Compiled input schema of a single tool
#[derive(Debug)]
pub struct ArgumentValidator {
    tool: String,
    schema: JSONSchema,
}

impl ArgumentValidator {
    /// Compile the input schema declared by `tool`
    #[inline]
    pub fn compile(tool: &Tool) -> McpResult<Self> {
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&tool.input_schema)
            .map_err(|e| McpError::InvalidToolParameters {
                tool: tool.name.clone(),
                message: format!("input schema does not compile: {e}"),
            })?;

        Ok(Self {
            tool: tool.name.clone(),
            schema,
        })
    }

    /// Check `arguments` against the tool's input schema
    #[inline]
    pub fn validate(&self, arguments: &Value) -> McpResult<()> {
        if let Err(errors) = self.schema.validate(arguments) {
            let messages: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{path}: {e}")
                    }
                })
                .collect();

            return Err(McpError::InvalidToolParameters {
                tool: self.tool.clone(),
                message: messages.join(", "),
            });
        }
        Ok(())
    }
}

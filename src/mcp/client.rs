//! MCP Client Implementation
//!
//! Request/response client for a tool server speaking newline-delimited
//! JSON-RPC over an async reader/writer pair.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use crate::mcp::validation::McpValidator;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tracing::{debug, info, warn};

pub struct McpClient<R, W> {
    lines: Lines<BufReader<R>>,
    writer: W,
    next_id: i64,
    validator: McpValidator,
    client_info: Implementation,
}

impl<R, W> McpClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a connected reader/writer pair. No messages are exchanged until [`Self::initialize`].
    #[inline]
    pub fn new(reader: R, writer: W, client_info: Implementation) -> McpResult<Self> {
        let validator = McpValidator::new().map_err(|e| McpError::InternalError {
            message: e.to_string(),
        })?;

        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
            next_id: 1,
            validator,
            client_info,
        })
    }

    /// Perform the initialize handshake and announce readiness to the server
    #[inline]
    pub async fn initialize(&mut self) -> McpResult<InitializeResult> {
        let params = InitializeParams {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: self.client_info.clone(),
        };

        let result: InitializeResult = self
            .request("initialize", Some(serde_json::to_value(params)?))
            .await?;

        if !self
            .validator
            .is_protocol_version_supported(&result.protocol_version)
        {
            return Err(McpError::UnsupportedProtocolVersion {
                version: result.protocol_version,
                supported: self.validator.supported_protocol_versions(),
            });
        }

        self.notify("notifications/initialized", None).await?;
        info!(
            "Connected to {} {}",
            result.server_info.name, result.server_info.version
        );
        Ok(result)
    }

    #[inline]
    pub async fn list_tools(&mut self) -> McpResult<Vec<Tool>> {
        let result: ListToolsResult = self.request("tools/list", None).await?;
        Ok(result.tools)
    }

    #[inline]
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> McpResult<CallToolResult> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        self.request("tools/call", Some(serde_json::to_value(params)?))
            .await
    }

    #[inline]
    pub async fn ping(&mut self) -> McpResult<()> {
        let _: Value = self.request("ping", None).await?;
        Ok(())
    }

    /// Flush and shut down the write half. A child's stdin stays open until the client is dropped.
    #[inline]
    pub async fn shutdown(&mut self) -> McpResult<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    async fn request<T>(&mut self, method: &str, params: Option<Value>) -> McpResult<T>
    where
        T: DeserializeOwned,
    {
        let id = RequestId::Number(self.next_id);
        self.next_id += 1;

        let request = JsonRpcRequest::new(method.to_string(), params, id.clone());
        self.send(&JsonRpcMessage::Request(request)).await?;

        let result = self.wait_for_response(&id).await?;
        self.validator
            .validate_result(method, &result)
            .map_err(|e| McpError::ValidationError {
                message: e.to_string(),
            })?;
        Ok(serde_json::from_value(result)?)
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> McpResult<()> {
        let notification = JsonRpcNotification::new(method.to_string(), params);
        self.send(&JsonRpcMessage::Notification(notification)).await
    }

    async fn send(&mut self, message: &JsonRpcMessage) -> McpResult<()> {
        let json = serde_json::to_string(message)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read messages until the response to `id` arrives, skipping anything else
    async fn wait_for_response(&mut self, id: &RequestId) -> McpResult<Value> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Err(McpError::ConnectionClosed);
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: JsonRpcMessage = serde_json::from_str(line)?;
            match message {
                JsonRpcMessage::Response(response) if &response.id == id => {
                    return Ok(response.result);
                }
                JsonRpcMessage::ErrorResponse(response)
                    if response.id.as_ref().is_none_or(|rid| rid == id) =>
                {
                    return Err(response.error.into());
                }
                JsonRpcMessage::Notification(notification) => {
                    debug!("Skipping server notification {}", notification.method);
                }
                JsonRpcMessage::Request(request) => {
                    warn!("Ignoring server request {}", request.method);
                }
                JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                    warn!("Skipping response to another request");
                }
            }
        }
    }
}

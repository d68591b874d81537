
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::mcp::protocol::InitializeResult;
use crate::mcp::{
    ArgumentValidator, CallToolResult, Implementation, McpClient, McpError, McpResult, Tool,
};

/// How long a closed server process gets to exit on its own before it is killed
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Request/response channel to the tool-providing process
#[async_trait]
pub trait ToolChannel: Send {
    async fn initialize(&mut self) -> McpResult<InitializeResult>;

    async fn list_tools(&mut self) -> McpResult<Vec<Tool>>;

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> McpResult<CallToolResult>;

    /// Release the channel and anything it holds
    async fn close(&mut self) -> McpResult<()>;
}

#[async_trait]
impl<R, W> ToolChannel for McpClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    #[inline]
    async fn initialize(&mut self) -> McpResult<InitializeResult> {
        McpClient::initialize(self).await
    }

    #[inline]
    async fn list_tools(&mut self) -> McpResult<Vec<Tool>> {
        McpClient::list_tools(self).await
    }

    #[inline]
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> McpResult<CallToolResult> {
        McpClient::call_tool(self, name, arguments).await
    }

    #[inline]
    async fn close(&mut self) -> McpResult<()> {
        self.shutdown().await
    }
}

/// A tool server running as a child process, spoken to over its stdin/stdout
pub struct StdioChannel {
    /// Owns the child's stdin. `None` once closed.
    client: Option<McpClient<ChildStdout, ChildStdin>>,
    child: Child,
    grace: Duration,
}

impl StdioChannel {
    /// Spawn `command args...` and attach a client to its standard streams.
    /// The child is killed if the channel is dropped without being closed.
    #[inline]
    pub fn spawn(command: &Path, args: &[String]) -> McpResult<Self> {
        Self::spawn_with_grace(command, args, SHUTDOWN_GRACE)
    }

    fn spawn_with_grace(command: &Path, args: &[String], grace: Duration) -> McpResult<Self> {
        debug!("Spawning tool server {} {:?}", command.display(), args);
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(McpError::InternalError {
                message: "tool server stdio was not captured".to_string(),
            });
        };

        let client = McpClient::new(stdout, stdin, client_info())?;
        Ok(Self {
            client: Some(client),
            child,
            grace,
        })
    }

    fn client(&mut self) -> McpResult<&mut McpClient<ChildStdout, ChildStdin>> {
        self.client.as_mut().ok_or(McpError::ConnectionClosed)
    }
}

#[async_trait]
impl ToolChannel for StdioChannel {
    #[inline]
    async fn initialize(&mut self) -> McpResult<InitializeResult> {
        self.client()?.initialize().await
    }

    #[inline]
    async fn list_tools(&mut self) -> McpResult<Vec<Tool>> {
        self.client()?.list_tools().await
    }

    #[inline]
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> McpResult<CallToolResult> {
        self.client()?.call_tool(name, arguments).await
    }

    #[inline]
    async fn close(&mut self) -> McpResult<()> {
        // The pipe only closes when ChildStdin is dropped, which ends the server's read loop
        if let Some(mut client) = self.client.take() {
            if let Err(e) = client.shutdown().await {
                debug!("Tool server stdin already closed: {}", e);
            }
            drop(client);
        }

        match tokio::time::timeout(self.grace, self.child.wait()).await {
            Ok(status) => {
                debug!("Tool server exited with {}", status?);
            }
            Err(_) => {
                warn!("Tool server did not exit within {:?}, killing it", self.grace);
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}

/// Name and version this program announces to tool servers
#[inline]
pub fn client_info() -> Implementation {
    Implementation {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

struct CatalogEntry {
    tool: Tool,
    validator: ArgumentValidator,
}

/// Snapshot of the tools offered by the server, in the order it listed them
#[derive(Default)]
pub struct ToolCatalog {
    entries: Vec<CatalogEntry>,
}

impl ToolCatalog {
    /// Compile the input schema of every tool. Later duplicates of a name are dropped.
    #[inline]
    pub fn new(tools: Vec<Tool>) -> McpResult<Self> {
        let mut entries: Vec<CatalogEntry> = Vec::with_capacity(tools.len());
        for tool in tools {
            if entries.iter().any(|e| e.tool.name == tool.name) {
                warn!("Ignoring duplicate tool {}", tool.name);
                continue;
            }
            let validator = ArgumentValidator::compile(&tool)?;
            entries.push(CatalogEntry { tool, validator });
        }
        Ok(Self { entries })
    }

    /// Look up a tool by exact name
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.entry(name).map(|e| &e.tool)
    }

    /// Check `arguments` against the input schema of the named tool
    #[inline]
    pub fn validate_arguments(&self, name: &str, arguments: &Map<String, Value>) -> McpResult<()> {
        let entry = self.entry(name).ok_or_else(|| McpError::ToolNotFound {
            name: name.to_string(),
        })?;
        entry.validator.validate(&Value::Object(arguments.clone()))
    }

    #[inline]
    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.entries.iter().map(|e| &e.tool)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.tool.name == name)
    }
}

/// An open connection to the tool server plus the tool snapshot taken when it opened.
///
/// Acquired with [`Session::connect`], released with [`Session::close`]. Every
/// operation on a closed session fails with [`McpError::ConnectionClosed`].
pub struct Session {
    channel: Option<Box<dyn ToolChannel>>,
    catalog: ToolCatalog,
    server_info: Implementation,
}

impl Session {
    /// Handshake over `channel` and cache the tools it offers
    #[inline]
    pub async fn connect<C>(channel: C) -> McpResult<Self>
    where
        C: ToolChannel + 'static,
    {
        let mut channel: Box<dyn ToolChannel> = Box::new(channel);

        let opened = async {
            let init = channel.initialize().await?;
            let catalog = ToolCatalog::new(channel.list_tools().await?)?;
            Ok::<_, McpError>((init, catalog))
        }
        .await;

        let (init, catalog) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                if let Err(close_err) = channel.close().await {
                    debug!("Closing failed channel: {}", close_err);
                }
                return Err(e);
            }
        };

        info!(
            "Connected to {} and the following tools are available:",
            init.server_info.name
        );
        for tool in catalog.tools() {
            info!("{}: {}", tool.name, tool.description.as_deref().unwrap_or(""));
        }
        if let Some(instructions) = &init.instructions {
            debug!("Server instructions: {}", instructions);
        }

        Ok(Self {
            channel: Some(channel),
            catalog,
            server_info: init.server_info,
        })
    }

    /// Spawn the tool server process and connect to it
    #[inline]
    pub async fn connect_stdio(command: &Path, args: &[String]) -> McpResult<Self> {
        Self::connect(StdioChannel::spawn(command, args)?).await
    }

    #[inline]
    pub fn catalog(&self) -> McpResult<&ToolCatalog> {
        self.ensure_open()?;
        Ok(&self.catalog)
    }

    #[inline]
    pub fn tools(&self) -> McpResult<Vec<&Tool>> {
        Ok(self.catalog()?.tools().collect())
    }

    #[inline]
    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    #[inline]
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> McpResult<CallToolResult> {
        let channel = self.channel.as_mut().ok_or(McpError::ConnectionClosed)?;
        channel.call_tool(name, arguments).await
    }

    /// Release the channel. Closing an already closed session does nothing.
    #[inline]
    pub async fn close(&mut self) -> McpResult<()> {
        match self.channel.take() {
            Some(mut channel) => {
                debug!("Closing session with {}", self.server_info.name);
                channel.close().await
            }
            None => Ok(()),
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.channel.is_none()
    }

    fn ensure_open(&self) -> McpResult<()> {
        if self.is_closed() {
            return Err(McpError::ConnectionClosed);
        }
        Ok(())
    }
}

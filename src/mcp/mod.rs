//! MCP (Model Context Protocol) server and client
//!
//! The retrieval tool is served over JSON-RPC 2.0 following MCP protocol
//! version 2025-06-18; the question-answering side talks to it through
//! [`McpClient`].


pub mod client;
pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod validation;

pub use client::McpClient;
pub use errors::{McpError, McpResult};
pub use protocol::{CallToolResult, Implementation, Tool, ToolContent};
pub use server::{McpServer, ToolHandler};
pub use tools::{AskTaxQuestionHandler, ToolRegistry};
pub use validation::ArgumentValidator;

/// Server name announced in the initialize handshake
pub const SERVER_NAME: &str = "Tax Law Agent";

/// Usage hint returned to clients alongside the server info
pub const SERVER_INSTRUCTIONS: &str =
    "Call ask_tax_question with a question to get matching passages of the Tax Procedures Act.";

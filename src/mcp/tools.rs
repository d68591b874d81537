//! MCP Tools Implementation
//!
//! The ordered tool registry served by [`McpServer`](crate::mcp::server::McpServer)
//! and the retrieval tool over the tax-law corpus.

use crate::corpus::{Corpus, CorpusError};
use crate::embeddings::Embedder;
use crate::mcp::errors::McpResult;
use crate::mcp::protocol::*;
use crate::mcp::server::ToolHandler;
use crate::mcp::validation::ArgumentValidator;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Retrieval tool handler over the indexed Tax Procedures Act
pub struct AskTaxQuestionHandler {
    corpus: Arc<Corpus>,
    embedder: Arc<dyn Embedder>,
}

impl AskTaxQuestionHandler {
    pub const NAME: &'static str = "ask_tax_question";

    /// Shown to the language model verbatim when it picks a tool
    pub const DESCRIPTION: &'static str = "Search Tax Procedures Act PDF for a given question.";

    /// Number of chunks joined into the returned context
    pub const TOP_K: usize = 3;

    #[inline]
    pub fn new(corpus: Arc<Corpus>, embedder: Arc<dyn Embedder>) -> Self {
        Self { corpus, embedder }
    }

    /// Create the ask_tax_question tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: Self::NAME.to_string(),
            description: Some(Self::DESCRIPTION.to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "title": "Question"
                    }
                },
                "required": ["question"]
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for AskTaxQuestionHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();
        let question = args
            .get("question")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: question"))?
            .to_string();

        debug!("Retrieving context for question: {}", question);

        // The embedder may block on HTTP, keep it off the async workers
        let corpus = Arc::clone(&self.corpus);
        let embedder = Arc::clone(&self.embedder);
        let retrieved = tokio::task::spawn_blocking(move || {
            corpus.context(&question, Self::TOP_K, embedder.as_ref())
        })
        .await?;

        match retrieved {
            // Nothing indexed: no content items rather than an empty text item
            Ok(context) if context.is_empty() => Ok(CallToolResult {
                content: Vec::new(),
                is_error: Some(false),
            }),
            Ok(context) => Ok(CallToolResult::text(context)),
            Err(CorpusError::Embedding(e)) => {
                error!("Failed to generate embedding for question: {}", e);
                Ok(CallToolResult::error(format!(
                    "Failed to generate embedding for question: {}",
                    e
                )))
            }
            Err(e) => {
                error!("Retrieval failed: {}", e);
                Ok(CallToolResult::error(format!("Retrieval failed: {}", e)))
            }
        }
    }
}

/// A tool definition together with its handler and compiled input schema
pub struct RegisteredTool {
    pub tool: Tool,
    pub handler: Box<dyn ToolHandler>,
    pub validator: ArgumentValidator,
}

/// Tool registry, listed in registration order and looked up by exact name
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    /// Create a new tool registry
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool already registered under its name
    #[inline]
    pub fn register(&mut self, tool: Tool, handler: Box<dyn ToolHandler>) -> McpResult<()> {
        let validator = ArgumentValidator::compile(&tool)?;
        let entry = RegisteredTool {
            tool,
            handler,
            validator,
        };

        match self
            .tools
            .iter_mut()
            .find(|registered| registered.tool.name == entry.tool.name)
        {
            Some(existing) => *existing = entry,
            None => self.tools.push(entry),
        }
        Ok(())
    }

    /// Get all registered tools
    #[inline]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|r| r.tool.clone()).collect()
    }

    /// Get a specific tool by name
    #[inline]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|r| r.tool.name == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

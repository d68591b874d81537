//! Question answering over the tool session: one tool-selection completion,
//! one tool call, one final completion.


pub mod parse;

use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::llm::{InferenceError, LanguageModel};
use crate::mcp::McpError;
use crate::prompts::{final_answer_prompt, render_tool_listing, tool_selection_prompt};
use crate::session::Session;

pub use parse::{ParseFailure, ToolCall, parse_tool_call};

/// Progress of a single query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    ToolsFetched,
    PromptSent,
    ResponseParsed,
    ToolDispatched,
    FinalPromptSent,
    Done,
    Error,
}

impl fmt::Display for QueryState {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::ToolsFetched => "ToolsFetched",
            Self::PromptSent => "PromptSent",
            Self::ResponseParsed => "ResponseParsed",
            Self::ToolDispatched => "ToolDispatched",
            Self::FinalPromptSent => "FinalPromptSent",
            Self::Done => "Done",
            Self::Error => "Error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("could not understand the model's tool selection: {0}")]
    Parse(#[from] ParseFailure),

    /// The arguments do not match the tool's input schema
    #[error("could not understand the model's tool selection: {0}")]
    InvalidArguments(McpError),

    #[error("unknown tool `{0}`")]
    UnknownTool(String),

    #[error("no content returned by tool `{0}`")]
    EmptyResult(String),

    #[error("tool `{tool}` failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("language model failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("tool session failed: {0}")]
    Channel(#[from] McpError),
}

impl QueryError {
    /// Whether the failure is answered with a message instead of being raised
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Parse(_)
                | Self::InvalidArguments(_)
                | Self::UnknownTool(_)
                | Self::EmptyResult(_)
                | Self::ToolFailed { .. }
        )
    }

    /// Text shown to the user in place of an answer
    #[inline]
    pub fn user_message(&self) -> String {
        format!("Error: {self}")
    }
}

/// Drives a query through [`QueryState`], logging every transition
struct Progress {
    state: QueryState,
}

impl Progress {
    fn new() -> Self {
        Self {
            state: QueryState::Idle,
        }
    }

    fn advance(&mut self, next: QueryState) {
        debug!("Query state {} -> {}", self.state, next);
        self.state = next;
    }
}

pub struct Orchestrator {
    model: Box<dyn LanguageModel>,
}

impl Orchestrator {
    #[inline]
    pub fn new(model: Box<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Answer `question` using the tools offered by `session`.
    ///
    /// Parse, unknown-tool, empty-result and tool failures come back as
    /// `Ok` with an `Error: ...` message. Language model and channel
    /// failures are returned as `Err`.
    #[inline]
    pub async fn process_query(
        &self,
        session: &mut Session,
        question: &str,
    ) -> Result<String, QueryError> {
        let mut progress = Progress::new();
        match self.run(&mut progress, session, question).await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                progress.advance(QueryState::Error);
                if e.is_recoverable() {
                    warn!("Query failed: {}", e);
                    Ok(e.user_message())
                } else {
                    error!("Query failed: {}", e);
                    Err(e)
                }
            }
        }
    }

    async fn run(
        &self,
        progress: &mut Progress,
        session: &mut Session,
        question: &str,
    ) -> Result<String, QueryError> {
        let listing = render_tool_listing(session.tools()?);
        progress.advance(QueryState::ToolsFetched);

        let completion = self
            .model
            .complete(&tool_selection_prompt(&listing, question))
            .await?;
        progress.advance(QueryState::PromptSent);
        debug!("Tool selection completion: {}", completion);

        let call = parse_tool_call(&completion)?;
        progress.advance(QueryState::ResponseParsed);

        let catalog = session.catalog()?;
        if catalog.get(&call.tool).is_none() {
            return Err(QueryError::UnknownTool(call.tool));
        }
        catalog
            .validate_arguments(&call.tool, &call.arguments)
            .map_err(QueryError::InvalidArguments)?;

        info!("Calling tool {}", call.tool);
        let result = session
            .call_tool(&call.tool, call.arguments)
            .await
            .map_err(|e| match e {
                // The server answered, so the session is still usable
                McpError::Remote { message, .. } => QueryError::ToolFailed {
                    tool: call.tool.clone(),
                    message,
                },
                other => QueryError::Channel(other),
            })?;
        progress.advance(QueryState::ToolDispatched);

        if result.is_error() {
            return Err(QueryError::ToolFailed {
                tool: call.tool,
                message: result.first_text().unwrap_or_default().to_string(),
            });
        }
        let context = match result.first_text() {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Err(QueryError::EmptyResult(call.tool)),
        };

        let answer = self
            .model
            .complete(&final_answer_prompt(context, question))
            .await?;
        progress.advance(QueryState::FinalPromptSent);

        let answer = answer.trim().to_string();
        progress.advance(QueryState::Done);
        Ok(answer)
    }
}

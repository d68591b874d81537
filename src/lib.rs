use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Document error: {0}")]
    Document(#[from] document::DocumentError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] embeddings::EmbeddingError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] corpus::CorpusError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Inference error: {0}")]
    Inference(#[from] llm::InferenceError),

    #[error("MCP error: {0}")]
    Mcp(#[from] mcp::McpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod corpus;
pub mod document;
pub mod embeddings;
pub mod index;
pub mod llm;
pub mod mcp;
pub mod orchestrator;
pub mod prompts;
pub mod session;

// Embeddings module
// Document chunking and the text-to-vector backends

pub mod chunking;
pub mod ollama;

use thiserror::Error;

pub use chunking::{Chunk, ChunkingConfig, ChunkingError, chunk_text};
pub use ollama::OllamaClient;

/// Dense vector produced by the embedding model
pub type Embedding = Vec<f32>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),

    #[error("embedding request rejected: {0}")]
    Rejected(String),

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("expected {expected} embeddings, backend returned {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("expected embedding dimension {expected}, backend returned {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Maps text to fixed-dimension vectors
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one embedding per input in the same order
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError>;

    /// Embed a single query. Failures are returned to the caller as-is.
    #[inline]
    fn embed_query(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut embeddings = self.embed(&[text.to_string()])?;
        if embeddings.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: embeddings.len(),
            });
        }
        Ok(embeddings.remove(0))
    }

    /// Dimension of the produced vectors, when known up front
    fn dimension(&self) -> Option<usize>;
}

/// Check that every embedding has the same dimension, and `expected` when given
#[inline]
pub fn check_dimensions(
    embeddings: &[Embedding],
    expected: Option<usize>,
) -> Result<usize, EmbeddingError> {
    let Some(first) = embeddings.first() else {
        return Ok(expected.unwrap_or(0));
    };
    let dimension = expected.unwrap_or(first.len());
    if dimension == 0 {
        return Err(EmbeddingError::MalformedResponse(
            "empty embedding vector".to_string(),
        ));
    }

    for embedding in embeddings {
        if embedding.len() != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: embedding.len(),
            });
        }
    }

    Ok(dimension)
}

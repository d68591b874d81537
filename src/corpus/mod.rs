
use thiserror::Error;
use tracing::{debug, info};

use crate::embeddings::{Chunk, ChunkingConfig, ChunkingError, Embedder, EmbeddingError, chunk_text};
use crate::index::{FlatL2Index, IndexError};

/// Separator placed between retrieved chunks when they are joined into context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("chunking failed: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index failed: {0}")]
    Index(#[from] IndexError),

    #[error("index holds {indexed} vectors for {chunks} chunks")]
    SizeMismatch { indexed: usize, chunks: usize },
}

/// A chunk returned by retrieval together with its distance to the query
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk<'a> {
    pub chunk: &'a Chunk,
    pub distance: f32,
}

/// The chunked, embedded and indexed document. Built once, read-only afterwards.
#[derive(Debug)]
pub struct Corpus {
    chunks: Vec<Chunk>,
    index: FlatL2Index,
}

impl Corpus {
    /// Chunk `text`, embed every chunk and index the vectors in chunk order
    #[inline]
    pub fn build(
        text: &str,
        config: &ChunkingConfig,
        embedder: &dyn Embedder,
    ) -> Result<Self, CorpusError> {
        let chunks = chunk_text(text, config)?;
        info!("Embedding {} chunks", chunks.len());

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = embedder.embed(&texts)?;
        if embeddings.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                actual: embeddings.len(),
            }
            .into());
        }

        let mut index = FlatL2Index::new();
        index.build(&embeddings)?;
        match embedder.dimension() {
            Some(expected) if !index.is_empty() && index.dimension() != expected => {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: index.dimension(),
                }
                .into());
            }
            _ => {}
        }
        if index.len() != chunks.len() {
            return Err(CorpusError::SizeMismatch {
                indexed: index.len(),
                chunks: chunks.len(),
            });
        }

        info!(
            "Corpus ready: {} chunks, dimension {}",
            chunks.len(),
            index.dimension()
        );
        Ok(Self { chunks, index })
    }

    /// The `k` chunks nearest to `question`, closest first.
    ///
    /// The question is embedded exactly once; an embedding failure is returned
    /// rather than retried or replaced by a placeholder vector.
    #[inline]
    pub fn retrieve(
        &self,
        question: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<RetrievedChunk<'_>>, CorpusError> {
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query = embedder.embed_query(question)?;
        let hits = self.index.search(&query, k)?;
        debug!("Retrieved {} chunks for question", hits.len());

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                self.chunks.get(hit.chunk_id).map(|chunk| RetrievedChunk {
                    chunk,
                    distance: hit.distance,
                })
            })
            .collect())
    }

    /// Text of the `k` nearest chunks joined by a blank line, closest first
    #[inline]
    pub fn context(
        &self,
        question: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<String, CorpusError> {
        let retrieved = self.retrieve(question, k, embedder)?;
        Ok(retrieved
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR))
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

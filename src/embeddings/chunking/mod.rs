#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Break points tried in order when a window has to be cut before its limit
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "? ", "! ", " "];

/// A slice of the source document used as the unit of retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the corpus; also its row in the vector index
    pub id: usize,
    /// The chunk text, including the overlap carried over from the previous chunk
    pub text: String,
    /// Byte offset of `text` within the source document
    pub source_offset: usize,
}

impl Chunk {
    /// Byte offset one past the last byte of this chunk in the source document
    #[inline]
    pub fn source_end(&self) -> usize {
        self.source_offset + self.text.len()
    }
}

/// Configuration for content chunking. Sizes are counted in characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("chunk size must be greater than 0")]
    ZeroChunkSize,
    #[error("overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ChunkingError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: self.overlap,
                chunk_size: self.chunk_size,
            });
        }
        Ok(())
    }
}

/// Split document text into overlapping windows of at most `chunk_size` characters.
///
/// Each window is cut at the latest paragraph break, line break, sentence end or
/// space found in its second half, and hard-cut at the limit when none exists.
/// The next window starts `overlap` characters before the previous cut, so the
/// parts of each chunk past the previous cut concatenate back to `text`.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, ChunkingError> {
    config.validate()?;

    // Byte offset of every char, plus the end of the text
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut covered = 0;
    let mut prev_start = 0;

    while covered < char_count {
        let start = if chunks.is_empty() {
            0
        } else {
            covered
                .saturating_sub(config.overlap)
                .max(prev_start + 1)
        };
        let limit = (start + config.chunk_size).min(char_count);

        let end = if limit == char_count {
            char_count
        } else {
            let min_end = (covered + 1).max(start + config.chunk_size / 2);
            find_break(text, &bounds, start, min_end, limit).unwrap_or(limit)
        };

        chunks.push(Chunk {
            id: chunks.len(),
            text: text[bounds[start]..bounds[end]].to_string(),
            source_offset: bounds[start],
        });

        prev_start = start;
        covered = end;
    }

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        char_count,
        chunks.len(),
        config.chunk_size,
        config.overlap
    );

    Ok(chunks)
}

/// Latest char position in `min_end..=limit` directly after a separator
fn find_break(
    text: &str,
    bounds: &[usize],
    start: usize,
    min_end: usize,
    limit: usize,
) -> Option<usize> {
    let window_start = bounds[start];
    let window = &text[window_start..bounds[limit]];
    let lowest = bounds[min_end];

    SEPARATORS.iter().find_map(|separator| {
        let cut = window_start + window.rfind(separator)? + separator.len();
        if cut < lowest {
            return None;
        }
        bounds.binary_search(&cut).ok()
    })
}

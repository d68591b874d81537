
use thiserror::Error;
use tracing::debug;

use crate::embeddings::Embedding;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("embedding {position} has dimension {actual}, index dimension is {expected}")]
    InconsistentDimension {
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("query has dimension {actual}, index dimension is {expected}")]
    QueryDimension { expected: usize, actual: usize },

    #[error("embeddings must have at least one dimension")]
    ZeroDimension,
}

/// A nearest-neighbor match: the chunk row and its squared L2 distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub chunk_id: usize,
    pub distance: f32,
}

/// Exhaustive squared-L2 index over a flat, row-major vector buffer.
///
/// Row `i` holds the embedding of chunk `i`. The index is read-only once built,
/// so `&FlatL2Index` can be shared between any number of concurrent searches.
#[derive(Debug, Clone, Default)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatL2Index {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of the index with `embeddings`, in order
    #[inline]
    pub fn build(&mut self, embeddings: &[Embedding]) -> Result<(), IndexError> {
        let Some(first) = embeddings.first() else {
            self.dimension = 0;
            self.vectors.clear();
            return Ok(());
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }

        let mut vectors = Vec::with_capacity(embeddings.len() * dimension);
        for (position, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimension {
                return Err(IndexError::InconsistentDimension {
                    position,
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            vectors.extend_from_slice(embedding);
        }

        self.dimension = dimension;
        self.vectors = vectors;
        debug!(
            "Built flat L2 index with {} vectors of dimension {}",
            self.len(),
            dimension
        );
        Ok(())
    }

    /// The `min(k, len)` nearest rows, ascending by distance, ties to the lower id
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(IndexError::QueryDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(chunk_id, row)| SearchHit {
                chunk_id,
                distance: squared_l2(row, query),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero until the index has been built with at least one vector
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

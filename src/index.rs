//! In-memory vector index with exact top-k search.

use crate::chunking::Chunk;
use crate::embeddings::Embedding;
use crate::error::IndexError;
use std::cmp::Ordering;

/// Similarity metric, fixed when the index is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Distance {
    /// Cosine similarity; higher scores are closer
    #[default]
    Cosine,
    /// Euclidean (L2) distance; lower scores are closer
    Euclid,
}

impl Distance {
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Distance::Cosine => cosine_similarity(a, b),
            Distance::Euclid => euclidean_distance(a, b),
        }
    }

    /// Orders scores best first
    fn rank(&self, a: f32, b: f32) -> Ordering {
        match self {
            Distance::Cosine => b.total_cmp(&a),
            Distance::Euclid => a.total_cmp(&b),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[derive(Debug, Clone)]
struct IndexEntry {
    vector: Vec<f32>,
    chunk: Chunk,
}

/// A chunk returned by a search together with its score under the index metric
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Read-only collection of (vector, chunk) entries.
///
/// `VectorIndex::default()` is an unbuilt index holding no entries.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
    distance: Distance,
    embedding_model: String,
}

impl VectorIndex {
    /// Build the index from all entries at once
    pub fn build(
        entries: Vec<(Embedding, Chunk)>,
        distance: Distance,
        embedding_model: impl Into<String>,
    ) -> Result<Self, IndexError> {
        let dimension = match entries.first() {
            Some((embedding, _)) => embedding.dimension(),
            None => return Err(IndexError::Empty),
        };
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }

        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(position, (embedding, chunk))| {
                if embedding.dimension() != dimension {
                    return Err(IndexError::DimensionMismatch {
                        position,
                        expected: dimension,
                        actual: embedding.dimension(),
                    });
                }
                Ok(IndexEntry {
                    vector: embedding.values,
                    chunk,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VectorIndex {
            entries,
            dimension,
            distance,
            embedding_model: embedding_model.into(),
        })
    }

    /// Return up to `k` entries closest to `vector`, best first.
    ///
    /// Equal scores keep insertion order; `k` larger than the index returns every entry.
    pub fn query(&self, vector: &Embedding, k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if vector.dimension() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                position: 0,
                expected: self.dimension,
                actual: vector.dimension(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, self.distance.score(&entry.vector, &vector.values)))
            .collect();

        // Stable sort so ties keep insertion order
        scored.sort_by(|a, b| self.distance.rank(a.1, b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| ScoredChunk {
                chunk: self.entries[position].chunk.clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

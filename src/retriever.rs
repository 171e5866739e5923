use crate::chunking::Chunk;
use crate::embeddings::{EmbedTask, Embedder};
use crate::error::RagError;
use crate::index::{ScoredChunk, VectorIndex};
use crate::remote::CallGuard;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TOP_K: usize = 10;

/// A user question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
}

impl Query {
    /// Trim the input; blank input is not a query
    pub fn parse(input: &str) -> Option<Self> {
        let text = input.trim();
        (!text.is_empty()).then(|| Query {
            text: text.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Chunks retrieved for one query, most similar first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievedContext {
    pub chunks: Vec<Chunk>,
}

/// Similarity search with a fixed top-k over a prebuilt index
pub struct Retriever<E> {
    embedder: E,
    index: Arc<VectorIndex>,
    k: usize,
    timeout: Option<Duration>,
}

impl<E: Embedder> Retriever<E> {
    /// The embedder must use the model the index was built with
    pub fn new(
        embedder: E,
        index: Arc<VectorIndex>,
        k: usize,
        timeout: Option<Duration>,
    ) -> Result<Self, RagError> {
        if !index.is_empty() && index.embedding_model() != embedder.model() {
            return Err(RagError::ModelMismatch {
                index: index.embedding_model().to_string(),
                embedder: embedder.model().to_string(),
            });
        }

        Ok(Retriever {
            embedder,
            index,
            k,
            timeout,
        })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub async fn retrieve(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<RetrievedContext, RagError> {
        let scored = self.retrieve_scored(query, cancel).await?;
        Ok(RetrievedContext {
            chunks: scored.into_iter().map(|s| s.chunk).collect(),
        })
    }

    /// Like [`Retriever::retrieve`] but keeps the similarity scores
    pub async fn retrieve_scored(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if self.index.is_empty() {
            return Err(RagError::EmptyIndex);
        }

        let guard = CallGuard::new(self.timeout, cancel.clone());
        let embedding = guard
            .run(self.embedder.embed(query.text(), EmbedTask::RetrievalQuery))
            .await
            .map_err(RagError::EmbeddingService)?;

        let results = self.index.query(&embedding, self.k)?;
        for result in &results {
            debug!(
                "Retrieved chunk {} (page {}) score {:.4}",
                result.chunk.chunk_index, result.chunk.source_page, result.score
            );
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parse_trims_and_rejects_blank() {
        assert_eq!(Query::parse("  why?  ").unwrap().text(), "why?");
        assert!(Query::parse("").is_none());
        assert!(Query::parse(" \t\n").is_none());
    }
}

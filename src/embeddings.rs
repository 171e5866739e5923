use crate::chunking::Chunk;
use crate::error::ServiceError;
use crate::remote::CallGuard;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Embedding { values }
    }
}

/// What the embedded text will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedTask {
    /// A chunk stored in the index
    RetrievalDocument,
    /// A user question searched against the index
    RetrievalQuery,
}

/// A remote service turning text into vectors
pub trait Embedder: Send + Sync {
    /// Identity of the embedding model; vectors from different models are not comparable
    fn model(&self) -> &str;

    fn embed(
        &self,
        text: &str,
        task: EmbedTask,
    ) -> impl Future<Output = Result<Embedding, ServiceError>> + Send;

    /// Embed several texts, returning one vector per text in input order
    fn embed_batch(
        &self,
        texts: &[String],
        task: EmbedTask,
    ) -> impl Future<Output = Result<Vec<Embedding>, ServiceError>> + Send {
        async move {
            let mut embeddings = Vec::with_capacity(texts.len());
            for text in texts {
                embeddings.push(self.embed(text, task).await?);
            }
            Ok(embeddings)
        }
    }
}

/// Embed chunks in sequential batches of at most `batch_size`
pub async fn embed_chunks<E: Embedder>(
    embedder: &E,
    chunks: &[Chunk],
    batch_size: usize,
    guard: &CallGuard,
) -> Result<Vec<Embedding>, ServiceError> {
    let batch_size = batch_size.max(1);
    let batches = chunks.len().div_ceil(batch_size);
    let mut embeddings = Vec::with_capacity(chunks.len());

    for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
        debug!("Embedding batch {}/{}", batch_no + 1, batches);
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();

        let vectors = guard
            .run(embedder.embed_batch(&texts, EmbedTask::RetrievalDocument))
            .await?;

        if vectors.len() != texts.len() {
            return Err(ServiceError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        embeddings.extend(vectors);
    }

    info!(
        "Generated {} embeddings with {}",
        embeddings.len(),
        embedder.model()
    );
    Ok(embeddings)
}

use crate::chunking::Chunker;
use crate::config::Settings;
use crate::document::Document;
use crate::embeddings::{embed_chunks, Embedder};
use crate::error::RagError;
use crate::gemini::GeminiClient;
use crate::generator::{Answer, AnswerGenerator, Generator};
use crate::index::VectorIndex;
use crate::remote::CallGuard;
use crate::retriever::{Query, Retriever};
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// RAG (Retrieval-Augmented Generation) engine.
///
/// Built once at startup, then shared read-only by whichever shell serves questions.
pub struct RagEngine<E, G> {
    source_id: String,
    retriever: Retriever<E>,
    generator: AnswerGenerator<G>,
}

pub type GeminiRagEngine = RagEngine<GeminiClient, GeminiClient>;

impl<E: Embedder, G: Generator> RagEngine<E, G> {
    /// Process a document: chunk it, generate embeddings and build the index
    pub async fn build(
        document: &Document,
        settings: &Settings,
        embedder: E,
        generator: G,
        cancel: &CancellationToken,
    ) -> Result<Self, RagError> {
        let chunker = Chunker::new(settings.chunk_size, settings.chunk_overlap)?;
        let chunks = chunker.split_document(document);
        info!(
            "Split {} ({} pages) into {} chunks",
            document.source_id,
            document.pages.len(),
            chunks.len()
        );

        let guard = CallGuard::new(settings.request_timeout(), cancel.clone());
        let embeddings = embed_chunks(&embedder, &chunks, settings.embed_batch_size, &guard)
            .await
            .map_err(RagError::EmbeddingService)?;

        let index = VectorIndex::build(
            embeddings.into_iter().zip(chunks).collect(),
            settings.distance,
            embedder.model(),
        )?;
        info!(
            "Indexed {} chunks ({} dimensions, {:?} distance)",
            index.len(),
            index.dimension(),
            index.distance()
        );

        Self::from_index(
            document.source_id.clone(),
            Arc::new(index),
            embedder,
            generator,
            settings,
        )
    }

    /// Assemble an engine around an already built index
    pub fn from_index(
        source_id: String,
        index: Arc<VectorIndex>,
        embedder: E,
        generator: G,
        settings: &Settings,
    ) -> Result<Self, RagError> {
        let timeout = settings.request_timeout();
        let retriever = Retriever::new(embedder, index, settings.retrieval_k, timeout)?;
        let generator = AnswerGenerator::new(generator, settings.sampling(), timeout);

        Ok(RagEngine {
            source_id,
            retriever,
            generator,
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn retriever(&self) -> &Retriever<E> {
        &self.retriever
    }

    /// Answer one question: retrieve context, then ask the language model
    pub async fn answer(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<Answer, RagError> {
        let query = Query::parse(question).ok_or(RagError::EmptyQuery)?;

        let context = self.retriever.retrieve(&query, cancel).await?;
        info!("Retrieved {} chunks for the question", context.chunks.len());

        let answer = self.generator.answer(&query, &context, cancel).await?;
        info!("Answer from {}: {}", self.generator.model(), answer.text);

        Ok(answer)
    }
}

#![allow(dead_code)]

use gemini_pdf_rag::config::Settings;
use gemini_pdf_rag::document::Document;
use gemini_pdf_rag::embeddings::{EmbedTask, Embedder, Embedding};
use gemini_pdf_rag::error::ServiceError;
use gemini_pdf_rag::generator::{Generator, Prompt, SamplingParams};
use gemini_pdf_rag::rag::RagEngine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const VOCABULARY: [&str; 10] = [
    "photosynthesis",
    "converts",
    "light",
    "energy",
    "chemical",
    "mitochondria",
    "produce",
    "atp",
    "ribosomes",
    "proteins",
];

pub const PHOTOSYNTHESIS: &str = "Photosynthesis converts light into chemical energy.";
pub const MITOCHONDRIA: &str = "Mitochondria produce ATP.";
pub const RIBOSOMES: &str = "Ribosomes build proteins.";

/// One dimension per vocabulary word, 1.0 when the word occurs in the text
pub fn vectorize(text: &str) -> Embedding {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .collect();

    Embedding::new(
        VOCABULARY
            .iter()
            .map(|term| if words.iter().any(|w| w == term) { 1.0 } else { 0.0 })
            .collect(),
    )
}

/// Deterministic keyword embedder; can be told to fail upcoming query embeddings
#[derive(Default)]
pub struct VocabularyEmbedder {
    failing_queries: AtomicUsize,
}

impl VocabularyEmbedder {
    pub fn failing_next_queries(count: usize) -> Self {
        VocabularyEmbedder {
            failing_queries: AtomicUsize::new(count),
        }
    }
}

impl Embedder for VocabularyEmbedder {
    fn model(&self) -> &str {
        "vocabulary"
    }

    async fn embed(&self, text: &str, task: EmbedTask) -> Result<Embedding, ServiceError> {
        if task == EmbedTask::RetrievalQuery
            && self
                .failing_queries
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(ServiceError::Status {
                status: 503,
                body: "embedding service unavailable".to_string(),
            });
        }
        Ok(vectorize(text))
    }
}

/// Answers with the first context chunk and records every prompt it receives
#[derive(Clone, Default)]
pub struct ContextEchoGenerator {
    pub prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl Generator for ContextEchoGenerator {
    fn model(&self) -> &str {
        "context-echo"
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        _sampling: &SamplingParams,
    ) -> Result<String, ServiceError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let first_chunk = prompt.system.split("\n\n").nth(1).unwrap_or_default();
        if first_chunk.is_empty() {
            return Ok("I'm sorry, I don't know.".to_string());
        }
        Ok(first_chunk.to_string())
    }
}

/// Never answers within any reasonable timeout
pub struct SlowGenerator;

impl Generator for SlowGenerator {
    fn model(&self) -> &str {
        "slow"
    }

    async fn generate(
        &self,
        _prompt: &Prompt,
        _sampling: &SamplingParams,
    ) -> Result<String, ServiceError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("too late".to_string())
    }
}

/// Echoes context like [`ContextEchoGenerator`] but takes a while, recording
/// the highest number of calls that were ever in flight together
#[derive(Clone, Default)]
pub struct OverlapTrackingGenerator {
    in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl Generator for OverlapTrackingGenerator {
    fn model(&self) -> &str {
        "overlap-tracking"
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        sampling: &SamplingParams,
    ) -> Result<String, ServiceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        ContextEchoGenerator::default().generate(prompt, sampling).await
    }
}

pub fn biology_document() -> Document {
    Document::from_pages("biology.pdf", [PHOTOSYNTHESIS, MITOCHONDRIA])
}

pub fn test_settings() -> Settings {
    Settings {
        embedding_model: "vocabulary".to_string(),
        generation_model: "context-echo".to_string(),
        ..Settings::default()
    }
}

pub async fn build_engine<G: Generator>(
    document: &Document,
    embedder: VocabularyEmbedder,
    generator: G,
) -> RagEngine<VocabularyEmbedder, G> {
    RagEngine::build(
        document,
        &test_settings(),
        embedder,
        generator,
        &CancellationToken::new(),
    )
    .await
    .expect("engine builds")
}

pub fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
}

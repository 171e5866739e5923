use crate::error::ConfigError;
use crate::generator::SamplingParams;
use crate::index::Distance;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Gemini accepts at most this many texts per batch embedding request
pub const MAX_EMBED_BATCH: usize = 100;

/// Every option the pipeline recognizes; each can also come from the environment (or `.env`)
#[derive(Args, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Path to the document to answer questions about (PDF or text)
    #[arg(long, env = "RAG_DOCUMENT", default_value = "source_file.pdf")]
    pub document: PathBuf,

    /// Maximum chunk length in characters
    #[arg(long, env = "RAG_CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters carried over between consecutive chunks
    #[arg(long, env = "RAG_CHUNK_OVERLAP", default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(long, env = "RAG_RETRIEVAL_K", default_value_t = 10)]
    pub retrieval_k: usize,

    #[arg(long, env = "RAG_EMBEDDING_MODEL", default_value = "models/embedding-001")]
    pub embedding_model: String,

    #[arg(long, env = "RAG_GENERATION_MODEL", default_value = "gemini-2.0-flash")]
    pub generation_model: String,

    #[arg(long, env = "RAG_TEMPERATURE", default_value_t = 0.0)]
    pub temperature: f32,

    /// Cap on generated tokens; unlimited when unset
    #[arg(long, env = "RAG_MAX_OUTPUT_TOKENS")]
    pub max_output_tokens: Option<u32>,

    /// Similarity metric of the vector index
    #[arg(long, env = "RAG_DISTANCE", value_enum, default_value_t = Distance::Cosine)]
    pub distance: Distance,

    /// Chunks sent per embedding request while building the index
    #[arg(long, env = "RAG_EMBED_BATCH_SIZE", default_value_t = MAX_EMBED_BATCH)]
    pub embed_batch_size: usize,

    /// Timeout for each remote call in seconds; 0 waits indefinitely
    #[arg(long, env = "RAG_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            document: PathBuf::from("source_file.pdf"),
            chunk_size: 1000,
            chunk_overlap: 200,
            retrieval_k: 10,
            embedding_model: "models/embedding-001".to_string(),
            generation_model: "gemini-2.0-flash".to_string(),
            temperature: 0.0,
            max_output_tokens: None,
            distance: Distance::Cosine,
            embed_batch_size: MAX_EMBED_BATCH,
            request_timeout_secs: 60,
        }
    }
}

impl Settings {
    /// Check every option once, before anything is loaded
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(invalid(
                "chunk_overlap",
                format!("must be smaller than chunk_size ({})", self.chunk_size),
            ));
        }
        if self.retrieval_k == 0 {
            return Err(invalid("retrieval_k", "must be greater than zero"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid("temperature", "must be between 0 and 2"));
        }
        if self.embed_batch_size == 0 || self.embed_batch_size > MAX_EMBED_BATCH {
            return Err(invalid(
                "embed_batch_size",
                format!("must be between 1 and {}", MAX_EMBED_BATCH),
            ));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(invalid("embedding_model", "must not be empty"));
        }
        if self.generation_model.trim().is_empty() {
            return Err(invalid("generation_model", "must not be empty"));
        }
        if self.max_output_tokens == Some(0) {
            return Err(invalid("max_output_tokens", "must be greater than zero"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

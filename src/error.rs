use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to turn the source file into a [`crate::document::Document`]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported document format {mime_type} for {}; only text and PDF files are supported", .path.display())]
    Unsupported { path: PathBuf, mime_type: String },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract text from PDF {}: {message}", .path.display())]
    Pdf { path: PathBuf, message: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero, got {0}")]
    InvalidSize(usize),

    #[error("chunk overlap {overlap} must be smaller than chunk size {size}")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// A single remote call (embedding or generation) that did not produce a result
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API request failed: {status} {body}")]
    Status { status: u16, body: String },

    #[error("no response generated")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for ServiceError {
    /// Request URLs are dropped so endpoints never reach user-facing messages
    fn from(error: reqwest::Error) -> Self {
        ServiceError::Request(error.without_url())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("cannot build an index from zero entries")]
    Empty,

    #[error("embedding vectors must have at least one dimension")]
    ZeroDimension,

    #[error("dimension mismatch at entry {position}: expected {expected}, got {actual}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },
}

/// Errors surfaced by the question answering pipeline
#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding service error: {0}")]
    EmbeddingService(#[source] ServiceError),

    #[error("generation service error: {0}")]
    GenerationService(#[source] ServiceError),

    #[error("the vector index is empty")]
    EmptyIndex,

    #[error("index construction failed: {0}")]
    Index(#[from] IndexError),

    #[error("chunking failed: {0}")]
    Chunk(#[from] ChunkError),

    #[error("index was built with embedding model {index}, but the embedder uses {embedder}")]
    ModelMismatch { index: String, embedder: String },

    #[error("query is empty")]
    EmptyQuery,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
}

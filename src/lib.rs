pub mod chunking;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod index;
pub mod rag;
pub mod remote;
pub mod retriever;
pub mod shell;
pub mod web;

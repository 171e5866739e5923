use crate::config::Settings;
use crate::embeddings::{EmbedTask, Embedder, Embedding};
use crate::error::{ConfigError, ServiceError};
use crate::generator::{Generator, Prompt, SamplingParams};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Configuration for Gemini API
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
}

impl GeminiConfig {
    /// Read the credential and endpoint from environment variables, models from settings
    pub fn from_env(settings: &Settings) -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .map_err(|_| ConfigError::MissingEnv("GEMINI_API_KEY"))?;
        let base_url = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(GeminiConfig {
            api_key,
            base_url,
            embedding_model: settings.embedding_model.clone(),
            generation_model: settings.generation_model.clone(),
        })
    }
}

/// Client for interacting with Gemini API
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Self {
        let client = reqwest::Client::new();
        GeminiClient { config, client }
    }

    /// Get the client configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn method_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model_path(model),
            method
        )
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ServiceError::Malformed(e.to_string()))
    }
}

impl Embedder for GeminiClient {
    fn model(&self) -> &str {
        &self.config.embedding_model
    }

    async fn embed(&self, text: &str, task: EmbedTask) -> Result<Embedding, ServiceError> {
        let model = model_path(&self.config.embedding_model);
        let request = EmbedContentRequest::new(&model, text, task);
        let url = self.method_url(&self.config.embedding_model, "embedContent");

        let response: EmbedContentResponse = self.post_json(&url, &request).await?;
        non_empty(response.embedding)
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        task: EmbedTask,
    ) -> Result<Vec<Embedding>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = model_path(&self.config.embedding_model);
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest::new(&model, text, task))
                .collect(),
        };
        let url = self.method_url(&self.config.embedding_model, "batchEmbedContents");

        let response: BatchEmbedResponse = self.post_json(&url, &request).await?;
        if response.embeddings.len() != texts.len() {
            return Err(ServiceError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        response.embeddings.into_iter().map(non_empty).collect()
    }
}

impl Generator for GeminiClient {
    fn model(&self) -> &str {
        &self.config.generation_model
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        sampling: &SamplingParams,
    ) -> Result<String, ServiceError> {
        let request = GenerateRequest {
            system_instruction: Content::new(None, &prompt.system),
            contents: vec![Content::new(Some("user"), &prompt.input)],
            generation_config: GenerationConfig {
                temperature: sampling.temperature,
                max_output_tokens: sampling.max_output_tokens,
            },
        };
        let url = self.method_url(&self.config.generation_model, "generateContent");

        let response: GenerateResponse = self.post_json(&url, &request).await?;
        response.into_text()
    }
}

/// Gemini REST paths address models as `models/<name>`
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn non_empty(data: EmbeddingData) -> Result<Embedding, ServiceError> {
    if data.values.is_empty() {
        return Err(ServiceError::EmptyResponse);
    }
    Ok(Embedding::new(data.values))
}

// Request/response structures for the Gemini API

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

impl<'a> EmbedContentRequest<'a> {
    fn new(model: &'a str, text: &'a str, task: EmbedTask) -> Self {
        EmbedContentRequest {
            model,
            content: Content::new(None, text),
            task_type: match task {
                EmbedTask::RetrievalDocument => "RETRIEVAL_DOCUMENT",
                EmbedTask::RetrievalQuery => "RETRIEVAL_QUERY",
            },
        }
    }
}

#[derive(Serialize, Debug)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize, Debug)]
struct EmbedContentResponse {
    embedding: EmbeddingData,
}

#[derive(Deserialize, Debug)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn new(role: Option<&'static str>, text: &'a str) -> Self {
        Content {
            role,
            parts: vec![Part { text }],
        }
    }
}

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Concatenate the text parts of the first candidate
    fn into_text(self) -> Result<String, ServiceError> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

use crate::error::{RagError, ServiceError};
use crate::remote::CallGuard;
use crate::retriever::{Query, RetrievedContext};
use log::debug;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SYSTEM_INSTRUCTION: &str = "You are a research assistant specialized in academic literature and question answering. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, apologize and say that you don't know instead of making one up. \
Use three sentences maximum and keep the answer concise and accurate.";

/// A generated answer to a single query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
}

/// Prompt sent to the language model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System instruction with the retrieved context appended
    pub system: String,
    /// The user's question, verbatim
    pub input: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    /// `None` leaves the output length to the model
    pub max_output_tokens: Option<u32>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        SamplingParams {
            temperature: 0.0,
            max_output_tokens: None,
        }
    }
}

/// A remote language model
pub trait Generator: Send + Sync {
    fn model(&self) -> &str;

    fn generate(
        &self,
        prompt: &Prompt,
        sampling: &SamplingParams,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

/// Render the prompt: fixed instruction, the context chunks, then the raw question
pub fn render_prompt(query: &Query, context: &RetrievedContext) -> Prompt {
    let context_text = context
        .chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    Prompt {
        system: format!("{}\n\n{}", SYSTEM_INSTRUCTION, context_text),
        input: query.text().to_string(),
    }
}

/// Answers a query from retrieved context with a fixed instruction and sampling
pub struct AnswerGenerator<G> {
    generator: G,
    sampling: SamplingParams,
    timeout: Option<Duration>,
}

impl<G: Generator> AnswerGenerator<G> {
    pub fn new(generator: G, sampling: SamplingParams, timeout: Option<Duration>) -> Self {
        AnswerGenerator {
            generator,
            sampling,
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    pub async fn answer(
        &self,
        query: &Query,
        context: &RetrievedContext,
        cancel: &CancellationToken,
    ) -> Result<Answer, RagError> {
        let prompt = render_prompt(query, context);
        debug!(
            "Prompting {} with {} context chunks",
            self.generator.model(),
            context.chunks.len()
        );

        let guard = CallGuard::new(self.timeout, cancel.clone());
        let text = guard
            .run(self.generator.generate(&prompt, &self.sampling))
            .await
            .map_err(RagError::GenerationService)?;

        Ok(Answer {
            text: text.trim().to_string(),
        })
    }
}

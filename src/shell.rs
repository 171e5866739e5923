use crate::embeddings::Embedder;
use crate::generator::Generator;
use crate::rag::RagEngine;
use log::{error, info};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Line-oriented question/answer loop over any async reader and writer
pub struct Shell<'a, E, G> {
    engine: &'a RagEngine<E, G>,
}

impl<'a, E: Embedder, G: Generator> Shell<'a, E, G> {
    pub fn new(engine: &'a RagEngine<E, G>) -> Self {
        Shell { engine }
    }

    /// Run the query loop until `exit`, end of input or shutdown.
    ///
    /// Failed questions are reported and the loop keeps going.
    pub async fn run<R, W>(
        &self,
        input: R,
        mut output: W,
        shutdown: &CancellationToken,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            "Ready to answer questions about {}. Type 'exit' to quit.",
            self.engine.source_id()
        );
        let mut lines = input.lines();

        loop {
            output.write_all(b"\nYour question: ").await?;
            output.flush().await?;

            let line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                break;
            };

            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
                break;
            }

            let cancel = shutdown.child_token();
            let reply = match self.engine.answer(question, &cancel).await {
                Ok(answer) => answer.text,
                Err(e) => {
                    error!("Failed to answer {:?}: {}", question, e);
                    format!("Sorry, the question could not be answered: {}", e)
                }
            };

            output.write_all(format!("\n{}\n", reply).as_bytes()).await?;
            output.flush().await?;
        }

        output.write_all(b"\nGoodbye!\n").await?;
        output.flush().await?;
        info!("Goodbye!");
        Ok(())
    }
}

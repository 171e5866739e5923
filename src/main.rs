use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use gemini_pdf_rag::config::Settings;
use gemini_pdf_rag::document::Document;
use gemini_pdf_rag::gemini::{GeminiClient, GeminiConfig};
use gemini_pdf_rag::rag::{GeminiRagEngine, RagEngine};
use gemini_pdf_rag::shell::Shell;
use gemini_pdf_rag::web;

/// Answer questions about a PDF document using Gemini embeddings and generation
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask questions in the terminal (default)
    Ask,
    /// Serve a browser page with a single question input
    Serve {
        #[arg(long, env = "RAG_BIND", default_value = "127.0.0.1:8501")]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = args.settings;
    settings.validate().context("Invalid configuration")?;

    let shutdown = CancellationToken::new();
    spawn_interrupt_handler(shutdown.clone());

    let engine = build_engine(&settings, &shutdown).await?;

    match args.command.unwrap_or(Command::Ask) {
        Command::Ask => {
            let stdin = BufReader::new(tokio::io::stdin());
            Shell::new(&engine)
                .run(stdin, tokio::io::stdout(), &shutdown)
                .await
                .context("Error in query loop")?;
        }
        Command::Serve { bind } => {
            web::serve(Arc::new(engine), bind, shutdown)
                .await
                .context("Web shell failed")?;
        }
    }

    Ok(())
}

/// Load the document and build the index; nothing is served until this completes
async fn build_engine(settings: &Settings, shutdown: &CancellationToken) -> Result<GeminiRagEngine> {
    info!("Processing file: {}", settings.document.display());
    let document = Document::from_file(&settings.document).context("Failed to load document")?;
    info!("Document type: {}", document.mime_type);

    let gemini_config = GeminiConfig::from_env(settings).context("Missing Gemini credentials")?;
    let gemini = GeminiClient::new(gemini_config);

    RagEngine::build(&document, settings, gemini.clone(), gemini, shutdown)
        .await
        .context("Failed to build the document index")
}

/// First Ctrl-C cancels the in-flight query and ends the session, a second one exits immediately
fn spawn_interrupt_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, shutting down (press Ctrl-C again to force quit)");
        shutdown.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

//! Browser front end: a single text input with the answer rendered beneath it.

use crate::embeddings::Embedder;
use crate::error::RagError;
use crate::generator::Generator;
use crate::rag::RagEngine;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use html_escape::{encode_double_quoted_attribute, encode_text};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub struct WebState<E, G> {
    engine: Arc<RagEngine<E, G>>,
    /// Held while a question is being answered; one query at a time
    gate: Arc<Mutex<()>>,
    shutdown: CancellationToken,
}

impl<E, G> Clone for WebState<E, G> {
    fn clone(&self) -> Self {
        WebState {
            engine: Arc::clone(&self.engine),
            gate: Arc::clone(&self.gate),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<E: Embedder, G: Generator> WebState<E, G> {
    async fn ask(&self, question: &str) -> Result<String, RagError> {
        let _turn = self.gate.lock().await;
        let cancel = self.shutdown.child_token();
        self.engine.answer(question, &cancel).await.map(|a| a.text)
    }
}

#[derive(Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    pub query: String,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub answer: String,
}

pub fn router<E, G>(engine: Arc<RagEngine<E, G>>, shutdown: CancellationToken) -> Router
where
    E: Embedder + 'static,
    G: Generator + 'static,
{
    let state = WebState {
        engine,
        gate: Arc::new(Mutex::new(())),
        shutdown,
    };

    Router::new()
        .route("/", get(index_page::<E, G>).post(ask_form::<E, G>))
        .route("/api/query", post(ask_json::<E, G>))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve the browser shell until `shutdown` is cancelled
pub async fn serve<E, G>(
    engine: Arc<RagEngine<E, G>>,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    E: Embedder + 'static,
    G: Generator + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(
        "Ask questions about {} at http://{}",
        engine.source_id(),
        listener.local_addr()?
    );

    let app = router(engine, shutdown.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Web shell shutting down");
        })
        .await
}

async fn health() -> &'static str {
    "ok"
}

async fn index_page<E, G>(State(state): State<WebState<E, G>>) -> Html<String>
where
    E: Embedder + 'static,
    G: Generator + 'static,
{
    render_page(state.engine.source_id(), "", None)
}

async fn ask_form<E, G>(
    State(state): State<WebState<E, G>>,
    Form(form): Form<QueryForm>,
) -> Html<String>
where
    E: Embedder + 'static,
    G: Generator + 'static,
{
    let question = form.query.trim();
    if question.is_empty() {
        return render_page(state.engine.source_id(), "", None);
    }

    let reply = match state.ask(question).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("Failed to answer {:?}: {}", question, e);
            format!("Sorry, the question could not be answered: {}", e)
        }
    };

    render_page(state.engine.source_id(), question, Some(&reply))
}

async fn ask_json<E, G>(
    State(state): State<WebState<E, G>>,
    Json(request): Json<QueryRequest>,
) -> Response
where
    E: Embedder + 'static,
    G: Generator + 'static,
{
    match state.ask(&request.query).await {
        Ok(answer) => (StatusCode::OK, Json(QueryResponse { answer })).into_response(),
        Err(RagError::EmptyQuery) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": RagError::EmptyQuery.to_string() })),
        )
            .into_response(),
        Err(e) => {
            error!("Query failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("Query failed: {}", e) })),
            )
                .into_response()
        }
    }
}

fn render_page(source_id: &str, question: &str, reply: Option<&str>) -> Html<String> {
    let reply = reply
        .map(|text| format!("<p id=\"answer\">{}</p>", encode_text(text)))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Ask {title}</title>
<style>
body {{ font-family: system-ui; max-width: 48rem; margin: 3rem auto; }}
input {{ width: 100%; padding: 0.5rem; font-size: 1rem; }}
#answer {{ white-space: pre-wrap; }}
</style>
</head>
<body>
<h1>Ask {title}</h1>
<form method="post" action="/">
<input type="text" name="query" placeholder="Write your query" value="{value}" autofocus>
</form>
{reply}
</body>
</html>"#,
        title = encode_text(source_id),
        value = encode_double_quoted_attribute(question),
        reply = reply,
    ))
}

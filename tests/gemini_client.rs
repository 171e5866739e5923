use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use gemini_pdf_rag::embeddings::{EmbedTask, Embedder};
use gemini_pdf_rag::error::ServiceError;
use gemini_pdf_rag::gemini::{GeminiClient, GeminiConfig};
use gemini_pdf_rag::generator::{Generator, Prompt, SamplingParams};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A request as seen by the mock server
struct RecordedRequest {
    uri: String,
    api_key: Option<String>,
    body: Value,
}

type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

async fn start_mock_gemini_server(
    response_status: u16,
    response_body: Value,
) -> (String, Recorded, oneshot::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let recorded: Recorded = Arc::default();

    let app = Router::new().fallback({
        let recorded = Arc::clone(&recorded);
        move |headers: HeaderMap, uri: Uri, body: String| {
            let recorded = Arc::clone(&recorded);
            let response_body = response_body.clone();
            async move {
                let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                let api_key = headers
                    .get("x-goog-api-key")
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                recorded.lock().unwrap().push(RecordedRequest {
                    uri: uri.to_string(),
                    api_key,
                    body,
                });
                let status = StatusCode::from_u16(response_status).unwrap();
                (status, response_body.to_string()).into_response()
            }
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}/v1beta", addr);

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .ok();
    });

    (base_url, recorded, shutdown_tx)
}

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::new(GeminiConfig {
        api_key: "test-key".to_string(),
        base_url: base_url.to_string(),
        embedding_model: "models/embedding-001".to_string(),
        generation_model: "gemini-2.0-flash".to_string(),
    })
}

#[tokio::test]
async fn test_embed_posts_query_task_and_returns_values() {
    let (base_url, recorded, shutdown_tx) =
        start_mock_gemini_server(200, json!({ "embedding": { "values": [0.5, -0.25, 1.0] } }))
            .await;

    let embedding = client(&base_url)
        .embed("What converts light?", EmbedTask::RetrievalQuery)
        .await
        .unwrap();

    assert_eq!(embedding.values, vec![0.5, -0.25, 1.0]);
    let requests = recorded.lock().unwrap();
    assert_eq!(requests[0].uri, "/v1beta/models/embedding-001:embedContent");
    assert_eq!(requests[0].api_key.as_deref(), Some("test-key"));
    assert_eq!(requests[0].body["taskType"], "RETRIEVAL_QUERY");
    assert_eq!(
        requests[0].body["content"]["parts"][0]["text"],
        "What converts light?"
    );
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn test_batch_embed_sends_one_request_for_all_texts() {
    let (base_url, recorded, shutdown_tx) = start_mock_gemini_server(
        200,
        json!({ "embeddings": [{ "values": [1.0, 0.0] }, { "values": [0.0, 1.0] }] }),
    )
    .await;
    let texts = vec!["first".to_string(), "second".to_string()];

    let embeddings = client(&base_url)
        .embed_batch(&texts, EmbedTask::RetrievalDocument)
        .await
        .unwrap();

    assert_eq!(embeddings.len(), 2);
    assert_eq!(embeddings[1].values, vec![0.0, 1.0]);
    let requests = recorded.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].uri.ends_with(":batchEmbedContents"));
    assert_eq!(requests[0].body["requests"][1]["content"]["parts"][0]["text"], "second");
    assert_eq!(requests[0].body["requests"][0]["taskType"], "RETRIEVAL_DOCUMENT");
    assert_eq!(requests[0].body["requests"][0]["model"], "models/embedding-001");
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn test_batch_embed_with_missing_vectors_is_malformed() {
    let (base_url, _recorded, shutdown_tx) =
        start_mock_gemini_server(200, json!({ "embeddings": [{ "values": [1.0] }] })).await;
    let texts = vec!["first".to_string(), "second".to_string()];

    let result = client(&base_url)
        .embed_batch(&texts, EmbedTask::RetrievalDocument)
        .await;

    assert!(matches!(result, Err(ServiceError::Malformed(_))));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn test_error_status_is_reported_with_body() {
    let (base_url, _recorded, shutdown_tx) = start_mock_gemini_server(
        403,
        json!({ "error": { "code": 403, "message": "API key not valid" } }),
    )
    .await;

    let result = client(&base_url)
        .embed("hello", EmbedTask::RetrievalQuery)
        .await;

    match result {
        Err(ServiceError::Status { status, body }) => {
            assert_eq!(status, 403);
            assert!(body.contains("API key not valid"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn test_generate_sends_instruction_and_question() {
    let (base_url, recorded, shutdown_tx) = start_mock_gemini_server(
        200,
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Photosynthesis does." }] },
                "finishReason": "STOP"
            }]
        }),
    )
    .await;
    let prompt = Prompt {
        system: "Answer briefly.\n\nPhotosynthesis converts light.".to_string(),
        input: "What converts light?".to_string(),
    };

    let answer = client(&base_url)
        .generate(&prompt, &SamplingParams::default())
        .await
        .unwrap();

    assert_eq!(answer, "Photosynthesis does.");
    let requests = recorded.lock().unwrap();
    let RecordedRequest { uri, api_key, body } = &requests[0];
    assert_eq!(uri, "/v1beta/models/gemini-2.0-flash:generateContent");
    assert_eq!(api_key.as_deref(), Some("test-key"));
    assert_eq!(
        body["systemInstruction"]["parts"][0]["text"],
        "Answer briefly.\n\nPhotosynthesis converts light."
    );
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "What converts light?");
    assert_eq!(body["generationConfig"]["temperature"], 0.0);
    assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn test_generate_without_candidates_is_empty_response() {
    let (base_url, _recorded, shutdown_tx) =
        start_mock_gemini_server(200, json!({ "candidates": [] })).await;
    let prompt = Prompt {
        system: "Answer briefly.".to_string(),
        input: "Anything?".to_string(),
    };

    let result = client(&base_url)
        .generate(&prompt, &SamplingParams::default())
        .await;

    assert!(matches!(result, Err(ServiceError::EmptyResponse)));
    shutdown_tx.send(()).ok();
}

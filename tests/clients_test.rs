//! HTTP client tests against an in-process fake provider

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use axum::Router;
use labrag::config::AppConfig;
use labrag::embeddings::Embedder;
use labrag::embeddings::EmbeddingClient;
use labrag::embeddings::EmbeddingProvider;
use labrag::llm::ChatMessage;
use labrag::llm::ChatModel;
use labrag::llm::GenerationParams;
use labrag::llm::LlmClient;
use labrag::llm::LlmProvider;
use labrag::LabRagError;
use serde_json::json;
use serde_json::Value;

#[derive(Clone, Default)]
struct Fake {
    embedding_requests: Arc<AtomicUsize>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer sk-test")
}

/// OpenAI-style embeddings: one-hot on input length, entries returned in reverse
async fn openai_embeddings(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.embedding_requests.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let mut data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .map(|(index, text)| {
            let len = text.as_str().unwrap_or_default().len() as f32;
            json!({"index": index, "embedding": [len, 1.0, 0.0]})
        })
        .collect();
    data.reverse();
    (StatusCode::OK, Json(json!({"data": data})))
}

async fn ollama_embeddings(Json(body): Json<Value>) -> Json<Value> {
    let len = body["prompt"].as_str().unwrap_or_default().len() as f32;
    Json(json!({"embedding": [len, 2.0]}))
}

async fn openai_chat(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    if body["model"] == "overloaded" {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "try later"})),
        );
    }
    let system = body["messages"][0]["content"].as_str().unwrap_or_default();
    let reply = format!(
        "role={} temp={} system_chars={}",
        body["messages"][0]["role"].as_str().unwrap_or_default(),
        body["temperature"],
        system.len()
    );
    (
        StatusCode::OK,
        Json(json!({"choices": [{"message": {"role": "assistant", "content": reply}}]})),
    )
}

async fn ollama_chat(Json(body): Json<Value>) -> Json<Value> {
    let stream = body["stream"].as_bool().unwrap_or(true);
    let user = body["messages"][1]["content"].as_str().unwrap_or_default();
    Json(json!({
        "message": {"role": "assistant", "content": format!("stream={stream} user={user}")},
        "done": true
    }))
}

async fn spawn_fake() -> (String, Fake) {
    let fake = Fake::default();
    let app = Router::new()
        .route("/v1/embeddings", post(openai_embeddings))
        .route("/v1/chat/completions", post(openai_chat))
        .route("/api/embeddings", post(ollama_embeddings))
        .route("/api/chat", post(ollama_chat))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), fake)
}

fn embedding_client(provider: EmbeddingProvider, endpoint: String) -> EmbeddingClient {
    let mut config = AppConfig::default().embeddings;
    config.provider = provider;
    config.endpoint = endpoint;
    config.api_key = Some("sk-test".to_string());
    config.api_key_env = None;
    EmbeddingClient::new(&config).unwrap()
}

fn llm_client(provider: LlmProvider, endpoint: String, model: &str) -> LlmClient {
    let mut config = AppConfig::default().llm;
    config.provider = provider;
    config.endpoint = endpoint;
    config.model = model.to_string();
    config.api_key = Some("sk-test".to_string());
    config.api_key_env = None;
    LlmClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_openai_batch_keeps_input_order() {
    let (base, fake) = spawn_fake().await;
    let client = embedding_client(EmbeddingProvider::OpenAI, format!("{base}/v1"));

    let texts = vec!["a".to_string(), "bbb".to_string(), "cc".to_string()];
    let vectors = client.embed_batch(&texts).await.unwrap();

    let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
    assert_eq!(lengths, vec![1.0, 3.0, 2.0]);
    assert_eq!(fake.embedding_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_groq_batches_are_chunked() {
    let (base, fake) = spawn_fake().await;
    let client = embedding_client(EmbeddingProvider::Groq, format!("{base}/v1"));

    let texts: Vec<String> = (0..250).map(|i| "x".repeat(i % 7 + 1)).collect();
    let vectors = client.embed_batch(&texts).await.unwrap();

    assert_eq!(vectors.len(), 250);
    assert_eq!(vectors[249][0], (249 % 7 + 1) as f32);
    assert_eq!(fake.embedding_requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_ollama_embeddings_in_order() {
    let (base, _) = spawn_fake().await;
    let client = embedding_client(EmbeddingProvider::Ollama, base);

    let texts: Vec<String> = ["one", "three", "fifteen"].iter().map(|s| s.to_string()).collect();
    let vectors = client.embed_batch(&texts).await.unwrap();
    assert_eq!(vectors, vec![vec![3.0, 2.0], vec![5.0, 2.0], vec![7.0, 2.0]]);

    let single = client.embed("glucose").await.unwrap();
    assert_eq!(single, vec![7.0, 2.0]);
}

#[tokio::test]
async fn test_embedding_dimension_mismatch_rejected() {
    let (base, _) = spawn_fake().await;
    let mut config = AppConfig::default().embeddings;
    config.provider = EmbeddingProvider::Ollama;
    config.endpoint = base;
    config.dimension = Some(1536);
    let client = EmbeddingClient::new(&config).unwrap();

    let err = client.embed("glucose").await.unwrap_err();
    assert!(matches!(err, LabRagError::EmbeddingError(_)));
}

#[tokio::test]
async fn test_wrong_key_is_embedding_error() {
    let (base, _) = spawn_fake().await;
    let mut config = AppConfig::default().embeddings;
    config.endpoint = format!("{base}/v1");
    config.api_key = Some("sk-wrong".to_string());
    let client = EmbeddingClient::new(&config).unwrap();

    let err = client.embed("glucose").await.unwrap_err();
    assert!(matches!(err, LabRagError::EmbeddingError(ref msg) if msg.contains("401")));
}

#[tokio::test]
async fn test_openai_chat_completion() {
    let (base, _) = spawn_fake().await;
    let client = llm_client(LlmProvider::OpenAI, format!("{base}/v1"), "gpt-4o-mini");

    let reply = client
        .complete(
            &[ChatMessage::system("abcd"), ChatMessage::user("hi")],
            &GenerationParams {
                temperature: 0.5,
                max_tokens: 64,
            },
        )
        .await
        .unwrap();
    assert_eq!(reply, "role=system temp=0.5 system_chars=4");
}

#[tokio::test]
async fn test_chat_error_status_is_llm_error() {
    let (base, _) = spawn_fake().await;
    let client = llm_client(LlmProvider::Groq, format!("{base}/v1"), "overloaded");

    let err = client
        .complete(&[ChatMessage::user("hi")], &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LabRagError::LlmError(ref msg) if msg.contains("503")));
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_ollama_chat_disables_streaming() {
    let (base, _) = spawn_fake().await;
    let client = llm_client(LlmProvider::Ollama, base, "llama3");

    let reply = client
        .complete(
            &[ChatMessage::system("s"), ChatMessage::user("Any anemia?")],
            &GenerationParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(reply, "stream=false user=Any anemia?");
}

#[tokio::test]
async fn test_unreachable_provider_is_http_error() {
    let client = llm_client(LlmProvider::Ollama, "http://127.0.0.1:1".to_string(), "llama3");
    let err = client
        .complete(&[ChatMessage::user("hi")], &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LabRagError::HttpError(_)));
}

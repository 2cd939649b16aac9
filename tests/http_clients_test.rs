//! Image fetcher and Gemini client against in-process HTTP servers.
//!
//! Run with: cargo test --test http_clients_test

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio_test::{assert_err, assert_ok};

use catalog_api::config::AnalysisConfig;
use catalog_api::models::analysis::{AnalysisMode, AnalysisRequest};
use catalog_api::services::analyzer::{AnalysisError, ProductAnalyzer};
use catalog_api::services::gemini::{build_prompt_parts, GeminiClient, VisionModel};
use catalog_api::services::image_fetcher::{HttpImageFetcher, ImageSource};

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00";

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn image_host() -> Router {
    Router::new()
        .route(
            "/img/shirt.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png; charset=binary")], PNG_BYTES) }),
        )
        .route("/img/untyped.gif", get(|| async { GIF_BYTES.to_vec() }))
        .route(
            "/img/missing.jpg",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        )
}

type Captured = Arc<Mutex<Vec<Value>>>;

async fn generate_content(
    State(captured): State<Captured>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    if model_action != "gemini-test:generateContent" {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "unknown model"})));
    }

    let images = body["contents"][0]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter(|p| p.get("inline_data").is_some()).count())
        .unwrap_or(0);
    captured.lock().unwrap().push(body);

    let text = format!("```json\n{{\"products\":[{{\"name\":\"Seen {images}\"}}]}}\n```");
    (
        StatusCode::OK,
        Json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })),
    )
}

async fn spawn_gemini() -> (String, Captured) {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route("/v1beta/models/{model_action}", post(generate_content))
        .with_state(captured.clone());
    (spawn(app).await, captured)
}

#[tokio::test]
async fn test_fetch_uses_declared_content_type() {
    let host = spawn(image_host()).await;
    let fetcher = HttpImageFetcher::default();

    let payload = assert_ok!(fetcher.fetch(&format!("{host}/img/shirt.png")).await);
    assert_eq!(payload.mime_type, "image/png");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&payload.data)
        .unwrap();
    assert_eq!(decoded, PNG_BYTES);
}

#[tokio::test]
async fn test_fetch_sniffs_when_header_is_not_an_image() {
    let host = spawn(image_host()).await;
    let fetcher = HttpImageFetcher::default();

    let payload = assert_ok!(fetcher.fetch(&format!("{host}/img/untyped.gif")).await);
    assert_eq!(payload.mime_type, "image/gif");
}

#[tokio::test]
async fn test_fetch_non_success_names_url() {
    let host = spawn(image_host()).await;
    let url = format!("{host}/img/missing.jpg");

    let err = assert_err!(HttpImageFetcher::default().fetch(&url).await);
    match err {
        AnalysisError::Fetch { url: failed, reason } => {
            assert_eq!(failed, url);
            assert!(reason.contains("404"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_gemini_client_sends_inline_images() {
    let (base, captured) = spawn_gemini().await;
    let client = GeminiClient::new(
        reqwest::Client::new(),
        "test-key".to_string(),
        "gemini-test".to_string(),
        base,
        "system prompt".to_string(),
    );

    let fetcher = HttpImageFetcher::default();
    let host = spawn(image_host()).await;
    let image = assert_ok!(fetcher.fetch(&format!("{host}/img/shirt.png")).await);

    let parts = assert_ok!(build_prompt_parts("analyze", vec![image]));
    let text = assert_ok!(client.generate(&parts).await);
    assert!(text.contains("Seen 1"));

    let bodies = captured.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0]["system_instruction"]["parts"][0]["text"],
        "system prompt"
    );
    assert_eq!(bodies[0]["contents"][0]["parts"][0]["text"], "analyze");
    assert_eq!(
        bodies[0]["contents"][0]["parts"][1]["inline_data"]["mime_type"],
        "image/png"
    );
}

#[tokio::test]
async fn test_gemini_rejection_is_model_invocation_error() {
    let (base, _) = spawn_gemini().await;
    let client = GeminiClient::new(
        reqwest::Client::new(),
        "wrong-key".to_string(),
        "gemini-test".to_string(),
        base,
        String::new(),
    );

    let parts = assert_ok!(build_prompt_parts(
        "analyze",
        vec![catalog_api::models::analysis::ImagePayload {
            data: "AAAA".to_string(),
            mime_type: "image/png".to_string(),
        }]
    ));
    let err = assert_err!(client.generate(&parts).await);
    assert!(matches!(err, AnalysisError::ModelInvocation(ref msg) if msg.contains("401")));
}

#[tokio::test]
async fn test_configured_analyzer_end_to_end() {
    let (base, captured) = spawn_gemini().await;
    let host = spawn(image_host()).await;

    let mut config = AnalysisConfig::with_api_key("test-key");
    config.model = "gemini-test".to_string();
    config.base_url = base;
    let analyzer = assert_ok!(ProductAnalyzer::from_config(&config));

    let request = assert_ok!(AnalysisRequest::new(
        vec![
            format!("{host}/img/shirt.png"),
            format!("{host}/img/untyped.gif"),
        ],
        AnalysisMode::Combined,
    ));
    let combined = assert_ok!(analyzer.analyze_combined(&request).await);

    assert_eq!(combined.analysis.first_str("products", "name"), Some("Seen 2"));
    assert_eq!(combined.metadata.model_used, "gemini-test");
    assert_eq!(captured.lock().unwrap().len(), 1);
}

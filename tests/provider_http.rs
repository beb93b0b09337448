//! Provider HTTP behaviour against mock servers.

mod common;

use ai_reply_rust::providers::{
    GeminiConfig, GeminiProvider, GenerateOptions, OllamaConfig, OllamaProvider,
};
use ai_reply_rust::{
    ApiKey, Error, GenerationPrompt, GenerationProvider, ImageAttachment, ProviderErrorKind,
    ProviderKind, ProviderRouterBuilder, ReplyLength, ReplyRequest,
};
use common::fast_config;
use mockito::{Matcher, Server};
use std::time::Duration;

const GEMINI_PATH: &str = "/v1beta/models/gemini-2.0-flash-exp:generateContent";

fn prompt() -> GenerationPrompt {
    GenerationPrompt {
        text: "write three replies".into(),
        image: None,
        options: GenerateOptions {
            max_suggestions: 3,
            length_hint: ReplyLength::Short,
        },
    }
}

fn gemini(base_url: &str) -> GeminiProvider {
    GeminiProvider::new(
        GeminiConfig {
            base_url: base_url.to_string(),
            ..GeminiConfig::default()
        },
        ApiKey::new("test-key").unwrap(),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn ollama(base_url: &str, model: Option<&str>) -> OllamaProvider {
    OllamaProvider::new(OllamaConfig {
        base_url: base_url.to_string(),
        model: model.map(String::from),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_gemini_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", GEMINI_PATH)
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "generationConfig": { "maxOutputTokens": 2048 }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"candidates":[{"content":{"parts":[{"text":"**Reply 1:** hi"},{"text":"\n**Reply 2:** hello"}]},"finishReason":"STOP"}]}"#,
        )
        .create_async()
        .await;

    let text = tokio_test::assert_ok!(gemini(&server.url()).generate(&prompt()).await);
    assert_eq!(text, "**Reply 1:** hi\n**Reply 2:** hello");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_gemini_sends_inline_image() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", GEMINI_PATH)
        .match_body(Matcher::Regex(r#""inline_data""#.into()))
        .with_status(200)
        .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"cute"}]}}]}"#)
        .create_async()
        .await;

    let mut p = prompt();
    p.image = Some(ImageAttachment::from_bytes(&b"\x89PNG\r\n\x1a\nrest"[..]));
    gemini(&server.url()).generate(&p).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_gemini_status_mapping() {
    let cases: [(usize, &str, ProviderErrorKind); 5] = [
        (
            429,
            r#"{"error":{"message":"Resource has been exhausted"}}"#,
            ProviderErrorKind::RateLimited,
        ),
        (403, r#"{"error":{"message":"forbidden"}}"#, ProviderErrorKind::InvalidCredential),
        (
            400,
            r#"{"error":{"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#,
            ProviderErrorKind::InvalidCredential,
        ),
        (400, r#"{"error":{"message":"bad field"}}"#, ProviderErrorKind::InvalidRequest),
        (503, "overloaded", ProviderErrorKind::Network),
    ];

    for (status, body, expected) in cases {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", GEMINI_PATH)
            .with_status(status)
            .with_header("retry-after", "4")
            .with_body(body)
            .create_async()
            .await;
        let err = gemini(&server.url()).generate(&prompt()).await.unwrap_err();
        assert_eq!(err.kind, expected, "HTTP {status}");
        if expected == ProviderErrorKind::RateLimited {
            assert_eq!(err.retry_after, Some(Duration::from_secs(4)));
        }
    }
}

#[tokio::test]
async fn test_gemini_safety_block() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", GEMINI_PATH)
        .with_status(200)
        .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
        .create_async()
        .await;
    let err = gemini(&server.url()).generate(&prompt()).await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::SafetyBlocked);
}

#[tokio::test]
async fn test_ollama_discovers_first_model() {
    let mut server = Server::new_async().await;
    let tags = server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models":[{"name":"llama3.2:latest"},{"name":"mistral"}]}"#)
        .expect(1)
        .create_async()
        .await;
    let generate = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "llama3.2:latest",
            "stream": false
        })))
        .with_status(200)
        .with_body(r#"{"model":"llama3.2:latest","response":"1. hey\n2. hi","done":true}"#)
        .expect(2)
        .create_async()
        .await;

    let provider = ollama(&server.url(), None);
    assert_eq!(provider.kind(), ProviderKind::Secondary);
    assert_eq!(provider.generate(&prompt()).await.unwrap(), "1. hey\n2. hi");
    // The discovered model is remembered.
    provider.generate(&prompt()).await.unwrap();
    assert_eq!(provider.name(), "ollama (llama3.2:latest)");
    tags.assert_async().await;
    generate.assert_async().await;
}

#[tokio::test]
async fn test_ollama_without_models_is_unavailable() {
    let mut server = Server::new_async().await;
    let _tags = server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models":[]}"#)
        .create_async()
        .await;

    let provider = ollama(&server.url(), None);
    assert!(!provider.is_available().await);
    let err = provider.generate(&prompt()).await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Unavailable);
}

#[tokio::test]
async fn test_ollama_missing_model_is_unavailable() {
    let mut server = Server::new_async().await;
    let _generate = server
        .mock("POST", "/api/generate")
        .with_status(404)
        .with_body(r#"{"error":"model 'nope' not found"}"#)
        .create_async()
        .await;

    let err = ollama(&server.url(), Some("nope"))
        .generate(&prompt())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Unavailable);
}

#[tokio::test]
async fn test_router_falls_back_from_rate_limited_gemini_to_ollama() {
    let mut gemini_server = Server::new_async().await;
    let rate_limited = gemini_server
        .mock("POST", GEMINI_PATH)
        .with_status(429)
        .with_body(r#"{"error":{"message":"quota"}}"#)
        .expect(3)
        .create_async()
        .await;
    let mut ollama_server = Server::new_async().await;
    let _local = ollama_server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_body(r#"{"response":"**Reply 1:** local hi"}"#)
        .create_async()
        .await;

    let mut cfg = fast_config();
    cfg.gemini.base_url = gemini_server.url();
    cfg.ollama = Some(OllamaConfig {
        base_url: ollama_server.url(),
        model: Some("llama3.2".into()),
        timeout_secs: 5,
    });
    let router = ProviderRouterBuilder::from_config(cfg, ApiKey::new("test-key").unwrap())
        .unwrap()
        .build()
        .unwrap();

    let request = ReplyRequest::builder().text("hey, you up?").build().unwrap();
    let result = router.handle(&request).await.unwrap();
    assert_eq!(result.provider_used(), Some(ProviderKind::Secondary));
    assert_eq!(result.text(), ["local hi"]);
    rate_limited.assert_async().await;

    let again = router.handle(&request).await.unwrap();
    assert!(again.served_from_cache());
}

#[tokio::test]
async fn test_router_reports_unreachable_ollama() {
    let mut gemini_server = Server::new_async().await;
    let _bad = gemini_server
        .mock("POST", GEMINI_PATH)
        .with_status(400)
        .with_body(r#"{"error":{"message":"API key not valid"}}"#)
        .create_async()
        .await;

    let mut cfg = fast_config();
    cfg.gemini.base_url = gemini_server.url();
    cfg.ollama = Some(OllamaConfig {
        base_url: "http://127.0.0.1:9".into(),
        model: Some("llama3.2".into()),
        timeout_secs: 2,
    });
    let router = ProviderRouterBuilder::from_config(cfg, ApiKey::new("test-key").unwrap())
        .unwrap()
        .build()
        .unwrap();

    let request = ReplyRequest::builder().text("hi").build().unwrap();
    let err = router.handle(&request).await.unwrap_err();
    let Error::AllProvidersFailed { primary, secondary } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(
        primary.provider_error().map(|e| e.kind),
        Some(ProviderErrorKind::InvalidCredential)
    );
    assert!(matches!(secondary.as_ref(), Error::SecondaryUnavailable(_)));
}

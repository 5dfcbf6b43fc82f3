//! Gemini client tests against a local mock server

use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use secrecy::SecretString;
use serde_json::json;

use autodeploy::analysis::strategy::StrategyGenerator;
use autodeploy::errors::EngineError;
use autodeploy::http::gemini::GeminiClient;
use autodeploy::models::repository::{RepositoryStructure, TechStack};
use autodeploy::models::strategy::{DeploymentStrategy, StrategySource};
use autodeploy::services::TextGenerator;

const GENERATE_PATH: &str = "/models/gemini-1.5-flash:generateContent";

fn client(server: &mockito::Server) -> GeminiClient {
    let key = SecretString::from("g3m-key".to_string());
    GeminiClient::new(&server.url(), "gemini-1.5-flash", &key, Duration::from_secs(5)).unwrap()
}

async fn reply_with(server: &mut mockito::Server, status: usize, body: &str) -> mockito::Mock {
    server
        .mock("POST", GENERATE_PATH)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

fn assert_generation_error(result: Result<String, EngineError>) {
    match result {
        Err(EngineError::GenerationError(_)) => {}
        other => panic!("expected a generation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_sends_prompt_and_joins_parts() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_header("x-goog-api-key", "g3m-key")
        .match_body(Matcher::PartialJson(json!({
            "contents": [{"parts": [{"text": "plan a deployment"}]}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"ok\":"},{"text":"true}"}],"role":"model"},"finishReason":"STOP"}]}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let text = client(&server).generate("plan a deployment").await.unwrap();

    mock.assert_async().await;
    assert_eq!(text, "{\"ok\":true}");
}

#[tokio::test]
async fn test_blocked_response_is_generation_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = reply_with(
        &mut server,
        200,
        r#"{"candidates":[{"finishReason":"SAFETY","safetyRatings":[]}],"promptFeedback":{"blockReason":"SAFETY"}}"#,
    )
    .await;

    assert_generation_error(client(&server).generate("anything").await);
}

#[tokio::test]
async fn test_no_candidates_is_generation_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = reply_with(&mut server, 200, r#"{"promptFeedback":{"blockReason":"OTHER"}}"#).await;

    assert_generation_error(client(&server).generate("anything").await);
}

#[tokio::test]
async fn test_server_error_is_generation_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = reply_with(
        &mut server,
        429,
        r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#,
    )
    .await;

    let result = client(&server).generate("anything").await;
    match result {
        Err(EngineError::GenerationError(message)) => assert!(message.contains("exhausted")),
        other => panic!("expected a generation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blocked_response_falls_back_to_default_strategy() {
    let mut server = mockito::Server::new_async().await;
    let _mock = reply_with(&mut server, 200, r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).await;

    let generator = StrategyGenerator::new(Arc::new(client(&server)), Duration::from_secs(5));
    let resolved = generator
        .generate(&TechStack::default(), &RepositoryStructure::new())
        .await;

    assert_eq!(resolved.source, StrategySource::Default);
    assert_eq!(resolved.strategy, DeploymentStrategy::default());
    assert!(resolved.fallback_reason.unwrap().contains("no text"));
}

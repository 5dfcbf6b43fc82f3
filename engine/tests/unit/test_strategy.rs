//! Strategy generation tests

use std::sync::Arc;
use std::time::Duration;

use autodeploy::analysis::strategy::StrategyGenerator;
use autodeploy::models::repository::{Concern, RepositoryStructure, TechStack};
use autodeploy::models::strategy::{DeploymentStrategy, StrategySource};

use crate::support::StubAi;

fn generator(ai: StubAi) -> StrategyGenerator {
    StrategyGenerator::new(Arc::new(ai), Duration::from_millis(200))
}

fn react_stack() -> TechStack {
    let mut stack = TechStack::default();
    stack.record(Concern::Frontend, "react", true);
    stack.record(Concern::Backend, "fastapi", true);
    stack
}

#[tokio::test]
async fn test_generation_error_falls_back_to_default() {
    let resolved = generator(StubAi::failing("quota exceeded"))
        .generate(&react_stack(), &RepositoryStructure::new())
        .await;

    assert_eq!(resolved.source, StrategySource::Default);
    assert_eq!(resolved.strategy, DeploymentStrategy::default());
    assert_eq!(resolved.strategy.frontend.platform, "vercel");
    assert_eq!(resolved.strategy.backend.platform, "render");
    assert!(resolved.fallback_reason.unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn test_fallback_is_idempotent() {
    let generator = generator(StubAi::replying("no json here"));
    let first = generator
        .generate(&react_stack(), &RepositoryStructure::new())
        .await;
    let second = generator
        .generate(&react_stack(), &RepositoryStructure::new())
        .await;

    assert_eq!(first.source, StrategySource::Default);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_timeout_falls_back() {
    let resolved = generator(StubAi::hanging())
        .generate(&react_stack(), &RepositoryStructure::new())
        .await;
    assert_eq!(resolved.source, StrategySource::Default);
    assert!(resolved.fallback_reason.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_strategy_extracted_from_prose() {
    let mut custom = DeploymentStrategy::default();
    custom.frontend.platform = "netlify".to_string();
    custom.backend.start_command = "gunicorn app:app".to_string();
    let reply = format!(
        "Here is the plan you asked for:\n```json\n{}\n```\nLet me know!",
        serde_json::to_string_pretty(&custom).unwrap()
    );

    let resolved = generator(StubAi::replying(&reply))
        .generate(&react_stack(), &RepositoryStructure::new())
        .await;

    assert_eq!(resolved.source, StrategySource::Ai);
    assert!(resolved.fallback_reason.is_none());
    assert_eq!(resolved.strategy, custom);
}

#[tokio::test]
async fn test_shape_mismatch_falls_back() {
    let reply = r#"{"frontend": {"platform": "vercel"}, "backend": "render"}"#;
    let resolved = generator(StubAi::replying(reply))
        .generate(&react_stack(), &RepositoryStructure::new())
        .await;
    assert_eq!(resolved.source, StrategySource::Default);
    assert_eq!(resolved.strategy, DeploymentStrategy::default());
}

#[tokio::test]
async fn test_prompt_carries_stack() {
    let ai = Arc::new(StubAi::failing("offline"));
    StrategyGenerator::new(ai.clone(), Duration::from_secs(1))
        .generate(&react_stack(), &RepositoryStructure::new())
        .await;

    let prompts = ai.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("\"fastapi\": true"));
    assert!(prompts[0].contains("MongoDB Atlas"));
}

#[tokio::test]
async fn test_multiline_build_command_falls_back() {
    let mut custom = DeploymentStrategy::default();
    custom.frontend.build_command = "npm ci\nnpm run build\npermissions:\n  contents: write".to_string();
    let reply = serde_json::to_string(&custom).unwrap();

    let resolved = generator(StubAi::replying(&reply))
        .generate(&react_stack(), &RepositoryStructure::new())
        .await;

    assert_eq!(resolved.source, StrategySource::Default);
    assert_eq!(resolved.strategy, DeploymentStrategy::default());
    assert!(resolved.fallback_reason.unwrap().contains("control characters"));
}

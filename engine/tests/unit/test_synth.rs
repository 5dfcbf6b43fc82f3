//! Artifact synthesis tests

use autodeploy::deploy::synth::{
    ArtifactSynthesizer, BACKEND_DOCKERFILE, BACKEND_WORKFLOW, FRONTEND_WORKFLOW,
    RENDER_MANIFEST, VERCEL_MANIFEST,
};
use autodeploy::models::strategy::DeploymentStrategy;

#[test]
fn test_synthesis_is_deterministic() {
    let synth = ArtifactSynthesizer::new();
    let strategy = DeploymentStrategy::default();

    let first = synth.synthesize("octo/music-app", &strategy);
    let second = synth.synthesize("octo/music-app", &strategy);
    assert_eq!(first, second);
}

#[test]
fn test_default_strategy_file_set() {
    let files = ArtifactSynthesizer::new().synthesize("octo/music-app", &DeploymentStrategy::default());

    assert_eq!(files.len(), 4);
    for path in [VERCEL_MANIFEST, RENDER_MANIFEST, FRONTEND_WORKFLOW, BACKEND_WORKFLOW] {
        assert!(files.contains_key(path), "missing {}", path);
    }
    assert!(!files.contains_key(BACKEND_DOCKERFILE));

    let render: serde_json::Value = serde_json::from_str(&files[RENDER_MANIFEST]).unwrap();
    assert_eq!(render["services"][0]["name"], "music-app-backend");
    assert_eq!(render["services"][0]["type"], "web");
    assert_eq!(render["services"][0]["plan"], "free");
}

#[test]
fn test_strategy_values_flow_into_artifacts() {
    let mut strategy = DeploymentStrategy::default();
    strategy.frontend.build_command = "yarn build".to_string();
    strategy.frontend.output_directory = "dist".to_string();
    strategy.backend.start_command = "gunicorn app:app".to_string();
    strategy.backend.dockerfile = Some("Dockerfile".to_string());

    let files = ArtifactSynthesizer::new().synthesize("octo/app", &strategy);

    let vercel: serde_json::Value = serde_json::from_str(&files[VERCEL_MANIFEST]).unwrap();
    assert_eq!(vercel["builds"][0]["config"]["distDir"], "dist");
    assert!(files[FRONTEND_WORKFLOW].contains("yarn build"));

    let render: serde_json::Value = serde_json::from_str(&files[RENDER_MANIFEST]).unwrap();
    assert_eq!(render["services"][0]["startCommand"], "gunicorn app:app");
    assert!(files.contains_key(BACKEND_DOCKERFILE));
}

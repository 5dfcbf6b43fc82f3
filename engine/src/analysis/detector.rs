//! Technology stack detection

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::models::repository::{Concern, RepositoryStructure, TechStack};
use crate::services::SourceControl;

const PACKAGE_JSON: &str = "package.json";
const REQUIREMENTS_TXT: &str = "requirements.txt";

/// Infers a [`TechStack`] from manifests and repository layout
pub struct TechStackDetector {
    scm: Arc<dyn SourceControl>,
}

impl TechStackDetector {
    pub fn new(scm: Arc<dyn SourceControl>) -> Self {
        Self { scm }
    }

    /// Run every detector. Never fails; a manifest that cannot be read or
    /// parsed simply contributes no signals.
    pub async fn detect(&self, repo: &str, structure: &RepositoryStructure) -> TechStack {
        let mut stack = TechStack::default();

        if structure.has_file(PACKAGE_JSON) {
            match self.scm.get_file_content(repo, PACKAGE_JSON).await {
                Ok(content) => {
                    if let Err(e) = detect_package_json(&mut stack, &content) {
                        warn!("Ignoring unparsable {}: {}", PACKAGE_JSON, e);
                    }
                }
                Err(e) => warn!("Failed to fetch {}: {}", PACKAGE_JSON, e),
            }
        }

        if structure.has_file(REQUIREMENTS_TXT) {
            match self.scm.get_file_content(repo, REQUIREMENTS_TXT).await {
                Ok(content) => detect_requirements(&mut stack, &content),
                Err(e) => warn!("Failed to fetch {}: {}", REQUIREMENTS_TXT, e),
            }
        }

        detect_layout(&mut stack, structure);

        debug!("Detected tech stack for {}: {:?}", repo, stack);
        stack
    }
}

/// Signals from a root `package.json`
pub fn detect_package_json(stack: &mut TechStack, content: &str) -> Result<(), EngineError> {
    let manifest: Value = serde_json::from_str(content)?;
    let mut dependencies: Vec<String> = manifest
        .get("dependencies")
        .and_then(Value::as_object)
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default();
    dependencies.sort();
    let has = |name: &str| dependencies.iter().any(|d| d == name);

    stack.record(Concern::Frontend, "react", has("react"));
    stack.record(Concern::Frontend, "vue", has("vue"));
    stack.record(Concern::Frontend, "next", has("next"));

    let build_script = manifest
        .pointer("/scripts/build")
        .and_then(Value::as_str)
        .is_some();
    stack.record(Concern::Frontend, "build_script", build_script);
    stack.record(Concern::Frontend, "dependencies", dependencies);
    Ok(())
}

/// Signals from a root `requirements.txt`
pub fn detect_requirements(stack: &mut TechStack, content: &str) {
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    let packages: Vec<String> = lines
        .iter()
        .filter(|line| !line.starts_with('#'))
        .map(|line| requirement_name(line))
        .collect();
    let has = |name: &str| packages.iter().any(|p| p == name);

    stack.record(Concern::Backend, "python", true);
    stack.record(
        Concern::Backend,
        "fastapi",
        content.to_lowercase().contains("fastapi"),
    );
    stack.record(Concern::Backend, "flask", has("flask"));
    stack.record(Concern::Backend, "django", has("django"));
    stack.record(Concern::Backend, "dependencies", lines);

    if has("pymongo") || has("motor") {
        stack.record(Concern::Database, "mongodb", true);
    }
}

/// Lowercased distribution name of a requirement line
fn requirement_name(line: &str) -> String {
    let end = line
        .find(|c: char| matches!(c, '=' | '<' | '>' | '~' | '!' | ';' | '[' | ' ' | '@'))
        .unwrap_or(line.len());
    line[..end].trim().to_lowercase()
}

/// Signals that only depend on what files exist
pub fn detect_layout(stack: &mut TechStack, structure: &RepositoryStructure) {
    if structure.has_directory("frontend/src") {
        stack.record(Concern::Frontend, "react_structure", true);
    }
    if structure.has_file("backend/server.py") {
        stack.record(Concern::Backend, "fastapi_structure", true);
    }

    if structure.has_file("Dockerfile") {
        stack.record(Concern::Deployment, "docker", true);
    }
    if structure.has_file("vercel.json") {
        stack.record(Concern::Deployment, "vercel", true);
    }
    if structure.has_file("render.yaml") {
        stack.record(Concern::Deployment, "render", true);
    }
    if structure.has_directory(".github/workflows") {
        stack.record(Concern::Deployment, "github_actions", true);
    }
}

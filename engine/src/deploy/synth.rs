//! Deployment artifact synthesis.
//!
//! Pure transformation from a strategy to file contents. Output is keyed by
//! path in a sorted map and all JSON is rendered from sorted maps, so the
//! same input always yields byte-identical artifacts.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::debug;

use crate::models::strategy::{DeploymentStrategy, PLATFORM_RENDER, PLATFORM_VERCEL};

/// Relative path -> file content
pub type ArtifactSet = BTreeMap<String, String>;

pub const FRONTEND_DIR: &str = "frontend";
pub const BACKEND_DIR: &str = "backend";
pub const VERCEL_MANIFEST: &str = "vercel.json";
pub const RENDER_MANIFEST: &str = "render.yaml";
pub const FRONTEND_WORKFLOW: &str = ".github/workflows/deploy-frontend.yml";
pub const BACKEND_WORKFLOW: &str = ".github/workflows/deploy-backend.yml";
pub const BACKEND_DOCKERFILE: &str = "backend/Dockerfile";

const NODE_VERSION: &str = "18";
const CONTAINER_BASE_IMAGE: &str = "python:3.11-slim";
const CONTAINER_PORT: u16 = 8000;

/// Renders strategies into deployment files
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactSynthesizer;

impl ArtifactSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(&self, repo: &str, strategy: &DeploymentStrategy) -> ArtifactSet {
        let mut files = ArtifactSet::new();
        let service = service_name(repo);

        if strategy.frontend.platform == PLATFORM_VERCEL {
            files.insert(VERCEL_MANIFEST.to_string(), vercel_manifest(strategy));
        }
        if strategy.backend.platform == PLATFORM_RENDER {
            files.insert(RENDER_MANIFEST.to_string(), render_manifest(service, strategy));
        }

        files.insert(FRONTEND_WORKFLOW.to_string(), frontend_workflow(strategy));
        files.insert(BACKEND_WORKFLOW.to_string(), backend_workflow());

        if strategy.backend.wants_container() {
            files.insert(BACKEND_DOCKERFILE.to_string(), dockerfile());
        }

        debug!("Synthesized {} artifacts for {}", files.len(), repo);
        files
    }
}

/// Final path segment of `owner/name`
fn service_name(repo: &str) -> &str {
    repo.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(repo)
}

fn pretty(value: &serde_json::Value) -> String {
    let mut out = serde_json::to_string_pretty(value).unwrap_or_default();
    out.push('\n');
    out
}

fn vercel_manifest(strategy: &DeploymentStrategy) -> String {
    pretty(&json!({
        "version": 2,
        "builds": [{
            "src": format!("{}/package.json", FRONTEND_DIR),
            "use": "@vercel/static-build",
            "config": {"distDir": strategy.frontend.output_directory}
        }],
        "routes": [{
            "src": "/(.*)",
            "dest": format!("/{}/$1", FRONTEND_DIR)
        }]
    }))
}

/// Emitted as JSON, which is valid YAML
fn render_manifest(service: &str, strategy: &DeploymentStrategy) -> String {
    pretty(&json!({
        "services": [{
            "type": "web",
            "name": format!("{}-backend", service),
            "env": "python",
            "plan": "free",
            "buildCommand": strategy.backend.build_command,
            "startCommand": strategy.backend.start_command,
            "rootDir": BACKEND_DIR,
            "envVars": [{
                "key": "MONGO_URL",
                "fromDatabase": {
                    "name": format!("{}-db", service),
                    "property": "connectionString"
                }
            }]
        }]
    }))
}

/// Indent every line of `text` so it stays inside a YAML block scalar
fn block_lines(text: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    text.trim()
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(&format!("\n{}", pad))
}

fn frontend_workflow(strategy: &DeploymentStrategy) -> String {
    let build_command = block_lines(&strategy.frontend.build_command, 10);
    format!(
        r#"name: Deploy Frontend to Vercel

on:
  push:
    branches: [ main ]
    paths: [ '{dir}/**' ]

jobs:
  deploy:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3

      - name: Setup Node.js
        uses: actions/setup-node@v3
        with:
          node-version: '{node}'

      - name: Install dependencies
        run: |
          cd {dir}
          npm install

      - name: Build project
        run: |
          cd {dir}
          {build_command}

      - name: Deploy to Vercel
        uses: amondnet/vercel-action@v25
        with:
          vercel-token: ${{{{ secrets.VERCEL_TOKEN }}}}
          vercel-org-id: ${{{{ secrets.VERCEL_ORG_ID }}}}
          vercel-project-id: ${{{{ secrets.VERCEL_PROJECT_ID }}}}
          working-directory: {dir}
"#,
        dir = FRONTEND_DIR,
        node = NODE_VERSION,
        build_command = build_command,
    )
}

fn backend_workflow() -> String {
    format!(
        r#"name: Deploy Backend to Render

on:
  push:
    branches: [ main ]
    paths: [ '{dir}/**' ]

jobs:
  deploy:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3

      - name: Trigger Render Deploy
        run: |
          curl -X POST "${{{{ secrets.RENDER_DEPLOY_HOOK }}}}"
"#,
        dir = BACKEND_DIR,
    )
}

fn dockerfile() -> String {
    format!(
        r#"FROM {image}

WORKDIR /app

COPY requirements.txt .
RUN pip install -r requirements.txt

COPY . .

EXPOSE {port}

CMD ["uvicorn", "server:app", "--host", "0.0.0.0", "--port", "{port}"]
"#,
        image = CONTAINER_BASE_IMAGE,
        port = CONTAINER_PORT,
    )
}

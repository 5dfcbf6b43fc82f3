//! Deployment strategy models

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::EngineError;

pub const PLATFORM_VERCEL: &str = "vercel";
pub const PLATFORM_RENDER: &str = "render";
pub const PLATFORM_MONGODB_ATLAS: &str = "mongodb_atlas";
pub const PLATFORM_GITHUB_ACTIONS: &str = "github_actions";

/// Four-section deployment plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentStrategy {
    pub frontend: FrontendPlan,
    pub backend: BackendPlan,
    pub database: DatabasePlan,
    pub cicd: CicdPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontendPlan {
    pub platform: String,
    pub build_command: String,
    pub output_directory: String,

    /// Names only, never values
    #[serde(default)]
    pub environment_variables: Vec<String>,

    #[serde(default)]
    pub vercel_config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendPlan {
    pub platform: String,
    pub build_command: String,
    pub start_command: String,

    /// Names only, never values
    #[serde(default)]
    pub environment_variables: Vec<String>,

    /// When present and non-empty a container build file is emitted
    #[serde(default)]
    pub dockerfile: Option<String>,

    #[serde(default)]
    pub render_config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabasePlan {
    pub platform: String,

    #[serde(default)]
    pub connection_string_format: Option<String>,

    #[serde(default)]
    pub collections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CicdPlan {
    #[serde(default = "default_cicd_platform")]
    pub platform: String,

    #[serde(default)]
    pub github_actions: Value,

    #[serde(default)]
    pub deployment_workflow: Vec<String>,
}

fn default_cicd_platform() -> String {
    PLATFORM_GITHUB_ACTIONS.to_string()
}

impl BackendPlan {
    pub fn wants_container(&self) -> bool {
        self.dockerfile
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

impl DeploymentStrategy {
    /// Check the invariants serde cannot express.
    ///
    /// Platforms must be named, commands and paths must be single lines
    /// free of control characters, and environment entries must be bare
    /// variable names.
    pub fn validate(&self) -> Result<(), EngineError> {
        let platforms = [
            ("frontend", &self.frontend.platform),
            ("backend", &self.backend.platform),
            ("database", &self.database.platform),
            ("cicd", &self.cicd.platform),
        ];
        for (section, platform) in platforms {
            if platform.trim().is_empty() {
                return Err(EngineError::ValidationError(format!(
                    "{} platform is empty",
                    section
                )));
            }
        }

        let lines = [
            ("frontend build_command", &self.frontend.build_command),
            ("frontend output_directory", &self.frontend.output_directory),
            ("backend build_command", &self.backend.build_command),
            ("backend start_command", &self.backend.start_command),
        ];
        for (field, value) in lines {
            if value.chars().any(char::is_control) {
                return Err(EngineError::ValidationError(format!(
                    "{} contains control characters: {:?}",
                    field, value
                )));
            }
        }

        let names = self
            .frontend
            .environment_variables
            .iter()
            .chain(&self.backend.environment_variables);
        for name in names {
            if !is_env_var_name(name) {
                return Err(EngineError::ValidationError(format!(
                    "invalid environment variable name: {:?}",
                    name
                )));
            }
        }

        Ok(())
    }
}

fn is_env_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Default for DeploymentStrategy {
    /// React static build on Vercel, Python WSGI service on Render, MongoDB
    /// Atlas, and a GitHub Actions workflow per side of the repository.
    fn default() -> Self {
        let backend_build = "pip install -r requirements.txt";
        let backend_start = "uvicorn server:app --host 0.0.0.0 --port $PORT";

        Self {
            frontend: FrontendPlan {
                platform: PLATFORM_VERCEL.to_string(),
                build_command: "npm run build".to_string(),
                output_directory: "build".to_string(),
                environment_variables: vec!["REACT_APP_BACKEND_URL".to_string()],
                vercel_config: json!({
                    "version": 2,
                    "builds": [{"src": "package.json", "use": "@vercel/static-build"}]
                }),
            },
            backend: BackendPlan {
                platform: PLATFORM_RENDER.to_string(),
                build_command: backend_build.to_string(),
                start_command: backend_start.to_string(),
                environment_variables: vec![
                    "MONGO_URL".to_string(),
                    "SECRET_KEY".to_string(),
                    "YOUTUBE_API_KEY".to_string(),
                ],
                dockerfile: None,
                render_config: json!({
                    "type": "web",
                    "env": "python",
                    "buildCommand": backend_build,
                    "startCommand": backend_start
                }),
            },
            database: DatabasePlan {
                platform: PLATFORM_MONGODB_ATLAS.to_string(),
                connection_string_format: Some(
                    "mongodb+srv://<username>:<password>@<cluster>.mongodb.net/<database>"
                        .to_string(),
                ),
                collections: vec![
                    "users".to_string(),
                    "playlists".to_string(),
                    "songs".to_string(),
                ],
            },
            cicd: CicdPlan {
                platform: PLATFORM_GITHUB_ACTIONS.to_string(),
                github_actions: json!({
                    "frontend_deploy": ".github/workflows/deploy-frontend.yml",
                    "backend_deploy": ".github/workflows/deploy-backend.yml"
                }),
                deployment_workflow: vec![
                    "Code push to main branch".to_string(),
                    "GitHub Actions triggers".to_string(),
                    "Frontend builds and deploys to Vercel".to_string(),
                    "Backend builds and deploys to Render".to_string(),
                    "Environment variables automatically configured".to_string(),
                ],
            },
        }
    }
}

/// Where a strategy came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategySource {
    Ai,
    Default,
}

/// A strategy together with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStrategy {
    pub strategy: DeploymentStrategy,
    pub source: StrategySource,

    /// Why the default was used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl ResolvedStrategy {
    pub fn from_ai(strategy: DeploymentStrategy) -> Self {
        Self {
            strategy,
            source: StrategySource::Ai,
            fallback_reason: None,
        }
    }

    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            strategy: DeploymentStrategy::default(),
            source: StrategySource::Default,
            fallback_reason: Some(reason.into()),
        }
    }
}
